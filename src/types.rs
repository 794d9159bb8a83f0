use crate::REGION_WIDTH;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 维度标识，每个维度拥有独立的区域、区块与子区块表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dimension(pub i32);

impl Dimension {
    pub const OVERWORLD: Dimension = Dimension(0);
    pub const NETHER: Dimension = Dimension(-1);
    pub const END: Dimension = Dimension(1);

    pub fn id(self) -> i32 {
        self.0
    }

    /// 已知维度的名称
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("overworld"),
            -1 => Some("the_nether"),
            1 => Some("the_end"),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<i32> for Dimension {
    fn from(id: i32) -> Self {
        Dimension(id)
    }
}

/// 区块位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// 获取该区块所在的区域坐标（算术右移，负数向下取整）
    pub fn region_pos(&self) -> RegionPos {
        RegionPos {
            x: self.x >> 5,
            z: self.z >> 5,
        }
    }

    /// 获取区块在所属区域内的局部坐标，范围 [0, 32)
    pub fn inner(&self) -> (u8, u8) {
        (
            inner_chunk_coordinate(self.x),
            inner_chunk_coordinate(self.z),
        )
    }
}

/// 区域位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    /// 区块坐标仍落在 i32 内的区域坐标范围
    pub const MIN: i32 = i32::MIN >> 5;
    pub const MAX: i32 = i32::MAX >> 5;

    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn in_range(&self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.x) && (Self::MIN..=Self::MAX).contains(&self.z)
    }

    /// 区域内某个局部坐标对应的全局区块坐标，超出 i32 时返回 `None`
    pub fn chunk_at(&self, inner_x: u8, inner_z: u8) -> Option<ChunkPos> {
        let x = self.x.checked_mul(REGION_WIDTH)?.checked_add(inner_x as i32)?;
        let z = self.z.checked_mul(REGION_WIDTH)?.checked_add(inner_z as i32)?;
        Some(ChunkPos { x, z })
    }
}

/// 子区块位置，Y为有符号的子区块序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionPos {
    pub x: i32,
    pub y: i8,
    pub z: i32,
}

impl SectionPos {
    pub fn new(x: i32, y: i8, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos {
            x: self.x,
            z: self.z,
        }
    }
}

/// 向下取模，负数坐标不会向零截断
pub fn inner_chunk_coordinate(chunk: i32) -> u8 {
    chunk.rem_euclid(REGION_WIDTH) as u8
}
