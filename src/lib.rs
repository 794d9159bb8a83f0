pub mod chunk;
pub mod compression;
pub mod config;
pub mod error;
pub mod header;
pub mod nbt;
pub mod palette;
pub mod store;
pub mod types;
pub mod utils;

pub use crate::config::DecodeConfig;
pub use crate::error::{ErrorKind, WorldError};
pub use crate::nbt::{NamedTag, Tag, TagType};
pub use crate::palette::SectionIndices;
pub use crate::store::{ChunkRef, WorldStore};
pub use crate::types::{ChunkPos, Dimension, RegionPos, SectionPos};

/// 扇区大小（字节）
pub const SECTOR_SIZE: usize = 4096;

/// 区域文件头部大小：1024个4字节的扇区表条目
pub const REGION_HEADER_SIZE: usize = 8192;

/// 每个区域在一条边上的区块数
pub const REGION_WIDTH: i32 = 32;

/// 一个16×16×16子区块的方块数
pub const SECTION_VOLUME: usize = 4096;

/// 区块负载的压缩算法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    Gzip = 1,
    Zlib = 2,
    None = 3,
}

impl TryFrom<u8> for CompressionType {
    type Error = WorldError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Zlib),
            3 => Ok(CompressionType::None),
            _ => Err(WorldError::UnsupportedCompression(value)),
        }
    }
}
