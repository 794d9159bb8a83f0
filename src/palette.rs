use crate::{error::WorldError, SECTION_VOLUME};
use std::ops::Deref;

/// 每个索引至少占用的位数
pub const MIN_BITS_PER_INDEX: u32 = 4;

/// 一个16×16×16子区块的调色板索引，按 YZX 顺序排列
#[derive(Clone, PartialEq, Eq)]
pub struct SectionIndices(Box<[u16; SECTION_VOLUME]>);

impl SectionIndices {
    pub fn as_slice(&self) -> &[u16] {
        &self.0[..]
    }

    /// 子区块内局部坐标 (x, y, z) 的调色板索引
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<u16> {
        if x >= 16 || y >= 16 || z >= 16 {
            return None;
        }
        Some(self.0[(y << 8) | (z << 4) | x])
    }

    /// 每个调色板索引出现的次数
    pub fn histogram(&self, palette_len: usize) -> Vec<usize> {
        let mut counts = vec![0usize; palette_len];
        for &index in self.0.iter() {
            if let Some(count) = counts.get_mut(index as usize) {
                *count += 1;
            }
        }
        counts
    }
}

impl Deref for SectionIndices {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        self.as_slice()
    }
}

impl std::fmt::Debug for SectionIndices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionIndices")
            .field("len", &SECTION_VOLUME)
            .finish()
    }
}

/// 调色板大小对应的索引位宽：max(ceil(log2(P)), 4)
pub fn bits_per_index(palette_len: usize) -> u32 {
    if palette_len <= 1 {
        return MIN_BITS_PER_INDEX;
    }
    let bits = usize::BITS - (palette_len - 1).leading_zeros();
    bits.max(MIN_BITS_PER_INDEX)
}

/// 存放4096个索引所需的long数量（索引不跨越long边界）
pub fn longs_needed(bits: u32) -> usize {
    let per_long = (64 / bits) as usize;
    SECTION_VOLUME.div_ceil(per_long)
}

/// 从打包的long数组中提取4096个定宽索引
///
/// 调色板只有一个条目时整个子区块是同一种方块，没有数据可提取，返回 `None`。
pub fn decode_indices(
    data: &[i64],
    palette_len: usize,
) -> Result<Option<SectionIndices>, WorldError> {
    if palette_len <= 1 {
        return Ok(None);
    }

    let bits = bits_per_index(palette_len);
    let indices_per_long = 64 / bits;
    let mask = (1u64 << bits) - 1;

    let needed = longs_needed(bits);
    if data.len() < needed {
        return Err(WorldError::truncated(
            data.len() * 8,
            needed * 8,
            data.len() * 8,
        ));
    }

    let mut indices = Box::new([0u16; SECTION_VOLUME]);
    let mut long_index = 0;
    let mut index_in_long = 0;
    let mut current = data[0] as u64;
    for slot in indices.iter_mut() {
        if index_in_long == indices_per_long {
            index_in_long = 0;
            long_index += 1;
            current = data[long_index] as u64;
        }
        *slot = ((current >> (index_in_long * bits)) & mask) as u16;
        index_in_long += 1;
    }

    Ok(Some(SectionIndices(indices)))
}
