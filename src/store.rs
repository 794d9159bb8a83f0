use crate::{
    chunk::{extract_sections, find_section, read_chunk},
    config::DecodeConfig,
    error::WorldError,
    header::{present_entries, SectorEntry},
    nbt::{Tag, TagType},
    palette::SectionIndices,
    types::{ChunkPos, Dimension, RegionPos, SectionPos},
    utils::calculate_sha256,
};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Deref;

/// 一个区域文件的原始字节，写入后只读
pub struct RegionBuffer {
    bytes: Box<[u8]>,
    digest: [u8; 32],
}

impl RegionBuffer {
    fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.into(),
            digest: calculate_sha256(bytes),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 内容的SHA-256摘要
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// 扇区表中所有存在的区块
    pub fn present_chunks(&self) -> Result<Vec<(u8, u8, SectorEntry)>, WorldError> {
        present_entries(&self.bytes)
    }
}

/// 子区块索引及派生出它的区块
struct SectionEntry {
    owner: ChunkPos,
    indices: SectionIndices,
}

#[derive(Default)]
struct DimensionData {
    regions: HashMap<RegionPos, RegionBuffer>,
    chunks: HashMap<ChunkPos, Tag>,
    sections: HashMap<SectionPos, SectionEntry>,
}

/// 已构建区块的只读句柄，取代全局的“当前区块”
#[derive(Debug, Clone, Copy)]
pub struct ChunkRef<'a> {
    dimension: Dimension,
    pos: ChunkPos,
    root: &'a Tag,
}

impl<'a> ChunkRef<'a> {
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn root(&self) -> &'a Tag {
        self.root
    }

    /// 区块中Y子区块的调色板列表
    pub fn palette(&self, y: i8) -> Result<&'a Tag, WorldError> {
        let pos = SectionPos::new(self.pos.x, y, self.pos.z);
        let section = find_section(self.root, y).ok_or(WorldError::SectionNotFound {
            dimension: self.dimension,
            section: pos,
        })?;
        let palette = section
            .get_path("block_states.palette")
            .map_err(|e| e.at_section(self.dimension, pos))?;
        if palette.tag_type() != TagType::List {
            return Err(WorldError::TypeMismatch {
                path: "block_states.palette".to_string(),
                expected: TagType::List,
                found: palette.tag_type(),
            }
            .at_section(self.dimension, pos));
        }
        Ok(palette)
    }
}

impl Deref for ChunkRef<'_> {
    type Target = Tag;

    fn deref(&self) -> &Tag {
        self.root
    }
}

/// 按维度和坐标保存区域缓冲区、区块标签树与子区块索引
pub struct WorldStore {
    name: String,
    config: DecodeConfig,
    dimensions: HashMap<Dimension, DimensionData>,
}

impl WorldStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, DecodeConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: DecodeConfig) -> Self {
        Self {
            name: name.into(),
            config,
            dimensions: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// 复制区域文件字节并保存，替换（并释放）同一坐标下原有的缓冲区
    pub fn open_region(
        &mut self,
        dimension: Dimension,
        region_x: i32,
        region_z: i32,
        bytes: &[u8],
    ) -> &RegionBuffer {
        let pos = RegionPos::new(region_x, region_z);
        let buffer = RegionBuffer::new(bytes);
        log::debug!(
            "[{}] 载入区域: 维度 {}, ({}, {}), {} 字节",
            self.name,
            dimension,
            region_x,
            region_z,
            bytes.len()
        );

        let regions = &mut self.dimensions.entry(dimension).or_default().regions;
        match regions.entry(pos) {
            Entry::Occupied(mut entry) => {
                if entry.get().digest != buffer.digest {
                    log::warn!(
                        "[{}] 替换区域: 维度 {}, ({}, {})",
                        self.name,
                        dimension,
                        region_x,
                        region_z
                    );
                }
                entry.insert(buffer);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(buffer),
        }
    }

    pub fn region(
        &self,
        dimension: Dimension,
        region_x: i32,
        region_z: i32,
    ) -> Result<&RegionBuffer, WorldError> {
        let pos = RegionPos::new(region_x, region_z);
        self.dimensions
            .get(&dimension)
            .and_then(|data| data.regions.get(&pos))
            .ok_or(WorldError::RegionNotFound {
                dimension,
                region: pos,
            })
    }

    pub fn contains_region(&self, dimension: Dimension, region_x: i32, region_z: i32) -> bool {
        self.region(dimension, region_x, region_z).is_ok()
    }

    /// 解码区块并保存其标签树与子区块索引
    ///
    /// 所有解码都在写入之前完成，任何失败都不会修改存储。
    pub fn build_chunk(
        &mut self,
        dimension: Dimension,
        chunk_x: i32,
        chunk_z: i32,
    ) -> Result<ChunkRef<'_>, WorldError> {
        let pos = ChunkPos::new(chunk_x, chunk_z);
        let region_pos = pos.region_pos();
        let region = self.region(dimension, region_pos.x, region_pos.z)?;

        let (inner_x, inner_z) = pos.inner();
        let root = read_chunk(&region.bytes, inner_x, inner_z, &self.config)
            .map_err(|e| e.at_chunk(dimension, pos))?
            .ok_or(WorldError::ChunkAbsent {
                dimension,
                chunk: pos,
            })?;
        let sections = extract_sections(&root).map_err(|e| e.at_chunk(dimension, pos))?;

        log::debug!(
            "[{}] 构建区块: 维度 {}, ({}, {}), {} 个子区块",
            self.name,
            dimension,
            chunk_x,
            chunk_z,
            sections.len()
        );

        let data = self.dimensions.entry(dimension).or_default();
        if data.chunks.contains_key(&pos) {
            // 旧根标签派生的子区块随旧根标签一起作废
            data.sections.retain(|_, entry| entry.owner != pos);
        }
        data.sections.extend(
            sections
                .into_iter()
                .map(|(key, indices)| (key, SectionEntry { owner: pos, indices })),
        );

        let root = match data.chunks.entry(pos) {
            Entry::Occupied(mut entry) => {
                entry.insert(root);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(root),
        };

        Ok(ChunkRef {
            dimension,
            pos,
            root,
        })
    }

    pub fn get_chunk(
        &self,
        dimension: Dimension,
        chunk_x: i32,
        chunk_z: i32,
    ) -> Result<ChunkRef<'_>, WorldError> {
        let pos = ChunkPos::new(chunk_x, chunk_z);
        let root = self
            .dimensions
            .get(&dimension)
            .and_then(|data| data.chunks.get(&pos))
            .ok_or(WorldError::ChunkNotFound {
                dimension,
                chunk: pos,
            })?;
        Ok(ChunkRef {
            dimension,
            pos,
            root,
        })
    }

    /// 子区块的4096个调色板索引
    pub fn get_section_view(
        &self,
        dimension: Dimension,
        x: i32,
        y: i8,
        z: i32,
    ) -> Result<&SectionIndices, WorldError> {
        let pos = SectionPos::new(x, y, z);
        self.dimensions
            .get(&dimension)
            .and_then(|data| data.sections.get(&pos))
            .map(|entry| &entry.indices)
            .ok_or(WorldError::SectionNotFound {
                dimension,
                section: pos,
            })
    }

    /// 子区块的调色板列表标签
    pub fn palette(
        &self,
        dimension: Dimension,
        x: i32,
        y: i8,
        z: i32,
    ) -> Result<&Tag, WorldError> {
        self.get_chunk(dimension, x, z)?.palette(y)
    }

    /// 子区块调色板的文本形式
    pub fn get_palette(
        &self,
        dimension: Dimension,
        x: i32,
        y: i8,
        z: i32,
    ) -> Result<String, WorldError> {
        Ok(self.palette(dimension, x, y, z)?.to_string())
    }

    pub fn dimensions(&self) -> Vec<Dimension> {
        let mut dimensions: Vec<Dimension> = self.dimensions.keys().copied().collect();
        dimensions.sort();
        dimensions
    }

    pub fn region_count(&self, dimension: Dimension) -> usize {
        self.dimensions
            .get(&dimension)
            .map_or(0, |data| data.regions.len())
    }

    pub fn chunk_count(&self, dimension: Dimension) -> usize {
        self.dimensions
            .get(&dimension)
            .map_or(0, |data| data.chunks.len())
    }

    pub fn section_count(&self, dimension: Dimension) -> usize {
        self.dimensions
            .get(&dimension)
            .map_or(0, |data| data.sections.len())
    }
}
