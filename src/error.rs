use crate::nbt::TagType;
use crate::types::{ChunkPos, Dimension, RegionPos, SectionPos};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorldError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("区域不存在: 维度 {dimension}, 区域 ({}, {})", .region.x, .region.z)]
    RegionNotFound { dimension: Dimension, region: RegionPos },

    #[error("区块未构建: 维度 {dimension}, 区块 ({}, {})", .chunk.x, .chunk.z)]
    ChunkNotFound { dimension: Dimension, chunk: ChunkPos },

    #[error("区域文件中没有该区块: 维度 {dimension}, 区块 ({}, {})", .chunk.x, .chunk.z)]
    ChunkAbsent { dimension: Dimension, chunk: ChunkPos },

    #[error(
        "子区块不存在: 维度 {dimension}, X: {}, Y: {}, Z: {}",
        .section.x, .section.y, .section.z
    )]
    SectionNotFound { dimension: Dimension, section: SectionPos },

    #[error("标签路径不存在: \"{path}\"")]
    TagNotFound { path: String },

    #[error("未知的NBT标签类型: {0}")]
    UnknownTagId(u8),

    #[error("未知的列表元素类型: {0}")]
    UnknownListElementType(u8),

    #[error("数据被截断: 偏移 {offset} 处需要 {needed} 字节, 剩余 {available} 字节")]
    TruncatedData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("类型不匹配: \"{path}\" 期望 {expected}, 实际为 {found}")]
    TypeMismatch {
        path: String,
        expected: TagType,
        found: TagType,
    },

    #[error("解压错误: {0}")]
    DecompressionError(String),

    #[error("不支持的压缩类型: {0}")]
    UnsupportedCompression(u8),

    #[error("坐标超出范围: ({x}, {z}) 不在 [0, 32) 内")]
    CoordinateOutOfRange { x: i32, z: i32 },

    #[error("NBT嵌套层数超过上限 {0}")]
    DepthLimitExceeded(usize),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("区块 ({}, {}) 解码失败 (维度 {dimension}): {source}", .chunk.x, .chunk.z)]
    AtChunk {
        dimension: Dimension,
        chunk: ChunkPos,
        source: Box<WorldError>,
    },

    #[error(
        "子区块 ({}, {}, {}) 读取失败 (维度 {dimension}): {source}",
        .section.x, .section.y, .section.z
    )]
    AtSection {
        dimension: Dimension,
        section: SectionPos,
        source: Box<WorldError>,
    },
}

/// 错误的大类，便于调用方按类别处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    UnknownTagId,
    UnknownListElementType,
    TruncatedData,
    TypeMismatch,
    DecompressionError,
    Other,
}

impl WorldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorldError::AtChunk { source, .. } | WorldError::AtSection { source, .. } => {
                source.kind()
            }
            WorldError::RegionNotFound { .. }
            | WorldError::ChunkNotFound { .. }
            | WorldError::ChunkAbsent { .. }
            | WorldError::SectionNotFound { .. }
            | WorldError::TagNotFound { .. } => ErrorKind::NotFound,
            WorldError::UnknownTagId(_) => ErrorKind::UnknownTagId,
            WorldError::UnknownListElementType(_) => ErrorKind::UnknownListElementType,
            WorldError::TruncatedData { .. } => ErrorKind::TruncatedData,
            WorldError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            WorldError::DecompressionError(_) => ErrorKind::DecompressionError,
            WorldError::Io(_)
            | WorldError::UnsupportedCompression(_)
            | WorldError::CoordinateOutOfRange { .. }
            | WorldError::DepthLimitExceeded(_)
            | WorldError::Config(_) => ErrorKind::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// 去掉坐标上下文后的底层错误
    pub fn root_cause(&self) -> &WorldError {
        match self {
            WorldError::AtChunk { source, .. } | WorldError::AtSection { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    pub(crate) fn at_chunk(self, dimension: Dimension, chunk: ChunkPos) -> Self {
        WorldError::AtChunk {
            dimension,
            chunk,
            source: Box::new(self),
        }
    }

    pub(crate) fn at_section(self, dimension: Dimension, section: SectionPos) -> Self {
        WorldError::AtSection {
            dimension,
            section,
            source: Box::new(self),
        }
    }

    pub(crate) fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        WorldError::TruncatedData {
            offset,
            needed,
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_kind_and_names_chunk() {
        let err = WorldError::truncated(12, 4, 1).at_chunk(Dimension::NETHER, ChunkPos::new(-3, 7));

        assert_eq!(err.kind(), ErrorKind::TruncatedData);
        assert!(matches!(err.root_cause(), WorldError::TruncatedData { offset: 12, .. }));
        let message = err.to_string();
        assert!(message.contains("(-3, 7)"), "{}", message);
        assert!(message.contains("-1 (the_nether)"), "{}", message);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_section_context_is_not_found() {
        let err = WorldError::TagNotFound {
            path: "block_states".to_string(),
        }
        .at_section(Dimension::OVERWORLD, SectionPos::new(1, -2, 3));

        assert!(err.is_not_found());
        assert!(err.to_string().contains("(1, -2, 3)"));
    }
}
