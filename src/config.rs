use crate::error::WorldError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 默认的NBT最大嵌套层数
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// 默认的单个区块解压后大小上限（64 MiB）
pub const DEFAULT_MAX_DECOMPRESSED_LEN: usize = 64 * 1024 * 1024;

/// 解码参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Compound/List 的最大嵌套层数
    pub max_depth: usize,
    /// 解压缓冲区翻倍重试的上限
    pub max_decompressed_len: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_decompressed_len: DEFAULT_MAX_DECOMPRESSED_LEN,
        }
    }
}

impl DecodeConfig {
    /// 从JSON文件读取配置，缺省字段使用默认值
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, WorldError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let config: DecodeConfig = serde_json::from_reader(reader)
            .map_err(|e| WorldError::Config(format!("JSON解析错误: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WorldError> {
        if self.max_depth == 0 {
            return Err(WorldError::Config("max_depth 必须大于0".to_string()));
        }
        if self.max_decompressed_len == 0 {
            return Err(WorldError::Config(
                "max_decompressed_len 必须大于0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"max_depth\": 16}}").unwrap();

        let config = DecodeConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.max_decompressed_len, DEFAULT_MAX_DECOMPRESSED_LEN);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"max_depth\": 0}}").unwrap();

        let result = DecodeConfig::from_json_file(file.path());
        assert!(matches!(result, Err(WorldError::Config(_))));
    }
}
