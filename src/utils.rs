use crate::error::WorldError;
use crate::types::RegionPos;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 计算SHA-256哈希
pub fn calculate_sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// 十六进制形式的摘要
pub fn hex_digest(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// 从 `r.<x>.<z>.mca` 形式的文件名解析区域坐标
pub fn region_file_coords<P: AsRef<Path>>(path: P) -> Option<RegionPos> {
    let name = path.as_ref().file_name()?.to_str()?;
    let mut parts = name.split('.');
    if parts.next()? != "r" {
        return None;
    }
    let x = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next()? != "mca" || parts.next().is_some() {
        return None;
    }
    let region = RegionPos::new(x, z);
    region.in_range().then_some(region)
}

/// 读取整个区域文件，文件大小不得超过4GB
pub fn read_region_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, WorldError> {
    let mut file = File::open(path.as_ref())?;
    let size = file.metadata()?.len();
    if size > 0xFFFF_FFFF {
        return Err(WorldError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("区域文件过大: {} 字节", size),
        )));
    }

    let mut buffer = Vec::with_capacity(size as usize);
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_region_file_coords() {
        assert_eq!(region_file_coords("r.0.0.mca"), Some(RegionPos::new(0, 0)));
        assert_eq!(
            region_file_coords("/world/region/r.-3.12.mca"),
            Some(RegionPos::new(-3, 12))
        );
        assert_eq!(region_file_coords("r.1.2.mcr"), None);
        assert_eq!(region_file_coords("r.a.2.mca"), None);
        assert_eq!(region_file_coords("r.1.2.mca.bak"), None);
        assert_eq!(region_file_coords("level.dat"), None);
        assert_eq!(region_file_coords("r.99999999.0.mca"), None);
        assert_eq!(
            region_file_coords("r.67108863.-67108864.mca"),
            Some(RegionPos::new(RegionPos::MAX, RegionPos::MIN))
        );
    }

    #[test]
    fn test_read_region_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4]).unwrap();
        file.flush().unwrap();

        assert_eq!(read_region_file(file.path()).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_hex_digest() {
        let digest = calculate_sha256(b"");
        assert_eq!(
            hex_digest(&digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
