use crate::{error::WorldError, REGION_HEADER_SIZE, REGION_WIDTH, SECTOR_SIZE};
use byteorder::{BigEndian, ByteOrder};

/// 区域文件扇区表中的一个条目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectorEntry {
    /// 以4096字节扇区为单位的偏移
    pub offset: u32,
    pub sector_count: u8,
}

impl SectorEntry {
    /// 偏移和扇区数都为0表示区块不存在
    pub fn is_absent(&self) -> bool {
        self.offset == 0 && self.sector_count == 0
    }

    pub fn byte_offset(&self) -> usize {
        self.offset as usize * SECTOR_SIZE
    }

    pub fn byte_len(&self) -> usize {
        self.sector_count as usize * SECTOR_SIZE
    }
}

fn entry_offset(x: u8, z: u8) -> usize {
    (z as usize * REGION_WIDTH as usize + x as usize) * 4
}

/// 读取局部坐标 (x, z) 的扇区表条目
pub fn read_sector_entry(buffer: &[u8], x: u8, z: u8) -> Result<SectorEntry, WorldError> {
    if x as i32 >= REGION_WIDTH || z as i32 >= REGION_WIDTH {
        return Err(WorldError::CoordinateOutOfRange {
            x: x as i32,
            z: z as i32,
        });
    }

    if buffer.len() < REGION_HEADER_SIZE {
        return Err(WorldError::truncated(0, REGION_HEADER_SIZE, buffer.len()));
    }

    let off = entry_offset(x, z);
    Ok(SectorEntry {
        offset: BigEndian::read_u24(&buffer[off..off + 3]),
        sector_count: buffer[off + 3],
    })
}

/// 遍历扇区表中所有存在的区块，返回局部坐标和条目
pub fn present_entries(buffer: &[u8]) -> Result<Vec<(u8, u8, SectorEntry)>, WorldError> {
    let mut entries = Vec::new();
    for z in 0..REGION_WIDTH as u8 {
        for x in 0..REGION_WIDTH as u8 {
            let entry = read_sector_entry(buffer, x, z)?;
            if !entry.is_absent() {
                entries.push((x, z, entry));
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use byteorder::WriteBytesExt;

    fn synthetic_header() -> Vec<u8> {
        let mut buffer = Vec::with_capacity(REGION_HEADER_SIZE);
        for z in 0..32u32 {
            for x in 0..32u32 {
                let offset = 2 + z * 32 + x + (x << 12);
                buffer.write_u24::<BigEndian>(offset).unwrap();
                buffer.write_u8(((x + z) % 255 + 1) as u8).unwrap();
            }
        }
        buffer
    }

    #[test]
    fn test_read_every_entry() {
        let buffer = synthetic_header();
        for z in 0..32u8 {
            for x in 0..32u8 {
                let entry = read_sector_entry(&buffer, x, z).unwrap();
                let expected = 2 + z as u32 * 32 + x as u32 + ((x as u32) << 12);
                assert_eq!(entry.offset, expected);
                assert_eq!(entry.sector_count as u32, (x as u32 + z as u32) % 255 + 1);
                assert!(!entry.is_absent());
            }
        }
    }

    #[test]
    fn test_entry_only_depends_on_its_bytes() {
        let mut buffer = vec![0u8; REGION_HEADER_SIZE];
        let off = entry_offset(5, 9);
        buffer[off..off + 4].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);

        let entry = read_sector_entry(&buffer, 5, 9).unwrap();
        assert_eq!(entry.offset, 0x010203);
        assert_eq!(entry.sector_count, 4);
        assert_eq!(entry.byte_offset(), 0x010203 * SECTOR_SIZE);
        assert!(read_sector_entry(&buffer, 9, 5).unwrap().is_absent());
    }

    #[test]
    fn test_present_entries_skips_absent() {
        let mut buffer = vec![0u8; REGION_HEADER_SIZE];
        buffer[..4].copy_from_slice(&[0, 0, 2, 1]);
        let off = entry_offset(31, 31);
        buffer[off..off + 4].copy_from_slice(&[0, 0, 3, 2]);

        let entries = present_entries(&buffer).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (0, 0, SectorEntry { offset: 2, sector_count: 1 }));
        assert_eq!(entries[1], (31, 31, SectorEntry { offset: 3, sector_count: 2 }));
    }

    #[test]
    fn test_short_header_is_truncated() {
        let buffer = vec![0u8; 100];
        assert_matches!(
            read_sector_entry(&buffer, 0, 0),
            Err(WorldError::TruncatedData { needed: REGION_HEADER_SIZE, .. })
        );
    }

    #[test]
    fn test_out_of_range_coordinate() {
        let buffer = vec![0u8; REGION_HEADER_SIZE];
        assert_matches!(
            read_sector_entry(&buffer, 32, 0),
            Err(WorldError::CoordinateOutOfRange { x: 32, z: 0 })
        );
    }
}
