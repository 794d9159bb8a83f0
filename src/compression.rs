use crate::{config::DecodeConfig, error::WorldError, header::SectorEntry, CompressionType};
use byteorder::{BigEndian, ByteOrder};
use flate2::read::GzDecoder;
use flate2::{Decompress, FlushDecompress, Status};
use std::io::Read;

/// 解压缓冲区的最小初始大小
const MIN_INFLATE_CAPACITY: usize = 256;

/// 区块负载头部：4字节长度 + 1字节压缩类型
const PAYLOAD_HEADER_LEN: usize = 5;

/// 读取扇区条目指向的区块负载并解压
pub fn read_chunk_payload(
    buffer: &[u8],
    entry: &SectorEntry,
    config: &DecodeConfig,
) -> Result<Vec<u8>, WorldError> {
    let start = entry.byte_offset();
    let available = buffer.len().saturating_sub(start);
    if available < PAYLOAD_HEADER_LEN {
        return Err(WorldError::truncated(start, PAYLOAD_HEADER_LEN, available));
    }

    // 长度包含1字节的压缩类型
    let length = BigEndian::read_u32(&buffer[start..start + 4]) as usize;
    if length == 0 {
        return Err(WorldError::truncated(start + 4, 1, 0));
    }

    let compression = CompressionType::try_from(buffer[start + 4])?;
    let data_start = start + PAYLOAD_HEADER_LEN;
    let data_len = length - 1;
    if buffer.len() - data_start < data_len {
        return Err(WorldError::truncated(
            data_start,
            data_len,
            buffer.len() - data_start,
        ));
    }

    decompress_data(
        &buffer[data_start..data_start + data_len],
        compression,
        config.max_decompressed_len,
    )
}

/// 解压数据，结果长度即解压后的准确大小
pub fn decompress_data(
    compressed_data: &[u8],
    compression_type: CompressionType,
    max_len: usize,
) -> Result<Vec<u8>, WorldError> {
    match compression_type {
        CompressionType::Zlib => inflate_zlib(compressed_data, max_len),

        CompressionType::Gzip => {
            let mut decompressed = Vec::with_capacity(compressed_data.len() * 4);
            GzDecoder::new(compressed_data)
                .take(max_len as u64 + 1)
                .read_to_end(&mut decompressed)
                .map_err(|e| WorldError::DecompressionError(e.to_string()))?;
            if decompressed.len() > max_len {
                return Err(limit_exceeded(max_len));
            }
            Ok(decompressed)
        }

        CompressionType::None => {
            if compressed_data.len() > max_len {
                return Err(limit_exceeded(max_len));
            }
            Ok(compressed_data.to_vec())
        }
    }
}

/// 缓冲区不足时翻倍重试，直到流结束或超过上限
fn inflate_zlib(compressed_data: &[u8], max_len: usize) -> Result<Vec<u8>, WorldError> {
    let mut capacity = compressed_data
        .len()
        .saturating_mul(4)
        .max(MIN_INFLATE_CAPACITY)
        .min(max_len);

    loop {
        let mut output = Vec::with_capacity(capacity);
        let mut inflater = Decompress::new(true);
        let status = inflater
            .decompress_vec(compressed_data, &mut output, FlushDecompress::Finish)
            .map_err(|e| WorldError::DecompressionError(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(output),
            Status::Ok | Status::BufError if output.len() == output.capacity() => {
                if capacity >= max_len {
                    return Err(limit_exceeded(max_len));
                }
                capacity = capacity.saturating_mul(2).min(max_len);
                log::trace!("解压缓冲区不足，扩大到 {} 字节后重试", capacity);
            }
            _ => {
                return Err(WorldError::DecompressionError(format!(
                    "压缩流不完整: 已读取 {} / {} 字节",
                    inflater.total_in(),
                    compressed_data.len()
                )))
            }
        }
    }
}

fn limit_exceeded(max_len: usize) -> WorldError {
    WorldError::DecompressionError(format!("解压后数据超过上限 {} 字节", max_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{REGION_HEADER_SIZE, SECTOR_SIZE};
    use assert_matches::assert_matches;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn region_with_payload(compression: u8, payload: &[u8]) -> Vec<u8> {
        let mut buffer = vec![0u8; REGION_HEADER_SIZE + SECTOR_SIZE];
        buffer.extend_from_slice(&(payload.len() as u32 + 1).to_be_bytes());
        buffer.push(compression);
        buffer.extend_from_slice(payload);
        buffer
    }

    const SECTOR_2: SectorEntry = SectorEntry {
        offset: 2,
        sector_count: 1,
    };

    #[test]
    fn test_zlib_grows_buffer() {
        // 高压缩比数据需要多次翻倍
        let original = vec![7u8; 200_000];
        let compressed = zlib(&original);
        assert!(compressed.len() * 4 < original.len());

        let decompressed = decompress_data(&compressed, CompressionType::Zlib, usize::MAX).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_zlib_exact_length() {
        let original: Vec<u8> = (0..1000u32).map(|i| (i * 31 % 251) as u8).collect();
        let decompressed =
            decompress_data(&zlib(&original), CompressionType::Zlib, usize::MAX).unwrap();
        assert_eq!(decompressed.len(), original.len());
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_zlib_limit_exceeded() {
        let compressed = zlib(&vec![0u8; 10_000]);
        assert_matches!(
            decompress_data(&compressed, CompressionType::Zlib, 1024),
            Err(WorldError::DecompressionError(_))
        );
    }

    #[test]
    fn test_corrupt_zlib() {
        let result = decompress_data(&[0x12, 0x34, 0x56, 0x78], CompressionType::Zlib, usize::MAX);
        assert_matches!(result, Err(WorldError::DecompressionError(_)));
    }

    #[test]
    fn test_incomplete_zlib_stream() {
        let compressed = zlib(b"hello world, hello world, hello world");
        let cut = &compressed[..compressed.len() / 2];
        assert_matches!(
            decompress_data(cut, CompressionType::Zlib, usize::MAX),
            Err(WorldError::DecompressionError(_))
        );
    }

    #[test]
    fn test_gzip_payload() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"gzip chunk").unwrap();
        let buffer = region_with_payload(1, &encoder.finish().unwrap());

        let payload = read_chunk_payload(&buffer, &SECTOR_2, &DecodeConfig::default()).unwrap();
        assert_eq!(payload, b"gzip chunk");
    }

    #[test]
    fn test_zlib_payload_at_sector() {
        let buffer = region_with_payload(2, &zlib(b"zlib chunk"));
        let payload = read_chunk_payload(&buffer, &SECTOR_2, &DecodeConfig::default()).unwrap();
        assert_eq!(payload, b"zlib chunk");
    }

    #[test]
    fn test_uncompressed_payload() {
        let buffer = region_with_payload(3, b"raw");
        let payload = read_chunk_payload(&buffer, &SECTOR_2, &DecodeConfig::default()).unwrap();
        assert_eq!(payload, b"raw");
    }

    #[test]
    fn test_unsupported_compression() {
        let buffer = region_with_payload(4, b"lz4");
        assert_matches!(
            read_chunk_payload(&buffer, &SECTOR_2, &DecodeConfig::default()),
            Err(WorldError::UnsupportedCompression(4))
        );
    }

    #[test]
    fn test_length_past_buffer() {
        let mut buffer = region_with_payload(2, &zlib(b"zlib chunk"));
        buffer.truncate(buffer.len() - 3);
        assert_matches!(
            read_chunk_payload(&buffer, &SECTOR_2, &DecodeConfig::default()),
            Err(WorldError::TruncatedData { .. })
        );
    }

    #[test]
    fn test_offset_past_buffer() {
        let buffer = vec![0u8; REGION_HEADER_SIZE];
        assert_matches!(
            read_chunk_payload(&buffer, &SECTOR_2, &DecodeConfig::default()),
            Err(WorldError::TruncatedData { available: 0, .. })
        );
    }
}
