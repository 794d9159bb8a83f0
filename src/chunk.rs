use crate::{
    compression::read_chunk_payload,
    config::DecodeConfig,
    error::WorldError,
    header::read_sector_entry,
    nbt::{parse_tag_with, Tag, TagType},
    palette::{decode_indices, SectionIndices},
    types::SectionPos,
};

/// 从区域缓冲区读取局部坐标处的区块根标签，区块不存在时返回 `None`
pub fn read_chunk(
    region: &[u8],
    inner_x: u8,
    inner_z: u8,
    config: &DecodeConfig,
) -> Result<Option<Tag>, WorldError> {
    let entry = read_sector_entry(region, inner_x, inner_z)?;
    if entry.is_absent() {
        return Ok(None);
    }

    let payload = read_chunk_payload(region, &entry, config)?;
    let (root, consumed) = parse_tag_with(&payload, config)?;
    if root.tag.tag_type() != TagType::Compound {
        return Err(WorldError::TypeMismatch {
            path: "<root>".to_string(),
            expected: TagType::Compound,
            found: root.tag.tag_type(),
        });
    }
    if consumed < payload.len() {
        log::debug!(
            "区块 ({}, {}) 的负载末尾有 {} 字节未使用",
            inner_x,
            inner_z,
            payload.len() - consumed
        );
    }
    Ok(Some(root.tag))
}

/// 解码区块中所有非均一子区块的调色板索引
///
/// 子区块按区块自身的 xPos/zPos 标签定位，而不是按请求的坐标。
/// 没有 block_states 或调色板只有一个条目的子区块会被跳过。
pub fn extract_sections(root: &Tag) -> Result<Vec<(SectionPos, SectionIndices)>, WorldError> {
    let sections = match root.child("sections") {
        Some(_) => root.get_list("sections")?,
        None => return Ok(Vec::new()),
    };

    let x_pos = root.get_int("xPos")?;
    let z_pos = root.get_int("zPos")?;

    let mut decoded = Vec::with_capacity(sections.len());
    for section in sections {
        if section.tag_type() != TagType::Compound {
            return Err(WorldError::TypeMismatch {
                path: "sections".to_string(),
                expected: TagType::Compound,
                found: section.tag_type(),
            });
        }

        let y = section.get_byte("Y")?;
        if section.child("block_states").is_none() {
            continue;
        }

        let palette = section.get_list("block_states.palette")?;
        if palette.len() <= 1 {
            continue;
        }

        let data = section.get_long_array("block_states.data")?;
        if let Some(indices) = decode_indices(data, palette.len())? {
            log::trace!(
                "子区块 ({}, {}, {}) 调色板大小 {}",
                x_pos,
                y,
                z_pos,
                palette.len()
            );
            decoded.push((SectionPos::new(x_pos, y, z_pos), indices));
        }
    }
    Ok(decoded)
}

/// 按Y查找区块中的子区块标签
pub fn find_section(root: &Tag, y: i8) -> Option<&Tag> {
    root.child("sections")?
        .as_list()?
        .iter()
        .find(|section| section.child("Y") == Some(&Tag::Byte(y)))
}
