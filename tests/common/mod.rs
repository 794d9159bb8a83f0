#![allow(dead_code)]

use byteorder::{BigEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use mcregion::{NamedTag, Tag, TagType, REGION_HEADER_SIZE, SECTOR_SIZE};
use std::io::Write;

pub fn write_named(out: &mut Vec<u8>, name: &str, tag: &Tag) {
    out.write_u8(tag.tag_type() as u8).unwrap();
    out.write_u16::<BigEndian>(name.len() as u16).unwrap();
    out.extend_from_slice(name.as_bytes());
    write_payload(out, tag);
}

pub fn write_payload(out: &mut Vec<u8>, tag: &Tag) {
    match tag {
        Tag::End => {}
        Tag::Byte(v) => out.write_i8(*v).unwrap(),
        Tag::Short(v) => out.write_i16::<BigEndian>(*v).unwrap(),
        Tag::Int(v) => out.write_i32::<BigEndian>(*v).unwrap(),
        Tag::Long(v) => out.write_i64::<BigEndian>(*v).unwrap(),
        Tag::Float(v) => out.write_f32::<BigEndian>(*v).unwrap(),
        Tag::Double(v) => out.write_f64::<BigEndian>(*v).unwrap(),
        Tag::ByteArray(v) => {
            out.write_u32::<BigEndian>(v.len() as u32).unwrap();
            v.iter().for_each(|b| out.write_i8(*b).unwrap());
        }
        Tag::String(v) => {
            out.write_u16::<BigEndian>(v.len() as u16).unwrap();
            out.extend_from_slice(v.as_bytes());
        }
        Tag::List(element, items) => {
            out.write_u8(*element as u8).unwrap();
            out.write_u32::<BigEndian>(items.len() as u32).unwrap();
            items.iter().for_each(|item| write_payload(out, item));
        }
        Tag::Compound(children) => {
            for child in children {
                write_named(out, &child.name, &child.tag);
            }
            out.write_u8(0).unwrap();
        }
        Tag::IntArray(v) => {
            out.write_u32::<BigEndian>(v.len() as u32).unwrap();
            v.iter().for_each(|i| out.write_i32::<BigEndian>(*i).unwrap());
        }
        Tag::LongArray(v) => {
            out.write_u32::<BigEndian>(v.len() as u32).unwrap();
            v.iter().for_each(|l| out.write_i64::<BigEndian>(*l).unwrap());
        }
    }
}

pub fn encode_root(tag: &Tag) -> Vec<u8> {
    let mut out = Vec::new();
    write_named(&mut out, "", tag);
    out
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// 按扇区布局拼装区域文件
pub struct RegionBuilder {
    bytes: Vec<u8>,
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; REGION_HEADER_SIZE],
        }
    }

    /// 把原始负载（已压缩）放在文件末尾的新扇区，并写入扇区表
    pub fn raw_chunk(mut self, x: u8, z: u8, compression: u8, compressed: &[u8]) -> Self {
        let sector = (self.bytes.len() / SECTOR_SIZE) as u32;
        let mut payload = Vec::new();
        payload
            .write_u32::<BigEndian>(compressed.len() as u32 + 1)
            .unwrap();
        payload.push(compression);
        payload.extend_from_slice(compressed);

        let sectors = payload.len().div_ceil(SECTOR_SIZE);
        payload.resize(sectors * SECTOR_SIZE, 0);
        self.bytes.extend_from_slice(&payload);

        let off = (z as usize * 32 + x as usize) * 4;
        let mut entry = Vec::new();
        entry.write_u24::<BigEndian>(sector).unwrap();
        entry.push(sectors as u8);
        self.bytes[off..off + 4].copy_from_slice(&entry);
        self
    }

    pub fn chunk(self, x: u8, z: u8, root: &Tag) -> Self {
        self.raw_chunk(x, z, 2, &zlib(&encode_root(root)))
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn palette(len: usize) -> Tag {
    let entries = (0..len)
        .map(|i| {
            Tag::Compound(vec![NamedTag::new(
                "Name",
                Tag::String(format!("minecraft:block_{}", i)),
            )])
        })
        .collect();
    Tag::List(TagType::Compound, entries)
}

/// 按给定位宽打包索引，索引不跨越long边界
pub fn pack_indices(indices: &[u16], bits: u32) -> Vec<i64> {
    let per_long = (64 / bits) as usize;
    indices
        .chunks(per_long)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, &v)| acc | ((v as u64) << (i as u32 * bits)))
                as i64
        })
        .collect()
}

pub fn section(y: i8, palette_len: usize, data: Vec<i64>) -> Tag {
    Tag::Compound(vec![
        NamedTag::new("Y", Tag::Byte(y)),
        NamedTag::new(
            "block_states",
            Tag::Compound(vec![
                NamedTag::new("palette", palette(palette_len)),
                NamedTag::new("data", Tag::LongArray(data)),
            ]),
        ),
    ])
}

pub fn chunk_root(x: i32, z: i32, sections: Vec<Tag>) -> Tag {
    Tag::Compound(vec![
        NamedTag::new("DataVersion", Tag::Int(3465)),
        NamedTag::new("xPos", Tag::Int(x)),
        NamedTag::new("yPos", Tag::Int(-4)),
        NamedTag::new("zPos", Tag::Int(z)),
        NamedTag::new("Status", Tag::String("minecraft:full".to_string())),
        NamedTag::new("LastUpdate", Tag::Long(8_000_123)),
        NamedTag::new("sections", Tag::List(TagType::Compound, sections)),
    ])
}
