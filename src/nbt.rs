// NBT标签树解析器（只读）
// 所有多字节整数均为大端序，每个解析函数都返回消耗的字节数

use crate::{config::DecodeConfig, error::WorldError};
use byteorder::{BigEndian, ReadBytesExt};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::io::{self, Cursor};

/// NBT标签类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagType {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TryFrom<u8> for TagType {
    type Error = WorldError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TagType::End),
            1 => Ok(TagType::Byte),
            2 => Ok(TagType::Short),
            3 => Ok(TagType::Int),
            4 => Ok(TagType::Long),
            5 => Ok(TagType::Float),
            6 => Ok(TagType::Double),
            7 => Ok(TagType::ByteArray),
            8 => Ok(TagType::String),
            9 => Ok(TagType::List),
            10 => Ok(TagType::Compound),
            11 => Ok(TagType::IntArray),
            12 => Ok(TagType::LongArray),
            _ => Err(WorldError::UnknownTagId(value)),
        }
    }
}

impl TagType {
    pub fn name(self) -> &'static str {
        match self {
            TagType::End => "End",
            TagType::Byte => "byte",
            TagType::Short => "short",
            TagType::Int => "int",
            TagType::Long => "long",
            TagType::Float => "float",
            TagType::Double => "double",
            TagType::ByteArray => "byte[]",
            TagType::String => "String",
            TagType::List => "List",
            TagType::Compound => "Compound",
            TagType::IntArray => "int[]",
            TagType::LongArray => "long[]",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    /// 元素类型与无名元素
    List(TagType, Vec<Tag>),
    /// 按文件顺序保存的有名子标签
    Compound(Vec<NamedTag>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedTag {
    pub name: String,
    pub tag: Tag,
}

impl NamedTag {
    pub fn new(name: impl Into<String>, tag: Tag) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }
}

/// 解析一个顶层标签：0 为单字节的End，1-12 为有名标签
pub fn parse_tag(data: &[u8]) -> Result<(NamedTag, usize), WorldError> {
    parse_tag_with(data, &DecodeConfig::default())
}

pub fn parse_tag_with(
    data: &[u8],
    config: &DecodeConfig,
) -> Result<(NamedTag, usize), WorldError> {
    let mut reader = TagReader::new(data, config.max_depth);
    let named = reader.named_tag()?;
    Ok((named, reader.position()))
}

/// 按给定类型解析一个无名负载
pub fn parse_payload(
    data: &[u8],
    tag_type: TagType,
    config: &DecodeConfig,
) -> Result<(Tag, usize), WorldError> {
    let mut reader = TagReader::new(data, config.max_depth);
    reader.payload(tag_type, 0)
}

struct TagReader<'a> {
    cursor: Cursor<&'a [u8]>,
    max_depth: usize,
}

impl<'a> TagReader<'a> {
    fn new(data: &'a [u8], max_depth: usize) -> Self {
        Self {
            cursor: Cursor::new(data),
            max_depth,
        }
    }

    fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    fn ensure(&self, needed: usize) -> Result<(), WorldError> {
        let available = self.remaining();
        if available < needed {
            return Err(WorldError::truncated(self.position(), needed, available));
        }
        Ok(())
    }

    fn read_with<T>(
        &mut self,
        needed: usize,
        read: impl FnOnce(&mut Cursor<&'a [u8]>) -> io::Result<T>,
    ) -> Result<T, WorldError> {
        self.ensure(needed)?;
        let (offset, available) = (self.position(), self.remaining());
        read(&mut self.cursor).map_err(|_| WorldError::truncated(offset, needed, available))
    }

    fn u8(&mut self) -> Result<u8, WorldError> {
        self.read_with(1, |c| c.read_u8())
    }

    fn u16(&mut self) -> Result<u16, WorldError> {
        self.read_with(2, |c| c.read_u16::<BigEndian>())
    }

    fn u32(&mut self) -> Result<u32, WorldError> {
        self.read_with(4, |c| c.read_u32::<BigEndian>())
    }

    /// 读取声明长度的数组前先确认剩余字节足够，避免按伪造长度分配内存
    fn array_len(&mut self, element_size: usize) -> Result<usize, WorldError> {
        let len = self.u32()? as usize;
        let needed = len.checked_mul(element_size).unwrap_or(usize::MAX);
        self.ensure(needed)?;
        Ok(len)
    }

    fn string(&mut self) -> Result<String, WorldError> {
        let len = self.u16()? as usize;
        self.ensure(len)?;
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        let bytes = &data[start..start + len];
        self.cursor.set_position((start + len) as u64);
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn named_tag(&mut self) -> Result<NamedTag, WorldError> {
        let id = self.u8()?;
        let tag_type = TagType::try_from(id)?;
        if tag_type == TagType::End {
            return Ok(NamedTag::new("", Tag::End));
        }

        let name = self.string()?;
        let (tag, _) = self.payload(tag_type, 0)?;
        Ok(NamedTag { name, tag })
    }

    fn payload(&mut self, tag_type: TagType, depth: usize) -> Result<(Tag, usize), WorldError> {
        let start = self.position();
        let tag = match tag_type {
            TagType::End => Tag::End,
            TagType::Byte => Tag::Byte(self.read_with(1, |c| c.read_i8())?),
            TagType::Short => Tag::Short(self.read_with(2, |c| c.read_i16::<BigEndian>())?),
            TagType::Int => Tag::Int(self.read_with(4, |c| c.read_i32::<BigEndian>())?),
            TagType::Long => Tag::Long(self.read_with(8, |c| c.read_i64::<BigEndian>())?),
            TagType::Float => Tag::Float(self.read_with(4, |c| c.read_f32::<BigEndian>())?),
            TagType::Double => Tag::Double(self.read_with(8, |c| c.read_f64::<BigEndian>())?),
            TagType::ByteArray => {
                let len = self.array_len(1)?;
                let mut bytes = vec![0i8; len];
                self.read_with(len, |c| c.read_i8_into(&mut bytes))?;
                Tag::ByteArray(bytes)
            }
            TagType::String => Tag::String(self.string()?),
            TagType::List => self.list(depth)?,
            TagType::Compound => self.compound(depth)?,
            TagType::IntArray => {
                let len = self.array_len(4)?;
                let mut ints = vec![0i32; len];
                self.read_with(len * 4, |c| c.read_i32_into::<BigEndian>(&mut ints))?;
                Tag::IntArray(ints)
            }
            TagType::LongArray => {
                let len = self.array_len(8)?;
                let mut longs = vec![0i64; len];
                self.read_with(len * 8, |c| c.read_i64_into::<BigEndian>(&mut longs))?;
                Tag::LongArray(longs)
            }
        };
        Ok((tag, self.position() - start))
    }

    fn enter(&self, depth: usize) -> Result<(), WorldError> {
        if depth >= self.max_depth {
            return Err(WorldError::DepthLimitExceeded(self.max_depth));
        }
        Ok(())
    }

    fn list(&mut self, depth: usize) -> Result<Tag, WorldError> {
        self.enter(depth)?;
        let element_id = self.u8()?;
        let count = self.u32()? as usize;

        // 空列表在真实数据中常以End作为元素类型
        if element_id == 0 && count == 0 {
            return Ok(Tag::List(TagType::End, Vec::new()));
        }
        let element_type = match TagType::try_from(element_id) {
            Ok(TagType::End) | Err(_) => {
                return Err(WorldError::UnknownListElementType(element_id))
            }
            Ok(element_type) => element_type,
        };

        // 每个元素至少占1字节
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            let (item, _) = self.payload(element_type, depth + 1)?;
            items.push(item);
        }
        Ok(Tag::List(element_type, items))
    }

    fn compound(&mut self, depth: usize) -> Result<Tag, WorldError> {
        self.enter(depth)?;
        let mut children = Vec::new();
        loop {
            let id = self.u8()?;
            let tag_type = TagType::try_from(id)?;
            if tag_type == TagType::End {
                break;
            }
            let name = self.string()?;
            let (tag, _) = self.payload(tag_type, depth + 1)?;
            children.push(NamedTag { name, tag });
        }
        Ok(Tag::Compound(children))
    }
}

impl Tag {
    pub fn tag_type(&self) -> TagType {
        match self {
            Tag::End => TagType::End,
            Tag::Byte(_) => TagType::Byte,
            Tag::Short(_) => TagType::Short,
            Tag::Int(_) => TagType::Int,
            Tag::Long(_) => TagType::Long,
            Tag::Float(_) => TagType::Float,
            Tag::Double(_) => TagType::Double,
            Tag::ByteArray(_) => TagType::ByteArray,
            Tag::String(_) => TagType::String,
            Tag::List(..) => TagType::List,
            Tag::Compound(_) => TagType::Compound,
            Tag::IntArray(_) => TagType::IntArray,
            Tag::LongArray(_) => TagType::LongArray,
        }
    }

    pub fn as_compound(&self) -> Option<&[NamedTag]> {
        match self {
            Tag::Compound(children) => Some(children),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(_, items) => Some(items),
            _ => None,
        }
    }

    /// Compound中第一个同名子标签
    pub fn child(&self, name: &str) -> Option<&Tag> {
        self.as_compound()?
            .iter()
            .find(|child| child.name == name)
            .map(|child| &child.tag)
    }

    /// 按 "a.b.c" 形式的路径逐层查找Compound子标签
    pub fn get_path(&self, path: &str) -> Result<&Tag, WorldError> {
        let mut current = self;
        let mut consumed = 0;
        for segment in path.split('.') {
            if current.tag_type() != TagType::Compound {
                let parent = &path[..consumed.max(1) - 1];
                return Err(WorldError::TypeMismatch {
                    path: if parent.is_empty() { "<root>" } else { parent }.to_string(),
                    expected: TagType::Compound,
                    found: current.tag_type(),
                });
            }
            consumed += segment.len() + 1;
            current = current.child(segment).ok_or_else(|| WorldError::TagNotFound {
                path: path[..(consumed - 1).min(path.len())].to_string(),
            })?;
        }
        Ok(current)
    }

    /// 查找路径并按请求的类型取值
    pub fn get<'a, T: FromTag<'a>>(&'a self, path: &str) -> Result<T, WorldError> {
        let tag = self.get_path(path)?;
        T::from_tag(tag).ok_or_else(|| WorldError::TypeMismatch {
            path: path.to_string(),
            expected: T::TAG_TYPE,
            found: tag.tag_type(),
        })
    }

    pub fn get_byte(&self, path: &str) -> Result<i8, WorldError> {
        self.get(path)
    }

    pub fn get_short(&self, path: &str) -> Result<i16, WorldError> {
        self.get(path)
    }

    pub fn get_int(&self, path: &str) -> Result<i32, WorldError> {
        self.get(path)
    }

    pub fn get_long(&self, path: &str) -> Result<i64, WorldError> {
        self.get(path)
    }

    pub fn get_float(&self, path: &str) -> Result<f32, WorldError> {
        self.get(path)
    }

    pub fn get_double(&self, path: &str) -> Result<f64, WorldError> {
        self.get(path)
    }

    pub fn get_string(&self, path: &str) -> Result<&str, WorldError> {
        self.get(path)
    }

    pub fn get_byte_array(&self, path: &str) -> Result<&[i8], WorldError> {
        self.get(path)
    }

    pub fn get_int_array(&self, path: &str) -> Result<&[i32], WorldError> {
        self.get(path)
    }

    pub fn get_long_array(&self, path: &str) -> Result<&[i64], WorldError> {
        self.get(path)
    }

    pub fn get_list(&self, path: &str) -> Result<&[Tag], WorldError> {
        self.get(path)
    }

    pub fn get_compound(&self, path: &str) -> Result<&[NamedTag], WorldError> {
        self.get(path)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => write!(f, "{}", v),
            Tag::Short(v) => write!(f, "{}", v),
            Tag::Int(v) => write!(f, "{}", v),
            Tag::Long(v) => write!(f, "{}", v),
            Tag::Float(v) => write!(f, "{}", v),
            Tag::Double(v) => write!(f, "{}", v),
            Tag::ByteArray(v) => render_numbers(f, v),
            Tag::String(v) => write!(f, "{:?}", v),
            Tag::List(_, items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.render(f, indent)?;
                }
                f.write_str("]")
            }
            Tag::Compound(children) => {
                if children.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{\n")?;
                for (i, child) in children.iter().enumerate() {
                    write!(f, "{:width$}{:?}: ", "", child.name, width = indent + 2)?;
                    child.tag.render(f, indent + 2)?;
                    f.write_str(if i + 1 < children.len() { ",\n" } else { "\n" })?;
                }
                write!(f, "{:width$}}}", "", width = indent)
            }
            Tag::IntArray(v) => render_numbers(f, v),
            Tag::LongArray(v) => render_numbers(f, v),
        }
    }
}

fn render_numbers<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", value)?;
    }
    f.write_str("]")
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Tag::End => serializer.serialize_unit(),
            Tag::Byte(v) => serializer.serialize_i8(*v),
            Tag::Short(v) => serializer.serialize_i16(*v),
            Tag::Int(v) => serializer.serialize_i32(*v),
            Tag::Long(v) => serializer.serialize_i64(*v),
            Tag::Float(v) => serializer.serialize_f32(*v),
            Tag::Double(v) => serializer.serialize_f64(*v),
            Tag::ByteArray(v) => v.serialize(serializer),
            Tag::String(v) => serializer.serialize_str(v),
            Tag::List(_, items) => items.serialize(serializer),
            Tag::Compound(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for child in children {
                    map.serialize_entry(&child.name, &child.tag)?;
                }
                map.end()
            }
            Tag::IntArray(v) => v.serialize(serializer),
            Tag::LongArray(v) => v.serialize(serializer),
        }
    }
}

/// 从标签中按类型取值
pub trait FromTag<'a>: Sized {
    const TAG_TYPE: TagType;

    fn from_tag(tag: &'a Tag) -> Option<Self>;
}

macro_rules! from_tag_copy {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> FromTag<'a> for $ty {
                const TAG_TYPE: TagType = TagType::$variant;

                fn from_tag(tag: &'a Tag) -> Option<Self> {
                    match tag {
                        Tag::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

macro_rules! from_tag_slice {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> FromTag<'a> for &'a $ty {
                const TAG_TYPE: TagType = TagType::$variant;

                fn from_tag(tag: &'a Tag) -> Option<Self> {
                    match tag {
                        Tag::$variant(v) => Some(&v[..]),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_tag_copy! {
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

from_tag_slice! {
    str => String,
    [i8] => ByteArray,
    [i32] => IntArray,
    [i64] => LongArray,
    [NamedTag] => Compound,
}

impl<'a> FromTag<'a> for &'a [Tag] {
    const TAG_TYPE: TagType = TagType::List;

    fn from_tag(tag: &'a Tag) -> Option<Self> {
        tag.as_list()
    }
}
