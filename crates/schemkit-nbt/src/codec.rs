use crate::tag::{Compound, List, NamedTag, Tag, TagType};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use schemkit_common::{Result, SchemError};
use std::io::{self, Read, Write};
use std::marker::PhantomData;

/// Nesting limit applied when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Upper bound on elements reserved up front from an untrusted length prefix
const MAX_PREALLOCATION: usize = 1 << 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Endianness {
    /// Java edition layout
    #[default]
    Big,
    /// Bedrock edition layout
    Little,
}

/// Reads one tag tree from an uncompressed stream in byte order `O`
pub struct TagReader<R, O> {
    reader: R,
    depth: usize,
    max_depth: usize,
    order: PhantomData<O>,
}

impl<R: Read, O: ByteOrder> TagReader<R, O> {
    pub fn new(reader: R, max_depth: usize) -> Self {
        TagReader {
            reader,
            depth: 0,
            max_depth,
            order: PhantomData,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads a fully framed tag: type byte, name, payload
    pub fn read_named(&mut self) -> Result<NamedTag> {
        let type_id = self.reader.read_u8()?;
        let tag_type = tag_type_from_id(type_id)?;
        if tag_type == TagType::End {
            return Ok(NamedTag::new("", Tag::End));
        }

        let name = self.read_string()?;
        let tag = self.read_payload(tag_type)?;
        Ok(NamedTag { name, tag })
    }

    fn read_string(&mut self) -> Result<String> {
        let length = self.reader.read_u16::<O>()?;
        let mut bytes = vec![0u8; length as usize];
        self.reader.read_exact(&mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|e| SchemError::MalformedWire(format!("invalid UTF-8 in string: {}", e)))
    }

    fn read_length(&mut self) -> Result<usize> {
        let length = self.reader.read_i32::<O>()?;
        usize::try_from(length)
            .map_err(|_| SchemError::MalformedWire(format!("negative length: {}", length)))
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(SchemError::DepthExceeded {
                max: self.max_depth,
            });
        }
        Ok(())
    }

    fn read_payload(&mut self, tag_type: TagType) -> Result<Tag> {
        Ok(match tag_type {
            TagType::End => Tag::End,
            TagType::Byte => Tag::Byte(self.reader.read_i8()?),
            TagType::Short => Tag::Short(self.reader.read_i16::<O>()?),
            TagType::Int => Tag::Int(self.reader.read_i32::<O>()?),
            TagType::Long => Tag::Long(self.reader.read_i64::<O>()?),
            TagType::Float => Tag::Float(self.reader.read_f32::<O>()?),
            TagType::Double => Tag::Double(self.reader.read_f64::<O>()?),
            TagType::ByteArray => {
                let length = self.read_length()?;
                let mut bytes = Vec::with_capacity(length.min(MAX_PREALLOCATION));
                (&mut self.reader)
                    .take(length as u64)
                    .read_to_end(&mut bytes)?;
                if bytes.len() != length {
                    return Err(SchemError::MalformedWire(format!(
                        "byte array declared {} bytes, stream held {}",
                        length,
                        bytes.len()
                    )));
                }
                Tag::ByteArray(bytes.into_iter().map(|b| b as i8).collect())
            }
            TagType::String => Tag::String(self.read_string()?),
            TagType::List => {
                self.enter()?;
                let element_id = self.reader.read_u8()?;
                let element_type = tag_type_from_id(element_id)?;
                let length = self.read_length()?;
                if element_type == TagType::End && length > 0 {
                    return Err(SchemError::MalformedWire(format!(
                        "list of {} End tags",
                        length
                    )));
                }
                let mut list = List::with_element_type(element_type);
                for _ in 0..length {
                    let element = self.read_payload(element_type)?;
                    list.push(element)?;
                }
                self.depth -= 1;
                Tag::List(list)
            }
            TagType::Compound => {
                self.enter()?;
                let mut compound = Compound::new();
                loop {
                    let NamedTag { name, tag } = self.read_named()?;
                    if let Tag::End = tag {
                        break;
                    }
                    compound.insert(name, tag);
                }
                self.depth -= 1;
                Tag::Compound(compound)
            }
            TagType::IntArray => {
                let length = self.read_length()?;
                let mut ints = Vec::with_capacity(length.min(MAX_PREALLOCATION));
                for _ in 0..length {
                    ints.push(self.reader.read_i32::<O>()?);
                }
                Tag::IntArray(ints)
            }
            TagType::LongArray => {
                let length = self.read_length()?;
                let mut longs = Vec::with_capacity(length.min(MAX_PREALLOCATION));
                for _ in 0..length {
                    longs.push(self.reader.read_i64::<O>()?);
                }
                Tag::LongArray(longs)
            }
        })
    }
}

fn tag_type_from_id(id: u8) -> Result<TagType> {
    TagType::from_id(id).ok_or_else(|| SchemError::MalformedWire(format!("Invalid tag type: {}", id)))
}

/// Writes tag trees to an uncompressed sink in byte order `O`
pub struct TagWriter<W, O> {
    writer: W,
    order: PhantomData<O>,
}

impl<W: Write, O: ByteOrder> TagWriter<W, O> {
    pub fn new(writer: W) -> Self {
        TagWriter {
            writer,
            order: PhantomData,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_named(&mut self, name: &str, tag: &Tag) -> Result<()> {
        self.writer.write_u8(tag.get_type_id())?;

        if !matches!(tag, Tag::End) {
            self.write_string(name)?;
        }

        self.write_payload(tag)
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        let length = u16::try_from(value.len()).map_err(|_| {
            SchemError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("string of {} bytes exceeds the 65535 byte limit", value.len()),
            ))
        })?;
        self.writer.write_u16::<O>(length)?;
        self.writer.write_all(value.as_bytes())?;
        Ok(())
    }

    fn write_length(&mut self, length: usize) -> Result<()> {
        let length = i32::try_from(length).map_err(|_| {
            SchemError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} elements exceed the array length limit", length),
            ))
        })?;
        self.writer.write_i32::<O>(length)?;
        Ok(())
    }

    fn write_payload(&mut self, tag: &Tag) -> Result<()> {
        match tag {
            Tag::End => {}
            Tag::Byte(v) => self.writer.write_i8(*v)?,
            Tag::Short(v) => self.writer.write_i16::<O>(*v)?,
            Tag::Int(v) => self.writer.write_i32::<O>(*v)?,
            Tag::Long(v) => self.writer.write_i64::<O>(*v)?,
            Tag::Float(v) => self.writer.write_f32::<O>(*v)?,
            Tag::Double(v) => self.writer.write_f64::<O>(*v)?,
            Tag::ByteArray(v) => {
                self.write_length(v.len())?;
                let bytes: Vec<u8> = v.iter().map(|&b| b as u8).collect();
                self.writer.write_all(&bytes)?;
            }
            Tag::String(v) => self.write_string(v)?,
            Tag::List(list) => {
                // an untyped list goes out as a list of End
                let element_id = list.element_type().map_or(0, TagType::id);
                self.writer.write_u8(element_id)?;
                self.write_length(list.len())?;
                for element in list {
                    self.write_payload(element)?;
                }
            }
            Tag::Compound(compound) => {
                for (name, child) in compound {
                    self.write_named(name, child)?;
                }
                self.writer.write_u8(TagType::End.id())?;
            }
            Tag::IntArray(v) => {
                self.write_length(v.len())?;
                for &i in v {
                    self.writer.write_i32::<O>(i)?;
                }
            }
            Tag::LongArray(v) => {
                self.write_length(v.len())?;
                for &l in v {
                    self.writer.write_i64::<O>(l)?;
                }
            }
        }
        Ok(())
    }
}

/// Reads a framed tag from an uncompressed stream, picking the byte order at runtime
pub fn read_named_tag<R: Read>(
    reader: R,
    endianness: Endianness,
    max_depth: usize,
) -> Result<NamedTag> {
    match endianness {
        Endianness::Big => TagReader::<_, BigEndian>::new(reader, max_depth).read_named(),
        Endianness::Little => TagReader::<_, LittleEndian>::new(reader, max_depth).read_named(),
    }
}

/// Writes a framed tag to an uncompressed sink, picking the byte order at runtime
pub fn write_named_tag<W: Write>(writer: W, tag: &NamedTag, endianness: Endianness) -> Result<()> {
    match endianness {
        Endianness::Big => TagWriter::<_, BigEndian>::new(writer).write_named(&tag.name, &tag.tag),
        Endianness::Little => {
            TagWriter::<_, LittleEndian>::new(writer).write_named(&tag.name, &tag.tag)
        }
    }
}
