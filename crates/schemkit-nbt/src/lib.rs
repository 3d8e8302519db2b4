pub mod codec;
pub mod compression;
pub mod json;
pub mod snbt;
pub mod tag;

pub use codec::{Endianness, DEFAULT_MAX_DEPTH};
pub use compression::Compression;
pub use tag::{Compound, FromTag, List, NamedTag, Tag, TagType};

use compression::{CompressingWriter, DecompressingReader};
use schemkit_common::{Result, SchemError};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub endianness: Endianness,
    pub max_depth: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            endianness: Endianness::Big,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Defaults to big-endian, gzip-compressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub endianness: Endianness,
    pub compression: Compression,
}

/// Reads a framed tag, gunzipping first when the stream starts with the gzip magic
pub fn read_named<R: Read>(reader: R, options: &ReadOptions) -> Result<(NamedTag, Compression)> {
    let mut stream = DecompressingReader::new(reader)?;
    let compression = stream.compression();
    let tag = codec::read_named_tag(&mut stream, options.endianness, options.max_depth)?;
    Ok((tag, compression))
}

pub fn write_named<W: Write>(writer: W, tag: &NamedTag, options: &WriteOptions) -> Result<()> {
    let mut sink = CompressingWriter::new(writer, options.compression);
    codec::write_named_tag(&mut sink, tag, options.endianness)?;
    sink.finish()?;
    Ok(())
}

// NbtFile represents a complete NBT file whose root is a compound
#[derive(Debug, Clone, PartialEq)]
pub struct NbtFile {
    pub name: String,
    pub root: Compound,
    /// Compression the file was read with, or should be written with
    pub compression: Compression,
}

impl NbtFile {
    pub fn new(name: impl Into<String>, root: Compound) -> Self {
        NbtFile {
            name: name.into(),
            root,
            compression: Compression::Gzip,
        }
    }

    pub fn read<R: Read>(reader: R, options: &ReadOptions) -> Result<Self> {
        let (NamedTag { name, tag }, compression) = read_named(reader, options)?;
        match tag {
            Tag::Compound(root) => Ok(NbtFile {
                name,
                root,
                compression,
            }),
            other => Err(SchemError::MalformedWire(format!(
                "root tag is {}, expected Compound",
                other.tag_type()
            ))),
        }
    }

    pub fn from_bytes(bytes: &[u8], options: &ReadOptions) -> Result<Self> {
        NbtFile::read(bytes, options)
    }

    /// Writes with the given byte order and the compression stored on this file
    pub fn write<W: Write>(&self, writer: W, endianness: Endianness) -> Result<()> {
        let options = WriteOptions {
            endianness,
            compression: self.compression,
        };
        write_named(writer, &self.to_named_tag(), &options)
    }

    pub fn to_bytes(&self, options: &WriteOptions) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        write_named(&mut buffer, &self.to_named_tag(), options)?;
        Ok(buffer)
    }

    pub fn to_named_tag(&self) -> NamedTag {
        NamedTag::new(self.name.clone(), self.root.clone())
    }
}
