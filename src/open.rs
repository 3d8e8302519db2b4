use crate::detect::{detect, detect_extension};
use schemkit_common::{Result, SchemError};
use schemkit_logger::Logger;
use schemkit_nbt::{self as nbt, Compound, NbtFile};
use schemkit_schematic::{
    codec_for, DecodeContext, FormatKind, Litematica, SchematicCodec, Schematic, Schematica,
    Sponge,
};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub nbt: nbt::ReadOptions,
    /// Format to fall back on when the root shape is not recognised
    pub hint: Option<FormatKind>,
    /// Fail on files newer than the newest known layout instead of warning
    pub strict_versions: bool,
}

/// Output format of an encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Sponge(i32),
    Litematica,
    Schematica,
}

impl Target {
    pub fn kind(self) -> FormatKind {
        match self {
            Target::Sponge(_) => FormatKind::Sponge,
            Target::Litematica => FormatKind::Litematica,
            Target::Schematica => FormatKind::Schematica,
        }
    }

    pub fn encode(self, schematic: &Schematic, logger: &dyn Logger) -> Result<NbtFile> {
        match self {
            Target::Sponge(version) => Sponge::new(version).encode(schematic, logger),
            Target::Litematica => Litematica.encode(schematic, logger),
            Target::Schematica => Schematica.encode(schematic, logger),
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::Sponge(schemkit_schematic::sponge::NEWEST_VERSION)
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sponge1" => Ok(Target::Sponge(1)),
            "sponge2" => Ok(Target::Sponge(2)),
            "sponge" | "sponge3" => Ok(Target::Sponge(3)),
            "litematica" | "litematic" => Ok(Target::Litematica),
            "schematica" | "schematic" => Ok(Target::Schematica),
            other => Err(format!(
                "unknown target {:?}, expected sponge1, sponge2, sponge3, litematica or schematica",
                other
            )),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Sponge(version) => write!(f, "sponge{}", version),
            Target::Litematica => f.write_str("litematica"),
            Target::Schematica => f.write_str("schematica"),
        }
    }
}

/// Defaults to Sponge version 3, big-endian, gzip-compressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub nbt: nbt::WriteOptions,
    pub target: Target,
}

/// Decodes an already parsed root compound
pub fn decode_root(root: &Compound, options: &ReadOptions, logger: &dyn Logger) -> Result<Schematic> {
    let kind = match (detect(root), options.hint) {
        (Some(detected), Some(hint)) if detected != hint => {
            logger.debug(&format!(
                "content looks like {} although the name suggests {}",
                detected, hint
            ));
            detected
        }
        (Some(detected), _) => detected,
        (None, Some(hint)) => hint,
        (None, None) => return Err(SchemError::NoDecoderFound),
    };
    let ctx = DecodeContext {
        logger,
        strict_versions: options.strict_versions,
    };
    codec_for(kind).decode(root, &ctx)
}

/// Reads and decodes a schematic from a raw or gzip-compressed stream
pub fn read_schematic<R: Read>(
    reader: R,
    options: &ReadOptions,
    logger: &dyn Logger,
) -> Result<Schematic> {
    let file = NbtFile::read(reader, &options.nbt)?;
    decode_root(&file.root, options, logger)
}

fn with_extension_hint(path: &Path, options: &ReadOptions) -> ReadOptions {
    ReadOptions {
        hint: options.hint.or_else(|| detect_extension(path)),
        ..*options
    }
}

pub fn read_file(
    path: impl AsRef<Path>,
    options: &ReadOptions,
    logger: &dyn Logger,
) -> Result<Schematic> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    read_schematic(reader, &with_extension_hint(path, options), logger)
}

/// Reads the file through tokio, then decodes synchronously
pub async fn read_file_async(
    path: impl AsRef<Path>,
    options: &ReadOptions,
    logger: &dyn Logger,
) -> Result<Schematic> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    read_schematic(bytes.as_slice(), &with_extension_hint(path, options), logger)
}

/// Reads a raw tag tree without interpreting it
pub fn read_nbt_file(path: impl AsRef<Path>, options: &nbt::ReadOptions) -> Result<NbtFile> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    NbtFile::read(reader, options)
}

pub fn write_schematic<W: Write>(
    writer: W,
    schematic: &Schematic,
    options: &WriteOptions,
    logger: &dyn Logger,
) -> Result<()> {
    let file = options.target.encode(schematic, logger)?;
    nbt::write_named(writer, &file.to_named_tag(), &options.nbt)
}

pub fn write_file(
    path: impl AsRef<Path>,
    schematic: &Schematic,
    options: &WriteOptions,
    logger: &dyn Logger,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_schematic(&mut writer, schematic, options, logger)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use schemkit_logger::NullLogger;

    #[test]
    fn test_target_names() {
        for name in ["sponge1", "sponge2", "sponge3", "litematica", "schematica"] {
            let target: Target = name.parse().unwrap();
            assert_eq!(target.to_string(), name);
        }
        assert_eq!("SPONGE".parse::<Target>(), Ok(Target::Sponge(3)));
        assert!("mcedit".parse::<Target>().is_err());
        assert_eq!(Target::default().kind(), FormatKind::Sponge);
    }

    #[test]
    fn test_unknown_root_needs_hint() {
        let root = Compound::new();
        assert_matches!(
            decode_root(&root, &ReadOptions::default(), &NullLogger),
            Err(SchemError::NoDecoderFound)
        );

        let options = ReadOptions {
            hint: Some(FormatKind::Sponge),
            ..ReadOptions::default()
        };
        assert_matches!(
            decode_root(&root, &options, &NullLogger),
            Err(SchemError::MissingRequiredField { .. })
        );
    }

    #[test]
    fn test_extension_hint_does_not_override_explicit_hint() {
        let options = ReadOptions {
            hint: Some(FormatKind::Litematica),
            ..ReadOptions::default()
        };
        let merged = with_extension_hint(Path::new("a.schem"), &options);
        assert_eq!(merged.hint, Some(FormatKind::Litematica));
        let merged = with_extension_hint(Path::new("a.schem"), &ReadOptions::default());
        assert_eq!(merged.hint, Some(FormatKind::Sponge));
    }
}
