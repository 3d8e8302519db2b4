use crate::litematica::Litematica;
use crate::schematic::{FormatKind, Schematic};
use crate::schematica::Schematica;
use crate::sponge::Sponge;
use schemkit_common::{Result, SchemError};
use schemkit_logger::Logger;
use schemkit_nbt::{Compound, NbtFile};

/// Data version written when a schematic does not carry one (Minecraft 1.20.1)
pub const DEFAULT_DATA_VERSION: i32 = 3465;

/// Per-call decoding settings. The logger receives version and layout warnings.
pub struct DecodeContext<'a> {
    pub logger: &'a dyn Logger,
    /// Fail instead of warning when a file is newer than the newest known layout
    pub strict_versions: bool,
}

impl<'a> DecodeContext<'a> {
    pub fn new(logger: &'a dyn Logger) -> Self {
        DecodeContext {
            logger,
            strict_versions: false,
        }
    }

    /// Returns the layout version to decode with
    pub(crate) fn check_version(
        &self,
        format: &'static str,
        version: i32,
        oldest: i32,
        newest: i32,
    ) -> Result<i32> {
        let unsupported = SchemError::UnsupportedVersion {
            format,
            version,
            newest,
        };
        if version < oldest {
            return Err(unsupported);
        }
        if version > newest {
            if self.strict_versions {
                return Err(unsupported);
            }
            self.logger.warning(&format!(
                "{}; decoding with the version {} layout",
                unsupported, newest
            ));
            return Ok(newest);
        }
        Ok(version)
    }
}

/// A schematic file format. Decoding reads the root compound of a file; encoding builds a
/// complete file, root name included.
pub trait SchematicCodec {
    fn kind(&self) -> FormatKind;

    /// Whether the root compound has this format's shape
    fn matches(&self, root: &Compound) -> bool;

    fn decode(&self, root: &Compound, ctx: &DecodeContext) -> Result<Schematic>;

    fn encode(&self, schematic: &Schematic, logger: &dyn Logger) -> Result<NbtFile>;
}

static SPONGE: Sponge = Sponge::new(crate::sponge::NEWEST_VERSION);
static LITEMATICA: Litematica = Litematica;
static SCHEMATICA: Schematica = Schematica;

/// Every decoder, in detection order. Litematica goes first since its root also carries a
/// `Version` key.
pub fn codecs() -> [&'static dyn SchematicCodec; 3] {
    [&LITEMATICA, &SPONGE, &SCHEMATICA]
}

pub fn codec_for(kind: FormatKind) -> &'static dyn SchematicCodec {
    match kind {
        FormatKind::Sponge => &SPONGE,
        FormatKind::Litematica => &LITEMATICA,
        FormatKind::Schematica => &SCHEMATICA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use schemkit_logger::{LogSeverity, MemoryLogger};

    #[test]
    fn test_newer_version_warns_and_uses_newest() {
        let logger = MemoryLogger::new();
        let ctx = DecodeContext::new(&logger);
        assert_eq!(ctx.check_version("Sponge", 9, 1, 3).unwrap(), 3);
        let warnings = logger.messages_at(LogSeverity::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Sponge"));
    }

    #[test]
    fn test_strict_rejects_newer_version() {
        let logger = MemoryLogger::new();
        let ctx = DecodeContext {
            logger: &logger,
            strict_versions: true,
        };
        assert_matches!(
            ctx.check_version("Sponge", 9, 1, 3),
            Err(SchemError::UnsupportedVersion { version: 9, newest: 3, .. })
        );
        assert!(logger.records().is_empty());
    }

    #[test]
    fn test_older_version_fails() {
        let logger = MemoryLogger::new();
        let ctx = DecodeContext::new(&logger);
        assert_matches!(
            ctx.check_version("Sponge", 0, 1, 3),
            Err(SchemError::UnsupportedVersion { version: 0, .. })
        );
        assert_eq!(ctx.check_version("Sponge", 2, 1, 3).unwrap(), 2);
    }

    #[test]
    fn test_codec_lookup() {
        for kind in [FormatKind::Sponge, FormatKind::Litematica, FormatKind::Schematica] {
            assert_eq!(codec_for(kind).kind(), kind);
        }
        assert_eq!(codecs()[0].kind(), FormatKind::Litematica);
    }
}
