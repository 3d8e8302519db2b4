use schemkit_nbt::Compound;
use schemkit_schematic::{codecs, FormatKind};
use std::path::Path;

/// Identifies the format from the shape of the root compound. `None` when nothing matches.
pub fn detect(root: &Compound) -> Option<FormatKind> {
    codecs()
        .into_iter()
        .find(|codec| codec.matches(root))
        .map(|codec| codec.kind())
}

/// Format suggested by a file extension
pub fn detect_extension(path: &Path) -> Option<FormatKind> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(FormatKind::from_extension)
}
