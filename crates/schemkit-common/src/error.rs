use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum SchemError {
    /// Unexpected byte layout or a truncated stream
    MalformedWire(String),
    /// Tag nesting went past the configured maximum
    DepthExceeded { max: usize },
    /// A tag of one variant was found or inserted where another was required
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// A varint ran past five groups or past 32 bits
    VarIntTooLarge,
    /// A key the format requires is absent or has the wrong tag type
    MissingRequiredField {
        tag: String,
        field: String,
        expected: &'static str,
    },
    /// Schema version outside the range a decoder knows
    UnsupportedVersion {
        format: &'static str,
        version: i32,
        newest: i32,
    },
    NoDecoderFound,
    IndexOutOfRange { index: u32, size: usize },
    InvalidBlockState(String),
    MalformedText { position: usize, message: String },
    /// The value has no representation in the target format
    Unencodable(String),
    Io(io::Error),
}

impl fmt::Display for SchemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemError::MalformedWire(msg) => write!(f, "Malformed data: {}", msg),
            SchemError::DepthExceeded { max } => {
                write!(f, "Tag nesting exceeds the maximum depth of {}", max)
            }
            SchemError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            SchemError::VarIntTooLarge => write!(f, "VarInt too big"),
            SchemError::MissingRequiredField {
                tag,
                field,
                expected,
            } => write!(
                f,
                "Missing required field '{}' of type {} in '{}'",
                field, expected, tag
            ),
            SchemError::UnsupportedVersion {
                format,
                version,
                newest,
            } => write!(
                f,
                "Unsupported {} version {} (newest known is {})",
                format, version, newest
            ),
            SchemError::NoDecoderFound => write!(f, "No decoder found for this schematic"),
            SchemError::IndexOutOfRange { index, size } => write!(
                f,
                "Palette index {} is not set (palette size {})",
                index, size
            ),
            SchemError::InvalidBlockState(state) => write!(f, "Invalid block state: {}", state),
            SchemError::MalformedText { position, message } => {
                write!(f, "SNBT error at {}: {}", position, message)
            }
            SchemError::Unencodable(msg) => write!(f, "Cannot encode: {}", msg),
            SchemError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl Error for SchemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SchemError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SchemError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                SchemError::MalformedWire(format!("unexpected end of stream ({})", err))
            }
            _ => SchemError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn eof_maps_to_malformed_wire() {
        let err: SchemError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert_matches!(err, SchemError::MalformedWire(_));
    }

    #[test]
    fn other_io_errors_stay_io() {
        let err: SchemError = io::Error::new(io::ErrorKind::BrokenPipe, "closed").into();
        assert_matches!(err, SchemError::Io(_));
        assert!(err.source().is_some());
    }

    #[test]
    fn missing_field_message_names_everything() {
        let err = SchemError::MissingRequiredField {
            tag: "Schematic".to_string(),
            field: "DataVersion".to_string(),
            expected: "Int",
        };
        assert_eq!(
            err.to_string(),
            "Missing required field 'DataVersion' of type Int in 'Schematic'"
        );
    }
}
