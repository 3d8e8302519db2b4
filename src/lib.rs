pub mod detect;
pub mod open;

// Re-export commonly used items
pub use detect::{detect, detect_extension};
pub use open::{
    decode_root, read_file, read_file_async, read_schematic, write_file, write_schematic,
    ReadOptions, Target, WriteOptions,
};
pub use schemkit_common::{BlockPos, Dimensions, Result, SchemError, Vec3};
pub use schemkit_logger::{ConsoleLogger, LogSeverity, Logger, MemoryLogger, NullLogger};
pub use schemkit_nbt as nbt;
pub use schemkit_schematic::{
    BlockEntity, BlockState, Entity, FormatKind, Metadata, Palette, Region, Schematic,
    SchematicSummary,
};
