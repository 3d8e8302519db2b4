pub mod block_state;
mod fields;
pub mod format;
pub mod litematica;
pub mod packing;
pub mod palette;
pub mod schematic;
pub mod schematica;
pub mod sponge;

pub use block_state::{BlockState, AIR, AIR_ID};
pub use format::{codec_for, codecs, DecodeContext, SchematicCodec, DEFAULT_DATA_VERSION};
pub use litematica::Litematica;
pub use palette::Palette;
pub use schematic::{
    BiomeGrid, BiomeLayout, BlockEntity, Entity, FormatKind, Metadata, Region, RegionSummary,
    ScheduledTick, Schematic, SchematicSummary,
};
pub use schematica::Schematica;
pub use sponge::Sponge;
