//! Dense array codecs shared by the schematic formats.

pub mod bitpack;
pub mod nibble;
pub mod varint;

pub use bitpack::bits_per_entry;
pub use nibble::AddBlocks;
pub use varint::{decode_varints, encode_varints};
