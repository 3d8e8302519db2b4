use schemkit_common::{Result, SchemError};

/// A value below 2^32 never needs more than five 7-bit groups
pub const MAX_VARINT_GROUPS: usize = 5;

/// Reads one varint starting at `*cursor`, advancing the cursor past it.
/// A varint stores 7 bits per byte, least significant group first, with the high bit set on
/// every byte except the last.
pub fn read_varint(bytes: &[i8], cursor: &mut usize) -> Result<u32> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for group in 0..MAX_VARINT_GROUPS {
        let byte = match bytes.get(*cursor) {
            Some(&b) => b as u8,
            None => {
                return Err(SchemError::MalformedWire(format!(
                    "varint stream ended after {} of a value's groups",
                    group
                )))
            }
        };
        *cursor += 1;

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if (byte & 0x80) == 0 {
            return u32::try_from(result).map_err(|_| SchemError::VarIntTooLarge);
        }
    }
    Err(SchemError::VarIntTooLarge)
}

/// Decodes exactly `count` varints. Bytes after the last value are ignored.
pub fn decode_varints(bytes: &[i8], count: usize) -> Result<Vec<u32>> {
    // every value takes at least one byte
    if count > bytes.len() {
        return Err(SchemError::MalformedWire(format!(
            "{} values expected but only {} bytes of varint data",
            count,
            bytes.len()
        )));
    }

    let mut values = Vec::with_capacity(count);
    let mut cursor = 0;
    while values.len() < count {
        values.push(read_varint(bytes, &mut cursor)?);
    }
    Ok(values)
}

pub fn write_varint(buffer: &mut Vec<i8>, mut value: u32) {
    while (value & !0x7F) != 0 {
        buffer.push((((value & 0x7F) as u8) | 0x80) as i8);
        value >>= 7;
    }
    buffer.push((value & 0x7F) as i8);
}

pub fn encode_varints(values: &[u32]) -> Vec<i8> {
    let mut buffer = Vec::with_capacity(values.len());
    for &value in values {
        write_varint(&mut buffer, value);
    }
    buffer
}
