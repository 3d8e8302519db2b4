use schemkit_common::{Result, SchemError};

/// Extra high bits for legacy block ids, in either of the two layouts seen in the wild
#[derive(Debug, Clone, Copy)]
pub enum AddBlocks<'a> {
    /// `AddBlocks`: two 4-bit values per byte, high nibble first
    Packed(&'a [i8]),
    /// `Add`: one byte per block holding the high bits
    PerBlock(&'a [i8]),
}

/// Splits each byte into two 4-bit values, high nibble first
pub fn unpack_nibbles(packed: &[i8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(packed.len() * 2);
    for &byte in packed {
        let byte = byte as u8;
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    nibbles
}

/// Inverse of [`unpack_nibbles`]; an odd trailing value gets a zero low nibble
pub fn pack_nibbles(nibbles: &[u8]) -> Vec<i8> {
    nibbles
        .chunks(2)
        .map(|pair| {
            let high = pair[0] & 0x0F;
            let low = pair.get(1).map_or(0, |v| v & 0x0F);
            ((high << 4) | low) as i8
        })
        .collect()
}

/// Combines 8-bit base ids with optional high bits into 12-bit ids:
/// `id = (high << 8) | (base & 0xFF)`
pub fn merge_block_ids(blocks: &[i8], add: Option<AddBlocks>) -> Result<Vec<u16>> {
    let base = blocks.iter().map(|&b| b as u8 as u16);
    let high: Vec<u8> = match add {
        None => return Ok(base.collect()),
        Some(AddBlocks::Packed(bytes)) => unpack_nibbles(bytes),
        Some(AddBlocks::PerBlock(bytes)) => bytes.iter().map(|&b| b as u8 & 0x0F).collect(),
    };
    if high.len() < blocks.len() {
        return Err(SchemError::MalformedWire(format!(
            "{} block ids but only {} high-bit entries",
            blocks.len(),
            high.len()
        )));
    }
    Ok(base
        .zip(high)
        .map(|(low, high)| ((high as u16) << 8) | low)
        .collect())
}

/// Splits 12-bit ids back into base bytes plus a packed `AddBlocks` array, which is only
/// produced when some id does not fit a byte
pub fn split_block_ids(ids: &[u16]) -> (Vec<i8>, Option<Vec<i8>>) {
    let blocks = ids.iter().map(|&id| (id & 0xFF) as u8 as i8).collect();
    if ids.iter().all(|&id| id <= 0xFF) {
        return (blocks, None);
    }
    let high: Vec<u8> = ids.iter().map(|&id| ((id >> 8) & 0x0F) as u8).collect();
    (blocks, Some(pack_nibbles(&high)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_high_nibble_first() {
        assert_eq!(unpack_nibbles(&[0xABu8 as i8]), vec![0xA, 0xB]);
        assert_eq!(pack_nibbles(&[0xA, 0xB, 0x3]), vec![0xABu8 as i8, 0x30]);
    }

    #[test]
    fn test_merge_packed_add_blocks() {
        let blocks = [1i8, 0xFFu8 as i8, 7];
        let add = [0x12i8, 0x30];
        let ids = merge_block_ids(&blocks, Some(AddBlocks::Packed(&add))).unwrap();
        assert_eq!(ids, vec![0x101, 0x2FF, 0x307]);
    }

    #[test]
    fn test_merge_per_block_add() {
        let ids = merge_block_ids(&[5, 6], Some(AddBlocks::PerBlock(&[0, 1]))).unwrap();
        assert_eq!(ids, vec![5, 0x106]);
    }

    #[test]
    fn test_merge_without_add_is_unsigned() {
        assert_eq!(merge_block_ids(&[-1, 0], None).unwrap(), vec![255, 0]);
    }

    #[test]
    fn test_short_add_array() {
        assert_matches!(
            merge_block_ids(&[1, 2, 3], Some(AddBlocks::Packed(&[0]))),
            Err(SchemError::MalformedWire(_))
        );
    }

    #[test]
    fn test_split_only_adds_when_needed() {
        assert_eq!(split_block_ids(&[1, 255]), (vec![1, -1], None));
        let (blocks, add) = split_block_ids(&[0x101, 0x2FF, 0x307]);
        assert_eq!(blocks, vec![1, -1, 7]);
        assert_eq!(add, Some(vec![0x12, 0x30]));
    }
}
