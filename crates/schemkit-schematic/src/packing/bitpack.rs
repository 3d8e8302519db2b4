use schemkit_common::{Result, SchemError};

/// Entry width used by Litematica block arrays: `max(2, ceil(log2(palette_size)))`
pub fn bits_per_entry(palette_size: usize) -> u32 {
    let needed = if palette_size > 1 {
        usize::BITS - (palette_size - 1).leading_zeros()
    } else {
        0
    };
    needed.max(2)
}

/// Number of 64-bit words that hold `count` entries of `bits` each. Entries may straddle
/// word boundaries, so this is `ceil(count * bits / 64)`.
pub fn packed_len(count: usize, bits: u32) -> Option<usize> {
    let total_bits = count.checked_mul(bits as usize)?;
    Some(total_bits.div_ceil(64))
}

fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Reads entry `index`. The caller guarantees the words cover the entry.
pub fn get_entry(words: &[i64], bits: u32, index: usize) -> u32 {
    let bit_index = index * bits as usize;
    let word_index = bit_index / 64;
    let bit_offset = (bit_index % 64) as u32;

    let mut value = (words[word_index] as u64) >> bit_offset;
    if bit_offset + bits > 64 {
        // the entry continues in the low bits of the next word
        value |= (words[word_index + 1] as u64) << (64 - bit_offset);
    }
    (value & mask(bits)) as u32
}

/// Overwrites entry `index` with the low `bits` bits of `value`
pub fn set_entry(words: &mut [i64], bits: u32, index: usize, value: u32) {
    let bit_index = index * bits as usize;
    let word_index = bit_index / 64;
    let bit_offset = (bit_index % 64) as u32;
    let value = value as u64 & mask(bits);

    let mut word = words[word_index] as u64;
    word &= !(mask(bits) << bit_offset);
    word |= value << bit_offset;
    words[word_index] = word as i64;

    if bit_offset + bits > 64 {
        let bits_in_next = bit_offset + bits - 64;
        let mut next = words[word_index + 1] as u64;
        next &= !mask(bits_in_next);
        next |= value >> (bits - bits_in_next);
        words[word_index + 1] = next as i64;
    }
}

/// Extracts `count` entries of width `bits` from a little-endian-within-word packed array
pub fn unpack(words: &[i64], bits: u32, count: usize) -> Result<Vec<u32>> {
    if !(1..=32).contains(&bits) {
        return Err(SchemError::MalformedWire(format!(
            "unsupported entry width of {} bits",
            bits
        )));
    }
    let needed = packed_len(count, bits).ok_or_else(|| {
        SchemError::MalformedWire(format!("{} entries of {} bits overflow", count, bits))
    })?;
    if words.len() < needed {
        return Err(SchemError::MalformedWire(format!(
            "packed array holds {} words, {} entries of {} bits need {}",
            words.len(),
            count,
            bits,
            needed
        )));
    }

    Ok((0..count).map(|i| get_entry(words, bits, i)).collect())
}

pub fn pack(values: &[u32], bits: u32) -> Vec<i64> {
    let len = packed_len(values.len(), bits).unwrap_or(0);
    let mut words = vec![0i64; len];
    for (i, &value) in values.iter().enumerate() {
        set_entry(&mut words, bits, i, value);
    }
    words
}
