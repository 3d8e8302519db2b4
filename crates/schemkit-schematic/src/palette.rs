use crate::packing::bitpack;
use schemkit_common::{Result, SchemError};
use std::collections::HashMap;
use std::hash::Hash;

/// Bidirectional map between small integer indices and tokens (block states, biome ids).
///
/// Indices may be sparse. `size` is one past the largest index ever assigned, which is what
/// the bit-packed formats use to pick their entry width. Reading an index that was never
/// assigned fails with `IndexOutOfRange`.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette<T: Eq + Hash + Clone> {
    id_to_token: HashMap<u32, T>,
    token_to_id: HashMap<T, u32>,
    size: usize,
}

impl<T: Eq + Hash + Clone> Default for Palette<T> {
    fn default() -> Self {
        Palette {
            id_to_token: HashMap::new(),
            token_to_id: HashMap::new(),
            size: 0,
        }
    }
}

impl<T: Eq + Hash + Clone> Palette<T> {
    pub fn new() -> Self {
        Palette::default()
    }

    /// Builds a dense palette where each token's index is its position
    pub fn from_tokens(tokens: impl IntoIterator<Item = T>) -> Self {
        let mut palette = Palette::new();
        for (index, token) in tokens.into_iter().enumerate() {
            palette.put(index as u32, token);
        }
        palette
    }

    /// Assigns `token` to `index`, replacing whatever was there. A token already present under
    /// another index keeps resolving to its first index.
    pub fn put(&mut self, index: u32, token: T) {
        if let Some(previous) = self.id_to_token.insert(index, token.clone()) {
            if self.token_to_id.get(&previous) == Some(&index) {
                self.token_to_id.remove(&previous);
            }
        }
        self.token_to_id.entry(token).or_insert(index);
        self.size = self.size.max(index as usize + 1);
    }

    pub fn get(&self, index: u32) -> Result<&T> {
        self.id_to_token
            .get(&index)
            .ok_or(SchemError::IndexOutOfRange {
                index,
                size: self.size,
            })
    }

    pub fn index_of(&self, token: &T) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Returns the token's index, appending it at `size` when it is new
    pub fn get_or_insert(&mut self, token: T) -> u32 {
        if let Some(&index) = self.token_to_id.get(&token) {
            return index;
        }
        let index = self.size as u32;
        self.put(index, token);
        index
    }

    /// One past the largest assigned index
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of assigned indices, which is below `size` when the palette is sparse
    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    pub fn bits_per_entry(&self) -> u32 {
        bitpack::bits_per_entry(self.size)
    }

    /// Entries in ascending index order
    pub fn entries(&self) -> Vec<(u32, &T)> {
        let mut entries: Vec<(u32, &T)> = self.id_to_token.iter().map(|(&i, t)| (i, t)).collect();
        entries.sort_unstable_by_key(|(i, _)| *i);
        entries
    }

    /// Fails on the first index in `indices` that has no token assigned
    pub fn validate(&self, indices: &[u32]) -> Result<()> {
        let mut checked = std::collections::HashSet::new();
        for &index in indices {
            if checked.insert(index) {
                self.get(index)?;
            }
        }
        Ok(())
    }
}
