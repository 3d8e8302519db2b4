use once_cell::sync::Lazy;
use schemkit_common::SchemError;
use schemkit_nbt::{Compound, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier every out-of-bounds or unfilled position resolves to
pub const AIR_ID: &str = "minecraft:air";

pub static AIR: Lazy<BlockState> = Lazy::new(|| BlockState::new(AIR_ID));

/// A block identifier plus its properties, ordered by key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockState {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        BlockState {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air" | "air"
        )
    }

    /// Namespace part of the identifier, `minecraft` when none is given
    pub fn namespace(&self) -> &str {
        self.name.split_once(':').map_or("minecraft", |(ns, _)| ns)
    }

    /// Reads the `{Name, Properties}` compound used by Litematica palettes
    pub fn from_compound(compound: &Compound) -> Option<Self> {
        let name = compound.get("Name")?.as_str()?;
        let mut state = BlockState::new(name);
        if let Some(properties) = compound.get_compound("Properties") {
            for (key, value) in properties {
                match value {
                    Tag::String(s) => state.properties.insert(key.clone(), s.clone()),
                    other => state.properties.insert(key.clone(), other.to_string()),
                };
            }
        }
        Some(state)
    }

    pub fn to_compound(&self) -> Compound {
        let mut compound = Compound::new();
        compound.insert("Name", self.name.as_str());
        if !self.properties.is_empty() {
            let properties: Compound = self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), Tag::String(v.clone())))
                .collect();
            compound.insert("Properties", properties);
        }
        compound
    }
}

impl Default for BlockState {
    fn default() -> Self {
        AIR.clone()
    }
}

impl FromStr for BlockState {
    type Err = SchemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SchemError::InvalidBlockState(s.to_string());
        let (name, rest) = match s.find('[') {
            Some(open) => (&s[..open], Some(&s[open + 1..])),
            None => (s, None),
        };
        let name = name.trim();
        if name.is_empty() || name.contains(']') {
            return Err(invalid());
        }

        let mut state = BlockState::new(name);
        if let Some(rest) = rest {
            let body = rest.strip_suffix(']').ok_or_else(invalid)?;
            if body.contains('[') || body.contains(']') {
                return Err(invalid());
            }
            for pair in body.split(',').filter(|p| !p.trim().is_empty()) {
                let (key, value) = pair.split_once('=').ok_or_else(invalid)?;
                let key = key.trim();
                if key.is_empty() {
                    return Err(invalid());
                }
                state
                    .properties
                    .insert(key.to_string(), value.trim().to_string());
            }
        }
        Ok(state)
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.properties.is_empty() {
            f.write_str("[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_plain_identifier() {
        let state: BlockState = "minecraft:stone".parse().unwrap();
        assert_eq!(state.name, "minecraft:stone");
        assert!(state.properties.is_empty());
        assert_eq!(state.namespace(), "minecraft");
    }

    #[test]
    fn test_parse_properties_sorted_by_key() {
        let state: BlockState = "minecraft:oak_stairs[waterlogged=false,facing=north,half=top]"
            .parse()
            .unwrap();
        assert_eq!(state.name, "minecraft:oak_stairs");
        assert_eq!(state.property("facing"), Some("north"));
        assert_eq!(
            state.properties.keys().collect::<Vec<_>>(),
            vec!["facing", "half", "waterlogged"]
        );
        assert_eq!(
            state.to_string(),
            "minecraft:oak_stairs[facing=north,half=top,waterlogged=false]"
        );
    }

    #[test]
    fn test_parse_rejects_malformed_brackets() {
        for bad in ["", "[a=b]", "stone[facing=north", "stone[facing]", "stone]x", "a[b=[c]]"] {
            assert_matches!(bad.parse::<BlockState>(), Err(SchemError::InvalidBlockState(_)));
        }
    }

    #[test]
    fn test_empty_brackets_mean_no_properties() {
        let state: BlockState = "mod:thing[]".parse().unwrap();
        assert_eq!(state, BlockState::new("mod:thing"));
        assert_eq!(state.namespace(), "mod");
    }

    #[test]
    fn test_compound_form() {
        let state = BlockState::new("minecraft:lever").with_property("powered", "true");
        let compound = state.to_compound();
        assert_eq!(compound.get_str("Name"), "minecraft:lever");
        assert_eq!(BlockState::from_compound(&compound), Some(state));
        assert_eq!(BlockState::from_compound(&Compound::new()), None);
    }

    #[test]
    fn test_air_variants() {
        assert!(AIR.is_air());
        assert!(BlockState::new("minecraft:cave_air").is_air());
        assert!(!BlockState::new("minecraft:stone").is_air());
        assert_eq!(BlockState::default(), *AIR);
    }
}
