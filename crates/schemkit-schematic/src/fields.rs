//! Lookup helpers that turn absent or mistyped keys into `MissingRequiredField`.

use schemkit_common::{BlockPos, Result, SchemError, Vec3};
use schemkit_nbt::{Compound, List, Tag, TagType};

pub(crate) fn missing(context: &str, field: &str, expected: TagType) -> SchemError {
    SchemError::MissingRequiredField {
        tag: context.to_string(),
        field: field.to_string(),
        expected: expected.name(),
    }
}

pub(crate) fn require_tag<'a>(
    compound: &'a Compound,
    context: &str,
    field: &str,
    expected: TagType,
) -> Result<&'a Tag> {
    match compound.get(field) {
        Some(tag) if tag.tag_type() == expected => Ok(tag),
        _ => Err(missing(context, field, expected)),
    }
}

/// Accepts any integer tag whose value fits an i32
pub(crate) fn require_int(compound: &Compound, context: &str, field: &str) -> Result<i32> {
    optional_int(compound, field).ok_or_else(|| missing(context, field, TagType::Int))
}

pub(crate) fn optional_int(compound: &Compound, field: &str) -> Option<i32> {
    compound
        .get(field)
        .and_then(Tag::as_integer)
        .and_then(|v| i32::try_from(v).ok())
}

pub(crate) fn optional_string(compound: &Compound, field: &str) -> Option<String> {
    compound.get(field).and_then(Tag::as_str).map(str::to_string)
}

pub(crate) fn require_compound<'a>(
    compound: &'a Compound,
    context: &str,
    field: &str,
) -> Result<&'a Compound> {
    compound
        .get_compound(field)
        .ok_or_else(|| missing(context, field, TagType::Compound))
}

pub(crate) fn require_list<'a>(compound: &'a Compound, context: &str, field: &str) -> Result<&'a List> {
    compound
        .get_list(field)
        .ok_or_else(|| missing(context, field, TagType::List))
}

pub(crate) fn require_byte_array<'a>(
    compound: &'a Compound,
    context: &str,
    field: &str,
) -> Result<&'a [i8]> {
    compound
        .get(field)
        .and_then(Tag::as_byte_array)
        .ok_or_else(|| missing(context, field, TagType::ByteArray))
}

pub(crate) fn require_long_array<'a>(
    compound: &'a Compound,
    context: &str,
    field: &str,
) -> Result<&'a [i64]> {
    compound
        .get(field)
        .and_then(Tag::as_long_array)
        .ok_or_else(|| missing(context, field, TagType::LongArray))
}

/// Sizes stored as shorts are unsigned, so `-1` means 65535
pub(crate) fn require_extent(compound: &Compound, context: &str, field: &str) -> Result<u32> {
    match compound.get(field) {
        Some(Tag::Short(v)) => Ok(*v as u16 as u32),
        Some(Tag::Int(v)) if (0..=u16::MAX as i32).contains(v) => Ok(*v as u32),
        _ => Err(missing(context, field, TagType::Short)),
    }
}

pub(crate) fn extent_tag(value: u32, field: &str) -> Result<Tag> {
    u16::try_from(value)
        .map(|v| Tag::Short(v as i16))
        .map_err(|_| SchemError::Unencodable(format!("{} of {} does not fit 16 bits", field, value)))
}

/// Reads a `{x, y, z}` int compound
pub(crate) fn require_xyz(compound: &Compound, context: &str, field: &str) -> Result<BlockPos> {
    let xyz = require_compound(compound, context, field)?;
    let context = format!("{}.{}", context, field);
    Ok(BlockPos::new(
        require_int(xyz, &context, "x")?,
        require_int(xyz, &context, "y")?,
        require_int(xyz, &context, "z")?,
    ))
}

pub(crate) fn xyz_compound(pos: BlockPos) -> Compound {
    let mut compound = Compound::new();
    compound.insert("x", pos.x);
    compound.insert("y", pos.y);
    compound.insert("z", pos.z);
    compound
}

/// Reads a `Pos` int array of three elements
pub(crate) fn require_int_pos(compound: &Compound, context: &str, field: &str) -> Result<BlockPos> {
    let tag = require_tag(compound, context, field, TagType::IntArray)?;
    tag.as_int_array()
        .and_then(BlockPos::from_slice)
        .ok_or_else(|| {
            SchemError::MalformedWire(format!("{}.{} must hold three ints", context, field))
        })
}

/// Reads a `Pos` list of three numbers
pub(crate) fn require_vec3(compound: &Compound, context: &str, field: &str) -> Result<Vec3> {
    let list = require_list(compound, context, field)?;
    match list.numbers().as_deref() {
        Some([x, y, z]) => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(SchemError::MalformedWire(format!(
            "{}.{} must hold three numbers",
            context, field
        ))),
    }
}

pub(crate) fn vec3_list(pos: Vec3) -> Result<List> {
    List::from_tags(vec![
        Tag::Double(pos.x),
        Tag::Double(pos.y),
        Tag::Double(pos.z),
    ])
}

pub(crate) fn compound_list(items: impl IntoIterator<Item = Compound>) -> Result<List> {
    List::from_tags(items.into_iter().map(Tag::Compound).collect())
}

pub(crate) fn string_list(items: &[String]) -> Result<List> {
    List::from_tags(items.iter().map(|s| Tag::String(s.clone())).collect())
}

/// Entries of `compound` whose keys are not in `known`
pub(crate) fn unknown_keys(compound: &Compound, known: &[&str]) -> Compound {
    compound
        .iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, tag)| (key.clone(), tag.clone()))
        .collect()
}

/// Copies entries of `source` into `target` without replacing keys already present
pub(crate) fn merge_missing(target: &mut Compound, source: &Compound) {
    for (key, tag) in source {
        if !target.contains_key(key) {
            target.insert(key.clone(), tag.clone());
        }
    }
}

/// Palette indices must be non-negative integers
pub(crate) fn palette_index(tag: &Tag, context: &str, key: &str) -> Result<u32> {
    tag.as_integer()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            SchemError::MalformedWire(format!(
                "{} entry {:?} has index {}, expected a non-negative int",
                context, key, tag
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_missing_field_names_context() {
        let compound = Compound::new();
        match require_int(&compound, "Schematic", "Version") {
            Err(SchemError::MissingRequiredField {
                tag,
                field,
                expected,
            }) => {
                assert_eq!(tag, "Schematic");
                assert_eq!(field, "Version");
                assert_eq!(expected, "Int");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type_is_missing() {
        let mut compound = Compound::new();
        compound.insert("Palette", 5i32);
        assert_matches!(
            require_compound(&compound, "Schematic", "Palette"),
            Err(SchemError::MissingRequiredField { .. })
        );
    }

    #[test]
    fn test_extent_is_unsigned_short() {
        let mut compound = Compound::new();
        compound.insert("Width", -1i16);
        compound.insert("Height", 300i32);
        assert_eq!(require_extent(&compound, "S", "Width").unwrap(), 65535);
        assert_eq!(require_extent(&compound, "S", "Height").unwrap(), 300);
        assert!(extent_tag(65536, "Width").is_err());
        assert_eq!(extent_tag(65535, "Width").unwrap(), Tag::Short(-1));
    }

    #[test]
    fn test_positions() {
        let mut compound = Compound::new();
        compound.insert("Pos", vec![1i32, 2, 3]);
        compound.insert("Bad", vec![1i32, 2]);
        compound.insert("Motion", vec3_list(Vec3::new(0.5, 1.0, -2.0)).unwrap());
        compound.insert("At", xyz_compound(BlockPos::new(4, 5, 6)));

        assert_eq!(
            require_int_pos(&compound, "E", "Pos").unwrap(),
            BlockPos::new(1, 2, 3)
        );
        assert_matches!(
            require_int_pos(&compound, "E", "Bad"),
            Err(SchemError::MalformedWire(_))
        );
        assert_eq!(
            require_vec3(&compound, "E", "Motion").unwrap(),
            Vec3::new(0.5, 1.0, -2.0)
        );
        assert_eq!(
            require_xyz(&compound, "E", "At").unwrap(),
            BlockPos::new(4, 5, 6)
        );
    }

    #[test]
    fn test_unknown_keys_and_merge() {
        let mut compound = Compound::new();
        compound.insert("Version", 2i32);
        compound.insert("Custom", "kept");
        let extra = unknown_keys(&compound, &["Version"]);
        assert_eq!(extra.len(), 1);
        assert_eq!(extra.get_str("Custom"), "kept");

        let mut target = Compound::new();
        target.insert("Custom", "mine");
        merge_missing(&mut target, &compound);
        assert_eq!(target.get_str("Custom"), "mine");
        assert_eq!(target.get_int("Version"), 2);
    }

    #[test]
    fn test_palette_index_rejects_negative() {
        assert_eq!(palette_index(&Tag::Int(3), "Palette", "a").unwrap(), 3);
        assert_matches!(
            palette_index(&Tag::Int(-1), "Palette", "a"),
            Err(SchemError::MalformedWire(_))
        );
        assert_matches!(
            palette_index(&Tag::String("x".into()), "Palette", "a"),
            Err(SchemError::MalformedWire(_))
        );
    }
}
