use schemkit_common::{Result, SchemError};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// Wire discriminator of a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TagType {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagType {
    pub fn from_id(id: u8) -> Option<TagType> {
        Some(match id {
            0 => TagType::End,
            1 => TagType::Byte,
            2 => TagType::Short,
            3 => TagType::Int,
            4 => TagType::Long,
            5 => TagType::Float,
            6 => TagType::Double,
            7 => TagType::ByteArray,
            8 => TagType::String,
            9 => TagType::List,
            10 => TagType::Compound,
            11 => TagType::IntArray,
            12 => TagType::LongArray,
            _ => return None,
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            TagType::End => "End",
            TagType::Byte => "Byte",
            TagType::Short => "Short",
            TagType::Int => "Int",
            TagType::Long => "Long",
            TagType::Float => "Float",
            TagType::Double => "Double",
            TagType::ByteArray => "ByteArray",
            TagType::String => "String",
            TagType::List => "List",
            TagType::Compound => "Compound",
            TagType::IntArray => "IntArray",
            TagType::LongArray => "LongArray",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(List),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

/// Floats compare by bit pattern so that a NaN payload equals itself after a round trip
impl PartialEq for Tag {
    fn eq(&self, other: &Tag) -> bool {
        match (self, other) {
            (Tag::End, Tag::End) => true,
            (Tag::Byte(a), Tag::Byte(b)) => a == b,
            (Tag::Short(a), Tag::Short(b)) => a == b,
            (Tag::Int(a), Tag::Int(b)) => a == b,
            (Tag::Long(a), Tag::Long(b)) => a == b,
            (Tag::Float(a), Tag::Float(b)) => a.to_bits() == b.to_bits(),
            (Tag::Double(a), Tag::Double(b)) => a.to_bits() == b.to_bits(),
            (Tag::ByteArray(a), Tag::ByteArray(b)) => a == b,
            (Tag::String(a), Tag::String(b)) => a == b,
            (Tag::List(a), Tag::List(b)) => a == b,
            (Tag::Compound(a), Tag::Compound(b)) => a == b,
            (Tag::IntArray(a), Tag::IntArray(b)) => a == b,
            (Tag::LongArray(a), Tag::LongArray(b)) => a == b,
            _ => false,
        }
    }
}

impl Tag {
    pub fn tag_type(&self) -> TagType {
        match self {
            Tag::End => TagType::End,
            Tag::Byte(_) => TagType::Byte,
            Tag::Short(_) => TagType::Short,
            Tag::Int(_) => TagType::Int,
            Tag::Long(_) => TagType::Long,
            Tag::Float(_) => TagType::Float,
            Tag::Double(_) => TagType::Double,
            Tag::ByteArray(_) => TagType::ByteArray,
            Tag::String(_) => TagType::String,
            Tag::List(_) => TagType::List,
            Tag::Compound(_) => TagType::Compound,
            Tag::IntArray(_) => TagType::IntArray,
            Tag::LongArray(_) => TagType::LongArray,
        }
    }

    pub fn get_type_id(&self) -> u8 {
        self.tag_type().id()
    }

    /// The zero value of a tag type
    pub fn default_for(tag_type: TagType) -> Tag {
        match tag_type {
            TagType::End => Tag::End,
            TagType::Byte => Tag::Byte(0),
            TagType::Short => Tag::Short(0),
            TagType::Int => Tag::Int(0),
            TagType::Long => Tag::Long(0),
            TagType::Float => Tag::Float(0.0),
            TagType::Double => Tag::Double(0.0),
            TagType::ByteArray => Tag::ByteArray(Vec::new()),
            TagType::String => Tag::String(String::new()),
            TagType::List => Tag::List(List::new()),
            TagType::Compound => Tag::Compound(Compound::new()),
            TagType::IntArray => Tag::IntArray(Vec::new()),
            TagType::LongArray => Tag::LongArray(Vec::new()),
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Tag::Byte(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Tag::Short(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Tag::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[i8]> {
        match self {
            Tag::ByteArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&[i32]> {
        match self {
            Tag::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            Tag::LongArray(v) => Some(v),
            _ => None,
        }
    }

    /// Any integral variant widened to i64. Schematic writers disagree on whether sizes are
    /// shorts or ints, so readers accept both.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Tag::Byte(n) => Some(*n as i64),
            Tag::Short(n) => Some(*n as i64),
            Tag::Int(n) => Some(*n as i64),
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Tag::Float(n) => Some(*n as f64),
            Tag::Double(n) => Some(*n),
            other => other.as_integer().map(|n| n as f64),
        }
    }
}

macro_rules! tag_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Tag {
                fn from(value: $ty) -> Self {
                    Tag::$variant(value)
                }
            }
        )*
    };
}

tag_from! {
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Vec<i8> => ByteArray,
    String => String,
    List => List,
    Compound => Compound,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::String(value.to_string())
    }
}

impl From<bool> for Tag {
    fn from(value: bool) -> Self {
        Tag::Byte(value as i8)
    }
}

/// Native values that can be read out of a single tag variant
pub trait FromTag: Sized {
    const TAG_TYPE: TagType;

    fn from_tag(tag: &Tag) -> Option<Self>;
}

macro_rules! from_tag {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromTag for $ty {
                const TAG_TYPE: TagType = TagType::$variant;

                fn from_tag(tag: &Tag) -> Option<Self> {
                    match tag {
                        Tag::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_tag! {
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Vec<i8> => ByteArray,
    String => String,
    List => List,
    Compound => Compound,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
}

/// Homogeneous list of tags. The element type is fixed by the first element pushed, or by
/// the element type byte read from the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct List {
    element_type: Option<TagType>,
    items: Vec<Tag>,
}

impl List {
    pub fn new() -> Self {
        List::default()
    }

    /// An empty list that already carries an element type, as read from the wire
    pub fn with_element_type(element_type: TagType) -> Self {
        List {
            element_type: match element_type {
                TagType::End => None,
                other => Some(other),
            },
            items: Vec::new(),
        }
    }

    pub fn from_tags(tags: Vec<Tag>) -> Result<Self> {
        let mut list = List::new();
        list.items.reserve(tags.len());
        for tag in tags {
            list.push(tag)?;
        }
        Ok(list)
    }

    pub fn element_type(&self) -> Option<TagType> {
        self.element_type
    }

    pub fn push(&mut self, tag: impl Into<Tag>) -> Result<()> {
        let tag = tag.into();
        let found = tag.tag_type();
        if found == TagType::End {
            return Err(SchemError::TypeMismatch {
                expected: self.element_type.map_or("any non-End tag", TagType::name),
                found: found.name(),
            });
        }
        match self.element_type {
            Some(expected) if expected != found => {
                return Err(SchemError::TypeMismatch {
                    expected: expected.name(),
                    found: found.name(),
                })
            }
            Some(_) => {}
            None => self.element_type = Some(found),
        }
        self.items.push(tag);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Tag> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.items.iter()
    }

    /// Iterates the compound elements, skipping anything else
    pub fn compounds(&self) -> impl Iterator<Item = &Compound> {
        self.items.iter().filter_map(Tag::as_compound)
    }

    /// All elements as f64 when every element is numeric
    pub fn numbers(&self) -> Option<Vec<f64>> {
        self.items.iter().map(Tag::as_number).collect()
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for List {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// String keyed map of tags. Keys are kept sorted so encoding is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    entries: BTreeMap<String, Tag>,
}

macro_rules! typed_getter {
    ($($name:ident -> $ty:ty = $variant:ident, $zero:expr;)*) => {
        $(
            /// Returns the zero value when the key is absent or holds another variant
            pub fn $name(&self, key: &str) -> $ty {
                match self.entries.get(key) {
                    Some(Tag::$variant(v)) => *v,
                    _ => $zero,
                }
            }
        )*
    };
}

impl Compound {
    pub fn new() -> Self {
        Compound::default()
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, tag: impl Into<Tag>) -> Option<Tag> {
        self.entries.insert(key.into(), tag.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Tag> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Moves every entry of `other` into this compound, overwriting existing keys
    pub fn extend(&mut self, other: Compound) {
        self.entries.extend(other.entries);
    }

    /// Fails with `TypeMismatch` when the key exists with another variant
    pub fn try_get<T: FromTag>(&self, key: &str) -> Result<Option<T>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(tag) => T::from_tag(tag).map(Some).ok_or(SchemError::TypeMismatch {
                expected: T::TAG_TYPE.name(),
                found: tag.tag_type().name(),
            }),
        }
    }

    typed_getter! {
        get_byte -> i8 = Byte, 0;
        get_short -> i16 = Short, 0;
        get_int -> i32 = Int, 0;
        get_long -> i64 = Long, 0;
        get_float -> f32 = Float, 0.0;
        get_double -> f64 = Double, 0.0;
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get_byte(key) != 0
    }

    pub fn get_str(&self, key: &str) -> &str {
        self.entries.get(key).and_then(Tag::as_str).unwrap_or("")
    }

    pub fn get_byte_array(&self, key: &str) -> &[i8] {
        self.entries
            .get(key)
            .and_then(Tag::as_byte_array)
            .unwrap_or(&[])
    }

    pub fn get_int_array(&self, key: &str) -> &[i32] {
        self.entries
            .get(key)
            .and_then(Tag::as_int_array)
            .unwrap_or(&[])
    }

    pub fn get_long_array(&self, key: &str) -> &[i64] {
        self.entries
            .get(key)
            .and_then(Tag::as_long_array)
            .unwrap_or(&[])
    }

    pub fn get_compound(&self, key: &str) -> Option<&Compound> {
        self.entries.get(key).and_then(Tag::as_compound)
    }

    pub fn get_list(&self, key: &str) -> Option<&List> {
        self.entries.get(key).and_then(Tag::as_list)
    }
}

impl FromIterator<(String, Tag)> for Compound {
    fn from_iter<I: IntoIterator<Item = (String, Tag)>>(iter: I) -> Self {
        Compound {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Compound {
    type Item = (&'a String, &'a Tag);
    type IntoIter = btree_map::Iter<'a, String, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Compound {
    type Item = (String, Tag);
    type IntoIter = btree_map::IntoIter<String, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A tag together with its name, the unit a file root is framed as
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTag {
    pub name: String,
    pub tag: Tag,
}

impl NamedTag {
    pub fn new(name: impl Into<String>, tag: impl Into<Tag>) -> Self {
        NamedTag {
            name: name.into(),
            tag: tag.into(),
        }
    }
}
