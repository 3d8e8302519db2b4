use crate::tag::{Compound, Tag};
use serde_json::{Map, Number, Value};

/// Renders a tag tree as plain JSON. Numeric widths are lost; non-finite floats become null.
pub fn to_json(tag: &Tag) -> Value {
    match tag {
        Tag::End => Value::Null,
        Tag::Byte(v) => Value::from(*v),
        Tag::Short(v) => Value::from(*v),
        Tag::Int(v) => Value::from(*v),
        Tag::Long(v) => Value::from(*v),
        Tag::Float(v) => float(*v as f64),
        Tag::Double(v) => float(*v),
        Tag::ByteArray(v) => Value::Array(v.iter().map(|&b| Value::from(b)).collect()),
        Tag::String(s) => Value::String(s.clone()),
        Tag::List(list) => Value::Array(list.iter().map(to_json).collect()),
        Tag::Compound(compound) => compound_to_json(compound),
        Tag::IntArray(v) => Value::Array(v.iter().map(|&i| Value::from(i)).collect()),
        Tag::LongArray(v) => Value::Array(v.iter().map(|&l| Value::from(l)).collect()),
    }
}

pub fn compound_to_json(compound: &Compound) -> Value {
    let obj: Map<String, Value> = compound
        .iter()
        .map(|(k, v)| (k.clone(), to_json(v)))
        .collect();
    Value::Object(obj)
}

fn float(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::List;
    use serde_json::json;

    #[test]
    fn test_nested_json() {
        let mut compound = Compound::new();
        compound.insert("Id", "minecraft:chest");
        compound.insert("Pos", vec![1i32, 2, 3]);
        compound.insert(
            "Motion",
            List::from_tags(vec![Tag::Double(0.5), Tag::Double(f64::NAN)]).unwrap(),
        );
        compound.insert("Count", 3i8);

        assert_eq!(
            compound_to_json(&compound),
            json!({
                "Id": "minecraft:chest",
                "Pos": [1, 2, 3],
                "Motion": [0.5, null],
                "Count": 3
            })
        );
    }
}
