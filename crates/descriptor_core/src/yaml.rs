//! YAML decoding into the raw document tree the loader reads.
//!
//! `serde_json::Value` has no room for YAML tags or integers wider than 64
//! bits, so YAML text is decoded with a dedicated visitor instead. CloudFormation
//! short-form tags become their long form (`!GetAtt Role.Arn` decodes as
//! `{"Fn::GetAtt": "Role.Arn"}`), other tags become a single `!Tag` key, and
//! oversized integers saturate so range checks can still report them.

use std::fmt;

use serde::de::{
    self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde_json::{Map, Number, Value};

/// Tags with a CloudFormation long form of `Fn::<Tag>`.
const FN_SHORT_FORMS: &[&str] = &[
    "Base64",
    "Cidr",
    "FindInMap",
    "GetAtt",
    "GetAZs",
    "ImportValue",
    "Join",
    "Select",
    "Split",
    "Sub",
    "Transform",
    "And",
    "Equals",
    "If",
    "Not",
    "Or",
];

pub(crate) fn from_str(text: &str) -> Result<Value, serde_yaml::Error> {
    serde_yaml::from_str::<RawNode>(text).map(|node| node.0)
}

struct RawNode(Value);

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawNodeVisitor).map(RawNode)
    }
}

struct RawNodeVisitor;

impl<'de> Visitor<'de> for RawNodeVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a YAML node")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Value, E> {
        Ok(Value::Bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Value, E> {
        Ok(Value::from(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Value, E> {
        Ok(Value::from(value))
    }

    fn visit_i128<E: de::Error>(self, value: i128) -> Result<Value, E> {
        let saturated = if value < 0 { i64::MIN } else { i64::MAX };
        Ok(Value::from(i64::try_from(value).unwrap_or(saturated)))
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> Result<Value, E> {
        Ok(Value::from(u64::try_from(value).unwrap_or(u64::MAX)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Value, E> {
        // `.inf` and `.nan` stay visible as text rather than turning into null.
        Ok(Number::from_f64(value).map_or_else(|| Value::String(value.to_string()), Value::Number))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Value, E> {
        Ok(Value::String(value.to_owned()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Value, E> {
        Ok(Value::String(value))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawNode::deserialize(deserializer).map(|node| node.0)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(RawNode(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = Map::new();
        while let Some((RawNode(key), RawNode(value))) = map.next_entry()? {
            object.insert(key_text(key), value);
        }
        Ok(Value::Object(object))
    }

    fn visit_enum<A>(self, data: A) -> Result<Value, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (tag, variant): (String, _) = data.variant()?;
        let RawNode(value) = variant.newtype_variant()?;
        Ok(tagged(&tag, value))
    }
}

/// Non-string mapping keys (`200:`, `true:`) are kept as their text.
fn key_text(key: Value) -> String {
    match key {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn tagged(tag: &str, value: Value) -> Value {
    let key = match tag {
        "Ref" | "Condition" => tag.to_string(),
        _ if FN_SHORT_FORMS.contains(&tag) => format!("Fn::{tag}"),
        _ => format!("!{tag}"),
    };
    let mut object = Map::new();
    object.insert(key, value);
    Value::Object(object)
}

/// A single-key `Ref`, `Condition` or `Fn::*` mapping.
pub(crate) fn is_intrinsic(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let mut keys = object.keys();
    match (keys.next(), keys.next()) {
        (Some(key), None) => key == "Ref" || key == "Condition" || key.starts_with("Fn::"),
        _ => false,
    }
}
