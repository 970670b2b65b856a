//! SC-002: Tagged YAML decoding.
//!
//! Parses template text with serde_yaml_ng and rewrites CloudFormation
//! short-form tags into their long-form call maps, so `!Ref X` and
//! `{"Ref": "X"}` are indistinguishable to the resolver.

use super::error::DecodeError;
use super::node::{Mapping, Node, Number};
use serde_yaml_ng::value::TaggedValue;
use serde_yaml_ng::Value;

/// Long-form call name for a short-form tag applied to a scalar.
fn scalar_call_name(tag: &str) -> Option<&'static str> {
    match tag {
        "Ref" => Some("Ref"),
        "Sub" => Some("Fn::Sub"),
        "GetAtt" => Some("Fn::GetAtt"),
        "ImportValue" => Some("Fn::ImportValue"),
        "Condition" => Some("Condition"),
        _ => None,
    }
}

/// Long-form call name for a short-form tag applied to a sequence.
fn sequence_call_name(tag: &str) -> Option<&'static str> {
    match tag {
        "Join" => Some("Fn::Join"),
        "Sub" => Some("Fn::Sub"),
        "GetAtt" => Some("Fn::GetAtt"),
        "If" => Some("Fn::If"),
        "Equals" => Some("Fn::Equals"),
        "And" => Some("Fn::And"),
        "Or" => Some("Fn::Or"),
        "Not" => Some("Fn::Not"),
        "Select" => Some("Fn::Select"),
        "Split" => Some("Fn::Split"),
        _ => None,
    }
}

/// Long-form call name for a short-form tag applied to a mapping.
fn mapping_call_name(tag: &str) -> Option<&'static str> {
    match tag {
        "Sub" => Some("Fn::Sub"),
        _ => None,
    }
}

/// Decode a template document into a mapping tree.
pub fn decode_template(content: &str) -> Result<Mapping, DecodeError> {
    if content.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    let value: Value = serde_yaml_ng::from_str(content)?;
    match decode_value(&value) {
        Node::Mapping(map) => Ok(map),
        Node::Null => Err(DecodeError::Empty),
        other => Err(DecodeError::NonMappingRoot(kind_name(&other))),
    }
}

/// Decode one YAML value, canonicalizing any short-form tags.
pub fn decode_value(value: &Value) -> Node {
    match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(*b),
        Value::Number(n) => decode_number(n),
        Value::String(s) => Node::String(s.clone()),
        Value::Sequence(items) => Node::Sequence(items.iter().map(decode_value).collect()),
        Value::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (k, v) in map {
                let key = match decode_key(k) {
                    Some(key) if !key.is_empty() => key,
                    _ => continue,
                };
                out.insert(key, decode_value(v));
            }
            Node::Mapping(out)
        }
        Value::Tagged(tagged) => decode_tagged(tagged),
    }
}

fn decode_tagged(tagged: &TaggedValue) -> Node {
    let tag = tagged.tag.to_string();
    let name = tag.trim_start_matches('!');
    let inner = decode_value(&tagged.value);
    let call = match &inner {
        Node::Sequence(_) => sequence_call_name(name),
        Node::Mapping(_) => mapping_call_name(name),
        _ => scalar_call_name(name),
    };
    match call {
        Some(call) => Node::call(call, inner),
        None => {
            tracing::debug!(tag = %tag, "unsupported tag, keeping untagged value");
            inner
        }
    }
}

fn decode_number(n: &serde_yaml_ng::Number) -> Node {
    if let Some(i) = n.as_i64() {
        Node::Number(Number::Int(i))
    } else if let Some(x) = n.as_f64() {
        Node::Number(Number::Float(x))
    } else {
        Node::String(n.to_string())
    }
}

fn decode_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => decode_key(&tagged.value),
        _ => None,
    }
}

fn kind_name(node: &Node) -> &'static str {
    match node {
        Node::Null => "null",
        Node::Bool(_) => "boolean",
        Node::Number(_) => "number",
        Node::String(_) => "string",
        Node::Sequence(_) => "sequence",
        Node::Mapping(_) => "mapping",
    }
}
