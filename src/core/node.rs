//! SC-001: Decoded template tree and tolerant value normalization.
//!
//! `Node` is the tagged union every later stage works on. Resolution never
//! mutates a tree in place; it builds a new one. The `as_*` helpers coerce
//! loosely typed template values (numbers in strings, scalars where a list is
//! expected) the way SAM authors actually write them.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Ordered mapping node. Key order is the document order.
pub type Mapping = IndexMap<String, Node>;

/// A numeric scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}

/// One node of a decoded template.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Node>),
    Mapping(Mapping),
}

impl Node {
    /// Build a single-key mapping, the canonical intrinsic call shape.
    pub fn call(name: &str, operand: Node) -> Node {
        let mut map = Mapping::with_capacity(1);
        map.insert(name.to_string(), operand);
        Node::Mapping(map)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Mapping lookup that treats an explicit `null` like an absent key.
    pub fn field(&self, key: &str) -> Option<&Node> {
        self.get(key).filter(|n| !n.is_null())
    }

    /// If this is an intrinsic call shape (single-key mapping), return its parts.
    pub fn as_call(&self) -> Option<(&str, &Node)> {
        let map = self.as_map()?;
        if map.len() != 1 {
            return None;
        }
        map.iter().next().map(|(k, v)| (k.as_str(), v))
    }

    /// Stringify a scalar. `Null` becomes the empty string; containers render
    /// as compact JSON.
    pub fn as_string(&self) -> String {
        match self {
            Node::Null => String::new(),
            Node::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Stringify, falling back when the result would be empty.
    pub fn as_string_or(&self, fallback: &str) -> String {
        let out = self.as_string();
        if out.is_empty() {
            fallback.to_string()
        } else {
            out
        }
    }

    /// Coerce to an integer. Accepts ints, floats (truncated) and numeric strings.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Node::Number(Number::Int(i)) => Some(*i),
            Node::Number(Number::Float(x)) if x.is_finite() => Some(x.trunc() as i64),
            Node::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_int_or(&self, fallback: i64) -> i64 {
        self.as_int().unwrap_or(fallback)
    }

    /// Coerce to a list: sequences as-is, `Null` as empty, any other value
    /// wrapped in a one-element list.
    pub fn to_list(&self) -> Vec<Node> {
        match self {
            Node::Null => Vec::new(),
            Node::Sequence(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Coerce to a list of strings (see [`Node::to_list`]).
    pub fn to_string_list(&self) -> Vec<String> {
        self.to_list().iter().map(Node::as_string).collect()
    }

    /// Convert into a JSON value for typed decoding with serde.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Null => serde_json::Value::Null,
            Node::Bool(b) => serde_json::Value::Bool(*b),
            Node::Number(Number::Int(i)) => serde_json::Value::from(*i),
            Node::Number(Number::Float(x)) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Node::String(s) => serde_json::Value::String(s.clone()),
            Node::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Node::to_json).collect())
            }
            Node::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => Ok(()),
            Node::Bool(b) => write!(f, "{}", b),
            Node::Number(n) => write!(f, "{}", n),
            Node::String(s) => f.write_str(s),
            Node::Sequence(_) | Node::Mapping(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Number(Number::Int(i))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }
}

impl From<Mapping> for Node {
    fn from(map: Mapping) -> Self {
        Node::Mapping(map)
    }
}

/// Append a trailing slash to a non-empty path.
pub fn ensure_trailing_slash(value: &str) -> String {
    if value.is_empty() || value.ends_with('/') {
        value.to_string()
    } else {
        format!("{}/", value)
    }
}

/// Build a mapping node from `(key, value)` pairs. Mostly a test convenience.
pub fn mapping<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Node
where
    K: Into<String>,
    V: Into<Node>,
{
    Node::Mapping(
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sc001_as_string_scalars() {
        assert_eq!(Node::Null.as_string(), "");
        assert_eq!(Node::from("x").as_string(), "x");
        assert_eq!(Node::from(42i64).as_string(), "42");
        assert_eq!(Node::from(true).as_string(), "true");
        assert_eq!(Node::Number(Number::Float(1.5)).as_string(), "1.5");
    }

    #[test]
    fn test_sc001_as_string_containers_render_json() {
        let node = Node::from(vec![Node::from("a"), Node::from(1i64)]);
        assert_eq!(node.as_string(), r#"["a",1]"#);
        let map = mapping([("k", "v")]);
        assert_eq!(map.as_string(), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_sc001_as_string_or_fallback() {
        assert_eq!(Node::Null.as_string_or("dflt"), "dflt");
        assert_eq!(Node::from("").as_string_or("dflt"), "dflt");
        assert_eq!(Node::from("set").as_string_or("dflt"), "set");
    }

    #[test]
    fn test_sc001_as_int_lenient() {
        assert_eq!(Node::from(7i64).as_int(), Some(7));
        assert_eq!(Node::from(" 12 ").as_int(), Some(12));
        assert_eq!(Node::Number(Number::Float(3.9)).as_int(), Some(3));
        assert_eq!(Node::from("abc").as_int(), None);
        assert_eq!(Node::Null.as_int_or(30), 30);
    }

    #[test]
    fn test_sc001_to_list_wraps_scalars() {
        assert_eq!(Node::from("x86_64").to_string_list(), vec!["x86_64"]);
        assert!(Node::Null.to_list().is_empty());
        let seq = Node::from(vec![Node::from("a"), Node::from("b")]);
        assert_eq!(seq.to_string_list(), vec!["a", "b"]);
    }

    #[test]
    fn test_sc001_as_call_single_key_only() {
        let call = Node::call("Ref", Node::from("X"));
        let (name, operand) = call.as_call().unwrap();
        assert_eq!(name, "Ref");
        assert_eq!(operand, &Node::from("X"));

        let two = mapping([("Ref", "X"), ("Other", "Y")]);
        assert!(two.as_call().is_none());
        assert!(Node::from("Ref").as_call().is_none());
    }

    #[test]
    fn test_sc001_field_skips_null() {
        let map = mapping([("A", Node::Null), ("B", Node::from(1i64))]);
        assert!(map.get("A").is_some());
        assert!(map.field("A").is_none());
        assert_eq!(map.field("B"), Some(&Node::from(1i64)));
    }

    #[test]
    fn test_sc001_ensure_trailing_slash() {
        assert_eq!(ensure_trailing_slash("functions/hello"), "functions/hello/");
        assert_eq!(ensure_trailing_slash("functions/hello/"), "functions/hello/");
        assert_eq!(ensure_trailing_slash(""), "");
    }

    #[test]
    fn test_sc001_to_json_nested() {
        let map = mapping([("z", Node::from(1i64)), ("a", Node::from(vec![Node::from(true)]))]);
        let json = map.to_json();
        assert_eq!(json["z"], 1);
        assert_eq!(json["a"][0], true);
    }
}
