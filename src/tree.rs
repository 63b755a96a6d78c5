//! The generic tree-shaped value model
//!
//! [`Tree`] is the intermediate form every conversion passes through: a
//! writer produces one, a reader consumes one, and the text codec in
//! [`crate::text`] maps it to and from bytes. Six kinds of node cover the
//! format: null, booleans, numbers (always `f64`), strings, arrays, and
//! objects. Objects are ordered lists of key/value entries rather than maps,
//! so a derived writer's field order — discriminant tag first, then plan
//! order — survives intact, and duplicate keys are representable (readers
//! take the first occurrence).

/// A single node of the tree-shaped value model.
#[derive(Clone, Debug, PartialEq)]
pub enum Tree {
    Null,
    Bool(bool),
    Num(f64),
    String(String),
    Array(Vec<Tree>),
    Object(Vec<(String, Tree)>),
}

/// The kind of a [`Tree`] node, without its payload; used in error reports
/// to say what was found where something else was expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeKind {
    Null,
    Bool,
    Num,
    String,
    Array,
    Object,
}

impl std::fmt::Display for TreeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TreeKind::Null => "null",
            TreeKind::Bool => "boolean",
            TreeKind::Num => "number",
            TreeKind::String => "string",
            TreeKind::Array => "array",
            TreeKind::Object => "object",
        };
        f.write_str(name)
    }
}

impl Tree {
    pub fn kind(&self) -> TreeKind {
        match self {
            Tree::Null => TreeKind::Null,
            Tree::Bool(_) => TreeKind::Bool,
            Tree::Num(_) => TreeKind::Num,
            Tree::String(_) => TreeKind::String,
            Tree::Array(_) => TreeKind::Array,
            Tree::Object(_) => TreeKind::Object,
        }
    }

    /// The value under `key` if this node is an object containing it; the
    /// first occurrence wins when keys repeat.
    pub fn field(&self, key: &str) -> Option<&Tree> {
        match self {
            Tree::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Tree::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Tree::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Tree]> {
        match self {
            Tree::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Tree)]> {
        match self {
            Tree::Object(entries) => Some(entries),
            _ => None,
        }
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Tree::Bool(b)
    }
}

impl From<f64> for Tree {
    fn from(n: f64) -> Self {
        Tree::Num(n)
    }
}

impl From<i32> for Tree {
    fn from(n: i32) -> Self {
        Tree::Num(f64::from(n))
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::String(s.to_owned())
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Tree::String(s)
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(items: Vec<Tree>) -> Self {
        Tree::Array(items)
    }
}

/// Renders the node in its textual form, identical to
/// [`to_text`](crate::text::to_text).
impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::text::to_text(self))
    }
}

#[cfg(feature = "serde_impls")]
impl serde::Serialize for Tree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{SerializeMap, SerializeSeq};
        match self {
            Tree::Null => serializer.serialize_unit(),
            Tree::Bool(b) => serializer.serialize_bool(*b),
            Tree::Num(n) => serializer.serialize_f64(*n),
            Tree::String(s) => serializer.serialize_str(s),
            Tree::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Tree::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(feature = "serde_impls")]
impl<'de> serde::Deserialize<'de> for Tree {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TreeVisitor;

        impl<'de> serde::de::Visitor<'de> for TreeVisitor {
            type Value = Tree;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a tree value")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Tree, E> {
                Ok(Tree::Null)
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Tree, E> {
                Ok(Tree::Null)
            }

            fn visit_some<D: serde::Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> Result<Tree, D::Error> {
                serde::Deserialize::deserialize(deserializer)
            }

            fn visit_bool<E: serde::de::Error>(self, b: bool) -> Result<Tree, E> {
                Ok(Tree::Bool(b))
            }

            fn visit_i64<E: serde::de::Error>(self, n: i64) -> Result<Tree, E> {
                Ok(Tree::Num(n as f64))
            }

            fn visit_u64<E: serde::de::Error>(self, n: u64) -> Result<Tree, E> {
                Ok(Tree::Num(n as f64))
            }

            fn visit_f64<E: serde::de::Error>(self, n: f64) -> Result<Tree, E> {
                Ok(Tree::Num(n))
            }

            fn visit_str<E: serde::de::Error>(self, s: &str) -> Result<Tree, E> {
                Ok(Tree::String(s.to_owned()))
            }

            fn visit_string<E: serde::de::Error>(self, s: String) -> Result<Tree, E> {
                Ok(Tree::String(s))
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Tree, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Tree::Array(items))
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> Result<Tree, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(Tree::Object(entries))
            }
        }

        deserializer.deserialize_any(TreeVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds_match_payloads() {
        assert_eq!(Tree::Null.kind(), TreeKind::Null);
        assert_eq!(Tree::Num(1.0).kind(), TreeKind::Num);
        assert_eq!(Tree::Object(vec![]).kind(), TreeKind::Object);
        assert_eq!(TreeKind::Bool.to_string(), "boolean");
    }

    #[test]
    fn field_takes_the_first_occurrence() {
        let tree = Tree::Object(vec![
            ("k".to_owned(), Tree::Num(1.0)),
            ("k".to_owned(), Tree::Num(2.0)),
        ]);
        assert_eq!(tree.field("k"), Some(&Tree::Num(1.0)));
        assert_eq!(tree.field("missing"), None);
        assert_eq!(Tree::Null.field("k"), None);
    }

    #[test]
    fn accessors_reject_other_kinds() {
        assert_eq!(Tree::Bool(true).as_bool(), Some(true));
        assert_eq!(Tree::Bool(true).as_num(), None);
        assert_eq!(Tree::from("s").as_str(), Some("s"));
        assert_eq!(
            Tree::Array(vec![Tree::Null]).as_array().map(<[_]>::len),
            Some(1)
        );
    }

    #[test]
    fn display_matches_the_text_codec() {
        let tree = Tree::Object(vec![("n".to_owned(), Tree::from(3))]);
        assert_eq!(tree.to_string(), r#"{"n":3}"#);
    }
}
