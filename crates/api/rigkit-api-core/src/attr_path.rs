//! AttrPath parsing and formatting.
//!
//! Grammar (mirrors the host's flat namespace convention):
//!   namespace:...:node.attribute[.sub]
//! - ':' separates namespace segments
//! - The last ':'-separated segment holds the node name and optional '.'-separated attribute fields
//!   Examples:
//!   "SingleJointSegment__arm:root_joint.translateX" -> namespaces=["SingleJointSegment__arm"], node="root_joint", fields=["translateX"]
//!   "Group__legs.translate" -> namespaces=[], node="Group__legs", fields=["translate"]
//!   "hook:pointConstraint.target[0].targetTranslate" -> fields=["target[0]", "targetTranslate"]
//!
//! A path without fields names a node rather than an attribute.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttrPathError {
    #[error("empty attribute path")]
    Empty,
    #[error("invalid attribute path '{path}': {reason}")]
    Invalid { path: String, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrPath {
    /// Namespace segments preceding the node (may be empty)
    pub namespaces: Vec<String>,
    /// Short node name
    pub node: String,
    /// Ordered attribute fields on the node (may be empty)
    pub fields: Vec<String>,
}

impl AttrPath {
    /// Construct an AttrPath from components.
    pub fn new(namespaces: Vec<String>, node: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            namespaces,
            node: node.into(),
            fields,
        }
    }

    /// Build a path from a full node name (`ns:node`) and a dotted attribute name.
    pub fn attr(node_name: &str, attribute: &str) -> Result<Self, AttrPathError> {
        Self::parse(&format!("{node_name}.{attribute}"))
    }

    /// Parse a path string according to the grammar described above.
    pub fn parse(s: &str) -> Result<Self, AttrPathError> {
        if s.is_empty() {
            return Err(AttrPathError::Empty);
        }
        let invalid = |reason: &'static str| AttrPathError::Invalid {
            path: s.to_string(),
            reason,
        };
        if s.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }

        // Namespaces may not contain '.', so split the node part off first.
        let (node_part, attr_part) = match s.find('.') {
            Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
            None => (s, None),
        };

        let mut segments: Vec<&str> = node_part.split(':').collect();
        if segments.iter().any(|seg| seg.is_empty()) {
            return Err(invalid("empty namespace or node segment"));
        }
        let node = match segments.pop() {
            Some(node) => node.to_string(),
            None => return Err(invalid("missing node name")),
        };

        let fields: Vec<String> = match attr_part {
            Some(attrs) => attrs.split('.').map(str::to_string).collect(),
            None => Vec::new(),
        };
        if fields.iter().any(|f| f.is_empty()) {
            return Err(invalid("empty attribute field"));
        }
        if fields.iter().any(|f| f.contains(':')) {
            return Err(invalid("attribute field contains ':'"));
        }

        Ok(AttrPath {
            namespaces: segments.into_iter().map(str::to_string).collect(),
            node,
            fields,
        })
    }

    /// Full node name including namespaces (`ns:node`).
    pub fn node_name(&self) -> String {
        if self.namespaces.is_empty() {
            self.node.clone()
        } else {
            format!("{}:{}", self.namespaces.join(":"), self.node)
        }
    }

    /// Dotted attribute name (`target[0].targetTranslate`), empty for node paths.
    pub fn attribute(&self) -> String {
        self.fields.join(".")
    }

    /// True when the path names an attribute rather than a node.
    pub fn is_attribute(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Leading namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespaces.first().map(String::as_str)
    }

    /// Same attribute on a different node.
    pub fn with_node_name(&self, node_name: &str) -> Result<Self, AttrPathError> {
        Self::attr(node_name, &self.attribute())
    }
}

/// Split `ns:node` into its leading namespace and the remainder.
/// Returns `None` for names living in the root namespace.
pub fn split_namespace(name: &str) -> Option<(&str, &str)> {
    name.split_once(':')
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.node_name())?;
        for field in &self.fields {
            write!(f, ".{field}")?;
        }
        Ok(())
    }
}

impl FromStr for AttrPath {
    type Err = AttrPathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttrPath::parse(s)
    }
}

// Serde support: serialize as string, deserialize from string
impl Serialize for AttrPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AttrPath {
    fn deserialize<D>(deserializer: D) -> Result<AttrPath, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AttrPath::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_namespaced_attribute() {
        let p = AttrPath::parse("SingleJointSegment__arm:root_joint.translateX").unwrap();
        assert_eq!(p.namespaces, vec!["SingleJointSegment__arm".to_string()]);
        assert_eq!(p.node, "root_joint");
        assert_eq!(p.fields, vec!["translateX".to_string()]);
        assert_eq!(p.node_name(), "SingleJointSegment__arm:root_joint");
        assert_eq!(p.to_string(), "SingleJointSegment__arm:root_joint.translateX");
    }

    #[test]
    fn parse_node_only() {
        let p = AttrPath::parse("Group__legs").unwrap();
        assert!(p.namespaces.is_empty());
        assert!(!p.is_attribute());
        assert_eq!(p.to_string(), "Group__legs");
    }

    #[test]
    fn parse_compound_plug() {
        let p = AttrPath::parse("m:hook_pointConstraint.target[0].targetTranslate").unwrap();
        assert_eq!(p.attribute(), "target[0].targetTranslate");
        assert_eq!(p.namespace(), Some("m"));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(AttrPath::parse("").is_err());
        assert!(AttrPath::parse("a b.c").is_err());
        assert!(AttrPath::parse("ns::node.t").is_err());
        assert!(AttrPath::parse("node..t").is_err());
        assert!(AttrPath::parse(":node").is_err());
    }

    #[test]
    fn split_namespace_strips_leading_segment() {
        assert_eq!(split_namespace("a__b:joint"), Some(("a__b", "joint")));
        assert_eq!(split_namespace("Group__x"), None);
    }
}
