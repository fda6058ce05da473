//! # Property Tree Adapter
//!
//! The compiler does not decode DTB containers itself. A decoder hands over a
//! walk of [`SourceNode`]s (path, ordered properties) through the
//! [`TreeWalk`] trait, and [`adapt`] turns that walk into the uniform
//! [`RawNode`] records the loader consumes.

use crate::error::{CompileError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Property names that carry a node's phandle
const PHANDLE_PROPERTIES: &[&str] = &["phandle", "linux,phandle"];

/// One raw scalar of a property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// 32-bit cell
    Int(u32),
    /// String
    Str(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Int(v) => write!(f, "<{:#x}>", v),
            RawValue::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// A property as delivered by the tree decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProperty {
    pub name: String,
    /// Ordered values. Empty for valueless (boolean) properties.
    #[serde(default, deserialize_with = "one_or_many")]
    pub values: Vec<RawValue>,
}

/// A node as delivered by the tree decoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    pub path: String,
    #[serde(default)]
    pub properties: Vec<SourceProperty>,
}

impl SourceNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_phandle(self, phandle: u32) -> Self {
        self.with_cells("phandle", &[phandle])
    }

    pub fn with_cells(mut self, name: &str, cells: &[u32]) -> Self {
        self.properties.push(SourceProperty {
            name: name.to_string(),
            values: cells.iter().copied().map(RawValue::Int).collect(),
        });
        self
    }

    pub fn with_str(mut self, name: &str, value: &str) -> Self {
        self.properties.push(SourceProperty {
            name: name.to_string(),
            values: vec![RawValue::Str(value.to_string())],
        });
        self
    }

    pub fn with_flag(mut self, name: &str) -> Self {
        self.properties.push(SourceProperty {
            name: name.to_string(),
            values: Vec::new(),
        });
        self
    }
}

/// Anything that can walk a decoded device tree in path order
pub trait TreeWalk {
    fn walk(&self) -> Box<dyn Iterator<Item = SourceNode> + '_>;
}

/// An in-memory decoded tree, also loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTree {
    nodes: Vec<SourceNode>,
}

impl RawTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: SourceNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<SourceNode> for RawTree {
    fn from_iter<I: IntoIterator<Item = SourceNode>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl TreeWalk for RawTree {
    fn walk(&self) -> Box<dyn Iterator<Item = SourceNode> + '_> {
        Box::new(self.nodes.iter().cloned())
    }
}

/// A node of the property tree, immutable once adapted
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    path: String,
    phandle: Option<u32>,
    type_name: Option<String>,
    instance_id: Option<String>,
    properties: Vec<(String, Vec<RawValue>)>,
}

impl RawNode {
    /// Adapt one decoded node, extracting its phandle and unit name
    pub fn from_source(node: SourceNode) -> Result<Self> {
        let mut phandle = None;
        for prop in &node.properties {
            if PHANDLE_PROPERTIES.contains(&prop.name.as_str()) {
                match prop.values.as_slice() {
                    [RawValue::Int(v)] => phandle = Some(*v),
                    other => {
                        return Err(CompileError::InvalidPropertyValue {
                            field: prop.name.clone(),
                            path: node.path.clone(),
                            expected: "a single cell".to_string(),
                            actual: describe_values(other),
                        })
                    }
                }
            }
        }

        let (type_name, instance_id) = match parse_unit_name(last_segment(&node.path)) {
            Some((t, i)) => (Some(t.to_string()), Some(i.to_string())),
            None => (None, None),
        };

        Ok(Self {
            path: node.path,
            phandle,
            type_name,
            instance_id,
            properties: node
                .properties
                .into_iter()
                .map(|p| (p.name, p.values))
                .collect(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn phandle(&self) -> Option<u32> {
        self.phandle
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &[RawValue])> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Look up a property by its name as written in the tree
    pub fn property(&self, name: &str) -> Option<&[RawValue]> {
        self.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// Adapt a whole walk, enforcing phandle uniqueness
pub fn adapt(tree: &dyn TreeWalk) -> Result<Vec<RawNode>> {
    let mut nodes = Vec::new();
    let mut seen: HashMap<u32, usize> = HashMap::new();

    for source in tree.walk() {
        let node = RawNode::from_source(source)?;
        if let Some(phandle) = node.phandle {
            if let Some(&first) = seen.get(&phandle) {
                let first: &RawNode = &nodes[first];
                return Err(CompileError::DuplicatePhandle {
                    phandle,
                    first: first.path.clone(),
                    second: node.path,
                });
            }
            seen.insert(phandle, nodes.len());
        }
        nodes.push(node);
    }

    tracing::debug!("[DTBC] Adapted {} tree nodes", nodes.len());
    Ok(nodes)
}

/// Split a `<type>@<id>` unit name
pub fn parse_unit_name(segment: &str) -> Option<(&str, &str)> {
    let (type_name, id) = segment.split_once('@')?;
    let valid_type = !type_name.is_empty()
        && type_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_type || id.is_empty() {
        return None;
    }
    Some((type_name, id))
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub(crate) fn describe_values(values: &[RawValue]) -> String {
    match values {
        [] => "no value".to_string(),
        [single] => single.to_string(),
        many => format!(
            "[{}]",
            many.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<RawValue>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(RawValue),
        Many(Vec<RawValue>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(v) => vec![v],
        OneOrMany::Many(v) => v,
    })
}
