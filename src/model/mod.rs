//! # Peripheral Model
//!
//! Arena of typed [`ModelInstance`]s built by the [`loader`], indexed by
//! `(type, id)` and by phandle. The store is frozen once loading finishes;
//! everything downstream only reads it.

pub mod cells;
pub mod loader;

pub use cells::CellReference;
pub use loader::load;

use crate::bindings::{BindingSchema, ScalarValue};
use crate::error::{CompileError, Result};
use crate::tree::RawNode;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Peripheral activation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Okay,
    Disabled,
}

impl Status {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "okay" => Some(Status::Okay),
            "disabled" => Some(Status::Disabled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Okay => "okay",
            Status::Disabled => "disabled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded value of one declared field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(ScalarValue),
    Status(Status),
    Ref(CellReference),
    /// Optional field not present in the node
    Absent,
}

impl FieldValue {
    /// JSON view used by default rendering; references render as their phandle
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Scalar(ScalarValue::String(s)) => Value::from(s.as_str()),
            FieldValue::Scalar(ScalarValue::Number(n)) => Value::from(*n),
            FieldValue::Scalar(ScalarValue::Flag(b)) => Value::from(*b),
            FieldValue::Status(status) => Value::from(status.as_str()),
            FieldValue::Ref(reference) => Value::from(reference.phandle()),
            FieldValue::Absent => Value::Null,
        }
    }
}

/// A typed node
#[derive(Debug, Clone)]
pub struct ModelInstance {
    type_name: String,
    instance_id: String,
    path: String,
    phandle: Option<u32>,
    schema: Arc<BindingSchema>,
    values: Vec<FieldValue>,
}

impl ModelInstance {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn phandle(&self) -> Option<u32> {
        self.phandle
    }

    pub fn schema(&self) -> &BindingSchema {
        &self.schema
    }

    /// Value of a declared field
    pub fn get(&self, field: &str) -> Result<&FieldValue> {
        self.schema
            .field(field)
            .map(|(index, _)| &self.values[index])
            .ok_or_else(|| CompileError::UnknownField {
                schema: self.schema.name().to_string(),
                field: field.to_string(),
            })
    }

    /// Declared fields paired with their values
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.values.iter())
    }

    /// Status of the instance; `None` when its binding declares no status
    pub fn status(&self) -> Option<Status> {
        let (index, _) = self.schema.status_field()?;
        match &self.values[index] {
            FieldValue::Status(status) => Some(*status),
            _ => None,
        }
    }

    /// Bindings without a status field are always active
    pub fn is_active(&self) -> bool {
        self.status().map_or(true, |s| s == Status::Okay)
    }

    /// The pin-control relation, when declared and bound
    pub fn pinctrl(&self) -> Option<&CellReference> {
        let (index, _) = self.schema.pinctrl_field()?;
        match &self.values[index] {
            FieldValue::Ref(reference) => Some(reference),
            _ => None,
        }
    }
}

/// Arena of raw nodes and typed instances
#[derive(Debug, Default)]
pub struct ModelStore {
    nodes: Vec<RawNode>,
    paths: HashMap<String, usize>,
    instances: Vec<ModelInstance>,
    by_key: HashMap<(String, String), usize>,
    by_phandle: HashMap<u32, usize>,
}

impl ModelStore {
    /// Every raw node, in tree walk order
    pub fn raw_nodes(&self) -> &[RawNode] {
        &self.nodes
    }

    pub fn node(&self, path: &str) -> Option<&RawNode> {
        self.paths.get(path).map(|&i| &self.nodes[i])
    }

    /// Every typed instance, in discovery order
    pub fn instances(&self) -> &[ModelInstance] {
        &self.instances
    }

    /// Instances of one binding, in discovery order
    pub fn instances_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a ModelInstance> {
        self.instances
            .iter()
            .filter(move |i| i.type_name == type_name)
    }

    pub fn instance(&self, type_name: &str, instance_id: &str) -> Option<&ModelInstance> {
        self.by_key
            .get(&(type_name.to_string(), instance_id.to_string()))
            .map(|&i| &self.instances[i])
    }

    pub fn by_phandle(&self, phandle: u32) -> Option<&ModelInstance> {
        self.index_of_phandle(phandle).map(|i| &self.instances[i])
    }

    /// Read-only view used by render and pin code
    pub fn peripheral<'a>(&'a self, instance: &'a ModelInstance) -> Peripheral<'a> {
        Peripheral {
            store: self,
            instance,
        }
    }

    pub(crate) fn index_of_phandle(&self, phandle: u32) -> Option<usize> {
        self.by_phandle.get(&phandle).copied()
    }

    pub(crate) fn instance_at(&self, index: usize) -> &ModelInstance {
        &self.instances[index]
    }
}

/// An instance together with the store its references resolve against
#[derive(Clone, Copy)]
pub struct Peripheral<'a> {
    store: &'a ModelStore,
    instance: &'a ModelInstance,
}

impl<'a> Peripheral<'a> {
    pub fn instance(&self) -> &'a ModelInstance {
        self.instance
    }

    pub fn store(&self) -> &'a ModelStore {
        self.store
    }

    pub fn string(&self, field: &str) -> Result<Option<&'a str>> {
        match self.instance.get(field)? {
            FieldValue::Scalar(ScalarValue::String(s)) => Ok(Some(s.as_str())),
            _ => Ok(None),
        }
    }

    pub fn number(&self, field: &str) -> Result<Option<u32>> {
        match self.instance.get(field)? {
            FieldValue::Scalar(ScalarValue::Number(n)) => Ok(Some(*n)),
            _ => Ok(None),
        }
    }

    /// Field as JSON, `null` when absent
    pub fn value(&self, field: &str) -> Result<Value> {
        Ok(self.instance.get(field)?.to_json())
    }

    pub fn reference(&self, field: &str) -> Result<Option<&'a CellReference>> {
        match self.instance.get(field)? {
            FieldValue::Ref(reference) => Ok(Some(reference)),
            _ => Ok(None),
        }
    }

    /// Named cell argument of a reference field, `null` when unbound
    pub fn cell(&self, field: &str, arg: &str) -> Result<Value> {
        Ok(self
            .reference(field)?
            .and_then(|r| r.arg(arg))
            .map_or(Value::Null, Value::from))
    }

    /// Dereference a reference field
    pub fn target(&self, field: &str) -> Result<Option<Peripheral<'a>>> {
        match self.reference(field)? {
            Some(reference) => {
                let instance = reference.target(self.store)?;
                Ok(Some(self.store.peripheral(instance)))
            }
            None => Ok(None),
        }
    }
}

impl fmt::Debug for Peripheral<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Peripheral").field(&self.instance.path).finish()
    }
}
