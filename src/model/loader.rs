//! # Model Instantiation
//!
//! Two passes over the adapted tree:
//!
//! 1. **Generic materialization** - every node whose last path segment is a
//!    `<type>@<id>` unit name is recorded as-is.
//! 2. **Typed materialization** - recorded nodes with a registered binding
//!    become [`ModelInstance`]s. Reference fields are decoded eagerly against
//!    the target binding's cell declaration; dereferencing waits until
//!    [`CellReference::target`] is called.
//!
//! Phandles may point forward in walk order, which is why pass 2 only starts
//! once pass 1 has seen every node.

use super::{CellReference, FieldValue, ModelInstance, ModelStore, Status};
use crate::bindings::{BindingRegistry, BindingSchema, FieldDecl, FieldKind, Presence, ScalarKind, ScalarValue};
use crate::error::{CompileError, Result};
use crate::tree::{describe_values, RawNode, RawValue};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Build the model store from adapted raw nodes
pub fn load(registry: &BindingRegistry, nodes: Vec<RawNode>) -> Result<ModelStore> {
    let mut store = ModelStore::default();
    for (index, node) in nodes.iter().enumerate() {
        store.paths.insert(node.path().to_string(), index);
    }
    store.nodes = nodes;

    // Pass 1: generic materialization
    let recorded: Vec<usize> = store
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.type_name().is_some())
        .map(|(index, _)| index)
        .collect();
    let phandle_types: HashMap<u32, Option<String>> = store
        .nodes
        .iter()
        .filter_map(|node| {
            node.phandle()
                .map(|p| (p, node.type_name().map(str::to_lowercase)))
        })
        .collect();
    tracing::info!(
        "[DTBC] Pass 1: recorded {} of {} nodes",
        recorded.len(),
        store.nodes.len()
    );

    // Pass 2: typed materialization
    let mut loader = Loader {
        registry,
        phandle_types: &phandle_types,
        claims: HashMap::new(),
    };
    let mut instances: Vec<ModelInstance> = Vec::new();
    let mut by_key: HashMap<(String, String), usize> = HashMap::new();
    let mut by_phandle = HashMap::new();

    for &index in &recorded {
        let node = &store.nodes[index];
        let (Some(type_name), Some(instance_id)) = (node.type_name(), node.instance_id()) else {
            continue;
        };
        let type_name = type_name.to_lowercase();
        let Some(schema) = registry.resolve(&type_name) else {
            tracing::debug!("[DTBC] No binding for {}, skipping", node.path());
            continue;
        };

        let instance = loader.instantiate(schema, node)?;
        let key = (type_name, instance_id.to_string());
        if let Some(&existing) = by_key.get(&key) {
            let existing = &instances[existing];
            return Err(CompileError::DuplicateInstance {
                key: format!("{}@{}", key.0, key.1),
                first: existing.path.clone(),
                second: node.path().to_string(),
            });
        }

        let position = instances.len();
        by_key.insert(key, position);
        if let Some(phandle) = instance.phandle {
            by_phandle.insert(phandle, position);
        }
        tracing::debug!("[DTBC] Instantiated {} as '{}'", node.path(), schema.name());
        instances.push(instance);
    }

    tracing::info!("[DTBC] Pass 2: instantiated {} typed nodes", instances.len());

    store.instances = instances;
    store.by_key = by_key;
    store.by_phandle = by_phandle;
    Ok(store)
}

/// Property keys as field names: no leading `#`, separators become `_`
pub fn normalize_key(key: &str) -> String {
    key.trim_start_matches('#')
        .chars()
        .map(|c| match c {
            '-' | ',' | '.' => '_',
            other => other,
        })
        .collect()
}

struct Loader<'a> {
    registry: &'a BindingRegistry,
    phandle_types: &'a HashMap<u32, Option<String>>,
    /// Exclusive targets already claimed, with the claiming `path:field`
    claims: HashMap<(String, u32), String>,
}

impl Loader<'_> {
    fn instantiate(&mut self, schema: &Arc<BindingSchema>, node: &RawNode) -> Result<ModelInstance> {
        let mut properties: HashMap<String, (&str, &[RawValue])> = HashMap::new();
        for (key, values) in node.properties() {
            match properties.entry(normalize_key(key)) {
                Entry::Occupied(entry) => {
                    return Err(CompileError::InvalidPropertyValue {
                        field: entry.key().clone(),
                        path: node.path().to_string(),
                        expected: "a single property per field".to_string(),
                        actual: format!("both '{}' and '{}'", entry.get().0, key),
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert((key, values));
                }
            }
        }

        let mut values = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let value = match properties.get(&field.name) {
                Some((_, raw)) => self.decode(schema, field, raw, node)?,
                None => missing(field, node)?,
            };
            values.push(value);
        }

        Ok(ModelInstance {
            type_name: schema.type_name(),
            instance_id: node.instance_id().unwrap_or_default().to_string(),
            path: node.path().to_string(),
            phandle: node.phandle(),
            schema: Arc::clone(schema),
            values,
        })
    }

    fn decode(
        &mut self,
        schema: &BindingSchema,
        field: &FieldDecl,
        raw: &[RawValue],
        node: &RawNode,
    ) -> Result<FieldValue> {
        match &field.kind {
            FieldKind::Scalar(kind) => decode_scalar(*kind, field, raw, node),
            FieldKind::Status => match raw {
                [RawValue::Str(s)] => Status::parse(s).map(FieldValue::Status).ok_or_else(|| {
                    CompileError::InvalidStatusValue {
                        path: node.path().to_string(),
                        value: s.clone(),
                    }
                }),
                other => Err(CompileError::InvalidStatusValue {
                    path: node.path().to_string(),
                    value: describe_values(other),
                }),
            },
            FieldKind::PhandleRef(spec) => {
                let target = self.registry.resolve(&spec.target).ok_or_else(|| {
                    CompileError::InvalidCellReference {
                        path: node.path().to_string(),
                        field: field.name.clone(),
                        expected: format!("a registered binding '{}'", spec.target),
                        actual: "no such binding".to_string(),
                    }
                })?;

                let reference = CellReference::decode(&field.name, spec, target, raw)
                    .map_err(|e| e.at(node.path()))?;
                let Some(reference) = reference else {
                    // A pin role bound to the null phandle has no pin yet
                    if schema.is_pinctrl() {
                        return Ok(FieldValue::Absent);
                    }
                    return missing(field, node);
                };

                match self.phandle_types.get(&reference.phandle()) {
                    Some(actual) if actual.as_deref() != Some(spec.target.as_str()) => {
                        return Err(CompileError::InvalidCellReference {
                            path: node.path().to_string(),
                            field: field.name.clone(),
                            expected: spec.target.clone(),
                            actual: actual.clone().unwrap_or_else(|| "an untyped node".to_string()),
                        });
                    }
                    Some(_) => {}
                    None => tracing::debug!(
                        "[DTBC] {}: '{}' points at unknown phandle {}",
                        node.path(),
                        field.name,
                        reference.phandle()
                    ),
                }

                if spec.unique || target.cells().unique {
                    let claim = (spec.target.clone(), reference.phandle());
                    let claimant = format!("{}:{}", node.path(), field.name);
                    if let Some(owner) = self.claims.get(&claim) {
                        return Err(CompileError::UniquenessViolation {
                            path: node.path().to_string(),
                            field: field.name.clone(),
                            target: spec.target.clone(),
                            phandle: reference.phandle(),
                            owner: owner.clone(),
                        });
                    }
                    self.claims.insert(claim, claimant);
                }

                Ok(FieldValue::Ref(reference.with_owner(node.path())))
            }
        }
    }
}

fn decode_scalar(kind: ScalarKind, field: &FieldDecl, raw: &[RawValue], node: &RawNode) -> Result<FieldValue> {
    let value = match (kind, raw) {
        (ScalarKind::Flag, _) => ScalarValue::Flag(true),
        (ScalarKind::String, [RawValue::Str(s)]) => ScalarValue::String(s.clone()),
        (ScalarKind::Number, [RawValue::Int(n)]) => ScalarValue::Number(*n),
        (kind, other) => {
            return Err(CompileError::InvalidPropertyValue {
                field: field.name.clone(),
                path: node.path().to_string(),
                expected: kind.to_string(),
                actual: describe_values(other),
            })
        }
    };
    Ok(FieldValue::Scalar(value))
}

fn missing(field: &FieldDecl, node: &RawNode) -> Result<FieldValue> {
    if field.kind == FieldKind::Scalar(ScalarKind::Flag) {
        return Ok(FieldValue::Scalar(ScalarValue::Flag(false)));
    }

    match &field.presence {
        Presence::Required => Err(CompileError::MissingAttribute {
            field: field.name.clone(),
            path: node.path().to_string(),
        }),
        Presence::Optional => Ok(FieldValue::Absent),
        Presence::Default(value) => match (&field.kind, value) {
            (FieldKind::Status, ScalarValue::String(s)) => Status::parse(s)
                .map(FieldValue::Status)
                .ok_or_else(|| CompileError::InvalidStatusValue {
                    path: node.path().to_string(),
                    value: s.clone(),
                }),
            _ => Ok(FieldValue::Scalar(value.clone())),
        },
    }
}
