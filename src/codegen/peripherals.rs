//! # Peripheral Rendering
//!
//! Generated firmware indexes peripheral configs by position, so records are
//! always emitted in model discovery order.

use crate::bindings::Record;
use crate::chosen::ChosenSelection;
use crate::error::Result;
use crate::model::{FieldValue, ModelInstance, ModelStore};
use serde_json::Value;

/// Render one instance through its binding's `render()`.
///
/// Bindings without one render their scalar and status fields.
pub fn render_instance(store: &ModelStore, instance: &ModelInstance) -> Result<Record> {
    match instance.schema().render_fn() {
        Some(render) => render(&store.peripheral(instance)),
        None => Ok(instance
            .fields()
            .filter(|(_, value)| !matches!(value, FieldValue::Ref(_)))
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect()),
    }
}

/// One record per instance of `type_name`, in discovery order
pub fn render_peripherals(store: &ModelStore, type_name: &str, only_active: bool) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for instance in store.instances_of(type_name) {
        if only_active && !instance.is_active() {
            tracing::debug!("[DTBC] {} is not active, not rendered", instance.path());
            continue;
        }
        records.push(render_instance(store, instance)?);
    }
    Ok(records)
}

/// Group label → ordered records of the chosen instances
pub fn render_chosen(store: &ModelStore, selection: &ChosenSelection<'_>, only_active: bool) -> Result<Record> {
    let mut context = Record::new();
    for group in selection.groups() {
        let mut records = Vec::new();
        for (config_group, instance) in group.iter() {
            if only_active && !instance.is_active() {
                tracing::debug!("[DTBC] {} is not active, not rendered", config_group);
                continue;
            }
            records.push(Value::Object(render_instance(store, instance)?));
        }
        tracing::info!("[DTBC] Rendered {} {} config(s)", records.len(), group.label());
        context.insert(group.label().to_string(), Value::Array(records));
    }
    Ok(context)
}
