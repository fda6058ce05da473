//! # Bindings
//!
//! Schema declarations, the registry they live in, and the built-in binding
//! families for the supported MCUs.

pub mod nvic;
pub mod pinctrl;
pub mod registry;
pub mod samd21;
pub mod schema;
pub mod stm32l1;

pub use pinctrl::{pin_token, render_pin, PinToken};
pub use registry::BindingRegistry;
pub use schema::{
    BindingSchema, CellSpec, FieldDecl, FieldKind, PhandleSpec, Presence, Record, RenderFn,
    ScalarKind, ScalarValue, SchemaBuilder, SchemaKind,
};

use crate::error::Result;
use crate::model::{CellReference, Peripheral};
use serde_json::Value;

/// Registry for a vendor/model pair, `None` when no bindings exist for it
pub fn for_cpu(vendor: &str, model: &str) -> Result<Option<BindingRegistry>> {
    let schemas = match (vendor, model) {
        ("st", "stm32l1") => stm32l1::schemas(),
        ("atmel" | "microchip", "samd21") => samd21::schemas(),
        _ => {
            tracing::warn!("[DTBC] No bindings for {},{}", vendor, model);
            return Ok(None);
        }
    };

    let mut registry = BindingRegistry::new();
    registry.register_all(schemas)?;
    tracing::info!(
        "[DTBC] Loaded {} bindings for {},{}",
        registry.len(),
        vendor,
        model
    );
    Ok(Some(registry))
}

/// Build a render record from ordered entries
pub(crate) fn record<I>(entries: I) -> Record
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Reference bound to a pin role, if the peripheral has a pin-control block
pub(crate) fn pin_role<'a>(
    pinctrl: Option<Peripheral<'a>>,
    role: &str,
) -> Result<Option<&'a CellReference>> {
    match pinctrl {
        Some(pinctrl) => pinctrl.reference(role),
        None => Ok(None),
    }
}

/// Named cell of a pin role's GPIO reference
pub(crate) fn pin_cell(pinctrl: Option<Peripheral<'_>>, role: &str, cell: &str) -> Result<Value> {
    Ok(pin_role(pinctrl, role)?
        .and_then(|r| r.arg(cell))
        .map_or(Value::Null, Value::from))
}
