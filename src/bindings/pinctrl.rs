//! # Pin-Control Helpers
//!
//! Pin-control bindings list a peripheral's pin roles as references into a
//! GPIO port binding. The GPIO binding carries the port `label`; the
//! reference carries the pin `num` cell.

use crate::error::{CompileError, Result};
use crate::model::{CellReference, ModelStore};
use serde_json::Value;
use std::fmt;

/// GPIO port field holding the port label
pub const PORT_LABEL_FIELD: &str = "label";
/// GPIO cell holding the pin number
pub const PIN_NUMBER_CELL: &str = "num";

/// Canonical identity of a physical pin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PinToken {
    Pin { port: String, num: u32 },
    Undefined,
}

impl PinToken {
    /// C initializer used in generated peripheral configs
    pub fn gpio_macro(&self) -> String {
        match self {
            PinToken::Pin { port, num } => format!("GPIO_PIN({},{})", port, num),
            PinToken::Undefined => "GPIO_UNDEF".to_string(),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, PinToken::Pin { .. })
    }
}

impl fmt::Display for PinToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinToken::Pin { port, num } => write!(f, "{}{}", port, num),
            PinToken::Undefined => f.write_str("undefined"),
        }
    }
}

/// Map an optional GPIO reference to its pin token
pub fn pin_token(store: &ModelStore, reference: Option<&CellReference>) -> Result<PinToken> {
    let Some(reference) = reference else {
        return Ok(PinToken::Undefined);
    };

    let port = reference.target(store)?;
    let label = store.peripheral(port).string(PORT_LABEL_FIELD)?.ok_or_else(|| {
        CompileError::MissingAttribute {
            field: PORT_LABEL_FIELD.to_string(),
            path: port.path().to_string(),
        }
    })?;
    let num = reference
        .arg(PIN_NUMBER_CELL)
        .ok_or_else(|| CompileError::InvalidCellReference {
            path: reference.owner().to_string(),
            field: reference.field().to_string(),
            expected: format!("a '{}' cell", PIN_NUMBER_CELL),
            actual: format!("cells of {}", reference.target_type()),
        })?;

    Ok(PinToken::Pin {
        port: label.to_string(),
        num,
    })
}

/// `GPIO_PIN(port,num)` for a bound pin, `GPIO_UNDEF` otherwise
pub fn render_pin(store: &ModelStore, reference: Option<&CellReference>) -> Result<Value> {
    Ok(Value::from(pin_token(store, reference)?.gpio_macro()))
}
