//! Nested Vectored Interrupt Controller of ARMv7-M cores.

use super::schema::BindingSchema;

/// NVIC binding. The node is named `interrupt-controller`; references pass
/// the interrupt `line`.
pub fn schema() -> BindingSchema {
    BindingSchema::peripheral("Nvic")
        .node_name("interrupt-controller")
        .number("interrupt_cells")
        .cells(&["line"])
        .build()
}
