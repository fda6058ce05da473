//! # Device Tree Binding Compiler (DTBC)
//!
//! Compiles a board's device tree into a validated model of peripherals, pin
//! multiplexing and pin assignments, ready for the template stage that
//! emits firmware configuration sources.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dtbc::{bindings, Board, RawTree};
//!
//! let tree = RawTree::from_json(&std::fs::read_to_string("board.json")?)?;
//! let registry = bindings::for_cpu("st", "stm32l1")?.expect("stm32l1 bindings");
//!
//! let board = Board::load(&tree, &registry)?;
//! for usart in board.render_peripherals("usart", true)? {
//!     println!("{}", serde_json::Value::Object(usart));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! DTBC follows a multi-phase pipeline:
//!
//! 1. **Tree Adaptation** - Decoded nodes become uniform raw records
//! 2. **Model Instantiation** - Raw records become typed instances (two passes)
//! 3. **Chosen Resolution** - The chosen node selects active instances
//! 4. **Pin Assignment** - Pin-control roles claim physical pins
//! 5. **Rendering** - Bindings render template records in discovery order

pub mod bindings;
pub mod chosen;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod model;
pub mod pins;
pub mod tree;

#[cfg(test)]
mod integration_tests;

// Re-export the main compilation API
pub use compiler::{compile_board, compile_board_with_options, Board, CompiledBoard};

pub use bindings::{BindingRegistry, BindingSchema, PinToken, Record};
pub use chosen::ChosenSelection;
pub use codegen::{BoardPin, BoardPinmap, ConnectorPinout, PinoutRow};
pub use config::{CompileOptions, DisabledPolicy};
pub use error::{CompileError, Result};
pub use model::{CellReference, ModelInstance, ModelStore, Peripheral, Status};
pub use pins::{PinAssignment, PinAssignmentTable};
pub use tree::{RawNode, RawTree, RawValue, SourceNode, TreeWalk};
