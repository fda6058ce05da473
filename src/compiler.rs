//! # Board Compiler
//!
//! Main entry points for compiling a board's device tree into the peripheral
//! and pinout context consumed by the template stage.

use crate::bindings::{BindingRegistry, Record};
use crate::chosen::{get_chosen, ChosenSelection};
use crate::codegen::{self, BoardPinmap, ConnectorPinout};
use crate::config::CompileOptions;
use crate::error::Result;
use crate::model::{self, ModelStore};
use crate::pins::{self, PinAssignmentTable};
use crate::tree::{adapt, TreeWalk};
use serde::Serialize;

/// Output of a full compilation run
#[derive(Debug, Clone, Serialize)]
pub struct CompiledBoard {
    /// Chosen group → rendered peripheral configs
    pub periph_conf: Record,
    /// Pin → owning config group and role
    pub pins: PinAssignmentTable,
}

/// Compile a decoded device tree with the default options
///
/// # Arguments
///
/// * `tree` - Walk of the decoded device tree
/// * `registry` - Fully populated binding registry
///
/// # Returns
///
/// * `Ok(CompiledBoard)` - Rendered chosen peripherals and the pin table
/// * `Err(CompileError)` - The first fatal problem found in the description
///
/// # Examples
///
/// ```rust,no_run
/// use dtbc::{bindings, compile_board, RawTree};
///
/// let tree = RawTree::from_json(&std::fs::read_to_string("board.json")?)?;
/// let registry = bindings::for_cpu("st", "stm32l1")?.expect("stm32l1 bindings");
/// let board = compile_board(&tree, &registry)?;
/// println!("{}", serde_json::to_string_pretty(&board)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn compile_board(tree: &dyn TreeWalk, registry: &BindingRegistry) -> Result<CompiledBoard> {
    compile_board_with_options(tree, registry, CompileOptions::default())
}

/// Compile a decoded device tree
pub fn compile_board_with_options(
    tree: &dyn TreeWalk,
    registry: &BindingRegistry,
    options: CompileOptions,
) -> Result<CompiledBoard> {
    tracing::info!("[DTBC] Starting board compilation");

    let board = Board::load_with_options(tree, registry, options)?;

    tracing::info!("[DTBC] Phase 3: Resolving chosen peripherals...");
    let selection = board.get_chosen()?;
    tracing::info!("[DTBC] {} chosen group(s)", selection.len());

    tracing::info!("[DTBC] Phase 4: Assigning pins...");
    let pins = pins::extract_pin_assignments(&board.store, &selection, board.options.disabled_chosen)?;

    tracing::info!("[DTBC] Phase 5: Rendering peripheral configs...");
    let periph_conf = codegen::render_chosen(&board.store, &selection, board.options.only_active)?;

    tracing::info!("[DTBC] Compilation successful!");
    Ok(CompiledBoard { periph_conf, pins })
}

/// A loaded board description
#[derive(Debug)]
pub struct Board {
    store: ModelStore,
    options: CompileOptions,
}

impl Board {
    pub fn load(tree: &dyn TreeWalk, registry: &BindingRegistry) -> Result<Self> {
        Self::load_with_options(tree, registry, CompileOptions::default())
    }

    pub fn load_with_options(
        tree: &dyn TreeWalk,
        registry: &BindingRegistry,
        options: CompileOptions,
    ) -> Result<Self> {
        tracing::info!("[DTBC] Phase 1: Adapting property tree...");
        let nodes = adapt(tree)?;

        tracing::info!("[DTBC] Phase 2: Instantiating models ({} bindings)...", registry.len());
        let store = model::load(registry, nodes)?;

        Ok(Self { store, options })
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn get_chosen(&self) -> Result<ChosenSelection<'_>> {
        get_chosen(&self.store, &self.options.chosen_path)
    }

    pub fn extract_pin_assignments(&self) -> Result<PinAssignmentTable> {
        let selection = self.get_chosen()?;
        pins::extract_pin_assignments(&self.store, &selection, self.options.disabled_chosen)
    }

    /// Rendered instances of one binding, in discovery order
    pub fn render_peripherals(&self, type_name: &str, only_active: bool) -> Result<Vec<Record>> {
        codegen::render_peripherals(&self.store, type_name, only_active)
    }

    /// Rendered chosen instances, grouped by chosen label
    pub fn render_chosen(&self) -> Result<Record> {
        let selection = self.get_chosen()?;
        codegen::render_chosen(&self.store, &selection, self.options.only_active)
    }

    /// Board connectors with the function assigned to each pin
    pub fn pinout(&self, pinmap: &BoardPinmap) -> Result<Vec<ConnectorPinout>> {
        let assignments = self.extract_pin_assignments()?;
        Ok(codegen::pinout(pinmap, &assignments))
    }
}
