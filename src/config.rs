//! # Compiler Options
//!
//! Every option has a default, so an empty JSON object is a valid
//! configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Default path of the node selecting the active peripherals
pub const DEFAULT_CHOSEN_PATH: &str = "/chosen";

/// What to do with a chosen peripheral whose status is not `okay`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledPolicy {
    /// Log a warning and leave it out
    #[default]
    Warn,
    /// Abort the compilation
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub chosen_path: String,
    pub disabled_chosen: DisabledPolicy,
    /// Leave inactive instances out of chosen rendering
    pub only_active: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            chosen_path: DEFAULT_CHOSEN_PATH.to_string(),
            disabled_chosen: DisabledPolicy::Warn,
            only_active: true,
        }
    }
}

impl CompileOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
