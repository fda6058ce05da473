//! # Board Pinout
//!
//! Joins the pin assignment table with the board's connector map so the
//! pinout template can print which function sits on every header pin.

use crate::error::Result;
use crate::pins::PinAssignmentTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One header pin of a board connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPin {
    /// Label printed on the board
    pub label: String,
    /// MCU pin token the header pin is wired to
    pub pin: String,
}

/// Connector name → header pins in connector order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardPinmap {
    connectors: BTreeMap<String, Vec<BoardPin>>,
}

impl BoardPinmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn add_connector(&mut self, name: &str, pins: Vec<BoardPin>) -> &mut Self {
        self.connectors.insert(name.to_string(), pins);
        self
    }

    pub fn connectors(&self) -> impl Iterator<Item = (&str, &[BoardPin])> {
        self.connectors
            .iter()
            .map(|(name, pins)| (name.as_str(), pins.as_slice()))
    }
}

/// A header pin with the function assigned to it, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinoutRow {
    pub label: String,
    pub pin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorPinout {
    pub name: String,
    pub pins: Vec<PinoutRow>,
}

/// Left-join the board connectors with the pin assignments
pub fn pinout(pinmap: &BoardPinmap, assignments: &PinAssignmentTable) -> Vec<ConnectorPinout> {
    pinmap
        .connectors()
        .map(|(name, pins)| ConnectorPinout {
            name: name.to_string(),
            pins: pins
                .iter()
                .map(|board_pin| PinoutRow {
                    label: board_pin.label.clone(),
                    pin: board_pin.pin.clone(),
                    function: assignments.get(&board_pin.pin).map(|a| a.function()),
                })
                .collect(),
        })
        .collect()
}
