//! # Pin Assignment
//!
//! Walks the chosen peripherals and claims one physical pin per pin-control
//! role. A pin can only be claimed once; a second claim is the conflict this
//! stage exists to catch.

use crate::bindings::pin_token;
use crate::chosen::ChosenSelection;
use crate::config::DisabledPolicy;
use crate::error::{CompileError, Result};
use crate::model::{FieldValue, ModelStore};
use serde::Serialize;
use std::collections::HashMap;

/// A physical pin claimed by one role of one config group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinAssignment {
    pub pin: String,
    pub config_group: String,
    pub role: String,
}

impl PinAssignment {
    /// `"<GROUP>.<role>"`, as printed on pinout diagrams
    pub fn function(&self) -> String {
        format!("{}.{}", self.config_group, self.role)
    }
}

/// Pin label → owner, in claim order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct PinAssignmentTable {
    assignments: Vec<PinAssignment>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PinAssignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a pin, failing if another role already holds it
    pub fn insert(&mut self, pin: &str, config_group: &str, role: &str) -> Result<()> {
        if let Some(&existing) = self.index.get(pin) {
            let existing = &self.assignments[existing];
            return Err(CompileError::DuplicatePinAssignment {
                pin: pin.to_string(),
                existing_group: existing.config_group.clone(),
                existing_role: existing.role.clone(),
                new_group: config_group.to_string(),
                new_role: role.to_string(),
            });
        }

        self.index.insert(pin.to_string(), self.assignments.len());
        self.assignments.push(PinAssignment {
            pin: pin.to_string(),
            config_group: config_group.to_string(),
            role: role.to_string(),
        });
        Ok(())
    }

    pub fn get(&self, pin: &str) -> Option<&PinAssignment> {
        self.index.get(pin).map(|&i| &self.assignments[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PinAssignment> {
        self.assignments.iter()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Claim the pins of every active chosen peripheral
pub fn extract_pin_assignments(
    store: &ModelStore,
    selection: &ChosenSelection<'_>,
    policy: DisabledPolicy,
) -> Result<PinAssignmentTable> {
    let mut table = PinAssignmentTable::new();

    for group in selection.groups() {
        for (config_group, instance) in group.iter() {
            if !instance.is_active() {
                match policy {
                    DisabledPolicy::Warn => {
                        tracing::warn!(
                            "[DTBC] {} is chosen as {} but is not enabled, skipping",
                            instance.path(),
                            config_group
                        );
                        continue;
                    }
                    DisabledPolicy::Error => {
                        return Err(CompileError::DisabledChosen {
                            group: config_group,
                            path: instance.path().to_string(),
                        })
                    }
                }
            }

            let Some(pinctrl) = instance.pinctrl() else {
                tracing::debug!("[DTBC] {} has no pin configuration", config_group);
                continue;
            };
            let pinctrl = pinctrl.target(store)?;

            for role in pinctrl.schema().pin_roles() {
                let FieldValue::Ref(reference) = pinctrl.get(&role.name)? else {
                    continue;
                };
                let token = pin_token(store, Some(reference))?;
                tracing::debug!("[DTBC] {} -> {}.{}", token, config_group, role.name);
                table.insert(&token.to_string(), &config_group, &role.name)?;
            }
        }
    }

    tracing::info!("[DTBC] Assigned {} pins", table.len());
    Ok(table)
}
