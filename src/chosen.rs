//! # Chosen Peripherals
//!
//! The chosen node selects which peripheral instances the board uses. Each
//! property is named `<namespace>,<group>` and lists one or more phandles;
//! the instance at index `i` of group `uart` becomes config group `UART<i>`.

use crate::error::{CompileError, Result};
use crate::model::{ModelInstance, ModelStore};
use crate::tree::{describe_values, RawValue};

/// One chosen group, e.g. every `riot,uart` selection
#[derive(Debug, Clone)]
pub struct ChosenGroup<'a> {
    label: String,
    instances: Vec<&'a ModelInstance>,
}

impl<'a> ChosenGroup<'a> {
    /// Group label as written after the namespace
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn instances(&self) -> &[&'a ModelInstance] {
        &self.instances
    }

    /// Config group label of the instance at `index`
    pub fn config_group(&self, index: usize) -> String {
        config_group(&self.label, index)
    }

    /// Instances paired with their config group labels
    pub fn iter(&self) -> impl Iterator<Item = (String, &'a ModelInstance)> + '_ {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, &instance)| (self.config_group(i), instance))
    }
}

/// Chosen groups, in the order the chosen node lists them
#[derive(Debug, Clone, Default)]
pub struct ChosenSelection<'a> {
    groups: Vec<ChosenGroup<'a>>,
}

impl<'a> ChosenSelection<'a> {
    pub fn get(&self, label: &str) -> Option<&ChosenGroup<'a>> {
        self.groups.iter().find(|g| g.label == label)
    }

    pub fn groups(&self) -> &[ChosenGroup<'a>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// `"<GROUP><index>"`
pub fn config_group(label: &str, index: usize) -> String {
    format!("{}{}", label.to_uppercase(), index)
}

/// Read the chosen node and resolve its phandles
pub fn get_chosen<'a>(store: &'a ModelStore, chosen_path: &str) -> Result<ChosenSelection<'a>> {
    let Some(chosen) = store.node(chosen_path) else {
        tracing::info!("[DTBC] No chosen node at {}", chosen_path);
        return Ok(ChosenSelection::default());
    };

    let mut selection = ChosenSelection::default();
    for (property, values) in chosen.properties() {
        let Some((_, label)) = property.rsplit_once(',') else {
            tracing::debug!("[DTBC] Ignoring chosen property '{}'", property);
            continue;
        };
        if label.is_empty() {
            return Err(CompileError::InvalidChosen {
                property: property.to_string(),
                reason: "empty group label".to_string(),
            });
        }
        if selection.get(label).is_some() {
            return Err(CompileError::InvalidChosen {
                property: property.to_string(),
                reason: format!("group '{}' is selected more than once", label),
            });
        }

        let mut instances = Vec::with_capacity(values.len());
        for value in values {
            let RawValue::Int(phandle) = value else {
                return Err(CompileError::InvalidChosen {
                    property: property.to_string(),
                    reason: format!("expected phandles, found {}", describe_values(values)),
                });
            };
            let instance = store
                .by_phandle(*phandle)
                .ok_or_else(|| CompileError::UnresolvedPhandle {
                    path: chosen.path().to_string(),
                    field: property.to_string(),
                    phandle: *phandle,
                })?;
            instances.push(instance);
        }

        tracing::debug!(
            "[DTBC] Chosen group '{}' selects {} instance(s)",
            label,
            instances.len()
        );
        selection.groups.push(ChosenGroup {
            label: label.to_string(),
            instances,
        });
    }

    Ok(selection)
}
