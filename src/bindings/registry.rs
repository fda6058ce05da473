//! # Binding Registry
//!
//! Maps canonical type names to schemas. Populate it completely before the
//! first load; a populated registry can be frozen process-wide with
//! [`BindingRegistry::install`].

use super::schema::BindingSchema;
use crate::error::{CompileError, Result};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<BindingRegistry> = OnceLock::new();

/// Table of registered bindings, keyed by canonical type name
#[derive(Debug, Default)]
pub struct BindingRegistry {
    schemas: HashMap<String, Arc<BindingSchema>>,
    order: Vec<String>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its canonical type name
    pub fn register(&mut self, schema: BindingSchema) -> Result<()> {
        schema.validate()?;
        let type_name = schema.type_name();
        if self.schemas.contains_key(&type_name) {
            return Err(CompileError::DuplicateSchema(type_name));
        }
        tracing::debug!("[DTBC] Registered binding '{}' ({:?})", type_name, schema.kind());
        self.order.push(type_name.clone());
        self.schemas.insert(type_name, Arc::new(schema));
        Ok(())
    }

    /// Register several schemas, stopping at the first duplicate
    pub fn register_all(&mut self, schemas: impl IntoIterator<Item = BindingSchema>) -> Result<()> {
        for schema in schemas {
            self.register(schema)?;
        }
        Ok(())
    }

    pub fn resolve(&self, type_name: &str) -> Option<&Arc<BindingSchema>> {
        self.schemas.get(type_name)
    }

    /// Type names in registration order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Freeze this registry as the process-wide one
    pub fn install(self) -> Result<&'static BindingRegistry> {
        GLOBAL
            .set(self)
            .map_err(|_| CompileError::RegistryInstalled)?;
        GLOBAL.get().ok_or(CompileError::RegistryInstalled)
    }

    /// The installed process-wide registry, if any
    pub fn global() -> Option<&'static BindingRegistry> {
        GLOBAL.get()
    }
}
