//! # Binding Schemas
//!
//! A [`BindingSchema`] declares what a typed node looks like: its fields, the
//! cell arguments other nodes pass when referencing it, and how instances
//! are rendered for the code generator.

use crate::error::{CompileError, Result};
use crate::model::{Peripheral, Status};
use serde::Serialize;
use std::fmt;

/// Ordered field-name → value record handed to the template stage
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Renders one instance into the record the code generator consumes
pub type RenderFn = fn(&Peripheral<'_>) -> Result<Record>;

/// Literal kinds a scalar field can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Number,
    /// Valueless property, true when present
    Flag,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => write!(f, "a string"),
            ScalarKind::Number => write!(f, "a single cell"),
            ScalarKind::Flag => write!(f, "a flag"),
        }
    }
}

/// A decoded scalar literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    String(String),
    Number(u32),
    Flag(bool),
}

/// A reference to another binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhandleSpec {
    /// Canonical type name of the referenced binding
    pub target: String,
    /// Exclusive relation: a target may be claimed through it only once
    pub unique: bool,
    /// This is the peripheral's pin-control relation
    pub pinctrl: bool,
}

/// Closed set of field kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// `okay` / `disabled`
    Status,
    PhandleRef(PhandleSpec),
}

/// What happens when the property is absent from the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    Default(ScalarValue),
}

/// One declared field of a binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub kind: FieldKind,
    pub presence: Presence,
}

impl FieldDecl {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            presence: Presence::Required,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::String))
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Number))
    }

    pub fn flag(name: &str) -> Self {
        Self::new(name, FieldKind::Scalar(ScalarKind::Flag))
    }

    pub fn status(name: &str) -> Self {
        Self::new(name, FieldKind::Status)
    }

    pub fn phandle(name: &str, target: &str) -> Self {
        Self::new(
            name,
            FieldKind::PhandleRef(PhandleSpec {
                target: target.to_lowercase(),
                unique: false,
                pinctrl: false,
            }),
        )
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn default_value(mut self, value: ScalarValue) -> Self {
        self.presence = Presence::Default(value);
        self
    }

    /// Mark a reference field as an exclusive relation
    pub fn unique(mut self) -> Self {
        if let FieldKind::PhandleRef(spec) = &mut self.kind {
            spec.unique = true;
        }
        self
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    pub fn phandle_spec(&self) -> Option<&PhandleSpec> {
        match &self.kind {
            FieldKind::PhandleRef(spec) => Some(spec),
            _ => None,
        }
    }
}

/// Whether a binding describes a peripheral or a pin-control block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Peripheral,
    Pinctrl,
}

/// Cell arguments that follow a phandle pointing at this binding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellSpec {
    pub names: Vec<String>,
    /// Every reference to this binding is exclusive
    pub unique: bool,
}

/// A registered binding
#[derive(Clone)]
pub struct BindingSchema {
    name: String,
    node_name: Option<String>,
    kind: SchemaKind,
    fields: Vec<FieldDecl>,
    cells: CellSpec,
    render: Option<RenderFn>,
}

impl fmt::Debug for BindingSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingSchema")
            .field("name", &self.name)
            .field("type_name", &self.type_name())
            .field("kind", &self.kind)
            .field("fields", &self.fields)
            .field("cells", &self.cells)
            .field("render", &self.render.is_some())
            .finish()
    }
}

impl BindingSchema {
    pub fn peripheral(name: &str) -> SchemaBuilder {
        SchemaBuilder::new(name, SchemaKind::Peripheral)
    }

    pub fn pinctrl(name: &str) -> SchemaBuilder {
        SchemaBuilder::new(name, SchemaKind::Pinctrl)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical registry key, matched against the node's `<type>@` prefix
    pub fn type_name(&self) -> String {
        match &self.node_name {
            Some(node_name) => node_name.to_lowercase(),
            None => self.name.to_lowercase(),
        }
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn is_pinctrl(&self) -> bool {
        self.kind == SchemaKind::Pinctrl
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<(usize, &FieldDecl)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    pub fn cells(&self) -> &CellSpec {
        &self.cells
    }

    pub fn render_fn(&self) -> Option<RenderFn> {
        self.render
    }

    /// Named pin roles of a pin-control binding, in declaration order
    pub fn pin_roles(&self) -> impl Iterator<Item = &FieldDecl> {
        let pinctrl = self.is_pinctrl();
        self.fields
            .iter()
            .filter(move |f| pinctrl && f.phandle_spec().is_some())
    }

    /// The peripheral's pin-control relation, if it declares one
    pub fn pinctrl_field(&self) -> Option<(usize, &FieldDecl)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.phandle_spec().is_some_and(|spec| spec.pinctrl))
    }

    pub fn status_field(&self) -> Option<(usize, &FieldDecl)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.kind == FieldKind::Status)
    }

    /// Check that every declared default fits its field kind
    pub fn validate(&self) -> Result<()> {
        for field in &self.fields {
            let Presence::Default(value) = &field.presence else {
                continue;
            };
            let fits = match (&field.kind, value) {
                (FieldKind::Scalar(ScalarKind::String), ScalarValue::String(_))
                | (FieldKind::Scalar(ScalarKind::Number), ScalarValue::Number(_))
                | (FieldKind::Scalar(ScalarKind::Flag), ScalarValue::Flag(_)) => true,
                (FieldKind::Status, ScalarValue::String(s)) => Status::parse(s).is_some(),
                _ => false,
            };
            if !fits {
                return Err(CompileError::InvalidSchema {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                    reason: format!("cannot default to {:?}", value),
                });
            }
        }
        Ok(())
    }
}

/// Static, explicit binding declaration
pub struct SchemaBuilder {
    schema: BindingSchema,
}

impl SchemaBuilder {
    fn new(name: &str, kind: SchemaKind) -> Self {
        Self {
            schema: BindingSchema {
                name: name.to_string(),
                node_name: None,
                kind,
                fields: Vec::new(),
                cells: CellSpec::default(),
                render: None,
            },
        }
    }

    /// Bind to nodes whose unit-name prefix differs from the binding name
    pub fn node_name(mut self, node_name: &str) -> Self {
        self.schema.node_name = Some(node_name.to_string());
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.schema.fields.push(field);
        self
    }

    pub fn string(self, name: &str) -> Self {
        self.field(FieldDecl::string(name))
    }

    pub fn number(self, name: &str) -> Self {
        self.field(FieldDecl::number(name))
    }

    pub fn status(self) -> Self {
        self.field(FieldDecl::status("status"))
    }

    pub fn phandle(self, name: &str, target: &str) -> Self {
        self.field(FieldDecl::phandle(name, target))
    }

    /// Optional pin-control relation
    pub fn pinctrl(self, name: &str, target: &str) -> Self {
        let mut field = FieldDecl::phandle(name, target).optional();
        if let FieldKind::PhandleRef(spec) = &mut field.kind {
            spec.pinctrl = true;
        }
        self.field(field)
    }

    /// Required pin role of a pin-control binding
    pub fn pin(self, role: &str, gpio: &str) -> Self {
        self.field(FieldDecl::phandle(role, gpio))
    }

    pub fn cells(mut self, names: &[&str]) -> Self {
        self.schema.cells.names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn unique_cells(mut self) -> Self {
        self.schema.cells.unique = true;
        self
    }

    pub fn render(mut self, render: RenderFn) -> Self {
        self.schema.render = Some(render);
        self
    }

    pub fn build(self) -> BindingSchema {
        self.schema
    }
}
