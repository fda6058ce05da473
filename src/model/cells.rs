//! # Cell References
//!
//! A reference property holds a phandle followed by the inline cell
//! arguments the target binding declares. Arity is checked when the
//! reference is decoded; following the phandle happens on first access to
//! [`CellReference::target`] and is memoized.

use super::{ModelInstance, ModelStore};
use crate::bindings::{BindingSchema, PhandleSpec};
use crate::error::{CompileError, Result};
use crate::tree::{describe_values, RawValue};
use std::cell::OnceCell;

/// Phandle value meaning "no reference"
pub const NULL_PHANDLE: u32 = 0;

/// A decoded phandle reference with its named cell arguments
#[derive(Debug, Clone)]
pub struct CellReference {
    owner: String,
    field: String,
    target_type: String,
    phandle: u32,
    args: Vec<(String, u32)>,
    resolved: OnceCell<usize>,
}

impl CellReference {
    /// Decode `<phandle arg...>` against the target binding's cell names.
    ///
    /// Returns `Ok(None)` for the null phandle. Errors carry no node path;
    /// the caller annotates them.
    pub fn decode(
        field: &str,
        spec: &PhandleSpec,
        target: &BindingSchema,
        values: &[RawValue],
    ) -> Result<Option<Self>> {
        let mut cells = Vec::with_capacity(values.len());
        for value in values {
            match value {
                RawValue::Int(v) => cells.push(*v),
                RawValue::Str(_) => {
                    return Err(invalid(
                        field,
                        format!("a phandle to {}", spec.target),
                        describe_values(values),
                    ))
                }
            }
        }

        let Some((&phandle, args)) = cells.split_first() else {
            return Err(invalid(
                field,
                format!("a phandle to {}", spec.target),
                "no value".to_string(),
            ));
        };

        if phandle == NULL_PHANDLE {
            return Ok(None);
        }

        let names = &target.cells().names;
        if args.len() != names.len() {
            return Err(invalid(
                field,
                format!(
                    "{} cell argument(s) [{}] for {}",
                    names.len(),
                    names.join(", "),
                    spec.target
                ),
                format!("{} cell argument(s)", args.len()),
            ));
        }

        Ok(Some(Self {
            owner: String::new(),
            field: field.to_string(),
            target_type: spec.target.clone(),
            phandle,
            args: names.iter().cloned().zip(args.iter().copied()).collect(),
            resolved: OnceCell::new(),
        }))
    }

    pub(crate) fn with_owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    /// Path of the node holding this reference
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn phandle(&self) -> u32 {
        self.phandle
    }

    /// Declared type of the referenced binding
    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    /// Named cell argument
    pub fn arg(&self, name: &str) -> Option<u32> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn args(&self) -> &[(String, u32)] {
        &self.args
    }

    /// Follow the phandle to the referenced instance.
    ///
    /// The resolved index is cached on first success and is only valid for
    /// the store this reference was loaded into; always pass that store.
    pub fn target<'s>(&self, store: &'s ModelStore) -> Result<&'s ModelInstance> {
        if let Some(&index) = self.resolved.get() {
            return Ok(store.instance_at(index));
        }

        let index = store
            .index_of_phandle(self.phandle)
            .ok_or_else(|| CompileError::UnresolvedPhandle {
                path: self.owner.clone(),
                field: self.field.clone(),
                phandle: self.phandle,
            })?;
        let instance = store.instance_at(index);
        if instance.type_name() != self.target_type {
            return Err(CompileError::InvalidCellReference {
                path: self.owner.clone(),
                field: self.field.clone(),
                expected: self.target_type.clone(),
                actual: instance.type_name().to_string(),
            });
        }

        let _ = self.resolved.set(index);
        Ok(instance)
    }
}

impl PartialEq for CellReference {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.field == other.field
            && self.target_type == other.target_type
            && self.phandle == other.phandle
            && self.args == other.args
    }
}

fn invalid(field: &str, expected: String, actual: String) -> CompileError {
    CompileError::InvalidCellReference {
        path: String::new(),
        field: field.to_string(),
        expected,
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::BindingRegistry;
    use crate::model::{load, FieldValue};
    use crate::tree::{adapt, RawTree, SourceNode};

    fn gpio() -> BindingSchema {
        BindingSchema::peripheral("Gpio")
            .string("label")
            .cells(&["num", "flags"])
            .build()
    }

    fn spec() -> PhandleSpec {
        PhandleSpec {
            target: "gpio".to_string(),
            unique: false,
            pinctrl: false,
        }
    }

    fn ints(values: &[u32]) -> Vec<RawValue> {
        values.iter().copied().map(RawValue::Int).collect()
    }

    #[test]
    fn test_decode_names_arguments() {
        let reference = CellReference::decode("tx", &spec(), &gpio(), &ints(&[4, 9, 7]))
            .unwrap()
            .unwrap();
        assert_eq!(reference.phandle(), 4);
        assert_eq!(reference.arg("num"), Some(9));
        assert_eq!(reference.arg("flags"), Some(7));
        assert_eq!(reference.arg("line"), None);
        assert_eq!(reference.target_type(), "gpio");
    }

    #[test]
    fn test_missing_argument_is_rejected() {
        let err = CellReference::decode("mosi", &spec(), &gpio(), &ints(&[4, 9])).unwrap_err();
        match err {
            CompileError::InvalidCellReference { field, expected, actual, .. } => {
                assert_eq!(field, "mosi");
                assert!(expected.starts_with("2 cell argument(s) [num, flags]"));
                assert_eq!(actual, "1 cell argument(s)");
            }
            other => panic!("expected invalid cell reference, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_argument_is_rejected() {
        let result = CellReference::decode("mosi", &spec(), &gpio(), &ints(&[4, 9, 0, 1]));
        assert!(matches!(result, Err(CompileError::InvalidCellReference { .. })));
    }

    #[test]
    fn test_null_phandle_is_absent() {
        let result = CellReference::decode("cs", &spec(), &gpio(), &ints(&[0])).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_string_payload_is_rejected() {
        let values = vec![RawValue::Str("gpioa".into())];
        let result = CellReference::decode("tx", &spec(), &gpio(), &values);
        assert!(matches!(result, Err(CompileError::InvalidCellReference { .. })));
    }

    #[test]
    fn test_target_is_cached_after_first_lookup() {
        let mut registry = BindingRegistry::new();
        registry
            .register_all([gpio(), BindingSchema::pinctrl("Pins").pin("tx", "gpio").build()])
            .unwrap();
        let tree: RawTree = vec![
            SourceNode::new("/soc/gpio@0")
                .with_phandle(4)
                .with_str("label", "A"),
            SourceNode::new("/soc/pins@0").with_cells("tx", &[4, 9, 7]),
        ]
        .into_iter()
        .collect();
        let store = load(&registry, adapt(&tree).unwrap()).unwrap();

        let pins = store.instance("pins", "0").unwrap();
        let FieldValue::Ref(reference) = pins.get("tx").unwrap() else {
            panic!("tx should be a reference");
        };
        assert!(reference.resolved.get().is_none());

        let first = reference.target(&store).unwrap();
        assert_eq!(reference.resolved.get(), Some(&0));
        let second = reference.target(&store).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.path(), "/soc/gpio@0");
    }
}
