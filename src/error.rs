//! # Compilation Errors
//!
//! Every failure of a compilation run. All of them are fatal: the compiler
//! refuses to hand a possibly-wrong model to the code generator.

/// Errors raised while loading, resolving or rendering a board description
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("binding '{0}' is already registered")]
    DuplicateSchema(String),

    #[error("binding '{schema}': field '{field}' {reason}")]
    InvalidSchema {
        schema: String,
        field: String,
        reason: String,
    },

    #[error("a binding registry is already installed for this process")]
    RegistryInstalled,

    #[error("phandle {phandle} is declared by both '{first}' and '{second}'")]
    DuplicatePhandle {
        phandle: u32,
        first: String,
        second: String,
    },

    #[error("nodes '{first}' and '{second}' both describe {key}")]
    DuplicateInstance {
        key: String,
        first: String,
        second: String,
    },

    #[error("{path}: missing required attribute '{field}'")]
    MissingAttribute { field: String, path: String },

    #[error("{path}: invalid value for '{field}': expected {expected}, found {actual}")]
    InvalidPropertyValue {
        field: String,
        path: String,
        expected: String,
        actual: String,
    },

    #[error("{path}: invalid status '{value}' (expected 'okay' or 'disabled')")]
    InvalidStatusValue { path: String, value: String },

    #[error("{path}: invalid cell reference in '{field}': expected {expected}, found {actual}")]
    InvalidCellReference {
        path: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("{path}: '{field}' references unresolved phandle {phandle}")]
    UnresolvedPhandle {
        path: String,
        field: String,
        phandle: u32,
    },

    #[error(
        "{path}: '{field}' references exclusive {target} (phandle {phandle}) already claimed by '{owner}'"
    )]
    UniquenessViolation {
        path: String,
        field: String,
        target: String,
        phandle: u32,
        owner: String,
    },

    #[error("binding '{schema}' has no field '{field}'")]
    UnknownField { schema: String, field: String },

    #[error("chosen property '{property}' is invalid: {reason}")]
    InvalidChosen { property: String, reason: String },

    #[error("{path}: chosen as {group} but its status is not 'okay'")]
    DisabledChosen { group: String, path: String },

    #[error(
        "pin {pin} is assigned to both {existing_group}.{existing_role} and {new_group}.{new_role}"
    )]
    DuplicatePinAssignment {
        pin: String,
        existing_group: String,
        existing_role: String,
        new_group: String,
        new_role: String,
    },

    #[error("invalid JSON input: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Result alias used throughout the compiler
pub type Result<T, E = CompileError> = std::result::Result<T, E>;

impl CompileError {
    /// Attach the owning node path to a path-less error raised deep inside
    /// value decoding.
    pub(crate) fn at(self, node_path: &str) -> Self {
        match self {
            CompileError::InvalidCellReference {
                path,
                field,
                expected,
                actual,
            } if path.is_empty() => CompileError::InvalidCellReference {
                path: node_path.to_string(),
                field,
                expected,
                actual,
            },
            other => other,
        }
    }
}
