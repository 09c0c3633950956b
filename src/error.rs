use thiserror::Error;

/// Failure of a single mutation command. The document is never partially
/// rewritten: a command that returns one of these leaves the input text as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("block '{0}' not found")]
    NotFound(String),

    #[error("slot '{label}' on node '{node}' is neither a block nor an inline value")]
    AmbiguousShape { node: String, label: String },

    #[error("'{0}' is reserved and cannot be removed")]
    Reserved(String),

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("opcode '{opcode}' has no dynamic family '{prefix}'")]
    NotDynamic { opcode: String, prefix: String },
}

impl EditError {
    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        EditError::NotFound(name.into())
    }
}

/// Errors raised while loading or checking a construct schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to parse schema YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Opcode '{opcode}' declares branch '{name}' more than once")]
    DuplicateBranch { opcode: String, name: String },

    #[error("Opcode '{opcode}' declares dynamic family '{name}' whose name ends in a digit")]
    InvalidFamily { opcode: String, name: String },
}

/// Errors raised by the chain refactorer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefactorError {
    #[error("invalid selection: {}", .0.join("; "))]
    InvalidSelection(Vec<String>),

    #[error("workflow '{0}' already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Edit(#[from] EditError),
}
