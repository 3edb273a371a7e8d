use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkageError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad probability, threshold order, slot count, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A standardizer or comparator names a resource that was never declared.
    #[error("unknown {kind} resource: '{name}'")]
    UnknownResource { kind: &'static str, name: String },
    /// Blocking definition or comparator names an encoding the registry lacks.
    #[error("unknown encoding method: '{0}'")]
    UnknownEncoding(String),
    /// An index or comparator refers to an attribute no standardizer produces.
    #[error("{context}: attribute '{attribute}' is never produced by a standardizer")]
    UnknownAttribute { context: String, attribute: String },
    /// Reference data file missing, unreadable or malformed.
    #[error("cannot load '{path}': {message}")]
    ResourceLoad { path: String, message: String },
    /// Missing required column in input data.
    #[error("data set '{dataset}': missing column '{column}'")]
    MissingColumn { dataset: String, column: String },
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

impl LinkageError {
    pub(crate) fn resource(path: impl Into<String>, message: impl ToString) -> Self {
        Self::ResourceLoad {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// True for errors raised before any record is processed because the
    /// configuration itself is unusable.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse(_)
                | Self::ConfigValidation(_)
                | Self::UnknownResource { .. }
                | Self::UnknownEncoding(_)
                | Self::UnknownAttribute { .. }
        )
    }
}
