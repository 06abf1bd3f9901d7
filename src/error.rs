use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown entity: {0}")]
    UnknownEntity(u32),

    #[error("Invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Text recognition failed: {0}")]
    Recognition(String),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
