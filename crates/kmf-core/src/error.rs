//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown resource kind: {alias}")]
    UnknownKind { alias: String },

    #[error("No resource kinds given")]
    EmptyKindSelection,

    #[error("Namespace value not passed")]
    EmptyNamespaceSpec,

    #[error("Invalid image reference '{reference}': {reason}")]
    InvalidImage { reference: String, reason: String },

    #[error("Unknown registry name: {name} (supported: gcr, dockerhub, gitlab)")]
    UnknownRegistry { name: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
