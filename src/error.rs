use thiserror::Error;

#[derive(Error, Debug)]
pub enum RekegError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Formula not found: {0}")]
    FormulaNotFound(String),

    #[error("No such keg or cask: {name}{}", suggestion.as_ref().map(|s| format!(" (did you mean {}?)", s)).unwrap_or_default())]
    NotInstalled {
        name: String,
        suggestion: Option<String>,
    },

    #[error(
        "--build-from-source requires developer tools, but no compiler was found. {}",
        crate::devtools::installation_instructions()
    )]
    DeveloperToolsMissing,

    #[error("brew is not installed")]
    BrewUnavailable,

    #[error("brew {command} failed for {target}")]
    BrewFailed { command: String, target: String },

    #[error("Bottle manifest for {name} unavailable: HTTP {status}")]
    ManifestUnavailable { name: String, status: u16 },

    #[error("Standard input closed before an answer was given")]
    InputClosed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to read directory: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RekegError>;
