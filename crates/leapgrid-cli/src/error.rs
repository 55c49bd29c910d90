use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] leapgrid_core::ValidationError),

    #[error(transparent)]
    Config(#[from] leapgrid_core::config::ConfigError),

    #[error("TRADIER_TOKEN is not set; export a Tradier API token")]
    MissingToken,

    #[error(transparent)]
    Fetch(#[from] leapgrid_core::tradier::FetchError),

    #[error(transparent)]
    Artifact(#[from] leapgrid_core::artifacts::ArtifactError),

    #[error("strict mode failed: warnings={warning_count}")]
    StrictModeViolation { warning_count: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::MissingToken => 2,
            Self::Fetch(_) => 3,
            Self::Serialization(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::Artifact(_) | Self::Io(_) => 10,
        }
    }
}
