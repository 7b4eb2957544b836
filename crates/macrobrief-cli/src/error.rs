use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] macrobrief_core::ConfigError),

    #[error(transparent)]
    Validation(#[from] macrobrief_core::ValidationError),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Validation(_) => 2,
        }
    }
}
