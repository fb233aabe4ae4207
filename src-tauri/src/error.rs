use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecorMateError {
    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<DecorMateError> for String {
    fn from(err: DecorMateError) -> Self {
        err.to_string()
    }
}
