use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("A phone is already active")]
    PhoneActive,

    #[error("Phone drops are cooling down ({remaining:.2}s left)")]
    CoolingDown { remaining: f32 },

    #[error("Simulation has collapsed; reset before dropping phones")]
    Collapsed,

    #[error("Unknown phone type: {0}")]
    UnknownPhoneType(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
