use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid date '{0}': expected YYYYMMDD")]
    InvalidDate(String),
    #[error("Invalid clock time '{0}': expected HH:MM:SS")]
    InvalidTime(String),
    #[error("Invalid feed data: {0}")]
    InvalidFeed(String),
    #[error("Invalid water geometry: {0}")]
    InvalidWaterGeometry(String),
    #[error("Location id '{0}' collides with an existing stop id")]
    LocationIdCollision(String),
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
