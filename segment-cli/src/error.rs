use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Segmenter error: {0}")]
    Segment(#[from] segmenter::SegmentError),

    #[error("Config file error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
