use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjError {
    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),

    #[error("Transform failed: {0}")]
    TransformFailed(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Transform error: {0}")]
    Transform(#[from] ProjError),

    /// The handler cannot be built for the rendering CRS (e.g. no positive wrap radius).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, HandlerError>;
