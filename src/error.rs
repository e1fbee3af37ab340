use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryboardError {
    #[error("script text is empty")]
    EmptyScript,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("no image payload in generation response")]
    NoImage,

    #[error("scene index {0} out of range")]
    SceneIndex(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("base64 decoding error: {0}")]
    DecodeError(#[from] base64::DecodeError),

    #[error("archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, StoryboardError>;
