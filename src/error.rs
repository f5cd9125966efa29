use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("font error: {0}")]
    Font(String),

    #[error("image encode error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("a label is already being composed")]
    Busy,

    #[error("label is missing {0}")]
    Incomplete(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
