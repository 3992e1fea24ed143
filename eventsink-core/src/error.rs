use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("File System Error - {0}")]
    FileSystem(String),

    #[error("Config Error - {0}")]
    Config(String),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::FileSystem(value.to_string())
    }
}
