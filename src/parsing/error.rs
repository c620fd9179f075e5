use thiserror::Error;

pub type PResult<T> = Result<T, ParsingError>;

#[derive(Debug, Error)]
pub enum ParsingError {
    #[error("Nom parsing error: {0}")]
    ParseError(#[from] nom::Err<nom::error::Error<String>>),
    #[error("Unknown direction: {0}")]
    UnknownDirection(String),
    #[error("Invalid run descriptor: {0}")]
    InvalidRun(String),
    #[error("Invalid scheduled time: {0}")]
    InvalidTime(String),
    #[error("Unable to build the date {0}-{1}-{2}")]
    UnableToBuildDate(i32, u32, u32),
    #[error("Unkown error: {0}")]
    Unknown(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for ParsingError {
    fn from(value: nom::Err<nom::error::Error<&str>>) -> Self {
        ParsingError::ParseError(value.map_input(String::from))
    }
}
