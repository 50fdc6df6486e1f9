use thiserror::Error;

pub type SfResult<T> = Result<T, SfError>;

#[derive(Error, Debug)]
pub enum SfError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid equation id: {text:?}")]
    InvalidId { text: String },
}
