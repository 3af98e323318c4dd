use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("reference '{0}' has no trailing id segment")]
    MissingId(String),
    #[error("reference '{0}' does not end with a numeric id")]
    NonNumericId(String),
}
