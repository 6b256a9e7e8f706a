use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // UID errors
    #[error("Invalid UID: {0}")]
    InvalidUid(String),

    // Operator input errors
    #[error("Invalid operating mode: {0}")]
    InvalidMode(String),

    // Key material errors
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of an operation run through [`RetryPolicy`](crate::retry::RetryPolicy)
/// after every allowed attempt failed.
///
/// Carries the name of the operation, the number of attempts made and the
/// error returned by the last attempt.
#[derive(Error, Debug)]
#[error("Operation {operation} failed after {attempts} attempts: {source}")]
pub struct RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Name of the operation that was retried.
    pub operation: &'static str,

    /// Total number of attempts made (first attempt included).
    pub attempts: u32,

    /// Error returned by the last attempt.
    #[source]
    pub source: E,
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Unwrap the error returned by the last attempt.
    pub fn into_inner(self) -> E {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_uid_display() {
        let error = Error::InvalidUid("empty".to_string());
        assert_eq!(error.to_string(), "Invalid UID: empty");
    }

    #[test]
    fn test_retry_error_display() {
        let error = RetryError {
            operation: "poll_for_tag",
            attempts: 4,
            source: std::io::Error::other("no tag"),
        };
        assert_eq!(
            error.to_string(),
            "Operation poll_for_tag failed after 4 attempts: no tag"
        );
        assert_eq!(error.into_inner().to_string(), "no tag");
    }
}
