/// Domain errors raised by the script store and submission path.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_variants() {
        assert_eq!(
            CoreError::NotFound("Script 'a.py' not found".into()).to_string(),
            "Not found: Script 'a.py' not found"
        );
        assert_eq!(
            CoreError::Conflict("exists".into()).to_string(),
            "Conflict: exists"
        );
    }

    #[test]
    fn io_error_maps_to_internal() {
        let err: CoreError = std::io::Error::other("disk full").into();
        assert!(matches!(err, CoreError::Internal(msg) if msg.contains("disk full")));
    }
}
