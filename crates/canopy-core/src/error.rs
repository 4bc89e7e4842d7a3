use thiserror::Error;

/// Shared lightweight error type for core primitive operations.
#[derive(Debug, Error)]
pub enum CanopyError {
    /// Invalid caller input or malformed primitive value.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Decode/parsing failure.
    #[error("decode error: {0}")]
    Decode(&'static str),
}

#[cfg(test)]
mod tests {
    use super::CanopyError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            CanopyError::InvalidInput("empty format id").to_string(),
            "invalid input: empty format id"
        );
        assert_eq!(
            CanopyError::Decode("bad cbor").to_string(),
            "decode error: bad cbor"
        );
    }
}
