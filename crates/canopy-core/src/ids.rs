/// 16-byte correlation identifier tying a request to its response.
pub type CorrelationId = [u8; 16];

/// Generates a fresh random correlation id.
pub fn new_correlation_id() -> CorrelationId {
    rand::random()
}

/// Hex rendering used in diagnostics.
pub fn correlation_hex(id: &CorrelationId) -> String {
    hex::encode(id)
}

#[cfg(test)]
mod tests {
    use super::{correlation_hex, new_correlation_id};

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(new_correlation_id(), new_correlation_id());
    }

    #[test]
    fn hex_rendering_is_lowercase_and_fixed_width() {
        let rendered = correlation_hex(&[0xAB; 16]);
        assert_eq!(rendered.len(), 32);
        assert_eq!(rendered, "ab".repeat(16));
    }
}
