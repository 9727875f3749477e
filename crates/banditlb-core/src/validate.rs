use crate::error::LbError;

/// Validates an inbound request id: exactly 24 ASCII alphanumeric
/// characters. Mirrors the original schema's `min_length=24, max_length=24`
/// plus `isalnum()` check.
pub fn validate_request_id(id: &str) -> Result<(), LbError> {
    if id.chars().count() != 24 {
        return Err(LbError::InvalidRequestId(format!(
            "request id must be exactly 24 characters, got {}",
            id.chars().count()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LbError::InvalidRequestId(
            "request id must be alphanumeric".to_string(),
        ));
    }
    Ok(())
}
