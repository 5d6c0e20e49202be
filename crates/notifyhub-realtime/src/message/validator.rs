//! Message validation rules.

use notifyhub_core::error::AppError;

/// Longest accepted topic name.
const MAX_TOPIC_LENGTH: usize = 128;

/// Validates the raw size and content of an inbound frame.
pub fn validate_inbound(raw: &str, max_size: usize) -> Result<(), AppError> {
    if raw.len() > max_size {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_size} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates topic name format.
pub fn validate_topic_name(topic: &str) -> Result<(), AppError> {
    if topic.is_empty() || topic.len() > MAX_TOPIC_LENGTH {
        return Err(AppError::validation("Invalid channel name length"));
    }

    if !topic
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.'))
    {
        return Err(AppError::validation(
            "Channel name contains invalid characters",
        ));
    }

    Ok(())
}
