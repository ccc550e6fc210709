/// Bound for payload and response previews stored in ledger records.
pub const MAX_PREVIEW_LENGTH: usize = 500;
/// Bound for error strings captured from the transport layer.
pub const MAX_ERROR_LENGTH: usize = 300;
/// Bound for offending-input previews kept for property-trial bugs.
pub const MAX_TRIAL_PREVIEW_LENGTH: usize = 100;

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

pub fn truncate_preview(text: &str) -> String {
    truncate_chars(text, MAX_PREVIEW_LENGTH)
}

pub fn truncate_error(error: &str) -> String {
    truncate_chars(error, MAX_ERROR_LENGTH)
}

/// Debug-quoted preview of a fuzzed input, bounded by character count after
/// quoting so control characters stay visible in the report.
pub fn quoted_preview(input: &str, max_chars: usize) -> String {
    let head = truncate_chars(input, max_chars);
    let quoted = format!("{:?}", head);
    truncate_chars(&quoted, max_chars)
}
