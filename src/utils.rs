pub type IntentName = String;
pub type SlotName = String;
pub type EntityName = String;

/// Turns an arbitrary identifier into a storage-safe file name: lowercased,
/// whitespace replaced by dashes, everything outside `[a-z0-9._-]` stripped.
pub fn sanitize_file_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || ['.', '_', '-'].contains(c))
        .collect()
}
