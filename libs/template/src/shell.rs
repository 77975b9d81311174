//! Shell-safety checks for values interpolated into generated scripts.

use crate::TemplateError;

/// Characters that could break a double-quoted bash string or start an
/// expansion.
const FORBIDDEN: &[char] = &['"', '\\', '`', '$', '\n', '\r'];

/// Validate that `value` can be interpolated into a shell line unchanged.
pub fn validate_shell_input(value: &str, field: &str) -> Result<(), TemplateError> {
    if value.is_empty() {
        return Err(TemplateError::UnsafeShellInput {
            field: field.to_string(),
            reason: "cannot be empty".to_string(),
        });
    }

    if let Some(bad) = value.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(TemplateError::UnsafeShellInput {
            field: field.to_string(),
            reason: format!("contains forbidden character {bad:?}"),
        });
    }

    Ok(())
}

/// Validate that `value` can be used as an unquoted shell word, e.g. a path
/// argument. Only ASCII letters, digits and `.`, `_`, `/`, `-` are allowed.
pub fn validate_shell_word(value: &str, field: &str) -> Result<(), TemplateError> {
    if value.is_empty() {
        return Err(TemplateError::UnsafeShellInput {
            field: field.to_string(),
            reason: "cannot be empty".to_string(),
        });
    }

    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-')))
    {
        return Err(TemplateError::UnsafeShellInput {
            field: field.to_string(),
            reason: format!("contains forbidden character {bad:?}"),
        });
    }

    Ok(())
}
