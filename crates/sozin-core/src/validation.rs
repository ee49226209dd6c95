use crate::error::ValidationError;

/// Longest name the kernel accepts (IFNAMSIZ minus the trailing NUL).
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Checks a name the way the kernel's `dev_valid_name` does.
pub fn validate_interface_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName { field });
    }
    let invalid = |reason: &str| ValidationError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(invalid("longer than 15 bytes"));
    }
    if name == "." || name == ".." {
        return Err(invalid("reserved name"));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == ':' || c.is_whitespace() || c.is_control())
    {
        return Err(invalid("contains '/', ':' or whitespace"));
    }
    Ok(())
}
