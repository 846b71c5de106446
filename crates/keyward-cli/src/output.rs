//! Output formatting for human-readable and JSON modes.
//!
//! Human mode uses colored terminal output.
//! JSON mode outputs pure JSON with no ANSI escapes.

use colored::Colorize;

/// Prints a success message.
pub fn print_success(msg: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ "status": "ok", "message": msg });
        println!("{}", obj);
    } else {
        println!("{} {}", "✓".green().bold(), msg);
    }
}

/// Prints key-value pairs, one per line, or a single JSON object.
pub fn print_fields(fields: &[(&str, String)], json_mode: bool) {
    if json_mode {
        let mut obj = serde_json::Map::new();
        for (key, value) in fields {
            obj.insert((*key).to_string(), serde_json::Value::String(value.clone()));
        }
        println!("{}", serde_json::Value::Object(obj));
        return;
    }

    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in fields {
        println!("{:<width$}  {}", key.bold(), value, width = width);
    }
}

/// Prints an error message.
pub fn print_error(msg: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ "error": msg });
        eprintln!("{}", obj);
    } else {
        eprintln!("{} {}", "error:".red().bold(), msg);
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validates a hex-encoded address string (64 hex chars = 32 bytes).
pub fn validate_address(s: &str) -> std::result::Result<(), String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() != 64 {
        return Err(format!(
            "address must be 64 hex characters (got {})",
            s.len()
        ));
    }
    if !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("address contains non-hex characters".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_address_passes() {
        assert!(validate_address(&"ab".repeat(32)).is_ok());
        assert!(validate_address(&format!("0x{}", "ab".repeat(32))).is_ok());
    }

    #[test]
    fn short_address_rejected() {
        assert!(validate_address("abcd").is_err());
    }

    #[test]
    fn non_hex_address_rejected() {
        assert!(validate_address(&"zz".repeat(32)).is_err());
    }
}
