// ============================================================================
// Log Sanitization Utility - Log Injection Prevention
// ============================================================================
//
// 🔒 SECURITY: Rejected CSRF requests are logged with their path, which is
// attacker-controlled. Everything user-supplied goes through here first:
// - newlines would forge extra log entries
// - ANSI escapes can rewrite what a terminal shows
// - unbounded input bloats the logs
//
// Tokens are never logged in clear, only redacted.
//
// ============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of characters kept from logged user input
const MAX_LOG_LENGTH: usize = 200;

static ANSI_ESCAPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("ANSI escape regex is valid")
});

/// Sanitize user input for safe logging
///
/// ```
/// use csrf_sync::utils::log_sanitizer::sanitize_for_log;
///
/// assert_eq!(sanitize_for_log("/submit\nINFO: fake"), "/submit INFO: fake");
/// assert_eq!(sanitize_for_log("/a\x1b[31mred\x1b[0m"), "/ared");
/// ```
pub fn sanitize_for_log(input: &str) -> String {
    let no_ansi = ANSI_ESCAPE_REGEX.replace_all(input, "");

    let mut sanitized = String::with_capacity(no_ansi.len().min(MAX_LOG_LENGTH + 3));
    let mut kept = 0;

    for c in no_ansi.chars() {
        let c = match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => continue,
            c => c,
        };

        if kept == MAX_LOG_LENGTH {
            sanitized.push_str("...");
            break;
        }

        sanitized.push(c);
        kept += 1;
    }

    sanitized
}

/// Redact a secret, keeping only its length
pub fn redact_sensitive(input: &str) -> String {
    format!("[REDACTED-{}]", input.len())
}
