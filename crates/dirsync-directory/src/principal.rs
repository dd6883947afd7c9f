//! Principal formatting and search filters.
//!
//! The same formatting rule is applied to the service bind identity and to
//! every per-user search, so both always agree on what a principal looks like.

/// Directory attribute the per-user search filters on.
pub const PRINCIPAL_ATTRIBUTE: &str = "userPrincipalName";

/// Format a login name as a directory principal.
///
/// Returns `login@domain` when a non-blank domain is given, otherwise the bare
/// login name.
///
/// ```
/// use dirsync_directory::format_principal;
///
/// assert_eq!(format_principal("alice", Some("EXAMPLE")), "alice@EXAMPLE");
/// assert_eq!(format_principal("alice", None), "alice");
/// ```
#[must_use]
pub fn format_principal(login: &str, domain: Option<&str>) -> String {
    match domain {
        Some(domain) if !domain.trim().is_empty() => format!("{login}@{domain}"),
        _ => login.to_string(),
    }
}

/// Escape special characters in LDAP filter values (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// Build the per-user search filter for an already formatted principal.
#[must_use]
pub fn principal_filter(principal: &str) -> String {
    format!(
        "({}={})",
        PRINCIPAL_ATTRIBUTE,
        escape_filter_value(principal)
    )
}
