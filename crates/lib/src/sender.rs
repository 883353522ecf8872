//! Sender allow-list check.
//!
//! Deliberately a tiny parser rather than an RFC 5322 one: take the address out of
//! `Name <addr>` (or use the bare string), lower-case it, and split the domain at the last `@`.

/// Extract the lower-cased address from `Name <addr>`, `"Name" <addr>` or a bare `addr`.
pub fn extract_address(sender: &str) -> String {
    let s = sender.trim();
    let addr = match (s.rfind('<'), s.rfind('>')) {
        (Some(open), Some(close)) if open < close => &s[open + 1..close],
        (Some(open), None) => &s[open + 1..],
        _ => s,
    };
    addr.trim().to_lowercase()
}

/// Domain part of an address: everything after the last `@`, without a trailing `>`.
/// Empty when there is no `@`.
pub fn extract_domain(address: &str) -> String {
    match address.rfind('@') {
        Some(i) => address[i + 1..].trim_end_matches('>').trim().to_lowercase(),
        None => String::new(),
    }
}

/// True when `sender` may commit. Empty allow-list allows everyone.
///
/// Entries containing `@` are compared with the whole address, other entries with the domain.
/// Both comparisons are exact and case-insensitive.
pub fn is_allowed(sender: &str, allow_list: &[String]) -> bool {
    if allow_list.is_empty() {
        return true;
    }
    let addr = extract_address(sender);
    let domain = extract_domain(&addr);

    allow_list.iter().any(|entry| {
        let entry = entry.trim().to_lowercase();
        if entry.is_empty() {
            false
        } else if entry.contains('@') {
            addr == entry
        } else {
            !domain.is_empty() && domain == entry
        }
    })
}
