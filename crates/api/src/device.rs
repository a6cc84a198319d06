//! Device fingerprinting from the User-Agent header

/// Derives an opaque device fingerprint from a User-Agent string. Returns
/// `None` for an absent or empty header.
pub fn device_fingerprint(user_agent: Option<&str>) -> Option<String> {
    let ua = user_agent?.trim();
    if ua.is_empty() {
        return None;
    }
    let mut fingerprint = String::with_capacity(ua.len());
    for c in ua.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            fingerprint.push(c.to_ascii_lowercase());
        } else if !fingerprint.ends_with('-') && !fingerprint.is_empty() {
            fingerprint.push('-');
        }
    }
    let fingerprint = fingerprint.trim_matches('-').to_string();
    if fingerprint.is_empty() {
        None
    } else {
        Some(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_user_agent_text() {
        assert_eq!(
            device_fingerprint(Some("Mozilla/5.0 (X11; Linux)")).as_deref(),
            Some("mozilla-5.0-x11-linux")
        );
    }

    #[test]
    fn absent_or_empty_yields_none() {
        assert_eq!(device_fingerprint(None), None);
        assert_eq!(device_fingerprint(Some("   ")), None);
        assert_eq!(device_fingerprint(Some("()")), None);
    }

    #[test]
    fn stable_for_same_input() {
        let a = device_fingerprint(Some("curl/8.5.0"));
        let b = device_fingerprint(Some("curl/8.5.0"));
        assert_eq!(a, b);
    }
}
