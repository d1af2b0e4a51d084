use super::error::ChatError;

const MAX_USERNAME_LEN: usize = 40;

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trims, collapses internal whitespace, strips characters outside `[A-Za-z0-9 _.\-]`, and caps
/// at 40 characters. Rejects an empty result.
pub fn sanitize_username(raw: &str) -> Result<String, ChatError> {
    let collapsed = collapse_whitespace(raw.trim());
    let filtered: String = collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '_' || *c == '.' || *c == '-')
        .collect();
    let trimmed = filtered.trim();

    if trimmed.is_empty() {
        return Err(ChatError::EmptyUsername);
    }

    Ok(trimmed.chars().take(MAX_USERNAME_LEN).collect())
}

/// Collapses whitespace, trims, and caps at `max_len`. Rejects an empty result.
pub fn sanitize_content(raw: &str, max_len: usize) -> Result<String, ChatError> {
    let collapsed = collapse_whitespace(raw.trim());

    if collapsed.is_empty() {
        return Err(ChatError::EmptyContent);
    }

    if looks_like_spam(&collapsed) {
        return Err(ChatError::SpamDetected);
    }

    Ok(collapsed.chars().take(max_len).collect())
}

/// True if `content` contains a URL scheme, a `www.` prefix, or a bare `label.tld` pattern
/// where `tld` is 2-10 letters.
pub fn looks_like_spam(content: &str) -> bool {
    let lower = content.to_ascii_lowercase();
    if lower.contains("http://") || lower.contains("https://") || lower.contains("www.") {
        return true;
    }

    for word in lower.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.');
        if let Some((label, tld)) = word.rsplit_once('.') {
            let label_ok = !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric());
            let tld_ok = (2..=10).contains(&tld.len()) && tld.chars().all(|c| c.is_ascii_alphabetic());
            if label_ok && tld_ok {
                return true;
            }
        }
    }

    false
}

/// Strips URL-like and domain-like substrings from an agent reply before it is stored, mirroring
/// [`looks_like_spam`]'s pattern set but removing rather than rejecting.
pub fn strip_urls(content: &str) -> String {
    content
        .split_whitespace()
        .filter(|word| !looks_like_spam(word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_trimmed_and_whitespace_collapsed() {
        assert_eq!(sanitize_username("  alice   bob  ").unwrap(), "alice bob");
    }

    #[test]
    fn username_strips_disallowed_characters() {
        assert_eq!(sanitize_username("alice!@#$%").unwrap(), "alice");
    }

    #[test]
    fn username_capped_at_forty_chars() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_username(&long).unwrap().len(), MAX_USERNAME_LEN);
    }

    #[test]
    fn empty_username_after_sanitization_is_rejected() {
        assert!(sanitize_username("!@#$%").is_err());
    }

    #[test]
    fn content_rejects_url_scheme() {
        assert!(sanitize_content("check out https://example.com", 200).is_err());
    }

    #[test]
    fn content_rejects_www_prefix() {
        assert!(sanitize_content("visit www.example.com", 200).is_err());
    }

    #[test]
    fn content_rejects_bare_domain_pattern() {
        assert!(sanitize_content("go to example.com now", 200).is_err());
    }

    #[test]
    fn content_allows_ordinary_sentences_with_periods() {
        assert!(sanitize_content("I think AAPL is a buy.", 200).is_ok());
    }

    #[test]
    fn content_is_capped_at_max_len() {
        let long = "word ".repeat(100);
        let sanitized = sanitize_content(&long, 10).unwrap();
        assert_eq!(sanitized.len(), 10);
    }

    #[test]
    fn strip_urls_removes_only_the_offending_tokens() {
        assert_eq!(strip_urls("buy AAPL see https://x.com for more"), "buy AAPL see for more");
    }
}
