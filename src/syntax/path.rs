//! Path splitting and alias prefixes.

use crate::config::ChainConfig;
use crate::error::{ChainError, Result};

/// Split a string specification into its non-empty segments.
///
/// An escape character directly before the delimiter yields a literal
/// delimiter inside the segment; any other escape character is kept as is.
///
/// ```
/// use function_chain::{split_path, ChainConfig};
///
/// let config = ChainConfig::default();
/// assert_eq!(split_path("/bookstore//shelves/", &config), ["bookstore", "shelves"]);
/// assert_eq!(split_path(r"concat '\/DC'", &config), ["concat '/DC'"]);
/// ```
pub fn split_path(text: &str, config: &ChainConfig) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == config.escape && chars.peek() == Some(&config.delimiter) {
            current.push(config.delimiter);
            chars.next();
        } else if c == config.delimiter {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Separate an `@alias = ` prefix from the expression it names.
///
/// The alias runs from the `@` up to the first `=` that follows at least one
/// character. Segments without a prefix come back unchanged with no alias.
pub fn split_alias(segment: &str) -> Result<(Option<String>, &str)> {
    let Some(rest) = segment.strip_prefix('@') else {
        return Ok((None, segment));
    };
    let Some(first) = rest.chars().next() else {
        return Ok((None, segment));
    };
    let search_from = first.len_utf8();
    let Some(eq) = rest[search_from..].find('=').map(|at| at + search_from) else {
        return Ok((None, segment));
    };

    let name = rest[..eq].trim();
    if !is_identifier(name) {
        return Err(ChainError::InvalidAliasName(name.to_string()));
    }
    Ok((Some(name.to_string()), rest[eq + 1..].trim()))
}

/// `[A-Za-z_][A-Za-z0-9_]*`, optionally ending in `?` or `!`.
pub fn is_identifier(name: &str) -> bool {
    let body = name
        .strip_suffix('?')
        .or_else(|| name.strip_suffix('!'))
        .unwrap_or(name);
    let mut chars = body.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_drops_empty_segments() {
        let config = ChainConfig::default();
        assert_eq!(
            split_path("/bookstore/shelves[:programing]//books[1]/title/", &config),
            vec!["bookstore", "shelves[:programing]", "books[1]", "title"]
        );
        assert!(split_path("///", &config).is_empty());
    }

    #[test]
    fn test_escaped_delimiter_is_literal() {
        let config = ChainConfig::default();
        assert_eq!(split_path(r"a\/b/c", &config), vec!["a/b", "c"]);
        assert_eq!(split_path(r"a\b", &config), vec![r"a\b"]);
    }

    #[test]
    fn test_custom_delimiter() {
        let config = ChainConfig::default().with_delimiter('|');
        assert_eq!(split_path(r"a/b|c\|d", &config), vec!["a/b", "c|d"]);
    }

    #[test]
    fn test_alias_prefix() {
        let (alias, body) = split_alias("@shelf = shelves[:mystery]").unwrap();
        assert_eq!(alias.as_deref(), Some("shelf"));
        assert_eq!(body, "shelves[:mystery]");

        let (alias, body) = split_alias("@s=a == b").unwrap();
        assert_eq!(alias.as_deref(), Some("s"));
        assert_eq!(body, "a == b");
    }

    #[test]
    fn test_no_alias_prefix() {
        assert_eq!(split_alias("books[1]").unwrap(), (None, "books[1]"));
        assert_eq!(split_alias("@shelf").unwrap(), (None, "@shelf"));
    }

    #[test]
    fn test_invalid_alias_names() {
        for bad in ["1", "!", "=", "@", "[", ".", "~"] {
            let segment = format!("@{}x = bookstore", bad);
            assert!(
                matches!(split_alias(&segment), Err(ChainError::InvalidAliasName(_))),
                "accepted {:?}",
                segment
            );
        }
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("_tmp"));
        assert!(is_identifier("empty?"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("a.b"));
    }
}
