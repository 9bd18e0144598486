//! Legacy page file parsing
//!
//! A legacy page is markdown with optional YAML frontmatter:
//!
//! ```text
//! ---
//! uuid: 550e8400-e29b-41d4-a716-446655440000
//! title: Main
//! author: alice
//! lastModified: 2024-01-01T00:00:00.000Z
//! ---
//! Body text
//! ```
//!
//! The body starts right after the closing `---` line.

use serde_yaml::Value;

/// Header fields the vault cares about; other keys are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pub uuid: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub last_modified: Option<String>,
}

/// Split a file into header fields and body.
///
/// Files without a frontmatter block yield empty fields and the whole text
/// as body. Malformed YAML is an error.
pub fn parse(raw: &str) -> Result<(Frontmatter, &str), serde_yaml::Error> {
    let Some((yaml, body)) = split(raw) else {
        return Ok((Frontmatter::default(), raw));
    };
    if yaml.trim().is_empty() {
        return Ok((Frontmatter::default(), body));
    }

    let value: Value = serde_yaml::from_str(yaml)?;
    let field = |key: &str| value.get(key).and_then(scalar_string);

    let fields = Frontmatter {
        uuid: field("uuid"),
        title: field("title"),
        author: field("author"),
        last_modified: field("lastModified"),
    };
    Ok((fields, body))
}

/// Returns `(yaml, body)` when `raw` opens with a `---` block that is closed.
fn split(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Non-empty scalar rendered as a string
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_header() {
        let raw = "---\nuuid: uuid-1\ntitle: Test\nauthor: alice\nlastModified: 2024-01-01T00:00:00.000Z\ncategories: [a, b]\n---\nHello";
        let (fields, body) = parse(raw).unwrap();

        assert_eq!(fields.uuid.as_deref(), Some("uuid-1"));
        assert_eq!(fields.title.as_deref(), Some("Test"));
        assert_eq!(fields.author.as_deref(), Some("alice"));
        assert_eq!(
            fields.last_modified.as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
        assert_eq!(body, "Hello");
    }

    #[test]
    fn test_body_is_kept_verbatim() {
        let raw = "---\nuuid: u\ntitle: T\n---\n\n# Heading\n---\nmore\n";
        let (_, body) = parse(raw).unwrap();
        assert_eq!(body, "\n# Heading\n---\nmore\n");
    }

    #[test]
    fn test_crlf_delimiters() {
        let raw = "---\r\nuuid: u\r\ntitle: T\r\n---\r\nBody\r\n";
        let (fields, body) = parse(raw).unwrap();
        assert_eq!(fields.uuid.as_deref(), Some("u"));
        assert_eq!(body, "Body\r\n");
    }

    #[test]
    fn test_no_frontmatter() {
        let (fields, body) = parse("Just text\n").unwrap();
        assert_eq!(fields, Frontmatter::default());
        assert_eq!(body, "Just text\n");
    }

    #[test]
    fn test_unclosed_frontmatter_is_body() {
        let raw = "---\nuuid: u\nno end";
        let (fields, body) = parse(raw).unwrap();
        assert!(fields.uuid.is_none());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_empty_frontmatter() {
        let (fields, body) = parse("---\n---\nBody").unwrap();
        assert_eq!(fields, Frontmatter::default());
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_non_string_scalars() {
        let (fields, _) = parse("---\nuuid: 12345\ntitle: true\nauthor: ''\n---\n").unwrap();
        assert_eq!(fields.uuid.as_deref(), Some("12345"));
        assert_eq!(fields.title.as_deref(), Some("true"));
        assert!(fields.author.is_none());
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(parse("---\nuuid: [unclosed\n---\nBody").is_err());
    }
}
