//! Mapping between `(prefix, version tag)` and vendor media types of the
//! shape `application/{prefix}.{tag}+json`.

use std::fmt;

use axum::http::HeaderValue;

use crate::errors::MediaTypeError;

const TYPE_PREFIX: &str = "application/";
const JSON_SUFFIX: &str = "+json";

/// A validated vendor media type for one version of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    version: String,
    essence: String,
}

impl MediaType {
    pub fn new(prefix: &str, version: &str) -> Result<Self, MediaTypeError> {
        validate_prefix(prefix)?;
        validate_version_tag(version)?;

        Ok(Self {
            version: version.to_string(),
            essence: media_type(prefix, version),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn as_str(&self) -> &str {
        &self.essence
    }

    /// Header form, used as the outgoing `Content-Type`.
    pub fn header_value(&self) -> HeaderValue {
        // Only token characters survive validation, so this cannot fail.
        HeaderValue::from_str(&self.essence)
            .unwrap_or_else(|_| HeaderValue::from_static("application/json"))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence)
    }
}

/// Builds the media type for a version tag. Performs no validation, see
/// [`MediaType::new`] for the checked form.
pub fn media_type(prefix: &str, version: &str) -> String {
    format!("{TYPE_PREFIX}{prefix}.{version}{JSON_SUFFIX}")
}

/// Recovers the version tag from a media type produced by [`media_type`].
///
/// Only the leading `{prefix}.` is stripped, so a tag that happens to
/// contain the prefix text still parses to itself.
pub fn parse_version_tag<'a>(media_type: &'a str, prefix: &str) -> Option<&'a str> {
    let media_type = media_type.trim();
    let subtype = strip_prefix_ignore_case(media_type, TYPE_PREFIX)?;
    let subtype = strip_suffix_ignore_case(subtype, JSON_SUFFIX)?;
    let tag = subtype.strip_prefix(prefix)?.strip_prefix('.')?;

    validate_version_tag(tag).ok().map(|_| tag)
}

pub fn validate_prefix(prefix: &str) -> Result<(), MediaTypeError> {
    validate_part("prefix", prefix)
}

pub fn validate_version_tag(version: &str) -> Result<(), MediaTypeError> {
    validate_part("version tag", version)
}

// RFC 7230 tchar, minus '+' which would collide with the structured suffix.
fn validate_part(part: &'static str, value: &str) -> Result<(), MediaTypeError> {
    if value.is_empty() {
        return Err(MediaTypeError::Empty(part));
    }
    if value.starts_with('.') || value.ends_with('.') {
        return Err(MediaTypeError::InvalidCharacter {
            part,
            value: value.to_string(),
            found: '.',
        });
    }

    let bad = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || "!#$%&'*-.^_`|~".contains(*c)));

    match bad {
        Some(found) => Err(MediaTypeError::InvalidCharacter {
            part,
            value: value.to_string(),
            found,
        }),
        None => Ok(()),
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;
    let tail = value.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &value[..split])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_vendor_media_type() {
        assert_eq!(
            media_type("vnd.example.user", "v3"),
            "application/vnd.example.user.v3+json"
        );
    }

    #[test]
    fn extracts_the_version() {
        let tag = parse_version_tag("application/vnd.example.v1+json", "vnd.example");
        assert_eq!(tag, Some("v1"));
    }

    #[test]
    fn parse_inverts_build() {
        for (prefix, version) in [
            ("vnd.example.user", "v1"),
            ("vnd.acme", "2024-01-01"),
            ("vnd.acme", "v1.2"),
        ] {
            let built = media_type(prefix, version);
            assert_eq!(parse_version_tag(&built, prefix), Some(version));
        }
    }

    #[test]
    fn tag_containing_the_prefix_still_parses() {
        let built = media_type("vnd", "vnd2");
        assert_eq!(parse_version_tag(&built, "vnd"), Some("vnd2"));
    }

    #[test]
    fn envelope_is_case_insensitive() {
        let tag = parse_version_tag("Application/vnd.example.v1+JSON", "vnd.example");
        assert_eq!(tag, Some("v1"));
    }

    #[test]
    fn foreign_media_types_have_no_tag() {
        assert_eq!(parse_version_tag("application/json", "vnd.example"), None);
        assert_eq!(parse_version_tag("text/vnd.example.v1+json", "vnd.example"), None);
        assert_eq!(parse_version_tag("application/vnd.other.v1+json", "vnd.example"), None);
        assert_eq!(parse_version_tag("application/vnd.example.+json", "vnd.example"), None);
        assert_eq!(parse_version_tag("application/vnd.examplev1+json", "vnd.example"), None);
    }

    #[test]
    fn rejects_characters_that_break_the_envelope() {
        assert!(matches!(
            MediaType::new("vnd.example", "v1+beta"),
            Err(MediaTypeError::InvalidCharacter { found: '+', .. })
        ));
        assert!(matches!(
            MediaType::new("vnd/example", "v1"),
            Err(MediaTypeError::InvalidCharacter { found: '/', .. })
        ));
        assert!(matches!(
            MediaType::new("vnd.example", ""),
            Err(MediaTypeError::Empty("version tag"))
        ));
        assert!(MediaType::new("vnd.example.", "v1").is_err());
    }

    #[test]
    fn checked_media_type_exposes_parts() {
        let media = MediaType::new("vnd.example.user", "v2").unwrap();
        assert_eq!(media.version(), "v2");
        assert_eq!(media.as_str(), "application/vnd.example.user.v2+json");
        assert_eq!(
            media.header_value(),
            HeaderValue::from_static("application/vnd.example.user.v2+json")
        );
    }
}
