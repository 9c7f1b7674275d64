//! `Accept` header negotiation against a resource's declared representations.

use crate::errors::AppError;
use crate::versioning::media_type::MediaType;

/// Outcome of negotiating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// Serve the resource's own handler; the media type is always the latest.
    Latest(MediaType),
    /// Serve an older representation through its transform.
    Legacy(MediaType),
}

impl Negotiation {
    pub fn media_type(&self) -> &MediaType {
        match self {
            Negotiation::Latest(media) | Negotiation::Legacy(media) => media,
        }
    }
}

/// A single parsed media range from an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
struct MediaRange {
    kind: String,
    subtype: String,
    quality: f32,
}

impl MediaRange {
    /// Only `q` is read. Any other range parameter (`charset`, ...) is
    /// dropped, so `application/x+json; charset=utf-8` matches
    /// `application/x+json` instead of being treated as a different range.
    fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let essence = parts.next()?.trim();
        let (kind, subtype) = essence.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() || (kind == "*" && subtype != "*") {
            return None;
        }

        let mut quality = 1.0;
        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if key.trim().eq_ignore_ascii_case("q") {
                quality = value.trim().parse::<f32>().ok()?;
                if !quality.is_finite() {
                    return None;
                }
                quality = quality.clamp(0.0, 1.0);
            }
        }

        Some(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            quality,
        })
    }

    /// Higher is more specific, `None` when the range does not cover the type.
    fn specificity(&self, kind: &str, subtype: &str) -> Option<u8> {
        let mut score = 0;
        if self.kind == kind {
            score |= 2;
        } else if self.kind != "*" {
            return None;
        }
        if self.subtype == subtype {
            score |= 1;
        } else if self.subtype != "*" {
            return None;
        }
        Some(score)
    }
}

/// Parsed `Accept` header. An absent header accepts everything.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptHeader {
    ranges: Option<Vec<MediaRange>>,
}

impl AcceptHeader {
    pub fn parse(header: Option<&str>) -> Self {
        let ranges = header.map(|raw| {
            raw.split(',')
                .filter(|part| !part.trim().is_empty())
                .filter_map(MediaRange::parse)
                .collect()
        });
        Self { ranges }
    }

    /// Whether the client accepts `media_type`, judged by the most specific
    /// matching range (ties go to the higher quality).
    pub fn accepts(&self, media_type: &str) -> bool {
        let Some(ranges) = &self.ranges else {
            return true;
        };
        let Some((kind, subtype)) = media_type.split_once('/') else {
            return false;
        };
        let (kind, subtype) = (kind.to_ascii_lowercase(), subtype.to_ascii_lowercase());

        ranges
            .iter()
            .filter_map(|range| range.specificity(&kind, &subtype).map(|s| (s, range.quality)))
            .max_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)))
            .is_some_and(|(_, quality)| quality > 0.0)
    }

    pub fn accepts_anything(&self) -> bool {
        self.accepts("*/*")
    }
}

/// Picks the representation for a request.
///
/// A client that accepts `*/*` always gets the latest representation.
/// Otherwise the candidates are scanned oldest first and the first acceptable
/// one wins.
pub fn negotiate(
    accept: Option<&str>,
    candidates: &[MediaType],
    latest: &MediaType,
) -> Result<Negotiation, AppError> {
    let header = AcceptHeader::parse(accept);

    if header.accepts_anything() {
        return Ok(Negotiation::Latest(latest.clone()));
    }

    let selected = candidates
        .iter()
        .find(|candidate| header.accepts(candidate.as_str()))
        .ok_or_else(|| AppError::NotAcceptable {
            accept: accept.unwrap_or_default().to_string(),
            supported_types: candidates.iter().map(ToString::to_string).collect(),
        })?;

    if selected == latest {
        Ok(Negotiation::Latest(latest.clone()))
    } else {
        Ok(Negotiation::Legacy(selected.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<MediaType> {
        ["v1", "v2", "v3"]
            .iter()
            .map(|v| MediaType::new("vnd.example.user", v).unwrap())
            .collect()
    }

    fn run(accept: Option<&str>) -> Result<Negotiation, AppError> {
        let candidates = candidates();
        negotiate(accept, &candidates, &candidates[2])
    }

    fn version(accept: &str) -> (bool, String) {
        match run(Some(accept)).unwrap() {
            Negotiation::Latest(media) => (true, media.version().to_string()),
            Negotiation::Legacy(media) => (false, media.version().to_string()),
        }
    }

    #[test]
    fn wildcard_and_missing_header_force_latest() {
        assert_eq!(version("*/*"), (true, "v3".into()));
        assert_eq!(version("application/vnd.example.user.v1+json, */*;q=0.1"), (true, "v3".into()));
        assert!(matches!(run(None), Ok(Negotiation::Latest(m)) if m.version() == "v3"));
    }

    #[test]
    fn exact_match_selects_legacy_version() {
        assert_eq!(version("application/vnd.example.user.v1+json"), (false, "v1".into()));
        assert_eq!(version("application/vnd.example.user.v2+json"), (false, "v2".into()));
        assert_eq!(version("APPLICATION/VND.EXAMPLE.USER.V2+JSON"), (false, "v2".into()));
    }

    #[test]
    fn exact_latest_is_native() {
        assert_eq!(version("application/vnd.example.user.v3+json"), (true, "v3".into()));
    }

    #[test]
    fn first_declared_match_wins_regardless_of_quality() {
        let accept = "application/vnd.example.user.v3+json;q=1, application/vnd.example.user.v2+json;q=0.2";
        assert_eq!(version(accept), (false, "v2".into()));
        assert_eq!(version("application/*"), (false, "v1".into()));
    }

    #[test]
    fn zero_quality_excludes_a_type() {
        let accept = "application/*, application/vnd.example.user.v1+json;q=0";
        assert_eq!(version(accept), (false, "v2".into()));
        assert!(run(Some("*/*;q=0")).is_err());
    }

    #[test]
    fn unsupported_type_lists_every_candidate() {
        match run(Some("application/json")) {
            Err(AppError::NotAcceptable {
                accept,
                supported_types,
            }) => {
                assert_eq!(accept, "application/json");
                assert_eq!(
                    supported_types,
                    [
                        "application/vnd.example.user.v1+json",
                        "application/vnd.example.user.v2+json",
                        "application/vnd.example.user.v3+json",
                    ]
                );
            }
            other => panic!("expected NotAcceptable, got {other:?}"),
        }
    }

    #[test]
    fn empty_or_garbage_header_accepts_nothing() {
        assert!(run(Some("")).is_err());
        assert!(run(Some("nonsense")).is_err());
        assert!(run(Some("application/vnd.example.user.v1+json;q=abc")).is_err());
    }

    #[test]
    fn parameters_other_than_quality_are_ignored() {
        let accept = "application/vnd.example.user.v2+json; charset=utf-8";
        assert_eq!(version(accept), (false, "v2".into()));
        let accept = "application/vnd.example.user.v1+json; charset=utf-8";
        assert_eq!(version(accept), (false, "v1".into()));
    }

    #[test]
    fn missing_header_accepts_everything() {
        let header = AcceptHeader::parse(None);
        assert!(header.accepts_anything());
        assert!(header.accepts("text/html"));
    }

    #[test]
    fn type_wildcard_does_not_imply_any() {
        let header = AcceptHeader::parse(Some("application/*"));
        assert!(!header.accepts_anything());
        assert!(header.accepts("application/json"));
        assert!(!header.accepts("text/html"));
    }
}
