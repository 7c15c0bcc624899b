//! A small URI value type plus the pattern matcher used throughout the
//! pubsub core: channel/resource pattern matching, prefix rewriting, and
//! relative-path extraction.
//!
//! This does not aim to be a general-purpose URI library (the host
//! framework already owns one) -- it models exactly the subset of URI
//! shapes the pubsub domain cares about: scheme, host, optional port,
//! `/`-separated path segments, and an opaque query/fragment tail that
//! matching never inspects.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

mod matcher;

pub use matcher::{change_prefix, has_prefix, has_prefix_strict, matches, matches_strict, relative_to};

/// Segment wildcard: matches exactly one path segment.
pub const SEGMENT_WILDCARD: &str = "*";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UriError {
    #[error("uri is empty")]
    Empty,
    #[error("uri {0:?} has no scheme")]
    MissingScheme(String),
    #[error("uri {0:?} has a non-numeric port")]
    InvalidPort(String),
}

/// A parsed URI: `scheme://host[:port]/seg1/seg2?query#fragment`.
///
/// `host` is `""` for the triple-slash form (`channel:///foo`) that the
/// pubsub domain uses for host-less channels, and may be the literal `*`
/// wildcard in a pattern. `query` and `fragment` are carried verbatim but
/// never participate in matching (see [`matches`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Uri {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: Vec<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl Uri {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port: None,
            path,
            query: None,
            fragment: None,
        }
    }

    /// `true` if the last path segment is the trailing multi-segment
    /// wildcard (`/*` as the final segment).
    pub fn is_suffix_wildcard_pattern(&self) -> bool {
        matches!(self.path.last().map(String::as_str), Some(SEGMENT_WILDCARD))
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(UriError::Empty);
        }

        let scheme_end = input.find(':').ok_or_else(|| UriError::MissingScheme(input.to_owned()))?;
        let scheme = &input[..scheme_end];
        if scheme.is_empty() {
            return Err(UriError::MissingScheme(input.to_owned()));
        }
        let mut rest = &input[scheme_end + 1..];

        let (host, port, mut rest_after_authority) = if let Some(stripped) = rest.strip_prefix("//") {
            rest = stripped;
            let authority_end = rest.find('/').unwrap_or(rest.len());
            let authority = &rest[..authority_end];
            let after = &rest[authority_end..];
            let authority = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
            let (host, port) = match authority.rsplit_once(':') {
                Some((h, p)) if !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()) => {
                    let port = p
                        .parse::<u16>()
                        .map_err(|_| UriError::InvalidPort(p.to_owned()))?;
                    (h.to_owned(), Some(port))
                }
                _ => (authority.to_owned(), None),
            };
            (host, port, after)
        } else {
            (String::new(), None, rest)
        };

        let fragment = rest_after_authority.find('#').map(|idx| {
            let frag = rest_after_authority[idx + 1..].to_owned();
            rest_after_authority = &rest_after_authority[..idx];
            frag
        });
        let query = rest_after_authority.find('?').map(|idx| {
            let q = rest_after_authority[idx + 1..].to_owned();
            rest_after_authority = &rest_after_authority[..idx];
            q
        });

        let path = rest_after_authority
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(Uri {
            scheme: scheme.to_owned(),
            host,
            port,
            path,
            query,
            fragment,
        })
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        for segment in &self.path {
            write!(f, "/{segment}")?;
        }
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl Serialize for Uri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}
