//! Classification of image locators
//!
//! A locator is whatever the `Image Name` column holds. Before anything is
//! loaded it is sorted into one of the shapes the loader understands, and
//! anything else is rejected as malformed so the probe can answer
//! `Invalid` without touching the filesystem or network.

use std::fmt;
use std::path::Path;

/// Why a locator was rejected before loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedLocator {
    Empty,
    /// `data:` URL without the `,` separating header and payload
    DataUrlWithoutPayload,
    UnsupportedScheme(String),
}

impl fmt::Display for MalformedLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedLocator::Empty => write!(f, "empty locator"),
            MalformedLocator::DataUrlWithoutPayload => write!(f, "data URL has no payload"),
            MalformedLocator::UnsupportedScheme(scheme) => {
                write!(f, "unsupported scheme {scheme:?}")
            }
        }
    }
}

/// A parsed image locator borrowing from the raw string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator<'a> {
    /// Inline `data:` URL
    Data {
        raw: &'a str,
        base64: bool,
        /// Still encoded: base64 when `base64` is set, percent-encoded otherwise
        payload: &'a str,
    },
    /// `http://` or `https://` URL
    Remote(&'a str),
    /// Filesystem path, either bare or from a `file://` URL
    File { raw: &'a str, path: &'a Path },
}

impl<'a> Locator<'a> {
    /// Sort a raw locator into a loadable shape
    pub fn parse(raw: &'a str) -> Result<Self, MalformedLocator> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MalformedLocator::Empty);
        }

        let Some(scheme) = scheme_of(trimmed) else {
            return Ok(Locator::File {
                raw,
                path: Path::new(trimmed),
            });
        };

        match scheme.to_ascii_lowercase().as_str() {
            "data" => {
                let rest = &trimmed[scheme.len() + 1..];
                let (header, payload) = rest
                    .split_once(',')
                    .ok_or(MalformedLocator::DataUrlWithoutPayload)?;
                let base64 = header
                    .split(';')
                    .any(|param| param.eq_ignore_ascii_case("base64"));
                Ok(Locator::Data {
                    raw,
                    base64,
                    payload,
                })
            }
            "http" | "https" => Ok(Locator::Remote(trimmed)),
            "file" => {
                let rest = &trimmed[scheme.len() + 1..];
                let path = rest.strip_prefix("//").unwrap_or(rest);
                if path.is_empty() {
                    return Err(MalformedLocator::Empty);
                }
                Ok(Locator::File {
                    raw,
                    path: Path::new(path),
                })
            }
            _ => Err(MalformedLocator::UnsupportedScheme(scheme.to_string())),
        }
    }

    /// The locator exactly as it appeared on the record
    pub fn as_str(&self) -> &'a str {
        match *self {
            Locator::Data { raw, .. } | Locator::File { raw, .. } => raw,
            Locator::Remote(url) => url,
        }
    }
}

/// URL scheme per RFC 3986, if the string starts with one
///
/// Single-letter schemes are treated as Windows drive letters (`C:\...`).
fn scheme_of(s: &str) -> Option<&str> {
    let (scheme, _) = s.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    (valid && scheme.len() > 1).then_some(scheme)
}
