//! Route template compilation and path matching.
//!
//! # Responsibilities
//! - Compile `{name}` templates into segment specs
//! - Match request paths segment by segment
//! - Capture placeholder values, percent-decoded when the result is UTF-8
//!
//! # Design Decisions
//! - Literal segments compare case-insensitively
//! - A placeholder owns its whole segment (`/files/{name}.txt` is rejected)
//! - Captures must be non-empty and never span a `/`

use std::collections::HashMap;
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while compiling a route template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("template {template:?} must start with '/'")]
    MissingLeadingSlash { template: String },
    #[error("segment {segment:?} of {template:?} mixes literal text with a placeholder")]
    MixedSegment { template: String, segment: String },
    #[error("placeholder {name:?} in {template:?} is not a valid identifier")]
    InvalidName { template: String, name: String },
    #[error("placeholder {name:?} appears more than once in {template:?}")]
    DuplicateName { template: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Lowercased literal text.
    Literal(String),
    /// Named capture.
    Capture(String),
}

/// Parameters captured from a matched path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: HashMap<String, String>,
}

impl PathParams {
    /// Value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Store a raw segment, percent-decoded when it decodes to valid UTF-8.
    fn insert(&mut self, name: &str, raw: &str) {
        let value = urlencoding::decode(raw)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        self.values.insert(name.to_string(), value);
    }
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    template: String,
    segments: Vec<Segment>,
}

impl PathMatcher {
    /// Compile a template such as `/api/download/{filename}`.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let Some(rest) = template.strip_prefix('/') else {
            return Err(RouteError::MissingLeadingSlash {
                template: template.to_string(),
            });
        };

        let mut seen = HashSet::new();
        let segments = rest
            .split('/')
            .map(|raw| parse_segment(template, raw, &mut seen))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// The template this matcher was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Match a request path, returning the captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let mut params = PathParams::default();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(expected) => {
                    if !literal_eq(expected, part) {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name, part);
                }
            }
        }

        // Segment counts must agree exactly.
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

fn parse_segment(
    template: &str,
    raw: &str,
    seen: &mut HashSet<String>,
) -> Result<Segment, RouteError> {
    let capture = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}'));
    match capture {
        Some(name) => {
            let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
            if !valid {
                return Err(RouteError::InvalidName {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            if !seen.insert(name.to_string()) {
                return Err(RouteError::DuplicateName {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            Ok(Segment::Capture(name.to_string()))
        }
        None if raw.contains('{') || raw.contains('}') => Err(RouteError::MixedSegment {
            template: template.to_string(),
            segment: raw.to_string(),
        }),
        None => Ok(Segment::Literal(raw.to_lowercase())),
    }
}

fn literal_eq(expected_lower: &str, actual: &str) -> bool {
    actual.eq_ignore_ascii_case(expected_lower) || actual.to_lowercase() == expected_lower
}
