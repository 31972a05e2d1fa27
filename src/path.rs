//! Parsing of submitted keys into path steps.
//!
//! The wire contract for a key is:
//!
//! ```text
//! path    := segment ('.' segment)*
//! segment := identifier ('[' digits ']')?
//! ```
//!
//! where `identifier` names a destination field (or an arbitrary map key)
//! case-sensitively, and `digits` is a base-10 non-negative integer
//! addressing a sequence position. `Projects[0].Members[1].Name` therefore
//! parses into three steps, the first two carrying an index.

use crate::error::{PathParseError, PathParseErrorKind};

/// One parsed step of a submitted key: a named field, optionally followed by
/// one bracketed index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment<'key> {
    /// The identifier part of the segment.
    pub name: &'key str,
    /// The bracketed index, if the segment carries one.
    pub index: Option<usize>,
}

/// Parse a routed key into an ordered list of path steps.
///
/// A parse failure means the whole key is unusable; callers drop the
/// key/value pair and continue with the next one.
pub fn parse_path(key: &str) -> Result<Vec<PathSegment<'_>>, PathParseError> {
    let mut segments = Vec::new();
    let mut offset = 0usize;

    for raw in key.split('.') {
        segments.push(parse_segment(raw, offset)?);
        offset += raw.len() + 1;
    }

    Ok(segments)
}

fn parse_segment(raw: &str, offset: usize) -> Result<PathSegment<'_>, PathParseError> {
    let Some(bracket) = raw.find('[') else {
        if raw.is_empty() {
            return Err(PathParseError::new(PathParseErrorKind::EmptySegment, offset));
        }
        return Ok(PathSegment {
            name: raw,
            index: None,
        });
    };

    let name = &raw[..bracket];
    if name.is_empty() {
        return Err(PathParseError::new(PathParseErrorKind::EmptySegment, offset));
    }

    let rest = &raw[bracket + 1..];
    let Some(close) = rest.find(']') else {
        return Err(PathParseError::new(
            PathParseErrorKind::UnterminatedBracket,
            offset + bracket,
        ));
    };
    if close + 1 != rest.len() {
        return Err(PathParseError::new(
            PathParseErrorKind::TrailingCharacters,
            offset + bracket + 1 + close + 1,
        ));
    }

    let digits = &rest[..close];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PathParseError::new(
            PathParseErrorKind::InvalidIndex,
            offset + bracket + 1,
        ));
    }
    let index = digits.parse::<usize>().map_err(|_| {
        // all-digit input can still overflow usize
        PathParseError::new(PathParseErrorKind::InvalidIndex, offset + bracket + 1)
    })?;

    Ok(PathSegment {
        name,
        index: Some(index),
    })
}
