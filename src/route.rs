//! Routing of raw submission keys, before path parsing.
//!
//! Routing decides, for each raw key of the submission, whether the key
//! participates in binding at all and what (possibly rewritten) key is
//! handed to the path parser. The two stock policies, prefix stripping and
//! an exact-name allow-list, are both special cases of the general form: a
//! plain function from raw key to optional routed key, which closures
//! implement directly.

use std::borrow::Cow;

/// A routing policy: maps a raw submission key to the key that gets parsed
/// and bound, or to `None` to skip the pair entirely.
pub trait KeyRoute {
    /// Route one raw key.
    fn route<'key>(&self, raw: &'key str) -> Option<Cow<'key, str>>;
}

impl<F> KeyRoute for F
where
    F: for<'key> Fn(&'key str) -> Option<Cow<'key, str>>,
{
    fn route<'key>(&self, raw: &'key str) -> Option<Cow<'key, str>> {
        self(raw)
    }
}

/// Accept keys starting with a prefix and bind the remainder.
///
/// The match is an exact byte match with no separator requirement, so the
/// prefix `"Person"` accepts both `"Person.Name"` and `"PersonName"`. A
/// single `.` separator left over after stripping a non-empty prefix is
/// trimmed: `"Person.Name"` routes to `"Name"`. The empty prefix accepts
/// every key unchanged.
#[derive(Debug, Clone, Copy)]
pub struct ByPrefix<'a>(pub &'a str);

impl KeyRoute for ByPrefix<'_> {
    fn route<'key>(&self, raw: &'key str) -> Option<Cow<'key, str>> {
        let rest = raw.strip_prefix(self.0)?;
        if self.0.is_empty() {
            return Some(Cow::Borrowed(raw));
        }
        Some(Cow::Borrowed(rest.strip_prefix('.').unwrap_or(rest)))
    }
}

/// Accept only keys exactly equal to one of the listed names, unchanged.
#[derive(Debug, Clone, Copy)]
pub struct ByNames<'a>(pub &'a [&'a str]);

impl KeyRoute for ByNames<'_> {
    fn route<'key>(&self, raw: &'key str) -> Option<Cow<'key, str>> {
        if self.0.contains(&raw) {
            Some(Cow::Borrowed(raw))
        } else {
            None
        }
    }
}
