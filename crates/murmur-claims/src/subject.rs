//! Subject patterns and token-wise matching.
//!
//! Subjects are dot-separated token strings. Two wildcards exist:
//! `*` matches exactly one token, `>` matches one or more trailing tokens
//! and may only appear as the final token.

use crate::errors::ClaimsError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated subject or subject pattern.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Subject(String);

impl Subject {
    /// Validate and wrap a subject string.
    pub fn new(s: impl Into<String>) -> Result<Self, ClaimsError> {
        let s = s.into();
        if !is_valid(&s) {
            return Err(ClaimsError::InvalidSubject(s));
        }
        Ok(Self(s))
    }

    /// The raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this pattern matches a literal subject.
    pub fn matches(&self, literal: &str) -> bool {
        subset_match(
            &self.0.split('.').collect::<Vec<_>>(),
            &literal.split('.').collect::<Vec<_>>(),
        )
    }

    /// Whether this pattern covers every subject `other` can match.
    ///
    /// Used to decide if an export's pattern is wide enough to serve an
    /// import's pattern.
    pub fn subsumes(&self, other: &Subject) -> bool {
        subset_match(
            &self.0.split('.').collect::<Vec<_>>(),
            &other.0.split('.').collect::<Vec<_>>(),
        )
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subject({:?})", self.0)
    }
}

impl TryFrom<String> for Subject {
    type Error = ClaimsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Subject> for String {
    fn from(s: Subject) -> Self {
        s.0
    }
}

/// Structural validity: non-empty tokens, `>` only in final position.
fn is_valid(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let tokens: Vec<&str> = s.split('.').collect();
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_empty() {
            return false;
        }
        if *tok == ">" && i != tokens.len() - 1 {
            return false;
        }
    }
    true
}

/// Token-wise subset match: does `pattern` match everything `subject`
/// matches? `subject` may itself contain wildcards; a literal subject is
/// just the degenerate case.
fn subset_match(pattern: &[&str], subject: &[&str]) -> bool {
    let mut i = 0;
    loop {
        match (pattern.get(i), subject.get(i)) {
            (Some(&">"), Some(_)) => return true,
            (Some(_), Some(&">")) => return false,
            (Some(&"*"), Some(_)) => {}
            (Some(p), Some(s)) => {
                if p != s {
                    return false;
                }
            }
            (None, None) => return true,
            // One side ran out of tokens.
            (_, _) => return false,
        }
        i += 1;
    }
}
