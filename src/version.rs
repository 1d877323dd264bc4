//! Alphanumeric version comparison.
//!
//! Version strings found in plugin descriptions are rarely well-formed semver;
//! "1.2", "v1.2b", "1.2 beta 3" and worse all occur in the wild. Comparison
//! here splits a string into numeric and alphabetic segments and compares them
//! pairwise: numeric segments compare as integers, alphabetic segments compare
//! case-insensitively, and a numeric segment sorts before an alphabetic one.
//! When one string is a prefix of the other, the shorter sorts first.

use std::cmp::Ordering;
use std::fmt;

/// A version string with a total, human-friendly ordering.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Number(u64),
    Text(String),
}

impl Version {
    /// Wraps a raw version string. Surrounding whitespace is ignored.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into().trim().to_owned(),
        }
    }

    /// The original string this version was built from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut digits = String::new();
        let mut letters = String::new();

        for c in self.raw.chars() {
            if c.is_ascii_digit() {
                if !letters.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut letters)));
                }
                digits.push(c);
            } else if c.is_alphabetic() {
                if !digits.is_empty() {
                    segments.push(number_segment(std::mem::take(&mut digits)));
                }
                letters.extend(c.to_lowercase());
            } else {
                // Everything else ('.', '-', spaces and so on) just separates segments.
                if !digits.is_empty() {
                    segments.push(number_segment(std::mem::take(&mut digits)));
                }
                if !letters.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut letters)));
                }
            }
        }

        if !digits.is_empty() {
            segments.push(number_segment(digits));
        }
        if !letters.is_empty() {
            segments.push(Segment::Text(letters));
        }

        segments
    }
}

fn number_segment(digits: String) -> Segment {
    // Digit runs longer than a u64 are clamped; nothing sensible is that long.
    Segment::Number(digits.parse().unwrap_or(u64::MAX))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.segments() == other.segments()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(&other.segments())
    }
}
