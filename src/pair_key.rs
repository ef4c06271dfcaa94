//! A key for unordered pairs of items.

use std::fmt;
use std::str::FromStr;

use crate::error::MRError;

/// An unordered pair of strings. The constructor stores the smaller string (byte-wise) first, so
/// `PairKey::new(x, y) == PairKey::new(y, x)`. Derived ordering is lexicographic on
/// `(first, second)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new<A: Into<String>, B: Into<String>>(a: A, b: B) -> PairKey {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            PairKey {
                first: a,
                second: b,
            }
        } else {
            PairKey {
                first: b,
                second: a,
            }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }
}

/// Renders as `(first, second)`. Only keys whose items do not contain `", "` can be parsed back.
impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

impl FromStr for PairKey {
    type Err = MRError;

    /// Parses the `Display` form back. The result is canonicalized again, so `(b, a)` parses to
    /// the same key as `(a, b)`. More than one `", "` is ambiguous and rejected.
    fn from_str(s: &str) -> Result<PairKey, MRError> {
        let inner = s.strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| MRError::parse(s, "pair key must be enclosed in parentheses"))?;
        match inner.split_once(", ") {
            Some((_, b)) if b.contains(", ") => {
                Err(MRError::parse(s, "ambiguous pair key: an item contains \", \""))
            }
            Some((a, b)) => Ok(PairKey::new(a, b)),
            None => Err(MRError::parse(s, "pair key needs two items separated by \", \"")),
        }
    }
}
