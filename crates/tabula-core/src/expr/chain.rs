use derive_more::{Deref, IntoIterator};
use std::fmt;

///
/// PropertyChain
///
/// Dotted path of property names rooted at the iterated record type, used by
/// sort clauses (`Address.Country.Name`). Every hop but the last must be a
/// to-one link; the schema checks that when the chain is resolved.
///

#[derive(Clone, Debug, Deref, Eq, Hash, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct PropertyChain(Vec<String>);

impl PropertyChain {
    #[must_use]
    pub fn new<I, S>(hops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(hops.into_iter().map(Into::into).collect())
    }

    /// Split a dotted path. Empty segments are kept so resolution can report
    /// them against the schema.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self(Vec::new());
        }

        Self::new(path.split('.'))
    }

    #[must_use]
    pub fn hops(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for PropertyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for PropertyChain {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for PropertyChain {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for PropertyChain {
    fn from(hops: [S; N]) -> Self {
        Self::new(hops)
    }
}
