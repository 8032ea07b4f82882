//! Request-target splitting.

/// The five components of a URI reference, per the RFC 3986 appendix B
/// split. Components that do not appear are empty strings; origin-form
/// request targets have empty scheme and authority.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Uri {
    scheme: String,
    authority: String,
    path: String,
    query: String,
    fragment: String,
}

impl Uri {
    /// Splits a request target into its components.
    ///
    /// This is the plain five-way split: no percent-decoding and no
    /// validation beyond locating the delimiters.
    #[must_use]
    pub fn parse(target: &str) -> Self {
        let mut rest = target;

        let fragment = match rest.split_once('#') {
            Some((before, fragment)) => {
                rest = before;
                fragment
            }
            None => "",
        };

        // A scheme is a non-empty prefix before the first ':' that appears
        // ahead of any '/', '?', or '#'.
        let mut scheme = "";
        if let Some((candidate, after)) = rest.split_once(':') {
            if !candidate.is_empty() && !candidate.contains(['/', '?']) {
                scheme = candidate;
                rest = after;
            }
        }

        let query = match rest.split_once('?') {
            Some((before, query)) => {
                rest = before;
                query
            }
            None => "",
        };

        let mut authority = "";
        if let Some(after) = rest.strip_prefix("//") {
            match after.find('/') {
                Some(index) => {
                    authority = &after[..index];
                    rest = &after[index..];
                }
                None => {
                    authority = after;
                    rest = "";
                }
            }
        }

        Self {
            scheme: scheme.to_owned(),
            authority: authority.to_owned(),
            path: rest.to_owned(),
            query: query.to_owned(),
            fragment: fragment.to_owned(),
        }
    }

    /// Scheme component, empty when absent.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Authority component, empty when absent.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Path component.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query component, empty when absent.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Fragment component, empty when absent.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}
