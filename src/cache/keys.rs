//! Page cache keys.

use std::fmt;

use axum::http::Uri;

/// Request identity a cached page is stored under: path plus raw query string.
///
/// `/?page=2` and `/` are distinct entries; `/?page=2&x=1` and `/?x=1&page=2`
/// are distinct as well since the query is not normalised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    path: String,
    query: String,
}

impl PageKey {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }

    pub fn from_uri(uri: &Uri) -> Self {
        Self::new(uri.path(), uri.query().unwrap_or(""))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_is_part_of_the_identity() {
        let first: Uri = "/?page=1".parse().expect("valid uri");
        let second: Uri = "/?page=2".parse().expect("valid uri");
        let bare: Uri = "/".parse().expect("valid uri");

        assert_ne!(PageKey::from_uri(&first), PageKey::from_uri(&second));
        assert_ne!(PageKey::from_uri(&first), PageKey::from_uri(&bare));
        assert_eq!(PageKey::from_uri(&bare), PageKey::new("/", ""));
    }

    #[test]
    fn display_round_trips_the_request_target() {
        assert_eq!(PageKey::new("/", "page=2").to_string(), "/?page=2");
        assert_eq!(PageKey::new("/", "").to_string(), "/");
    }
}
