//! Cache key definitions
//!
//! Entries are identified by request method plus the canonical absolute URL,
//! mirroring how a browser cache keys `Request` objects.

use hyper::Method;
use std::fmt;
use url::Url;

use crate::types::Result;

/// The two named cache partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Pages and static assets
    Pages,
    /// Media: remote clips and uploaded local videos
    Clips,
}

impl Partition {
    pub fn name(&self) -> &'static str {
        match self {
            Partition::Pages => "pages",
            Partition::Clips => "clips",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a cached request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: Method,
    pub url: Url,
}

impl CacheKey {
    /// Create a key from an absolute URL. Fragments never reach the network, so
    /// they are stripped.
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url }
    }

    /// Resolve a path (with optional query) against the origin
    pub fn for_path(method: Method, origin: &Url, path_and_query: &str) -> Result<Self> {
        Ok(Self::new(method, origin.join(path_and_query)?))
    }

    /// GET key for a path, used for media and pre-warmed assets
    pub fn get(origin: &Url, path_and_query: &str) -> Result<Self> {
        Self::for_path(Method::GET, origin, path_and_query)
    }

    /// Path component, used for policy lookup
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Convert to storage key string
    pub fn to_storage_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://scout.local:5000").unwrap()
    }

    #[test]
    fn test_canonical_url() {
        let a = CacheKey::get(&origin(), "/clips/load/g1/../g1/c1").unwrap();
        let b = CacheKey::get(&origin(), "/clips/load/g1/c1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_storage_key(), "GET http://scout.local:5000/clips/load/g1/c1");
    }

    #[test]
    fn test_method_is_part_of_identity() {
        let get = CacheKey::for_path(Method::GET, &origin(), "/test").unwrap();
        let post = CacheKey::for_path(Method::POST, &origin(), "/test").unwrap();
        assert_ne!(get.to_storage_key(), post.to_storage_key());
        assert_eq!(get.path(), post.path());
    }

    #[test]
    fn test_fragment_stripped_query_kept() {
        let key = CacheKey::get(&origin(), "/page?x=1#top").unwrap();
        assert_eq!(key.url.as_str(), "http://scout.local:5000/page?x=1");
        assert_eq!(key.path(), "/page");
    }
}
