use std::borrow::Borrow;
use std::fmt;

/// Cache identity of a loadable resource: a resolved URL.
///
/// Identity is by resource, so two catalog entries pointing at the same
/// storage key share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaKey(String);

impl MediaKey {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Concatenate a base endpoint and a storage key. The result is not
    /// validated as a URL.
    pub fn resolve(base: &str, storage_key: &str) -> Self {
        let mut url = String::with_capacity(base.len() + storage_key.len());
        url.push_str(base);
        url.push_str(storage_key);
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MediaKey {
    fn from(url: String) -> Self {
        Self(url)
    }
}

impl From<&str> for MediaKey {
    fn from(url: &str) -> Self {
        Self(url.to_owned())
    }
}

impl AsRef<str> for MediaKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MediaKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_concatenates_without_validation() {
        let key = MediaKey::resolve("https://bucket.example/", "audio/track 1.mp3");
        assert_eq!(key.as_str(), "https://bucket.example/audio/track 1.mp3");

        let raw = MediaKey::resolve("", "not a url");
        assert_eq!(raw.to_string(), "not a url");
    }
}
