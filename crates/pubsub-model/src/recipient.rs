use std::hash::{Hash, Hasher};

use pubsub_uri::Uri;

/// A delivery target plus an optional bearer token. Equality and hashing
/// are keyed on `uri` alone, so a `HashSet<Recipient>`/dedup-by-uri
/// naturally collapses repeated subscriptions to the same endpoint even
/// if their auth tokens happen to differ (the first one registered wins).
#[derive(Debug, Clone)]
pub struct Recipient {
    pub uri: Uri,
    pub auth_token: Option<String>,
}

impl Recipient {
    pub fn new(uri: Uri, auth_token: Option<String>) -> Self {
        Self { uri, auth_token }
    }
}

impl PartialEq for Recipient {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for Recipient {}

impl Hash for Recipient {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_auth_token() {
        let a = Recipient::new("http://test.com/foo/sub1".parse().unwrap(), Some("tok-a".into()));
        let b = Recipient::new("http://test.com/foo/sub1".parse().unwrap(), Some("tok-b".into()));
        assert_eq!(a, b);
    }

    #[test]
    fn inequality_on_different_uri() {
        let a = Recipient::new("http://test.com/foo/sub1".parse().unwrap(), None);
        let b = Recipient::new("http://test.com/foo/sub2".parse().unwrap(), None);
        assert_ne!(a, b);
    }
}
