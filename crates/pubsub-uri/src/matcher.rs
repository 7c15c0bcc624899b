//! Pure pattern matching over [`Uri`](crate::Uri) values.
//!
//! `matches` is the core predicate used to test an event channel (or
//! resource origin) against a subscription's pattern. The remaining
//! functions support propagation, which needs to rewrite the prefix of a
//! URI (e.g. translating a peer's `subscribers` base into a local one)
//! rather than just test membership.

use crate::{Uri, SEGMENT_WILDCARD};

fn http_family(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

fn scheme_matches(pattern: &str, candidate: &str, strict: bool) -> bool {
    if pattern == "*" {
        return true;
    }
    if pattern.eq_ignore_ascii_case(candidate) {
        return true;
    }
    !strict && http_family(pattern) && http_family(candidate)
}

fn host_matches(pattern: &str, candidate: &str) -> bool {
    pattern == SEGMENT_WILDCARD || pattern.eq_ignore_ascii_case(candidate)
}

fn path_matches(pattern: &[String], candidate: &[String]) -> bool {
    match pattern.split_first() {
        None => candidate.is_empty(),
        Some((segment, rest)) if segment == SEGMENT_WILDCARD && rest.is_empty() => {
            // Trailing `/*` matches any (possibly empty) remaining suffix.
            true
        }
        Some((segment, rest)) => match candidate.split_first() {
            None => false,
            Some((candidate_segment, candidate_rest)) => {
                (segment == SEGMENT_WILDCARD || segment == candidate_segment)
                    && path_matches(rest, candidate_rest)
            }
        },
    }
}

/// Is `candidate` an instance of `pattern`, in non-strict (http/https
/// equivalent) mode?
pub fn matches(pattern: &Uri, candidate: &Uri) -> bool {
    matches_mode(pattern, candidate, false)
}

/// As [`matches`], but `http` and `https` are distinct schemes. Used
/// internally for identity comparisons where scheme must be exact.
pub fn matches_strict(pattern: &Uri, candidate: &Uri) -> bool {
    matches_mode(pattern, candidate, true)
}

fn matches_mode(pattern: &Uri, candidate: &Uri, strict: bool) -> bool {
    scheme_matches(&pattern.scheme, &candidate.scheme, strict)
        && host_matches(&pattern.host, &candidate.host)
        && path_matches(&pattern.path, &candidate.path)
}

fn prefix_mode(uri: &Uri, base: &Uri, strict: bool) -> bool {
    scheme_matches(&base.scheme, &uri.scheme, strict)
        && host_matches(&base.host, &uri.host)
        && uri.path.len() >= base.path.len()
        && uri.path[..base.path.len()] == base.path[..]
}

/// Does `uri` begin with `base`'s scheme, host, and leading path segments?
/// Unlike [`matches`], `base` is treated as a literal prefix, not a
/// wildcard pattern.
pub fn has_prefix(uri: &Uri, base: &Uri) -> bool {
    prefix_mode(uri, base, false)
}

pub fn has_prefix_strict(uri: &Uri, base: &Uri) -> bool {
    prefix_mode(uri, base, true)
}

/// Rewrite `uri`'s `from` prefix to `to`, keeping the path suffix beyond
/// the prefix, and `uri`'s own query/fragment. Returns `uri` unchanged if
/// it does not have the `from` prefix.
pub fn change_prefix(uri: &Uri, from: &Uri, to: &Uri) -> Uri {
    if !has_prefix(uri, from) {
        return uri.clone();
    }
    let mut path = to.path.clone();
    path.extend_from_slice(&uri.path[from.path.len()..]);
    Uri {
        scheme: to.scheme.clone(),
        host: to.host.clone(),
        port: to.port,
        path,
        query: uri.query.clone(),
        fragment: uri.fragment.clone(),
    }
}

/// The path segments of `uri` beyond `base`'s prefix, or `None` if `uri`
/// does not start with `base`.
pub fn relative_to(uri: &Uri, base: &Uri) -> Option<Vec<String>> {
    if has_prefix(uri, base) {
        Some(uri.path[base.path.len()..].to_vec())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn literal_segment_matches_only_itself() {
        assert!(matches(&u("channel:///foo/bar"), &u("channel:///foo/bar")));
        assert!(!matches(&u("channel:///foo/bar"), &u("channel:///foo/baz")));
    }

    #[test]
    fn trailing_star_matches_any_suffix_of_one_or_more_segments() {
        let pattern = u("channel:///foo/*");
        assert!(matches(&pattern, &u("channel:///foo/bar")));
        assert!(matches(&pattern, &u("channel:///foo")));
        assert!(matches(&pattern, &u("channel:///foo/bar/baz")));
    }

    #[test]
    fn trailing_star_segment_matches_any_suffix_including_empty() {
        let pattern = u("channel:///foo/*/*");
        assert!(matches(&pattern, &u("channel:///foo/bar")));
        assert!(matches(&pattern, &u("channel:///foo/bar/baz")));
        assert!(matches(&pattern, &u("channel:///foo/bar/baz/qux")));
        assert!(!matches(&pattern, &u("channel:///foo")));
    }

    #[test]
    fn wildcard_scheme_matches_anything() {
        assert!(matches(&u("*://*/*"), &u("channel:///foo/bar")));
    }

    #[test]
    fn http_and_https_are_equivalent_unless_strict() {
        let pattern = u("http://test.com/foo");
        let candidate = u("https://test.com/foo");
        assert!(matches(&pattern, &candidate));
        assert!(!matches_strict(&pattern, &candidate));
    }

    #[test]
    fn host_is_case_insensitive() {
        assert!(matches(&u("http://Test.COM/foo"), &u("http://test.com/foo")));
    }

    #[test]
    fn wildcard_host_matches_any_host() {
        assert!(matches(&u("pubsub://*/*"), &u("pubsub://svc.internal/update")));
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        assert!(matches(
            &u("channel:///foo/bar?x=1#frag"),
            &u("channel:///foo/bar?y=2"),
        ));
    }

    #[test]
    fn has_prefix_is_literal_not_wildcard() {
        let base = u("http://svc.local/subscribers");
        assert!(has_prefix(&u("http://svc.local/subscribers/loc-1"), &base));
        assert!(!has_prefix(&u("http://svc.local/other/loc-1"), &base));
        // a literal "*" segment in the candidate is not a wildcard here
        assert!(!has_prefix(&u("http://svc.local/*"), &u("http://svc.local/subscribers")));
    }

    #[test]
    fn change_prefix_rewrites_base_and_keeps_suffix() {
        let from = u("http://upstream.local/subscribers");
        let to = u("http://downstream.local/subscribers");
        let original = u("http://upstream.local/subscribers/loc-42?access-key=abc");
        let rewritten = change_prefix(&original, &from, &to);
        assert_eq!(rewritten, u("http://downstream.local/subscribers/loc-42?access-key=abc"));
    }

    #[test]
    fn change_prefix_is_noop_without_matching_prefix() {
        let from = u("http://upstream.local/subscribers");
        let to = u("http://downstream.local/subscribers");
        let original = u("http://elsewhere.local/subscribers/loc-42");
        assert_eq!(change_prefix(&original, &from, &to), original);
    }

    #[test]
    fn relative_to_extracts_suffix_segments() {
        let base = u("http://svc.local/subscribers");
        let uri = u("http://svc.local/subscribers/loc-7");
        assert_eq!(relative_to(&uri, &base), Some(vec!["loc-7".to_owned()]));
        assert_eq!(relative_to(&u("http://other.local/subscribers/loc-7"), &base), None);
    }
}
