use std::sync::Arc;
use std::time::Duration;

use pubsub_model::doc::{RecipientDoc, SubscriptionDoc, SubscriptionSetDoc};
use pubsub_registry::{dispatch, DispatchConfig, Registry};
use pubsub_test_support::{sample_event, subscription_set_doc, uri, RecordingTransport};

#[tokio::test]
async fn register_read_replace_delete_round_trip() {
    let registry = Registry::new(uri("http:///self"), None);
    let (set, already_existed) = registry.register(subscription_set_doc("http:///owner1", "channel:///foo/*", "http:///foo/sub1")).await.unwrap();
    assert!(!already_existed);

    let got = registry.get(&set.location, set.access_key.as_str()).await.unwrap();
    assert_eq!(got, set);

    let mut shorter = subscription_set_doc("http:///owner1", "channel:///foo/*", "http:///foo/sub1");
    shorter.subscriptions[0].cookies.clear();
    let replaced = registry.replace(&set.location, set.access_key.as_str(), shorter).await.unwrap();
    let replaced_set = match replaced {
        pubsub_registry::ReplaceOutcome::Replaced(s) => s,
        pubsub_registry::ReplaceOutcome::NotModified(_) => panic!("expected a replace"),
    };
    assert_eq!(replaced_set.location, set.location);

    registry.remove(&set.location, set.access_key.as_str()).await.unwrap();
    let err = registry.get(&set.location, set.access_key.as_str()).await.unwrap_err();
    assert!(matches!(err, pubsub_registry::RegistryError::Forbidden));
}

#[tokio::test]
async fn combined_set_merges_subscriptions_from_two_owners() {
    let registry = Registry::new(uri("http:///self"), None);

    let mut doc1 = subscription_set_doc("http:///o1", "channel:///c1", "http:///r1");
    doc1.subscriptions[0].channels.push(uri("channel:///c2"));
    registry.register(doc1).await.unwrap();

    let mut doc2 = subscription_set_doc("http:///o2", "channel:///c1", "http:///r2");
    doc2.subscriptions[0].channels.push(uri("channel:///c3"));
    registry.register(doc2).await.unwrap();

    let combined = registry.combined_set().await;
    let doc = combined.as_doc();
    assert_eq!(doc.subscriptions.len(), 3);

    let c1 = doc.subscriptions.iter().find(|s| s.channels == vec![uri("channel:///c1")]).expect("c1 subscription");
    let mut recipients: Vec<_> = c1.recipients.iter().map(|r| r.uri.to_string()).collect();
    recipients.sort();
    assert_eq!(recipients, vec!["http:///r1".to_owned(), "http:///r2".to_owned()]);
}

#[tokio::test]
async fn put_with_non_increasing_version_is_not_modified() {
    let registry = Registry::new(uri("http:///self"), None);
    let mut doc = subscription_set_doc("http:///owner1", "channel:///foo", "http:///foo/sub1");
    doc.version = Some(10);
    let (set, _) = registry.register(doc).await.unwrap();

    let mut stale = subscription_set_doc("http:///owner1", "channel:///foo", "http:///foo/sub1");
    stale.version = Some(9);
    let outcome = registry.replace(&set.location, set.access_key.as_str(), stale).await.unwrap();
    assert!(matches!(outcome, pubsub_registry::ReplaceOutcome::NotModified(_)));

    let mut newer = subscription_set_doc("http:///owner1", "channel:///foo", "http:///foo/sub1");
    newer.version = Some(11);
    let outcome = registry.replace(&set.location, set.access_key.as_str(), newer).await.unwrap();
    assert!(matches!(outcome, pubsub_registry::ReplaceOutcome::Replaced(_)));
}

#[tokio::test]
async fn event_fans_out_to_the_matching_recipient_with_its_cookie() {
    let registry = Registry::new(uri("http:///self"), None);
    let mut doc = subscription_set_doc("http:///owner1", "channel:///foo/*", "http://test.com/foo/sub1");
    doc.subscriptions[0].cookies.push("service-key=1234".to_owned());
    registry.register(doc).await.unwrap();

    let transport = Arc::new(RecordingTransport::default());
    let combined = registry.combined_set().await;
    let event = sample_event("channel:///foo/bar", "http://foobar.com/some/page", b"<foo/>");
    dispatch(registry, transport.clone(), combined, event, DispatchConfig::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, uri("http://test.com/foo/sub1"));
    assert_eq!(calls[0].1.as_deref(), Some("service-key=1234"));
}

#[tokio::test]
async fn repeated_failures_evict_a_zero_tolerance_set() {
    let registry = Registry::new(uri("http:///self"), None);
    let mut doc = subscription_set_doc("http:///owner1", "channel:///foo/*", "http://dead.local/sub1");
    doc.max_failures = Some(0);
    let (set, _) = registry.register(doc).await.unwrap();

    let transport = Arc::new(RecordingTransport::new(vec![Err(pubsub_registry::TransportError::Status(400))]));
    let combined = registry.combined_set().await;
    let event = sample_event("channel:///foo/bar", "http://foobar.com/page", b"<foo/>");
    let mut config = DispatchConfig::default();
    config.retry_budget = Duration::from_millis(50);
    dispatch(registry.clone(), transport, combined, event, config).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let err = registry.get(&set.location, set.access_key.as_str()).await.unwrap_err();
    assert!(matches!(err, pubsub_registry::RegistryError::Forbidden));
}

#[tokio::test]
async fn meta_channel_subscriber_receives_combined_set_on_mutation() {
    let registry = Registry::new(uri("http:///self"), None);

    let subscribe_doc = SubscriptionSetDoc {
        max_failures: None,
        version: None,
        owner: uri("http://peer.local/"),
        subscriptions: vec![SubscriptionDoc {
            id: None,
            channels: vec![uri("pubsub://*/*")],
            resources: vec![],
            proxy: None,
            cookies: vec![],
            recipients: vec![RecipientDoc { auth_token: None, uri: uri("http://peer.local/subscribers") }],
        }],
        access_key: None,
        location: None,
    };
    registry.register(subscribe_doc).await.unwrap();

    registry.register(subscription_set_doc("http:///owner1", "channel:///foo", "http:///foo/sub1")).await.unwrap();

    let transport = Arc::new(RecordingTransport::default());
    pubsub_registry::push_combined_set(registry, transport.clone(), DispatchConfig::default()).await;

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, uri("http://peer.local/subscribers"));
}
