use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;

use pubsub_model::{Location, SubscriptionSet};
use pubsub_registry::ReplaceOutcome;
use pubsub_uri::Uri;

use crate::http::response::{self, HttpResponse};
use crate::state::AppState;

/// `POST /subscribers` -- register a new set, or, when the document's
/// owner is a known upstream peer, ingest it as a downstream combined-set
/// push instead (see [`pubsub_registry::Registry::ingest_downstream`]).
pub async fn post_subscribers(State(state): State<AppState>, body: String) -> HttpResponse {
    let doc = match pubsub_wire::decode_subscription_set(&body) {
        Ok(doc) => doc,
        Err(err) => return response::wire_error(err),
    };

    if state.upstream_peers.contains(&doc.owner) {
        state.registry.ingest_downstream(doc.owner.clone(), doc).await;
        return StatusCode::OK.into_response();
    }

    match state.registry.register(doc).await {
        Ok((set, already_existed)) => {
            let location_uri = location_uri(&state, &set);
            let mut response_doc = set.as_doc();
            response_doc.location = Some(location_uri.clone());
            let body = match pubsub_wire::encode_subscription_set(&response_doc) {
                Ok(body) => body,
                Err(err) => return response::wire_error(err),
            };
            if already_existed {
                (StatusCode::CONFLICT, [(header::CONTENT_LOCATION, location_uri.to_string())], body).into_response()
            } else {
                (StatusCode::CREATED, [(header::LOCATION, location_uri.to_string())], body).into_response()
            }
        }
        Err(err) => response::registry_error(err),
    }
}

/// `GET /subscribers` -- the combined (dispatch-table) view.
pub async fn get_combined_set(State(state): State<AppState>) -> HttpResponse {
    let combined = state.registry.combined_set().await;
    match pubsub_wire::encode_subscription_set(&combined.as_doc()) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => response::wire_error(err),
    }
}

/// `GET /subscribers/{loc}` -- the owner's own set.
pub async fn get_subscriber(State(state): State<AppState>, Path(location): Path<String>, Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> HttpResponse {
    let Some(access_key) = extract_access_key(&query, &headers) else {
        return response::forbidden("missing access key");
    };
    match state.registry.get(&Location::from(location), &access_key).await {
        Ok(set) => match pubsub_wire::encode_subscription_set(&set.as_doc()) {
            Ok(body) => (StatusCode::OK, body).into_response(),
            Err(err) => response::wire_error(err),
        },
        Err(err) => response::registry_error(err),
    }
}

/// `PUT /subscribers/{loc}` -- replace, subject to the version rule in
/// the data model.
pub async fn put_subscriber(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> HttpResponse {
    let Some(access_key) = extract_access_key(&query, &headers) else {
        return response::forbidden("missing access key");
    };
    let doc = match pubsub_wire::decode_subscription_set(&body) {
        Ok(doc) => doc,
        Err(err) => return response::wire_error(err),
    };
    match state.registry.replace(&Location::from(location), &access_key, doc).await {
        Ok(ReplaceOutcome::Replaced(set)) => match pubsub_wire::encode_subscription_set(&set.as_doc()) {
            Ok(body) => (StatusCode::OK, body).into_response(),
            Err(err) => response::wire_error(err),
        },
        Ok(ReplaceOutcome::NotModified(_)) => StatusCode::NOT_MODIFIED.into_response(),
        Err(err) => response::registry_error(err),
    }
}

/// `DELETE /subscribers/{loc}`.
pub async fn delete_subscriber(State(state): State<AppState>, Path(location): Path<String>, Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> HttpResponse {
    let Some(access_key) = extract_access_key(&query, &headers) else {
        return response::forbidden("missing access key");
    };
    match state.registry.remove(&Location::from(location), &access_key).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => response::registry_error(err),
    }
}

fn location_uri(state: &AppState, set: &SubscriptionSet) -> Uri {
    let mut uri = state.subscribers_uri.clone();
    uri.path.push(set.location.as_str().to_owned());
    uri.query = Some(format!("access-key={}", set.access_key.as_str()));
    uri
}

/// Access key lookup per §4.3: a URI query parameter, or a cookie.
fn extract_access_key(query: &HashMap<String, String>, headers: &HeaderMap) -> Option<String> {
    if let Some(key) = query.get("access-key") {
        return Some(key.clone());
    }
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').map(str::trim).find_map(|pair| pair.strip_prefix("access-key=")).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;
    use pubsub_model::doc::{RecipientDoc, SubscriptionDoc, SubscriptionSetDoc};
    use pubsub_registry::{DispatchConfig, Registry};

    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    fn state() -> AppState {
        AppState::new(Registry::new(uri("http://registry.local/"), None), uri("http://registry.local/subscribers"), DispatchConfig::default(), HashSet::new())
    }

    fn doc(owner: &str, channel: &str) -> SubscriptionSetDoc {
        SubscriptionSetDoc {
            max_failures: None,
            version: None,
            owner: uri(owner),
            subscriptions: vec![SubscriptionDoc {
                id: None,
                channels: vec![uri(channel)],
                resources: vec![],
                proxy: None,
                cookies: vec![],
                recipients: vec![RecipientDoc { auth_token: None, uri: uri("http://owner.local/inbox") }],
            }],
            access_key: None,
            location: None,
        }
    }

    async fn body_string(response: HttpResponse) -> String {
        String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn post_subscribers_returns_created_with_location_header() {
        let state = state();
        let body = pubsub_wire::encode_subscription_set(&doc("http://owner.local/", "channel:///foo")).unwrap();
        let response = post_subscribers(State(state), body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers().get(header::LOCATION).expect("location header");
        assert!(location.to_str().unwrap().contains("access-key="));
    }

    #[tokio::test]
    async fn reposting_the_same_owner_is_a_conflict() {
        let state = state();
        let body = pubsub_wire::encode_subscription_set(&doc("http://owner.local/", "channel:///foo")).unwrap();
        post_subscribers(State(state.clone()), body.clone()).await;
        let response = post_subscribers(State(state), body).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(response.headers().contains_key(header::CONTENT_LOCATION));
    }

    #[tokio::test]
    async fn full_lifecycle_register_read_replace_delete() {
        let state = state();
        let created = post_subscribers(State(state.clone()), pubsub_wire::encode_subscription_set(&doc("http://owner.local/", "channel:///foo")).unwrap()).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let location_header = created.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_owned();
        let location_uri: Uri = location_header.parse().unwrap();
        let location = location_uri.path.last().unwrap().clone();
        let access_key = location_uri.query.as_ref().unwrap().strip_prefix("access-key=").unwrap().to_owned();

        let mut query = HashMap::new();
        query.insert("access-key".to_owned(), access_key.clone());

        let got = get_subscriber(State(state.clone()), Path(location.clone()), Query(query.clone()), HeaderMap::new()).await;
        assert_eq!(got.status(), StatusCode::OK);

        let replace_body = pubsub_wire::encode_subscription_set(&doc("http://owner.local/", "channel:///bar")).unwrap();
        let replaced = put_subscriber(State(state.clone()), Path(location.clone()), Query(query.clone()), HeaderMap::new(), replace_body).await;
        assert_eq!(replaced.status(), StatusCode::OK);
        let replaced_body = body_string(replaced).await;
        assert!(replaced_body.contains("bar"));

        let deleted = delete_subscriber(State(state.clone()), Path(location.clone()), Query(query), HeaderMap::new()).await;
        assert_eq!(deleted.status(), StatusCode::OK);

        let mut bad_query = HashMap::new();
        bad_query.insert("access-key".to_owned(), access_key);
        let after_delete = get_subscriber(State(state), Path(location), Query(bad_query), HeaderMap::new()).await;
        assert_eq!(after_delete.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn get_subscriber_without_access_key_is_forbidden() {
        let state = state();
        let response = get_subscriber(State(state), Path("anything".to_owned()), Query(HashMap::new()), HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn ingest_from_a_known_upstream_peer_bypasses_registration() {
        let mut peers = HashSet::new();
        peers.insert(uri("http://upstream.local/"));
        let state = AppState::new(Registry::new(uri("http://registry.local/"), None), uri("http://registry.local/subscribers"), DispatchConfig::default(), peers);
        let body = pubsub_wire::encode_subscription_set(&doc("http://upstream.local/", "pubsub://*/*")).unwrap();
        let response = post_subscribers(State(state.clone()), body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.registry.meta_channel_destinations().await.len(), 1);
    }
}
