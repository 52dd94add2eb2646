//! Authenticated request handling: header attachment, status mapping, and
//! session teardown on 401.
//!
//! Run:
//!   cargo test -p planner-client --test client_tests

mod common;
mod support;

use std::time::Duration;

use planner_client::session::{
    KeyValueStore, LogoutReason, SessionEvent, SessionState, CREDENTIAL_KEY, LOGIN_PATH,
};
use planner_client::RequestError;
use serde::Deserialize;
use serde_json::json;
use support::Harness;

async fn logged_in(token: &str) -> Harness {
    let h = Harness::new();
    h.transport.respond_json(
        LOGIN_PATH,
        200,
        json!({
            "accessToken": token,
            "user": {"id": "1", "email": "a@b.com", "firstName": "A", "lastName": "B", "roles": ["ROLE_X"]}
        }),
    );
    h.session.login("a@b.com", "pw").await.into_result().unwrap();
    h
}

#[tokio::test]
async fn test_bearer_attached_when_authenticated() {
    let h = logged_in("h.e.s").await;
    h.transport
        .respond_json("/api/orders", 200, json!([{"id": "o1"}]));

    let orders = h.client.get("/api/orders").await.unwrap();

    assert_eq!(orders, json!([{"id": "o1"}]));
    let sent = h.transport.requests_to("/api/orders");
    assert_eq!(sent[0].bearer.as_ref().map(|c| c.bearer()), Some("Bearer h.e.s".to_string()));
}

#[tokio::test]
async fn test_unauthenticated_request_has_no_bearer() {
    let h = Harness::new();
    h.transport.respond_json("/api/health", 200, json!({"status": "UP"}));

    let health = h.client.get("/api/health").await.unwrap();

    assert_eq!(health["status"], "UP");
    assert!(h.transport.requests_to("/api/health")[0].bearer.is_none());
}

#[tokio::test]
async fn test_401_ends_session_and_clears_storage() {
    let h = logged_in("h.e.s").await;
    let mut events = h.session.subscribe();
    h.transport.respond("/api/employees", 401, "expired");

    let err = h.client.get("/api/employees").await.unwrap_err();

    assert_eq!(err, RequestError::AuthenticationRequired);
    assert_eq!(h.session.state(), SessionState::LoggedOut);
    assert!(h.session.credential().is_none());
    assert!(h.storage.is_empty());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::LoggedOut {
            reason: LogoutReason::Revoked
        }
    );

    // Later calls go out unauthenticated
    h.transport.respond_json("/api/employees", 200, json!([]));
    h.client.get("/api/employees").await.unwrap();
    assert!(h.transport.requests_to("/api/employees")[1].bearer.is_none());
}

#[tokio::test]
async fn test_403_keeps_session() {
    let h = logged_in("h.e.s").await;
    h.transport.respond("/api/teams", 403, "nope");

    let err = h.client.delete("/api/teams").await.unwrap_err();

    assert_eq!(err, RequestError::AccessForbidden);
    assert_eq!(h.session.state(), SessionState::LoggedIn);
    assert_eq!(h.storage.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("h.e.s"));
}

#[tokio::test]
async fn test_other_statuses_become_http_errors() {
    let h = logged_in("h.e.s").await;
    h.transport.respond("/api/planning", 500, "planner exploded");

    let err = h
        .client
        .post("/api/planning", Some(json!({"cleanFirst": true})))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RequestError::Http {
            status: 500,
            body: "planner exploded".into()
        }
    );
    assert_eq!(err.to_string(), "HTTP 500: planner exploded");
    assert!(h.session.is_authenticated());
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    let h = logged_in("h.e.s").await;
    h.transport.fail("/api/orders", "connection reset");

    let err = h.client.get("/api/orders").await.unwrap_err();

    assert_eq!(err, RequestError::network("connection reset"));
    assert!(h.session.is_authenticated());
}

#[tokio::test]
async fn test_empty_and_invalid_bodies() {
    let h = logged_in("h.e.s").await;
    h.transport
        .respond("/api/orders/1", 204, "")
        .respond("/api/orders/2", 200, "not json");

    assert_eq!(
        h.client.delete("/api/orders/1").await.unwrap(),
        serde_json::Value::Null
    );
    assert!(matches!(
        h.client.put("/api/orders/2", None).await,
        Err(RequestError::InvalidBody { .. })
    ));
}

#[tokio::test]
async fn test_typed_helpers() {
    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Team {
        id: String,
        employee_count: u32,
    }

    let h = logged_in("h.e.s").await;
    h.transport
        .respond_json("/api/teams/t1", 200, json!({"id": "t1", "employeeCount": 3}))
        .respond_json("/api/teams", 201, json!({"id": "t2", "employeeCount": 0}));

    let team: Team = h.client.get_json("/api/teams/t1").await.unwrap();
    assert_eq!(
        team,
        Team {
            id: "t1".into(),
            employee_count: 3
        }
    );

    let created: Team = h
        .client
        .post_json("/api/teams", &json!({"name": "Night shift"}))
        .await
        .unwrap();
    assert_eq!(created.id, "t2");
    assert_eq!(
        h.transport.requests_to("/api/teams")[0].body,
        Some(json!({"name": "Night shift"}))
    );
}

#[tokio::test]
async fn test_concurrent_401s_end_session_exactly_once() {
    let h = logged_in("h.e.s").await;
    let mut events = h.session.subscribe();
    h.transport
        .respond_after("/api/orders", Duration::from_millis(20), 401, "expired")
        .respond_after("/api/employees", Duration::from_millis(5), 401, "expired");

    let (orders, employees) = tokio::join!(
        h.client.get("/api/orders"),
        h.client.get("/api/employees")
    );

    assert_eq!(orders.unwrap_err(), RequestError::AuthenticationRequired);
    assert_eq!(employees.unwrap_err(), RequestError::AuthenticationRequired);
    assert_eq!(h.session.state(), SessionState::LoggedOut);

    let mut logouts = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::LoggedOut { .. }) {
            logouts += 1;
        }
    }
    assert_eq!(logouts, 1);
}

#[tokio::test]
async fn test_in_flight_call_keeps_its_captured_credential() {
    let h = logged_in("h.e.s").await;
    h.transport
        .respond_after("/api/orders", Duration::from_millis(30), 200, "[]")
        .respond_after("/api/employees", Duration::from_millis(5), 401, "expired");

    let (orders, employees) = tokio::join!(
        h.client.get("/api/orders"),
        h.client.get("/api/employees")
    );

    // The slow call started with the credential and finishes normally
    assert_eq!(orders.unwrap(), json!([]));
    assert_eq!(employees.unwrap_err(), RequestError::AuthenticationRequired);
    assert_eq!(
        h.transport.requests_to("/api/orders")[0]
            .bearer
            .as_ref()
            .map(|c| c.as_str().to_string()),
        Some("h.e.s".to_string())
    );
    assert_eq!(h.session.state(), SessionState::LoggedOut);
}

#[tokio::test]
async fn test_stale_401_does_not_end_a_newer_session() {
    let h = logged_in("o.l.d").await;
    h.transport
        .respond_after("/api/orders", Duration::from_millis(30), 401, "expired")
        .respond_json(
            LOGIN_PATH,
            200,
            json!({"accessToken": "n.e.w", "email": "a@b.com", "id": "1"}),
        );

    let slow = h.client.get("/api/orders");
    let relogin = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        h.session.login("a@b.com", "pw").await
    };
    let (slow, relogin) = tokio::join!(slow, relogin);

    assert_eq!(slow.unwrap_err(), RequestError::AuthenticationRequired);
    assert!(relogin.is_success());
    assert_eq!(h.session.state(), SessionState::LoggedIn);
    assert_eq!(h.session.credential().unwrap().as_str(), "n.e.w");
}
