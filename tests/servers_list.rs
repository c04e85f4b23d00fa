mod common;

use axum::http::StatusCode;
use common::{TestApp, ids};

async fn seeded() -> (TestApp, String, String, Vec<i64>) {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    app.category("alice", "gaming").await;
    app.category("alice", "music").await;

    let g1 = app.server("alice", "Frag Hall", "gaming").await;
    let m1 = app.server("bob", "Jam Room", "music").await;
    let g2 = app.server("bob", "Speedruns", "gaming").await;
    app.join(g1, "bob").await;

    (app, alice, bob, vec![g1, m1, g2])
}

#[tokio::test]
async fn anonymous_listing_returns_every_server() {
    let (app, _, _, servers) = seeded().await;

    let (status, body) = app.get("/api/servers/select", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), servers);

    let first = &body[0];
    assert_eq!(first["name"], "Frag Hall");
    assert_eq!(first["owner"], "alice");
    assert_eq!(first["category"], "gaming");
    assert!(first["icon"].is_null());
    assert!(first.get("num_members").is_none());
}

#[tokio::test]
async fn category_with_member_counts() {
    let (app, _, _, servers) = seeded().await;

    let (status, body) = app
        .get(
            "/api/servers/select?category=gaming&with_num_members=true",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![servers[0], servers[2]]);
    assert_eq!(body[0]["num_members"], 2);
    assert_eq!(body[1]["num_members"], 1);
}

#[tokio::test]
async fn by_user_needs_a_caller() {
    let (app, _, _, _) = seeded().await;

    let (status, body) = app
        .get("/api/servers/select?by_user=true&category=gaming", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        "Authentication credentials were not provided."
    );
}

#[tokio::test]
async fn by_user_lists_memberships() {
    let (app, alice, bob, servers) = seeded().await;

    let (_, body) = app
        .get("/api/servers/select?by_user=true", Some(&alice))
        .await;
    assert_eq!(ids(&body), vec![servers[0]]);

    let (_, body) = app.get("/api/servers/select?by_user=true", Some(&bob)).await;
    assert_eq!(ids(&body), servers);
}

#[tokio::test]
async fn by_serverid_needs_a_caller() {
    let (app, _, _, servers) = seeded().await;

    let (status, _) = app
        .get(
            &format!("/api/servers/select?by_serverid={}", servers[0]),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn by_serverid_returns_one_server() {
    let (app, alice, _, servers) = seeded().await;

    let (status, body) = app
        .get(
            &format!("/api/servers/select?by_serverid={}", servers[1]),
            Some(&alice),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![servers[1]]);
}

#[tokio::test]
async fn unknown_server_id_is_a_bad_request() {
    let (app, alice, _, _) = seeded().await;

    let (status, body) = app
        .get("/api/servers/select?by_serverid=999", Some(&alice))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Server with id 999 does not exist!");
}

#[tokio::test]
async fn malformed_server_id_hides_the_cause() {
    let (app, alice, _, _) = seeded().await;

    let (status, body) = app
        .get("/api/servers/select?by_serverid=abc", Some(&alice))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Server value error!");
}

#[tokio::test]
async fn qty_truncates_and_malformed_qty_fails() {
    let (app, _, _, servers) = seeded().await;

    let (_, body) = app.get("/api/servers/select?qty=2", None).await;
    assert_eq!(ids(&body), servers[..2].to_vec());

    let (_, body) = app.get("/api/servers/select?qty=0", None).await;
    assert!(ids(&body).is_empty());

    let (_, body) = app.get("/api/servers/select?qty=50", None).await;
    assert_eq!(ids(&body), servers);

    let (status, body) = app.get("/api/servers/select?qty=5000000000", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), servers);

    let (status, body) = app.get("/api/servers/select?qty=lots", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("detail").is_some());
}

#[tokio::test]
async fn bad_token_is_rejected_even_for_public_listing() {
    let (app, _, _, _) = seeded().await;

    let (status, _) = app.get("/api/servers/select", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
