use serde_json::json;
use siddu_api::{ApiError, FeedFilter, FeedQuery, ReactionKind, TimeWindow, VoteKind};
use siddu_pulse::SidduClient;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pulse_json(id: &str, love: u64) -> serde_json::Value {
    json!({
        "id": id,
        "userId": "u1",
        "userInfo": {"username": "trinity"},
        "content": {"text": "Night at the movies", "hashtags": []},
        "engagement": {
            "reactions": {"love": love, "fire": 0, "mindblown": 0, "laugh": 0, "sad": 0, "angry": 0, "total": love},
            "userReaction": null,
            "comments": 0,
            "shares": 0,
            "hasCommented": false,
            "hasShared": false,
            "hasBookmarked": false
        },
        "timestamp": "2025-03-01T12:00:00Z"
    })
}

fn client(server: &MockServer, token: Option<&str>) -> SidduClient {
    SidduClient::new(&server.uri(), token, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_feed_sends_query_and_reads_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pulse/feed"))
        .and(query_param("filter", "trending"))
        .and(query_param("window", "7d"))
        .and(query_param("hashtag", "dune"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [pulse_json("p21", 3)],
            "pagination": {"current_page": 2, "has_more": false}
        })))
        .mount(&server)
        .await;

    let mut query = FeedQuery::new(FeedFilter::Trending).hashtag("dune");
    query.window = Some(TimeWindow::Week);
    let page = client(&server, None).get_feed(&query, 2, 20).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, "p21");
    assert_eq!(page.items[0].engagement.reaction_count(ReactionKind::Love), 3);
    assert_eq!(page.has_more, Some(false));
}

#[tokio::test]
async fn test_feed_accepts_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pulse/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([pulse_json("p1", 0)])))
        .mount(&server)
        .await;

    let page = client(&server, None)
        .get_feed(&FeedQuery::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.has_more, None);
}

#[tokio::test]
async fn test_error_status_uses_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pulse/feed"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "database unavailable"})))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .get_feed(&FeedQuery::default(), 1, 20)
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unparseable_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pulse/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .get_feed(&FeedQuery::default(), 1, 20)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Malformed { .. }));
}

#[tokio::test]
async fn test_reaction_sends_bearer_and_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/pulse/p1/reactions"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(json!({"type": "love"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reactions": {"love": 6, "fire": 0, "mindblown": 0, "laugh": 0, "sad": 0, "angry": 0, "total": 6},
            "userReaction": "love"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = client(&server, Some("secret-token"))
        .toggle_reaction("p1", ReactionKind::Love)
        .await
        .unwrap();
    assert_eq!(snapshot.reactions[&ReactionKind::Love], 6);
    assert_eq!(snapshot.total, 6);
    assert_eq!(snapshot.user_reaction, Some(ReactionKind::Love));
}

#[tokio::test]
async fn test_share_count_is_optional() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/pulse/p1/share"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(4)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/pulse/p2/share"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let client = client(&server, Some("t"));
    assert_eq!(client.share("p1").await.unwrap(), Some(4));
    assert_eq!(client.share("p2").await.unwrap(), None);
}

#[tokio::test]
async fn test_share_with_garbled_body_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/pulse/p1/share"))
        .respond_with(ResponseTemplate::new(200).set_body_string("shared!"))
        .mount(&server)
        .await;

    let err = client(&server, Some("t")).share("p1").await.unwrap_err();
    assert!(matches!(err, ApiError::Malformed { .. }));
}

#[tokio::test]
async fn test_comment_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/pulse/p1/comments"))
        .and(body_json(json!({"content": "So good"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "c42",
            "postId": "p1",
            "author": {"username": "trinity"},
            "content": "So good",
            "like_count": 0,
            "created_at": "2025-03-01T12:00:00Z",
            "is_liked": false
        })))
        .mount(&server)
        .await;

    let comment = client(&server, Some("t"))
        .add_comment("p1", "So good")
        .await
        .unwrap();
    assert_eq!(comment.id, "c42");
    assert_eq!(comment.item_id, "p1");
    assert_eq!(comment.created_at.as_deref(), Some("2025-03-01T12:00:00Z"));
}

#[tokio::test]
async fn test_vote_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/reviews/r1/vote"))
        .and(body_json(json!({"voteType": "unhelpful"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "v1",
            "voteType": "unhelpful",
            "changed": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/reviews/r1/vote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Vote removed"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/reviews/r1/vote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
        .mount(&server)
        .await;

    let client = client(&server, Some("t"));
    assert_eq!(
        client.vote("r1", VoteKind::Unhelpful).await.unwrap(),
        VoteKind::Unhelpful
    );
    client.remove_vote("r1").await.unwrap();
    assert_eq!(client.get_vote("r1").await.unwrap(), None);
}

#[tokio::test]
async fn test_bookmark_and_unbookmark_methods() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/pulse/p1/bookmark"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/pulse/p1/bookmark"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Bookmark not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, Some("t"));
    client.bookmark("p1").await.unwrap();
    let err = client.unbookmark("p1").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
}
