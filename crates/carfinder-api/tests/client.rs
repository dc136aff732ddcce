//! Integration tests for the HTTP client using wiremock.

use carfinder_api::{
    ChatClient, ChatRequest, ConversationId, Error, FeedQuery, StreamEvent,
    stream::PREFERENCES_SAVED,
};
use futures::StreamExt;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body() -> String {
    [
        r#"data: {"content":"Found "}"#,
        r#"data: {"content":"3 SUVs"}"#,
        r#"data: {"event":"preferences_saved","preference_id":"p-1"}"#,
        r#"data: {"event":"end"}"#,
    ]
    .iter()
    .map(|l| format!("{}\n\n", l))
    .collect()
}

#[tokio::test]
async fn send_streams_events_and_captures_conversation_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .and(body_json(serde_json::json!({
            "message": "I want an SUV",
            "conversation_id": null
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .insert_header("X-Conversation-ID", "abc123")
                .set_body_string(sse_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri()).unwrap();
    let response = client
        .send(&ChatRequest::new("I want an SUV", None))
        .await
        .unwrap();

    assert_eq!(response.conversation_id, ConversationId::new("abc123"));

    let events: Vec<StreamEvent> = response
        .events
        .map(|e| e.expect("no transport error"))
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            StreamEvent::delta("Found "),
            StreamEvent::delta("3 SUVs"),
            StreamEvent::side_effect(PREFERENCES_SAVED),
            StreamEvent::side_effect("end"),
        ]
    );
}

#[tokio::test]
async fn send_includes_existing_conversation_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .and(body_json(serde_json::json!({
            "message": "and under $30k",
            "conversation_id": "abc123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri()).unwrap();
    let response = client
        .send(&ChatRequest::new("and under $30k", ConversationId::new("abc123")))
        .await
        .unwrap();

    assert!(response.conversation_id.is_none());
    assert_eq!(response.events.count().await, 0);
}

#[tokio::test]
async fn send_fails_on_non_success_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri()).unwrap();
    let err = client
        .send(&ChatRequest::new("hello", None))
        .await
        .unwrap_err();

    match err {
        Error::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn alerts_feed_passes_query_and_parses_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/alerts/feed"))
        .and(query_param("limit", "10"))
        .and(query_param("only_unseen", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "a1",
                "similarity_score": 0.91,
                "created_at": "2024-05-01T12:00:00Z",
                "listing": {
                    "vin": "5YJ3E1EA7KF317000",
                    "year": 2021,
                    "make": "Tesla",
                    "model": "Model 3",
                    "mileage": 21000,
                    "price": 31500.0,
                    "listing_url": "https://example.com/l/a1",
                    "photos": [],
                    "dealer": { "name": "EV Depot", "city": "Denver", "state": "CO" }
                }
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri()).unwrap();
    let alerts = client
        .alerts_feed(&FeedQuery {
            limit: 10,
            only_unseen: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].match_percent(), 91);
    assert_eq!(alerts[0].listing.title(), "2021 Tesla Model 3");
}

#[tokio::test]
async fn alerts_feed_reports_unexpected_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/alerts/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri()).unwrap();
    let err = client.alerts_feed(&FeedQuery::default()).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse(_)));
}

#[tokio::test]
async fn alerts_feed_accepts_naive_utc_timestamps() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/alerts/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "a1",
                "similarity_score": 0.8,
                "created_at": "2024-05-01T12:00:00.123456",
                "viewed_at": null,
                "listing": { "vin": "VIN1" }
            },
            {
                "id": "a2",
                "similarity_score": 0.7,
                "created_at": "2024-04-30T09:15:00",
                "viewed_at": "2024-05-01T10:00:00.5",
                "listing": { "vin": "VIN2" }
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/alerts/a2/mark-viewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "viewed_at": "2024-05-02T08:30:00.000001"
        })))
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri()).unwrap();

    let alerts = client.alerts_feed(&FeedQuery::default()).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts[0].is_unseen());
    assert!(!alerts[1].is_unseen());
    assert_eq!(
        alerts[0].created_at.unwrap().to_rfc3339(),
        "2024-05-01T12:00:00.123456+00:00"
    );

    let viewed = client.mark_alert_viewed("a2").await.unwrap();
    assert!(viewed.viewed_at.is_some());
}

#[tokio::test]
async fn mark_viewed_and_stats() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/alerts/a1/mark-viewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "viewed_at": "2024-05-02T08:30:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/alerts/stats"))
        .and(query_param("user_id", "u-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_alerts": 4,
            "unseen_alerts": 1,
            "alerts_by_day": { "2024-05-01": 3, "2024-05-02": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri()).unwrap();

    let viewed = client.mark_alert_viewed("a1").await.unwrap();
    assert_eq!(viewed.status, "success");
    assert!(viewed.viewed_at.is_some());

    let stats = client.alert_stats(Some("u-1")).await.unwrap();
    assert_eq!(stats.total_alerts, 4);
    assert_eq!(stats.unseen_alerts, 1);
    assert_eq!(stats.alerts_by_day.get("2024-05-01"), Some(&3));
}

#[tokio::test]
async fn chat_history_returns_transcript() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/history/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "role": "user", "content": "Hi" },
            { "role": "assistant", "content": "Hello! What are you shopping for?" }
        ])))
        .mount(&server)
        .await;

    let client = ChatClient::new(server.uri()).unwrap();
    let id = ConversationId::new("abc123").unwrap();
    let history = client.chat_history(&id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, "assistant");
}
