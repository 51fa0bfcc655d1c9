//! Support desk operations against a mock Zendesk API.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{basic_auth, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zendesk_bridge::config::Config;
use zendesk_bridge::desk::{NewTicket, SupportDesk, SupportSession};
use zendesk_bridge::enrich::{FIELD_APP, FIELD_CLOSED_AT, FIELD_USER_ID};
use zendesk_bridge::error::BridgeError;
use zendesk_bridge::models::Ticket;
use zendesk_bridge::query::TicketFilter;

const APP_FIELD: u64 = 360001;
const AGENT_ID: u64 = 235323;

fn desk_for(server: &MockServer) -> SupportDesk {
    let config = Config::new("acme", "agent@acme.test", "secret-token", "sso-key")
        .unwrap()
        .with_app_name_field(APP_FIELD)
        .with_api_base(format!("{}/api/v2", server.uri()))
        .unwrap();
    SupportDesk::new(&config)
}

fn new_ticket(local_user_id: Option<u64>) -> NewTicket {
    NewTicket {
        local_user_id,
        name: "Jane Roe".to_string(),
        email: "jane@example.com".to_string(),
        message: "The app crashes on start".to_string(),
        subject: "Crash".to_string(),
        locale_id: 1,
        app_name: "Mobile".to_string(),
        brand_id: None,
        uploads: vec!["tok-1".to_string()],
    }
}

async fn mount_upsert_and_me(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v2/users/create_or_update.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": 20978392, "name": "Jane Roe", "email": "jane@example.com"}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/users/me.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": AGENT_ID, "name": "Support Agent", "role": "agent"}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/tickets.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ticket": {"id": 35436, "subject": "Crash", "status": "new",
                       "requester_id": 20978392, "assignee_id": AGENT_ID},
            "audit": {"id": 1}
        })))
        .mount(server)
        .await;
}

/// Returns the JSON body of the first received request to `path`.
async fn received_body(server: &MockServer, request_path: &str) -> Value {
    let requests = server.received_requests().await.unwrap();
    let request = requests
        .iter()
        .find(|r| r.url.path() == request_path)
        .unwrap_or_else(|| panic!("no request to {}", request_path));
    serde_json::from_slice(&request.body).unwrap()
}

fn search_page(tickets: Value, count: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "results": tickets,
        "count": count,
        "next_page": null,
        "previous_page": null
    }))
}

#[tokio::test]
async fn requests_use_token_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/me.json"))
        .and(basic_auth("agent@acme.test/token", "secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": AGENT_ID}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let agent = desk.current_user().await.unwrap();
    assert_eq!(agent.id, AGENT_ID);
    assert!(desk.client().is_connected());
}

#[tokio::test]
async fn create_ticket_links_new_requester() {
    let server = MockServer::start().await;
    mount_upsert_and_me(&server).await;

    let desk = desk_for(&server);
    let created = desk
        .create_ticket(&SupportSession::new(), &new_ticket(Some(42)))
        .await
        .unwrap();
    assert_eq!(created.ticket.id, 35436);

    let user = received_body(&server, "/api/v2/users/create_or_update.json").await;
    assert_eq!(
        user,
        json!({"user": {
            "email": "jane@example.com",
            "name": "Jane Roe",
            "locale_id": 1,
            "external_id": "user_42"
        }})
    );

    let ticket = received_body(&server, "/api/v2/tickets.json").await;
    assert_eq!(
        ticket,
        json!({"ticket": {
            "subject": "Crash",
            "external_id": "user_42",
            "requester_id": 20978392,
            "submitter_id": 20978392,
            "assignee_id": AGENT_ID,
            "comment": {"body": "The app crashes on start", "uploads": ["tok-1"]},
            "priority": "normal",
            "custom_fields": [{"id": APP_FIELD, "value": "Mobile"}]
        }})
    );
}

#[tokio::test]
async fn create_ticket_keeps_existing_link() {
    let server = MockServer::start().await;
    mount_upsert_and_me(&server).await;

    let mut session = SupportSession::new();
    session.set_cached_user_search(vec![serde_json::from_value(json!({"id": 11})).unwrap()]);

    let desk = desk_for(&server);
    let mut ticket = new_ticket(Some(42));
    ticket.brand_id = Some(7);
    desk.create_ticket(&session, &ticket).await.unwrap();

    let user = received_body(&server, "/api/v2/users/create_or_update.json").await;
    assert!(user["user"].get("external_id").is_none());

    let ticket = received_body(&server, "/api/v2/tickets.json").await;
    assert_eq!(ticket["ticket"]["external_id"], json!("user_42"));
    assert_eq!(ticket["ticket"]["brand_id"], json!(7));
}

#[tokio::test]
async fn create_ticket_requires_email() {
    let server = MockServer::start().await;
    let desk = desk_for(&server);

    let mut ticket = new_ticket(None);
    ticket.email = "  ".to_string();
    let err = desk
        .create_ticket(&SupportSession::new(), &ticket)
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn user_tickets_aggregates_across_matched_users() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/search.json"))
        .and(query_param("external_id", "user_42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{"id": 11}, {"id": 12}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/search.json"))
        .and(query_param("query", "type:ticket,status:\"closed\",requester_id:11"))
        .respond_with(search_page(
            json!([{
                "id": 1, "subject": "Old crash", "status": "closed",
                "external_id": "user_42", "updated_at": "2026-01-05T10:00:00Z",
                "custom_fields": [{"id": APP_FIELD, "value": "Mobile"}]
            }]),
            1,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/search.json"))
        .and(query_param("query", "type:ticket,status:\"closed\",requester_id:12"))
        .respond_with(search_page(
            json!([
                {"id": 2, "status": "closed", "external_id": "legacy-7"},
                {"id": 3, "status": "closed"}
            ]),
            2,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let mut session = SupportSession::new();
    desk.set_user_search(&mut session, 42).await.unwrap();

    let query = TicketFilter::new().with_status("closed").to_query();
    let tickets = desk.user_tickets(&mut session, &query, None).await.unwrap();

    let ids: Vec<u64> = tickets.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(session.user_tickets_count(None), 3);
    assert_eq!(session.user_tickets_count(Some("closed")), 3);

    assert_eq!(tickets[0].derived(FIELD_APP), Some(&json!("Mobile")));
    assert_eq!(tickets[0].derived(FIELD_USER_ID), Some(&json!(42)));
    assert_eq!(
        tickets[0].derived(FIELD_CLOSED_AT),
        Some(&json!("2026-01-05T10:00:00Z"))
    );
    assert_eq!(tickets[1].derived(FIELD_USER_ID), Some(&Value::Null));
    assert_eq!(tickets[2].derived(FIELD_APP), Some(&Value::Null));
}

#[tokio::test]
async fn user_tickets_empty_user_search_skips_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/search.json"))
        .respond_with(search_page(json!([]), 0))
        .expect(0)
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let mut session = SupportSession::new();
    desk.set_user_search(&mut session, 7).await.unwrap();

    let tickets = desk
        .user_tickets(&mut session, &TicketFilter::new().to_query(), None)
        .await
        .unwrap();

    assert!(tickets.is_empty());
    assert_eq!(session.user_tickets_count(None), 0);
}

#[tokio::test]
async fn user_tickets_without_user_search_is_unscoped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/search.json"))
        .and(query_param("query", "type:ticket,"))
        .and(query_param("page", "2"))
        .respond_with(search_page(
            json!([{"id": 8, "status": "open"}, {"id": 9, "status": "pending"}]),
            40,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let mut session = SupportSession::new();
    let rows = desk
        .user_tickets_as_array(&mut session, &TicketFilter::new().to_query(), Some(2))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], json!(8));
    assert_eq!(rows[0][FIELD_CLOSED_AT], Value::Null);
    assert_eq!(session.user_tickets_count(None), 40);
    assert_eq!(session.user_tickets_count(Some("open")), 1);
}

#[tokio::test]
async fn current_ticket_fetches_and_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tickets/35436.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ticket": {"id": 35436, "subject": "Crash", "status": "open",
                       "external_id": "user_42", "via": {"channel": "api"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let mut session = SupportSession::new();
    assert!(desk.current_ticket(&mut session, None).await.unwrap().is_none());

    let ticket = desk
        .current_ticket(&mut session, Some(35436))
        .await
        .unwrap()
        .cloned()
        .unwrap();
    assert_eq!(ticket.display_subject(), "Crash");
    assert_eq!(ticket.derived(FIELD_USER_ID), Some(&json!(42)));

    let cached = desk.current_ticket(&mut session, None).await.unwrap().unwrap();
    assert_eq!(cached.id, 35436);
    assert_eq!(cached.to_map().unwrap()["via"], json!({"channel": "api"}));
}

#[tokio::test]
async fn missing_ticket_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tickets/404.json"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "RecordNotFound", "description": "Not found"
        })))
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let err = desk
        .current_ticket(&mut SupportSession::new(), Some(404))
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::NotFound { ref id } if id == "ticket 404"));
}

#[tokio::test]
async fn last_comment_author_is_resolved_through_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tickets/5/comments.json"))
        .and(query_param("order_by", "created_at"))
        .and(query_param("sort_order", "desc"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "comments": [{"id": 100, "author_id": 77, "body": "Fixed in 2.1"}],
            "count": 4
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/search.json"))
        .and(query_param("query", "type:user,user:77"))
        .respond_with(search_page(
            json!([{"id": 77, "name": "Agent Smith", "email": "smith@acme.test"}]),
            1,
        ))
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let name = desk.last_comment_author_name(5).await.unwrap();
    assert_eq!(name.as_deref(), Some("Agent Smith"));
}

#[tokio::test]
async fn requester_email_is_resolved_through_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/search.json"))
        .and(query_param("query", "type:user,user:55"))
        .respond_with(search_page(
            json!([{"id": 55, "name": "Jane Roe", "email": "jane@example.com"}]),
            1,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let mut ticket = Ticket::new(35436);
    ticket.requester_id = Some(55);

    let email = desk.requester_email(&ticket).await.unwrap();
    assert_eq!(email.as_deref(), Some("jane@example.com"));
}

#[tokio::test]
async fn requester_email_without_requester_sends_nothing() {
    let server = MockServer::start().await;
    let desk = desk_for(&server);

    let email = desk.requester_email(&Ticket::new(35436)).await.unwrap();

    assert_eq!(email, None);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_file_returns_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/uploads.json"))
        .and(query_param("filename", "crash.log"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "upload": {"token": "6bk3gql82em5nmf",
                       "attachment": {"id": 1, "file_name": "crash.log"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let token = desk
        .upload_file(b"panic at line 3".to_vec(), "text/plain", "crash.log")
        .await
        .unwrap();

    assert_eq!(token, "6bk3gql82em5nmf");
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/users/me.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Couldn't authenticate you"))
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let err = desk.current_user().await.unwrap_err();
    assert!(matches!(err, BridgeError::Authentication));

    let err = desk.client().test_connection().await.unwrap_err();
    assert!(matches!(err, BridgeError::ConnectionTest { .. }));
}

#[tokio::test]
async fn unprocessable_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/users/create_or_update.json"))
        .and(body_partial_json(json!({"user": {"email": "jane@example.com"}})))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": "RecordInvalid",
            "description": "Record validation errors"
        })))
        .mount(&server)
        .await;

    let desk = desk_for(&server);
    let err = desk
        .create_ticket(&SupportSession::new(), &new_ticket(None))
        .await
        .unwrap_err();

    match err {
        BridgeError::Api { error, description } => {
            assert_eq!(error, "RecordInvalid");
            assert_eq!(description, "Record validation errors");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}
