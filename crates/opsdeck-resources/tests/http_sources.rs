use opsdeck_query::{
    FetchError, FilterField, FilterSet, FilterValue, PageRequest, PageSource, Record, RecordId,
    SortSpec,
};
use opsdeck_resources::{
    ApiClient, LogsSource, StaticSession, TenantConfig, TransferStatus, TransfersSource,
    UsersSource,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use warp::http::StatusCode;
use warp::Filter;

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    query: HashMap<String, String>,
    auth: Option<String>,
    body: Option<Value>,
}

type SeenLog = Arc<Mutex<Vec<Seen>>>;

fn with_log(log: SeenLog) -> impl Filter<Extract = (SeenLog,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&log))
}

fn logs_body() -> Value {
    json!({
        "logs": [
            {
                "_id": "l1",
                "type": "change_status",
                "timestamp": "2024-03-01T10:00:00.000Z",
                "contactId": "c1",
                "oldStatus": "new",
                "newStatus": "won",
                "changedBy": "bot",
                "confidence": 92
            },
            {
                "_id": "l2",
                "type": "received_message",
                "timestamp": "2024-03-01T09:00:00.000Z",
                "messageText": "hola"
            }
        ],
        "total": 42,
        "hasMore": true,
        "stats": { "received_messages": 30, "change_status": 7, "bot_actions": 5 }
    })
}

fn transfers_body() -> Value {
    json!({
        "requests": [
            {
                "_id": "t1",
                "username": "ana",
                "platform": "whatsapp",
                "status": "pending",
                "createdAt": "2024-03-02T12:00:00.000Z",
                "attachment": { "type": "image", "link": "https://cdn/x.png", "file_name": "x.png" },
                "extractedData": { "amount": 1500.5, "currency": "ARS" }
            },
            {
                "_id": "t2",
                "username": "bo",
                "status": "processed",
                "createdAt": "2024-03-02T11:00:00.000Z",
                "extractedData": null
            }
        ],
        "pagination": {
            "page": 3, "limit": 10, "total": 37, "totalPages": 4, "hasNext": true, "hasPrev": true
        },
        "filters": { "applied": {}, "availableStatuses": [], "availableChannels": [] },
        "stats": {
            "totalTransfers": 37,
            "totalAmount": 55000.0,
            "pending": 12,
            "pendingAmount": 18000.0,
            "processed": 20,
            "processedAmount": 30000.0,
            "error": 5,
            "errorAmount": 7000.0,
            "averageAmount": 1486.5,
            "approvalRate": 54.0
        },
        "totalUsers": 9
    })
}

fn users_body() -> Value {
    json!({
        "users": [
            {
                "_id": "u1",
                "name": "Ana",
                "username": "ana",
                "phone": "+5491100000000",
                "email": "ana@example.com",
                "channel": "whatsapp",
                "password": "hidden",
                "status": "active",
                "botNum": 2,
                "botUrl": "https://bot/2",
                "createAt": "2024-03-01T08:00:00.000Z"
            }
        ],
        "pagination": {
            "page": 1, "limit": 20, "total": 1, "totalPages": 1, "hasNext": false, "hasPrev": false
        },
        "message": "ok"
    })
}

async fn serve() -> (SocketAddr, SeenLog) {
    let log: SeenLog = Arc::new(Mutex::new(Vec::new()));

    let logs = warp::get()
        .and(warp::path!("api" / "logs"))
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_log(Arc::clone(&log)))
        .map(|query: HashMap<String, String>, auth, log: SeenLog| {
            let garbled = query.get("searchTerm").map(String::as_str) == Some("garbled");
            log.lock().unwrap().push(Seen {
                path: "/logs".into(),
                query,
                auth,
                body: None,
            });
            if garbled {
                warp::reply::json(&json!({ "logs": "not a list" }))
            } else {
                warp::reply::json(&logs_body())
            }
        });

    let transfers = warp::get()
        .and(warp::path!("api" / "request_image"))
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_log(Arc::clone(&log)))
        .map(|query: HashMap<String, String>, auth, log: SeenLog| {
            let search = query.get("search").cloned();
            log.lock().unwrap().push(Seen {
                path: "/request_image".into(),
                query,
                auth,
                body: None,
            });
            match search.as_deref() {
                Some("explode") => warp::reply::with_status(
                    warp::reply::json(&json!({ "error": "database down" })),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ),
                Some("missing") => warp::reply::with_status(
                    warp::reply::json(&Value::Null),
                    StatusCode::NOT_FOUND,
                ),
                _ => warp::reply::with_status(warp::reply::json(&transfers_body()), StatusCode::OK),
            }
        });

    let update = warp::put()
        .and(warp::path!("api" / "request_image" / String))
        .and(warp::body::json())
        .and(with_log(Arc::clone(&log)))
        .map(|id: String, body: Value, log: SeenLog| {
            log.lock().unwrap().push(Seen {
                path: format!("/request_image/{id}"),
                query: HashMap::new(),
                auth: None,
                body: Some(body),
            });
            warp::reply::json(&json!({ "message": "updated" }))
        });

    let automation = warp::put()
        .and(warp::path!("api" / "request_register" / "automatization"))
        .and(warp::body::json())
        .and(with_log(Arc::clone(&log)))
        .map(|body: Value, log: SeenLog| {
            log.lock().unwrap().push(Seen {
                path: "/request_register/automatization".into(),
                query: HashMap::new(),
                auth: None,
                body: Some(body),
            });
            warp::reply::json(&json!({ "message": "updated" }))
        });

    let users = warp::get()
        .and(warp::path("api"))
        .and(warp::path("request_register"))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_log(Arc::clone(&log)))
        .map(|query: HashMap<String, String>, log: SeenLog| {
            log.lock().unwrap().push(Seen {
                path: "/request_register/".into(),
                query,
                auth: None,
                body: None,
            });
            warp::reply::json(&users_body())
        });

    let routes = logs.or(transfers).or(update).or(automation).or(users);
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, log)
}

fn client(addr: SocketAddr) -> ApiClient {
    let session = StaticSession::new(TenantConfig::new(format!("http://{addr}"))).with_token("secret");
    ApiClient::new(Arc::new(session)).unwrap()
}

fn last_seen(log: &SeenLog) -> Seen {
    log.lock().unwrap().last().cloned().unwrap()
}

#[tokio::test]
async fn logs_are_requested_by_offset_with_search_term() {
    let (addr, log) = serve().await;
    let source = LogsSource::new(client(addr));
    let filters = FilterSet::new()
        .with(FilterField::Search, "acme")
        .with(FilterField::LogType, "change_status");

    let page = source
        .fetch_page(&filters, &LogsSource::default_sort(), PageRequest::Number { page: 2, limit: 10 })
        .await
        .unwrap();

    let seen = last_seen(&log);
    assert_eq!(seen.auth.as_deref(), Some("Bearer secret"));
    assert_eq!(seen.query["limit"], "10");
    assert_eq!(seen.query["offset"], "10");
    assert_eq!(seen.query["sortBy"], "timestamp");
    assert_eq!(seen.query["sortOrder"], "desc");
    assert_eq!(seen.query["searchTerm"], "acme");
    assert_eq!(seen.query["logType"], "change_status");
    assert!(!seen.query.contains_key("search"));

    assert_eq!(page.len(), 2);
    assert_eq!(page.total_matching, 42);
    assert!(page.has_next);
    assert_eq!(page.stats.change_status, 7);
    let ids: Vec<RecordId> = page.records.iter().map(Record::record_id).collect();
    assert_eq!(ids, vec![RecordId::from("l1"), RecordId::from("l2")]);
    assert_eq!(page.records[0].new_status.as_deref(), Some("won"));
    assert_eq!(page.records[0].details["confidence"], json!(92));
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let (addr, _log) = serve().await;
    let source = LogsSource::new(client(addr));
    let filters = FilterSet::new().with(FilterField::Search, "garbled");

    let err = source
        .fetch_page(&filters, &SortSpec::default(), PageRequest::Offset { offset: 0, limit: 20 })
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn transfers_are_requested_by_page_number() {
    let (addr, log) = serve().await;
    let source = TransfersSource::new(client(addr));
    let filters = FilterSet::new()
        .with(FilterField::Status, "pending")
        .with(
            FilterField::StartDate,
            FilterValue::parse(FilterField::StartDate, "2024-03-01"),
        );

    let page = source
        .fetch_page(&filters, &SortSpec::default(), PageRequest::Offset { offset: 20, limit: 10 })
        .await
        .unwrap();

    let seen = last_seen(&log);
    assert_eq!(seen.query["page"], "3");
    assert_eq!(seen.query["limit"], "10");
    assert_eq!(seen.query["status"], "pending");
    assert_eq!(seen.query["startDate"], "2024-03-01T00:00:00.000Z");
    assert!(!seen.query.contains_key("search"));
    assert!(!seen.query.contains_key("sortBy"));

    assert_eq!(page.total_matching, 37);
    assert!(page.has_next);
    assert_eq!(page.records[0].status, TransferStatus::Pending);
    assert_eq!(page.records[0].amount(), Some(1500.5));
    assert_eq!(page.records[1].amount(), None);
    assert!((page.stats.total_amount - 55000.0).abs() < f64::EPSILON);
    assert_eq!(page.stats.pending, 12);
}

#[tokio::test]
async fn default_status_is_not_sent() {
    let (addr, log) = serve().await;
    let source = TransfersSource::new(client(addr));
    let filters = FilterSet::new()
        .with(FilterField::Status, "all")
        .with(FilterField::Search, "ana");

    source
        .fetch_page(&filters, &SortSpec::default(), PageRequest::Number { page: 1, limit: 20 })
        .await
        .unwrap();

    let seen = last_seen(&log);
    assert!(!seen.query.contains_key("status"));
    assert_eq!(seen.query["search"], "ana");
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let (addr, _log) = serve().await;
    let source = TransfersSource::new(client(addr));
    let filters = FilterSet::new().with(FilterField::Search, "explode");

    let err = source
        .fetch_page(&filters, &SortSpec::default(), PageRequest::Number { page: 1, limit: 20 })
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::status(500, "database down"));
}

#[tokio::test]
async fn status_line_is_used_without_error_body() {
    let (addr, _log) = serve().await;
    let source = TransfersSource::new(client(addr));
    let filters = FilterSet::new().with(FilterField::Search, "missing");

    let err = source
        .fetch_page(&filters, &SortSpec::default(), PageRequest::Number { page: 1, limit: 20 })
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::status(404, "HTTP 404: Not Found"));
}

#[tokio::test]
async fn sources_declare_the_filters_they_send() {
    let (addr, _log) = serve().await;
    let logs = LogsSource::new(client(addr));
    let transfers = TransfersSource::new(client(addr));
    let users = UsersSource::new(client(addr));

    assert!(logs.supports(FilterField::Search));
    assert!(logs.supports(FilterField::LogType));
    assert!(!logs.supports(FilterField::Channel));

    assert!(transfers.supports(FilterField::Status));
    assert!(!transfers.supports(FilterField::Channel));
    assert!(!transfers.supports(FilterField::LogType));

    assert!(users.supports(FilterField::Channel));
    assert!(!users.supports(FilterField::Search));
}

#[tokio::test]
async fn transfer_actions_put_status_bodies() {
    let (addr, log) = serve().await;
    let source = TransfersSource::new(client(addr));

    source.approve(&RecordId::from("t1")).await.unwrap();
    let seen = last_seen(&log);
    assert_eq!(seen.path, "/request_image/t1");
    assert_eq!(seen.body, Some(json!({ "status": "approved" })));

    source.reject(&RecordId::from("t2")).await.unwrap();
    let seen = last_seen(&log);
    assert_eq!(seen.path, "/request_image/t2");
    assert_eq!(seen.body, Some(json!({ "status": "rejected" })));

    source.set_automation(true).await.unwrap();
    let seen = last_seen(&log);
    assert_eq!(seen.path, "/request_register/automatization");
    assert_eq!(seen.body, Some(json!({ "status": true })));
}

#[tokio::test]
async fn users_send_channel_and_report_total() {
    let (addr, log) = serve().await;
    let source = UsersSource::new(client(addr));
    let filters = FilterSet::new()
        .with(FilterField::Channel, "whatsapp")
        .with(FilterField::Search, "ignored");

    let page = source
        .fetch_page(&filters, &SortSpec::default(), PageRequest::Number { page: 1, limit: 20 })
        .await
        .unwrap();

    let seen = last_seen(&log);
    assert_eq!(seen.path, "/request_register/");
    assert_eq!(seen.query["channel"], "whatsapp");
    assert!(!seen.query.contains_key("search"));

    assert_eq!(page.stats.total, 1);
    assert!(!page.has_next);
    assert_eq!(page.records[0].bot_num, Some(2));
    assert_eq!(page.records[0].created_at.as_deref(), Some("2024-03-01T08:00:00.000Z"));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = LogsSource::new(client(addr));
    let err = source
        .fetch_page(&FilterSet::new(), &SortSpec::default(), PageRequest::Number { page: 1, limit: 20 })
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Network(_)));
}
