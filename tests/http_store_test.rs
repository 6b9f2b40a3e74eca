use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use inventory_client::api::{HttpStore, StoreError};
use inventory_client::form::Field;
use inventory_client::inventory::{ActionError, Confirm, Inventory};
use inventory_client::notify::Channel;
use inventory_client::view::TableState;

const TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
struct Seen {
    method: String,
    path: String,
    body: String,
}

/// Answers one connection per scripted `(status, body)` pair, in order, and
/// records the request line and body of each.
struct CannedBackend {
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<Seen>>>,
    _task: JoinHandle<()>,
}

impl CannedBackend {
    async fn start(script: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let task = tokio::spawn(async move {
            for (status, body) in script {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                log.lock().await.push(request);
                let response = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });
        Self {
            addr,
            seen,
            _task: task,
        }
    }

    fn store(&self) -> HttpStore {
        let base = Url::parse(&format!("http://{}", self.addr)).unwrap();
        HttpStore::with_base_url(base, "inventory-client-test").unwrap()
    }

    async fn seen(&self) -> Vec<Seen> {
        self.seen.lock().await.clone()
    }
}

async fn read_request(stream: &mut TcpStream) -> Seen {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the request head ended");
        buf.extend_from_slice(&chunk[..n]);
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the request body ended");
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.split_whitespace();
    Seen {
        method: request_line.next().unwrap_or_default().to_string(),
        path: request_line.next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[head_end..head_end + content_length]).to_string(),
    }
}

struct Yes;

#[async_trait]
impl Confirm for Yes {
    async fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

#[tokio::test]
async fn list_decodes_sloppy_rows() {
    let backend = CannedBackend::start(vec![(
        200,
        r#"[
            {"id": 1, "name": "Pen", "description": null, "price": "abc", "quantity": "3"},
            {"id": "2", "name": "Cup", "description": "Blue", "price": 4.5, "quantity": 1}
        ]"#,
    )])
    .await;

    let products = backend.store().list().await.unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].price, 0.0);
    assert_eq!(products[0].quantity, 3);
    assert_eq!(products[0].description, "");
    assert_eq!(products[1].id, 2);
    assert_eq!(products[1].price, 4.5);
    assert_eq!(
        backend.seen().await,
        vec![Seen {
            method: "GET".into(),
            path: "/products".into(),
            body: String::new(),
        }]
    );
}

#[tokio::test]
async fn not_found_carries_the_server_detail() {
    let backend = CannedBackend::start(vec![(404, r#"{"detail": "Product Not Found"}"#)]).await;

    let err = backend.store().get(7).await.unwrap_err();

    match &err {
        StoreError::Status { status, detail } => {
            assert_eq!(*status, StatusCode::NOT_FOUND);
            assert_eq!(detail.as_deref(), Some("Product Not Found"));
        }
        other => panic!("expected a status error, got {:?}", other),
    }
    assert_eq!(err.user_message("Operation failed"), "Product Not Found");
    assert_eq!(backend.seen().await[0].path, "/products/7");
}

#[tokio::test]
async fn error_without_detail_reports_the_status() {
    let backend = CannedBackend::start(vec![(500, "<html>oops</html>")]).await;

    let err = backend.store().list().await.unwrap_err();

    assert!(err.detail().is_none());
    assert!(err.user_message("Operation failed").contains("500"));
}

#[tokio::test]
async fn delete_accepts_a_message_body() {
    let backend =
        CannedBackend::start(vec![(200, r#"{"message": "Product Deleted Successfully"}"#)]).await;

    backend.store().delete(3).await.unwrap();

    let seen = backend.seen().await;
    assert_eq!(seen[0].method, "DELETE");
    assert_eq!(seen[0].path, "/products/3");
}

#[tokio::test]
async fn view_flow_over_http() {
    let backend = CannedBackend::start(vec![
        (
            200,
            r#"[{"id": 1, "name": "Phone", "description": "A smartphone", "price": 699.99, "quantity": 50}]"#,
        ),
        (409, r#"{"detail": "Product ID already exists"}"#),
        (200, r#"{"message": "Product Deleted Successfully"}"#),
        (200, "[]"),
    ])
    .await;
    let mut view = Inventory::new(backend.store(), TTL);

    view.mount().await;
    match view.table() {
        TableState::Rows(rows) => assert_eq!(rows[0].name, "Phone"),
        other => panic!("expected rows, got {:?}", other),
    }

    view.set_field(Field::Id, "1");
    view.set_field(Field::Name, "Mug");
    view.set_field(Field::Description, "Blue");
    view.set_field(Field::Price, "2.5");
    view.set_field(Field::Quantity, "4");
    let err = view.submit().await.unwrap_err();
    assert!(matches!(err, ActionError::Store(StoreError::Status { .. })));
    assert_eq!(view.notice(Channel::Error), Some("Product ID already exists"));
    assert_eq!(view.form().draft().name, "Mug");

    assert!(view.delete(1, &mut Yes).await.unwrap());
    assert_eq!(
        view.notice(Channel::Success),
        Some("Product deleted successfully")
    );
    assert!(view.notice(Channel::Error).is_none());
    assert_eq!(view.table(), TableState::Empty);

    let seen = backend.seen().await;
    let lines: Vec<(&str, &str)> = seen
        .iter()
        .map(|s| (s.method.as_str(), s.path.as_str()))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("GET", "/products"),
            ("POST", "/products"),
            ("DELETE", "/products/1"),
            ("GET", "/products"),
        ]
    );
    let posted: Value = serde_json::from_str(&seen[1].body).unwrap();
    assert_eq!(
        posted,
        json!({"id": 1, "name": "Mug", "description": "Blue", "price": 2.5, "quantity": 4})
    );
}
