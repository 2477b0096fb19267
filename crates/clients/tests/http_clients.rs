//! HTTP client tests against a local stub of the remote services.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use clients::{
    DirectoryClient, HttpDirectoryClient, HttpInventoryClient, InventoryClient, RemoteError,
};
use common::{Credential, ProductId, UserId};
use serde_json::{Value, json};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    authorization: Option<String>,
    body: Option<Value>,
}

#[derive(Clone, Default)]
struct Stub {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Stub {
    async fn record(&self, path: String, headers: &HeaderMap, body: Option<Value>) {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen.lock().await.push(Seen {
            path,
            authorization,
            body,
        });
    }

    async fn last(&self) -> Seen {
        self.seen.lock().await.last().cloned().unwrap()
    }
}

async fn user(State(stub): State<Stub>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    stub.record(format!("/api/v1/users/{id}"), &headers, None)
        .await;
    match id {
        1 => Json(json!({"id": 1, "firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com"}))
            .into_response(),
        2 => StatusCode::NOT_FOUND.into_response(),
        3 => StatusCode::UNAUTHORIZED.into_response(),
        4 => StatusCode::FORBIDDEN.into_response(),
        6 => StatusCode::OK.into_response(),
        7 => (StatusCode::OK, "<html>oops</html>").into_response(),
        8 => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            StatusCode::OK.into_response()
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn product(State(stub): State<Stub>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    stub.record(format!("/api/v1/products/{id}"), &headers, None)
        .await;
    match id {
        10 => Json(json!({"id": 10, "name": "Widget", "price": 19.99, "stock": 5})).into_response(),
        11 => Json(json!({"id": 11, "name": "Ghost", "price": "1.00", "stock": null})).into_response(),
        12 => StatusCode::NOT_FOUND.into_response(),
        14 => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/json")],
            r#"{"id":14,"name":"Ledger","price":10.00,"stock":3}"#,
        )
            .into_response(),
        15 => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/json")],
            r#"{"id":15,"name":"Vault","price":12345678901234567.89,"stock":1}"#,
        )
            .into_response(),
        _ => StatusCode::BAD_GATEWAY.into_response(),
    }
}

async fn stock(
    State(stub): State<Stub>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    stub.record(format!("/api/v1/products/{id}/stock"), &headers, Some(body))
        .await;
    match id {
        10 => StatusCode::NO_CONTENT,
        13 => StatusCode::FORBIDDEN,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn start_stub() -> (String, Stub) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/api/v1/users/{id}", get(user))
        .route("/api/v1/products/{id}", get(product))
        .route("/api/v1/products/{id}/stock", patch(stock))
        .route("/actuator/health", get(|| async { Json(json!({"status": "UP"})) }))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), stub)
}

fn directory(base: &str) -> HttpDirectoryClient {
    HttpDirectoryClient::new(base, Duration::from_millis(500)).unwrap()
}

fn inventory(base: &str) -> HttpInventoryClient {
    HttpInventoryClient::new(base, Duration::from_millis(500)).unwrap()
}

#[tokio::test]
async fn test_get_user_decodes_record() {
    let (base, _) = start_stub().await;

    let user = directory(&base)
        .get_user(UserId::new(1), None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.id, UserId::new(1));
    assert_eq!(user.email.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn test_status_codes_are_classified() {
    let (base, _) = start_stub().await;
    let client = directory(&base);

    assert_eq!(
        client.get_user(UserId::new(2), None).await,
        Err(RemoteError::NotFound)
    );
    assert_eq!(
        client.get_user(UserId::new(3), None).await,
        Err(RemoteError::Unauthorized)
    );
    assert_eq!(
        client.get_user(UserId::new(4), None).await,
        Err(RemoteError::Forbidden)
    );
    assert!(matches!(
        client.get_user(UserId::new(5), None).await,
        Err(RemoteError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_empty_body_is_none_and_garbage_is_unavailable() {
    let (base, _) = start_stub().await;
    let client = directory(&base);

    assert_eq!(client.get_user(UserId::new(6), None).await, Ok(None));
    assert!(matches!(
        client.get_user(UserId::new(7), None).await,
        Err(RemoteError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_slow_service_times_out_as_unavailable() {
    let (base, _) = start_stub().await;
    let client = HttpDirectoryClient::new(&base, Duration::from_millis(100)).unwrap();

    assert!(matches!(
        client.get_user(UserId::new(8), None).await,
        Err(RemoteError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    // Nothing listens on the discard port.
    let client = directory("http://127.0.0.1:9");
    assert!(matches!(
        client.get_user(UserId::new(1), None).await,
        Err(RemoteError::Unavailable(_))
    ));
    assert!(!client.is_available().await);
}

#[tokio::test]
async fn test_credential_forwarded_verbatim() {
    let (base, stub) = start_stub().await;
    let credential = Credential::from_header("Bearer eyJhbGciOi.payload.sig").unwrap();

    directory(&base)
        .get_user(UserId::new(1), Some(&credential))
        .await
        .unwrap();
    assert_eq!(
        stub.last().await.authorization.as_deref(),
        Some("Bearer eyJhbGciOi.payload.sig")
    );

    inventory(&base)
        .set_stock(ProductId::new(10), 3, Some(&credential))
        .await
        .unwrap();
    assert_eq!(
        stub.last().await.authorization.as_deref(),
        Some("Bearer eyJhbGciOi.payload.sig")
    );
}

#[tokio::test]
async fn test_no_credential_sends_no_header() {
    let (base, stub) = start_stub().await;

    inventory(&base)
        .get_product(ProductId::new(10), None)
        .await
        .unwrap();

    let seen = stub.last().await;
    assert_eq!(seen.path, "/api/v1/products/10");
    assert_eq!(seen.authorization, None);
}

#[tokio::test]
async fn test_get_product_reads_price_and_stock() {
    let (base, _) = start_stub().await;
    let client = inventory(&base);

    let widget = client
        .get_product(ProductId::new(10), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(widget.name, "Widget");
    assert_eq!(widget.price.to_string(), "19.99");
    assert_eq!(widget.stock, Some(5));

    let ghost = client
        .get_product(ProductId::new(11), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ghost.stock, None);

    assert_eq!(
        client.get_product(ProductId::new(12), None).await,
        Err(RemoteError::NotFound)
    );
    assert!(matches!(
        client.get_product(ProductId::new(99), None).await,
        Err(RemoteError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_numeric_price_keeps_scale_and_digits() {
    let (base, _) = start_stub().await;
    let client = inventory(&base);

    let ledger = client
        .get_product(ProductId::new(14), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ledger.price.amount().scale(), 2);
    assert_eq!(ledger.price.to_string(), "10.00");

    let vault = client
        .get_product(ProductId::new(15), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vault.price.to_string(), "12345678901234567.89");
}

#[tokio::test]
async fn test_set_stock_sends_absolute_quantity() {
    let (base, stub) = start_stub().await;
    let client = inventory(&base);

    client.set_stock(ProductId::new(10), 2, None).await.unwrap();

    let seen = stub.last().await;
    assert_eq!(seen.path, "/api/v1/products/10/stock");
    assert_eq!(seen.body, Some(json!({"newStock": 2})));

    assert_eq!(
        client.set_stock(ProductId::new(13), 1, None).await,
        Err(RemoteError::Forbidden)
    );
    assert!(matches!(
        client.set_stock(ProductId::new(14), 1, None).await,
        Err(RemoteError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_health_probe() {
    let (base, _) = start_stub().await;
    assert!(directory(&base).is_available().await);
    assert!(inventory(&base).is_available().await);
}
