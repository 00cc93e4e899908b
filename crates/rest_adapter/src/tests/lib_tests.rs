use super::*;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use resource_core::ResourceController;
use serde::{Deserialize, Serialize};
use shared::protocol::Identifiable;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Product {
    id: EntityId,
    nombre: String,
    activo: bool,
}

impl Identifiable for Product {
    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Clone, Default)]
struct Captured {
    params: Arc<Mutex<Option<HashMap<String, String>>>>,
    body: Arc<Mutex<Option<Value>>>,
}

async fn spawn_api(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api")
}

fn product_adapter(base_url: &str) -> RestAdapter<Product> {
    RestAdapter::new(
        Client::new(),
        base_url,
        RestResourceSpec::new("productos", "productos"),
    )
}

fn paged_body() -> Value {
    json!({
        "results": [{"id": 1, "nombre": "martillo", "activo": true}],
        "count": 42,
        "page": 1,
        "page_size": 10,
        "next": "http://host/api/productos/?page=2",
        "previous": null
    })
}

#[test]
fn urls_follow_collection_conventions() {
    let adapter = product_adapter("http://host/api/");

    assert_eq!(adapter.collection_url(""), "http://host/api/productos/");
    assert_eq!(
        adapter.collection_url("bulk/activate"),
        "http://host/api/productos/bulk/activate/"
    );
    assert_eq!(
        adapter.item_url(EntityId(7), ""),
        "http://host/api/productos/7/"
    );
    assert_eq!(
        adapter.item_url(EntityId(7), "toggle_active"),
        "http://host/api/productos/7/toggle_active/"
    );
}

#[tokio::test]
async fn get_all_decodes_paged_envelope_and_forwards_query_params() {
    let captured = Captured::default();
    let app = Router::new()
        .route(
            "/api/productos/",
            get(
                |State(captured): State<Captured>, Query(params): Query<HashMap<String, String>>| async move {
                    *captured.params.lock().await = Some(params);
                    Json(paged_body())
                },
            ),
        )
        .with_state(captured.clone());
    let base_url = spawn_api(app).await;
    let adapter = product_adapter(&base_url);

    let mut params = Filters::new();
    params.insert("activo".to_string(), shared::domain::FilterValue::Bool(true));
    params.insert("page".to_string(), shared::domain::FilterValue::Int(1));

    let envelope = adapter.get_all(&params).await.expect("list");
    let (items, meta) = envelope.into_parts();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].nombre, "martillo");
    let meta = meta.expect("page meta");
    assert_eq!(meta.count, Some(42));
    assert!(meta.next.is_some());

    let seen = captured.params.lock().await.clone().expect("captured");
    assert_eq!(seen.get("activo").map(String::as_str), Some("true"));
    assert_eq!(seen.get("page").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn bare_array_response_decodes_without_page_meta() {
    let app = Router::new().route(
        "/api/productos/",
        get(|| async { Json(json!([{"id": 3, "nombre": "sierra", "activo": true}])) }),
    );
    let base_url = spawn_api(app).await;

    let envelope = product_adapter(&base_url)
        .get_all(&Filters::new())
        .await
        .expect("list");
    let (items, meta) = envelope.into_parts();
    assert_eq!(items.len(), 1);
    assert!(meta.is_none());
}

#[tokio::test]
async fn auth_and_missing_statuses_map_to_their_error_classes() {
    let app = Router::new()
        .route(
            "/api/productos/1/",
            get(|| async { StatusCode::UNAUTHORIZED }),
        )
        .route("/api/productos/2/", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/api/productos/3/",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
    let base_url = spawn_api(app).await;
    let adapter = product_adapter(&base_url);

    assert!(matches!(
        adapter.get_by_id(EntityId(1)).await,
        Err(AdapterError::Unauthorized)
    ));
    assert!(matches!(
        adapter.get_by_id(EntityId(2)).await,
        Err(AdapterError::NotFound)
    ));
    assert!(matches!(
        adapter.get_by_id(EntityId(3)).await,
        Err(AdapterError::Network(_))
    ));
}

#[tokio::test]
async fn field_error_object_becomes_validation_error() {
    let app = Router::new().route(
        "/api/productos/",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "detail": "datos inválidos",
                    "nombre": ["este campo es obligatorio", "segundo mensaje"],
                    "precio": "debe ser positivo"
                })),
            )
        }),
    );
    let base_url = spawn_api(app).await;

    let err = product_adapter(&base_url)
        .create(&json!({}))
        .await
        .expect_err("validation failure");
    match err {
        AdapterError::Validation { message, fields } => {
            assert_eq!(message, "datos inválidos");
            assert_eq!(
                fields.get("nombre").map(String::as_str),
                Some("este campo es obligatorio")
            );
            assert_eq!(
                fields.get("precio").map(String::as_str),
                Some("debe ser positivo")
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn bulk_actions_post_ids_to_their_route() {
    let captured = Captured::default();
    let app = Router::new()
        .route(
            "/api/productos/bulk/activate/",
            post(
                |State(captured): State<Captured>, Json(body): Json<Value>| async move {
                    *captured.body.lock().await = Some(body);
                    StatusCode::OK
                },
            ),
        )
        .with_state(captured.clone());
    let base_url = spawn_api(app).await;

    product_adapter(&base_url)
        .activate_multiple(&[EntityId(1), EntityId(2)])
        .await
        .expect("bulk activate");

    let body = captured.body.lock().await.clone().expect("captured body");
    assert_eq!(body, json!({"ids": [1, 2]}));
}

#[tokio::test]
async fn toggle_active_posts_explicit_target_state() {
    let captured = Captured::default();
    let app = Router::new()
        .route(
            "/api/productos/5/toggle_active/",
            post(
                |State(captured): State<Captured>, Json(body): Json<Value>| async move {
                    *captured.body.lock().await = Some(body);
                    StatusCode::OK
                },
            ),
        )
        .with_state(captured.clone());
    let base_url = spawn_api(app).await;

    product_adapter(&base_url)
        .toggle_active(EntityId(5), Some(false))
        .await
        .expect("toggle");

    let body = captured.body.lock().await.clone().expect("captured body");
    assert_eq!(body, json!({"activo": false}));
}

#[tokio::test]
async fn controller_drives_rest_adapter_end_to_end() {
    let app = Router::new().route("/api/productos/active/", get(|| async { Json(paged_body()) }));
    let base_url = spawn_api(app).await;
    let adapter = Arc::new(product_adapter(&base_url));
    let controller = ResourceController::new(adapter);

    assert!(controller.fetch_list(Filters::new()).await);

    let state = controller.state().await;
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].nombre, "martillo");
    assert_eq!(state.pagination.total_items, 42);
    assert_eq!(state.pagination.total_pages, 5);
}

#[tokio::test]
async fn structured_error_body_overrides_generic_status_mapping() {
    let app = Router::new().route(
        "/api/productos/9/",
        get(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"code": "network", "message": "backend draining"})),
            )
        }),
    );
    let base_url = spawn_api(app).await;

    let err = product_adapter(&base_url)
        .get_by_id(EntityId(9))
        .await
        .expect_err("failure");
    match err {
        AdapterError::Network(message) => assert_eq!(message, "backend draining"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_object_validation_body_yields_empty_field_map() {
    match parse_validation("plain text error") {
        AdapterError::Validation { message, fields } => {
            assert_eq!(message, "validation failed");
            assert!(fields.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
