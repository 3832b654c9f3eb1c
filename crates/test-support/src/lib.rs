//! Shared test fixtures.
//!
//! [`items_api_router`] is a small in-memory "items" API whose [`items_openapi_document`]
//! matches its routes, so tests can convert the document and call the tools against the real
//! handlers (in process or over a socket via [`spawn_items_api`]).

use anyhow::Context as _;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener};
use std::process::Child;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails or if the bound socket's
/// local address cannot be read.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// Poll an HTTP URL until it returns a success status (2xx/3xx).
///
/// # Errors
///
/// Returns an error if the timeout elapses before the endpoint returns a success status.
pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout_dur {
            anyhow::bail!("timed out waiting for {url}");
        }

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    }
}

// ============================================================================
// Sample items API
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemCreate {
    name: String,
    price: f64,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
struct GreetingQuery {
    #[serde(default)]
    name: Option<String>,
}

type Store = Arc<RwLock<BTreeMap<u64, Item>>>;

fn seed() -> BTreeMap<u64, Item> {
    [
        (1, "Hammer", 9.99),
        (2, "Screwdriver", 4.5),
        (3, "Wrench", 12.0),
    ]
    .into_iter()
    .map(|(id, name, price)| {
        let item = Item {
            id,
            name: name.to_string(),
            price,
            description: None,
        };
        (id, item)
    })
    .collect()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"detail": "Item not found"})),
    )
        .into_response()
}

async fn list_items(State(store): State<Store>, Query(page): Query<Page>) -> Json<Vec<Item>> {
    let items = store.read();
    Json(
        items
            .values()
            .skip(page.skip)
            .take(page.limit)
            .cloned()
            .collect(),
    )
}

async fn create_item(State(store): State<Store>, Json(input): Json<ItemCreate>) -> Json<Item> {
    let mut items = store.write();
    let id = items.keys().next_back().map_or(1, |last| last + 1);
    let item = Item {
        id,
        name: input.name,
        price: input.price,
        description: input.description,
    };
    items.insert(id, item.clone());
    Json(item)
}

async fn get_item(State(store): State<Store>, Path(item_id): Path<u64>) -> Response {
    match store.read().get(&item_id) {
        Some(item) => Json(item.clone()).into_response(),
        None => not_found(),
    }
}

async fn update_item(
    State(store): State<Store>,
    Path(item_id): Path<u64>,
    Json(input): Json<ItemCreate>,
) -> Response {
    let mut items = store.write();
    let Some(item) = items.get_mut(&item_id) else {
        return not_found();
    };
    item.name = input.name;
    item.price = input.price;
    item.description = input.description;
    Json(item.clone()).into_response()
}

async fn delete_item(State(store): State<Store>, Path(item_id): Path<u64>) -> Response {
    match store.write().remove(&item_id) {
        Some(_) => Json(json!({"deleted": item_id})).into_response(),
        None => not_found(),
    }
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    Json(
        headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect(),
    )
}

async fn get_greeting(Query(q): Query<GreetingQuery>) -> Json<Value> {
    let name = q.name.unwrap_or_else(|| "mundo".to_string());
    Json(json!({"message": format!("¡Hola, {name}! 你好 👋")}))
}

async fn raise_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal failure").into_response()
}

async fn openapi_json() -> Json<Value> {
    Json(items_openapi_document())
}

/// Router for the sample items API, with its own fresh in-memory store.
#[must_use]
pub fn items_api_router() -> Router {
    let store: Store = Arc::new(RwLock::new(seed()));
    Router::new()
        .route("/items/", get(list_items).post(create_item))
        .route(
            "/items/{item_id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/headers", get(echo_headers))
        .route("/greeting", get(get_greeting))
        .route("/error", get(raise_error))
        .route("/openapi.json", get(openapi_json))
        .with_state(store)
}

/// Serve [`items_api_router`] on an ephemeral localhost port.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn spawn_items_api() -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind items api")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, items_api_router()).await;
    });
    Ok(addr)
}

/// The `OpenAPI` 3.1 document describing [`items_api_router`].
#[must_use]
pub fn items_openapi_document() -> Value {
    let item_response = |description: &str| {
        json!({
            "description": description,
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Item"}}}
        })
    };
    let not_found = json!({
        "description": "Item not found",
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/HTTPError"}}}
    });
    let validation = json!({
        "description": "Validation Error",
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/HTTPError"}}}
    });
    let item_id = json!({
        "name": "item_id",
        "in": "path",
        "required": true,
        "description": "The ID of the item",
        "schema": {"type": "integer", "title": "Item Id"}
    });
    let item_body = json!({
        "required": true,
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ItemCreate"}}}
    });

    json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Items API",
            "description": "A sample API for managing items",
            "version": "0.1.0"
        },
        "paths": {
            "/items/": {
                "get": {
                    "tags": ["items"],
                    "summary": "List Items",
                    "description": "List all items with pagination.",
                    "operationId": "list_items",
                    "parameters": [
                        {"name": "skip", "in": "query", "required": false,
                         "schema": {"type": "integer", "default": 0, "title": "Skip"},
                         "description": "Number of items to skip"},
                        {"name": "limit", "in": "query", "required": false,
                         "schema": {"type": "integer", "default": 10, "maximum": 100, "title": "Limit"},
                         "description": "Max number of items to return"}
                    ],
                    "responses": {
                        "200": {
                            "description": "Successful Response",
                            "content": {"application/json": {"schema": {
                                "type": "array",
                                "items": {"$ref": "#/components/schemas/Item"},
                                "title": "Response List Items"
                            }}}
                        },
                        "422": validation.clone()
                    }
                },
                "post": {
                    "tags": ["items"],
                    "summary": "Create Item",
                    "description": "Create a new item.",
                    "operationId": "create_item",
                    "requestBody": item_body.clone(),
                    "responses": {"200": item_response("Successful Response"), "422": validation.clone()}
                }
            },
            "/items/{item_id}": {
                "get": {
                    "tags": ["items"],
                    "summary": "Get Item",
                    "description": "Get a specific item by its ID.",
                    "operationId": "get_item",
                    "parameters": [item_id.clone()],
                    "responses": {
                        "200": item_response("Successful Response"),
                        "404": not_found.clone(),
                        "422": validation.clone()
                    }
                },
                "put": {
                    "tags": ["items"],
                    "summary": "Update Item",
                    "operationId": "update_item",
                    "parameters": [item_id.clone()],
                    "requestBody": item_body,
                    "responses": {
                        "200": item_response("Successful Response"),
                        "404": not_found.clone(),
                        "422": validation.clone()
                    }
                },
                "delete": {
                    "tags": ["items"],
                    "summary": "Delete Item",
                    "operationId": "delete_item",
                    "parameters": [item_id],
                    "responses": {
                        "200": {"description": "Successful Response",
                                "content": {"application/json": {"schema": {"type": "object"}}}},
                        "404": not_found,
                        "422": validation
                    }
                }
            },
            "/headers": {
                "get": {
                    "tags": ["debug"],
                    "summary": "Echo Headers",
                    "operationId": "echo_headers",
                    "responses": {"200": {"description": "Request headers",
                        "content": {"application/json": {"schema": {"type": "object"}}}}}
                }
            },
            "/greeting": {
                "get": {
                    "tags": ["debug"],
                    "summary": "Get Greeting",
                    "operationId": "get_greeting",
                    "parameters": [{"name": "name", "in": "query", "required": false,
                        "schema": {"anyOf": [{"type": "string"}, {"type": "null"}], "title": "Name"}}],
                    "responses": {"200": {"description": "A multilingual greeting",
                        "content": {"application/json": {"schema": {"type": "object"}}}}}
                }
            },
            "/error": {
                "get": {
                    "tags": ["debug"],
                    "summary": "Raise Error",
                    "operationId": "raise_error",
                    "responses": {"500": {"description": "Always fails"}}
                }
            }
        },
        "components": {
            "schemas": {
                "Item": {
                    "type": "object",
                    "title": "Item",
                    "required": ["id", "name", "price"],
                    "properties": {
                        "id": {"type": "integer", "title": "Id"},
                        "name": {"type": "string", "title": "Name"},
                        "price": {"type": "number", "title": "Price"},
                        "description": {"anyOf": [{"type": "string"}, {"type": "null"}], "title": "Description"}
                    }
                },
                "ItemCreate": {
                    "type": "object",
                    "title": "ItemCreate",
                    "required": ["name", "price"],
                    "properties": {
                        "name": {"type": "string", "title": "Name", "description": "Name of the item"},
                        "price": {"type": "number", "title": "Price", "description": "Price in USD"},
                        "description": {"anyOf": [{"type": "string"}, {"type": "null"}], "title": "Description"}
                    }
                },
                "HTTPError": {
                    "type": "object",
                    "title": "HTTPError",
                    "properties": {"detail": {"type": "string", "title": "Detail"}}
                }
            }
        }
    })
}
