// Orchid Catalog - Web Server
// REST API with Axum over the catalog store

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use orchid_catalog::{
    CatalogError, Category, CategoryKey, Item, Location, RelocationEngine, RelocationOutcome,
    SqliteStore,
};
use orchid_catalog::store::CatalogStore;

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<SqliteStore>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Category response (items stamped with the category's display name,
/// the shape the list screen consumes)
#[derive(Serialize)]
struct CategoryResponse {
    key: String,
    name: String,
    items: Vec<Item>,
}

impl CategoryResponse {
    fn from_node(key: &CategoryKey, category: &Category) -> Self {
        let items = category
            .items
            .values()
            .map(|item| {
                let mut stamped = item.clone();
                stamped.category = category.name.clone();
                stamped
            })
            .collect();

        Self {
            key: key.clone(),
            name: category.name.clone(),
            items,
        }
    }
}

#[derive(Deserialize)]
struct AddItemRequest {
    category_key: String,
    item: Item,
}

#[derive(Serialize)]
struct AddItemResponse {
    item_key: String,
}

#[derive(Serialize)]
struct UpdateItemResponse {
    moved: bool,
    location: Location,
}

impl From<RelocationOutcome> for UpdateItemResponse {
    fn from(outcome: RelocationOutcome) -> Self {
        Self {
            moved: outcome.is_move(),
            location: outcome.location().clone(),
        }
    }
}

/// Map a core error to a status + envelope.
fn catalog_error_response(err: CatalogError) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let status = match err {
        CatalogError::EmptyTree
        | CatalogError::NotFound { .. }
        | CatalogError::DestinationCategoryNotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CatalogError::Write(_) | CatalogError::PartialRelocation { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(ApiResponse::err(err.to_string())))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/categories - The whole category tree
async fn get_categories(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().unwrap();

    match store.fetch_tree() {
        Ok(tree) => {
            let response: Vec<CategoryResponse> = tree
                .iter()
                .map(|(key, category)| CategoryResponse::from_node(key, category))
                .collect();

            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            eprintln!("Error fetching categories: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<Vec<CategoryResponse>>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/categories/:key/items - One category's items
async fn get_category_items(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let store = state.store.lock().unwrap();

    match store.fetch_tree() {
        Ok(tree) => match tree.get(&key) {
            Some(category) => {
                let response = CategoryResponse::from_node(&key, category);
                (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
            }
            None => (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<CategoryResponse>::err(format!(
                    "no category with key {}",
                    key
                ))),
            )
                .into_response(),
        },
        Err(e) => {
            eprintln!("Error fetching category {}: {}", key, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<CategoryResponse>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// POST /api/items - Add flow (validate, stamp, push)
async fn add_item(
    State(state): State<AppState>,
    Json(request): Json<AddItemRequest>,
) -> impl IntoResponse {
    let mut store = state.store.lock().unwrap();
    let mut engine = RelocationEngine::new(&mut *store);

    match engine.add_item(&request.category_key, request.item) {
        Ok(item_key) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok(AddItemResponse { item_key })),
        )
            .into_response(),
        Err(e) => catalog_error_response(e).into_response(),
    }
}

/// PUT /api/items/:name - Edit flow (in-place update or relocation)
async fn update_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(updated): Json<Item>,
) -> impl IntoResponse {
    // Decode URL-encoded item name
    let decoded_name = urlencoding::decode(&name)
        .unwrap_or_else(|_| name.clone().into())
        .into_owned();

    let mut store = state.store.lock().unwrap();
    let mut engine = RelocationEngine::new(&mut *store);

    match engine.update_item(&decoded_name, &updated) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::ok(UpdateItemResponse::from(outcome))),
        )
            .into_response(),
        Err(e) => {
            eprintln!("Error updating item {}: {}", decoded_name, e);
            catalog_error_response(e).into_response()
        }
    }
}

/// DELETE /api/items/:name - Deletion variant (locate, then remove)
async fn delete_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let decoded_name = urlencoding::decode(&name)
        .unwrap_or_else(|_| name.clone().into())
        .into_owned();

    let mut store = state.store.lock().unwrap();
    let mut engine = RelocationEngine::new(&mut *store);

    match engine.remove_item(&decoded_name) {
        Ok(location) => (StatusCode::OK, Json(ApiResponse::ok(location))).into_response(),
        Err(e) => {
            eprintln!("Error deleting item {}: {}", decoded_name, e);
            catalog_error_response(e).into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌸 Orchid Catalog - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Open database
    let db_path = std::env::var("ORCHIDS_DB").unwrap_or_else(|_| "orchids.db".to_string());
    let db_path = std::path::Path::new(&db_path);

    let store = SqliteStore::open(db_path).expect("Failed to open catalog database");
    println!("✓ Catalog database opened: {:?}", db_path);

    // Create shared state
    let state = AppState {
        store: Arc::new(Mutex::new(store)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/categories", get(get_categories))
        .route("/categories/:key/items", get(get_category_items))
        .route("/items", post(add_item))
        .route("/items/:name", put(update_item).delete(delete_item))
        .with_state(state.clone());

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/categories");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
