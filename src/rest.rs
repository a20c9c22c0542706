//! REST API layer using Axum (served on port 3001 by default)
//!
//! - `GET /api/health` and `POST /api/login` are public.
//! - `/api/items` CRUD requires `Authorization: Bearer <token>`; the verified
//!   claims reach each handler through the [`AuthUser`] extractor.
//! - Every failure is rendered by [`ApiError`] as `{"error": "..."}`.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Duration;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::auth::{Identity, TokenService};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{Claims, CreateItemRequest, PublicUser, UpdateItemRequest, WasteItem};
use crate::openapi::ApiDoc;
use crate::storage::{CredentialStore, InMemoryItemStore, ItemStore};

/// Shared app state for REST handlers (Arc-wrapped by the router)
#[derive(Clone)]
pub struct AppState {
    pub items: Arc<dyn ItemStore>,
    pub credentials: Arc<CredentialStore>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(
        items: Arc<dyn ItemStore>,
        credentials: Arc<CredentialStore>,
        tokens: TokenService,
    ) -> Self {
        Self {
            items,
            credentials,
            tokens,
        }
    }

    /// Seeded in-memory stores plus a token service, as the server binary runs them.
    pub fn from_config(config: &Config) -> Result<Self, bcrypt::BcryptError> {
        let items: Arc<dyn ItemStore> = if config.no_seed_items {
            Arc::new(InMemoryItemStore::new())
        } else {
            Arc::new(InMemoryItemStore::seeded())
        };
        let credentials = Arc::new(CredentialStore::seeded(config.bcrypt_cost)?);
        let tokens = TokenService::new(
            config.jwt_secret.as_bytes(),
            Duration::seconds(config.token_ttl_secs),
        );
        Ok(Self::new(items, credentials, tokens))
    }
}

/// JSON body extractor whose rejection goes through [`ApiError`].
///
/// A body sent without a JSON content type is read as `{}`, so the handler
/// answers with its usual missing-field error. Unparseable JSON is a 500.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => {
                serde_json::from_value(serde_json::Value::Object(Default::default()))
                    .map(ApiJson)
                    .map_err(|e| ApiError::Internal(format!("empty body rejected: {e}")))
            }
            Err(rejection) => Err(rejection.into()),
        }
    }
}

/// Claims of a verified bearer token.
///
/// No header, or a header without a token segment, is a 401. A token that
/// fails verification is a 403. Roles are carried but not checked.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::MissingToken)?;
        let claims = state.tokens.verify(token)?;
        Ok(AuthUser(claims))
    }
}

// Token is the second space-separated segment: "Bearer <token>".
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .split(' ')
        .nth(1)
        .filter(|token| !token.is_empty())
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ItemList {
    pub items: Vec<WasteItem>,
    pub total: usize,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DeletedItem {
    pub message: String,
    pub item: WasteItem,
}

/// Create Axum router with health, login and item endpoints
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/health", get(health_handler).fallback(route_not_found))
        .route("/api/login", post(login_handler).fallback(route_not_found))
        .route(
            "/api/items",
            get(list_items).post(create_item).fallback(route_not_found),
        )
        .route(
            "/api/items/:id",
            get(get_item)
                .put(update_item)
                .delete(delete_item)
                .fallback(route_not_found),
        )
        .route("/api/openapi.json", get(openapi_handler).fallback(route_not_found))
        .fallback(route_not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check handler
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "REM Waste API is running".to_string(),
    })
}

/// Handler: exchange username/password for a bearer token
///
/// Unknown usernames and wrong passwords get the same 401 after the same
/// amount of bcrypt work.
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Username or password missing", body = crate::error::ErrorBody),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(username), Some(password)) = (
        payload.username.filter(|u| !u.is_empty()),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::Validation(
            "Username and password required".to_string(),
        ));
    };

    let credentials = state.credentials.clone();
    let lookup = username.clone();
    let user = tokio::task::spawn_blocking(move || credentials.authenticate(&lookup, &password))
        .await
        .map_err(|e| ApiError::Internal(format!("login task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("password verification failed: {e}")))?;

    let Some(user) = user else {
        warn!(%username, "login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let token = state
        .tokens
        .issue(&Identity::from(&user))
        .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;

    info!(username = %user.username, role = user.role.as_str(), "login succeeded");
    Ok(Json(LoginResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

/// Handler: all items in insertion order
#[utoipa::path(
    get,
    path = "/api/items",
    tag = "items",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All items", body = ItemList),
        (status = 401, description = "Access token required", body = crate::error::ErrorBody),
        (status = 403, description = "Invalid or expired token", body = crate::error::ErrorBody)
    )
)]
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
) -> Result<Json<ItemList>, ApiError> {
    let items = state.items.list().await?;
    Ok(Json(ItemList {
        total: items.len(),
        items,
    }))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}",
    tag = "items",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 200, description = "The item", body = WasteItem),
        (status = 404, description = "Item not found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<WasteItem>, ApiError> {
    state
        .items
        .get(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::ItemNotFound)
}

/// Handler: create an item; always starts `pending`
#[utoipa::path(
    post,
    path = "/api/items",
    tag = "items",
    security(("bearer" = [])),
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = WasteItem),
        (status = 400, description = "Missing fields or quantity <= 0", body = crate::error::ErrorBody)
    )
)]
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiJson(payload): ApiJson<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = payload.validate()?;
    let item = state.items.create(fields).await?;
    info!(id = %item.id, by = %claims.username, "item created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler: partial update; only supplied fields change
#[utoipa::path(
    put,
    path = "/api/items/{id}",
    tag = "items",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Item id")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated item", body = WasteItem),
        (status = 400, description = "Invalid quantity or status", body = crate::error::ErrorBody),
        (status = 404, description = "Item not found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateItemRequest>,
) -> Result<Json<WasteItem>, ApiError> {
    // an unknown id wins over a bad payload
    let patch = payload.validate();
    if state.items.get(&id).await?.is_none() {
        return Err(ApiError::ItemNotFound);
    }
    let item = state
        .items
        .update(&id, patch?)
        .await?
        .ok_or(ApiError::ItemNotFound)?;
    info!(%id, by = %claims.username, "item updated");
    Ok(Json(item))
}

#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    tag = "items",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deleted", body = DeletedItem),
        (status = 404, description = "Item not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedItem>, ApiError> {
    let item = state
        .items
        .delete(&id)
        .await?
        .ok_or(ApiError::ItemNotFound)?;
    info!(%id, by = %claims.username, "item deleted");
    Ok(Json(DeletedItem {
        message: "Item deleted successfully".to_string(),
        item,
    }))
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}
