use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use models::{NewProfile, ProfileError, ProfileId, ProfileUpdate};
use security::AdminKeyPolicy;
use storage::ProfileStorageEngine;

pub mod config;
pub mod profile_url;
pub mod qr;

pub use crate::config::{RestApiConfig, load_rest_api_config};
use crate::profile_url::{ProfileSnapshot, ProfileUrlBuilder, UrlMode};

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// Implement IntoResponse for RestApiError to convert it into an HTTP response
impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RestApiError::Profile(ProfileError::Validation(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            RestApiError::Profile(ProfileError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "User not found".to_string())
            }
            RestApiError::Profile(ProfileError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized: admin key invalid or missing".to_string(),
            ),
            RestApiError::Profile(ProfileError::ServerMisconfigured(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server admin configuration missing".to_string(),
            ),
            RestApiError::Profile(ProfileError::EncodingError(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error generating QR code: {}", e),
            ),
            RestApiError::Profile(other) => {
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
            RestApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

// Shared state for the Axum application
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ProfileStorageEngine>,
    admin_policy: AdminKeyPolicy,
    url_builder: ProfileUrlBuilder,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ProfileStorageEngine>,
        admin_policy: AdminKeyPolicy,
        url_builder: ProfileUrlBuilder,
    ) -> Self {
        Self {
            store,
            admin_policy,
            url_builder,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AdminKeyQuery {
    #[serde(rename = "adminKey")]
    admin_key: Option<String>,
}

/// The admin secret arrives in the `x-admin-key` header (preferred) or the
/// `adminKey` query parameter.
fn supplied_admin_key(headers: &HeaderMap, query: &AdminKeyQuery) -> Option<String> {
    headers
        .get("x-admin-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| query.admin_key.clone())
}

fn parse_id(raw: &str) -> Result<ProfileId, RestApiError> {
    ProfileId::parse(raw).map_err(|e| RestApiError::Profile(ProfileError::Validation(e)))
}

// Handler for POST /api/user/register
async fn register_profile_handler(
    State(state): State<AppState>,
    Json(payload): Json<NewProfile>,
) -> Result<(StatusCode, Json<Value>), RestApiError> {
    let profile = state.store.create(payload).await?;
    info!("Registered profile {}", profile.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": profile,
        })),
    ))
}

// Handler for GET /api/user/all (admin-gated)
async fn list_profiles_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminKeyQuery>,
) -> Result<Json<Value>, RestApiError> {
    state
        .admin_policy
        .authorize(supplied_admin_key(&headers, &query).as_deref())?;
    let profiles = state.store.list_all().await?;
    Ok(Json(json!({
        "success": true,
        "count": profiles.len(),
        "data": profiles,
    })))
}

// Handler for GET /api/user/:id (public emergency profile)
async fn get_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, RestApiError> {
    let id = parse_id(&id)?;
    let profile = state
        .store
        .get(&id)
        .await?
        .ok_or(ProfileError::NotFound(id))?;
    Ok(Json(json!({
        "success": true,
        "data": profile,
    })))
}

// Handler for PUT /api/user/:id (admin-gated)
async fn update_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<AdminKeyQuery>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Value>, RestApiError> {
    // Authorization comes first: a denied caller must not mutate anything.
    state
        .admin_policy
        .authorize(supplied_admin_key(&headers, &query).as_deref())?;
    let id = parse_id(&id)?;
    let profile = state.store.update(&id, update).await?;
    info!("Updated profile {}", profile.id);
    Ok(Json(json!({
        "success": true,
        "message": "User updated successfully",
        "data": profile,
    })))
}

// Handler for DELETE /api/user/:id (admin-gated)
async fn delete_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<AdminKeyQuery>,
) -> Result<Json<Value>, RestApiError> {
    state
        .admin_policy
        .authorize(supplied_admin_key(&headers, &query).as_deref())?;
    let id = parse_id(&id)?;
    state.store.delete(&id).await?;
    info!("Deleted profile {}", id);
    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}

// Handler for GET /api/qr/:id
async fn generate_qr_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, RestApiError> {
    let id = parse_id(&id)?;

    // Best-effort snapshot for the fallback query string; a failed lookup
    // must never block QR generation.
    let snapshot = match state.store.get(&id).await {
        Ok(Some(profile)) => Some(ProfileSnapshot::from(&profile)),
        Ok(None) => None,
        Err(e) => {
            warn!("Snapshot lookup for {} failed: {}", id, e);
            None
        }
    };

    let profile_url = state.url_builder.build(&id, snapshot.as_ref());
    let qr_code = qr::encode_data_url(&profile_url)?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "qrCode": qr_code,
            "profileUrl": profile_url,
            "userId": id.to_string(),
        },
    })))
}

// Handler for GET /api/health
async fn health_check_handler(State(state): State<AppState>) -> Json<Value> {
    let (connected, count) = match state.store.count().await {
        Ok(count) => (true, Some(count)),
        Err(_) => (false, None),
    };
    Json(json!({
        "status": "OK",
        "message": "Life Code API is running",
        "storage": {
            "engine": state.store.engine_kind(),
            "connected": connected,
            "profiles": count,
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Builds the application router over the given state.
pub fn app(state: AppState) -> Router {
    // CORS stays permissive: profiles are scanned by arbitrary phones on the
    // local network.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/api/user/register", post(register_profile_handler))
        .route("/api/user/all", get(list_profiles_handler))
        .route(
            "/api/user/:id",
            get(get_profile_handler)
                .put(update_profile_handler)
                .delete(delete_profile_handler),
        )
        .route("/api/qr/:id", get(generate_qr_handler))
        .route("/api/health", get(health_check_handler))
        .with_state(state)
        .layer(cors)
}

/// Main function to start the REST API server.
pub async fn start_server(
    config: RestApiConfig,
    store: Arc<dyn ProfileStorageEngine>,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), anyhow::Error> {
    let mode = if config.qr_inline_mode {
        UrlMode::Inline
    } else {
        UrlMode::Plain
    };
    let state = AppState::new(
        store,
        AdminKeyPolicy::new(config.admin_api_key.clone()),
        ProfileUrlBuilder::new(&config.frontend_url, mode),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid host/port configuration")?;

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;

    info!("REST API server listening on {}", addr);
    info!("API health check: http://{}/api/health", addr);

    axum::serve(listener, app(state).into_make_service())
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
            info!("Received shutdown signal.");
        })
        .await
        .context("REST API server failed to start or run")?;

    info!("REST API server stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{BloodGroup, EmergencyContact};
    use std::net::Ipv4Addr;
    use storage::InMemoryProfileStorage;

    fn test_state(admin_key: Option<&str>) -> AppState {
        AppState::new(
            Arc::new(InMemoryProfileStorage::new()),
            AdminKeyPolicy::new(admin_key.map(str::to_string)),
            ProfileUrlBuilder::with_local_addr(
                "http://localhost:3000",
                Some(Ipv4Addr::new(192, 168, 1, 50)),
                UrlMode::Plain,
            ),
        )
    }

    fn sample_payload() -> NewProfile {
        NewProfile {
            name: "Jo Doe".to_string(),
            age: Some(34),
            blood_group: Some(BloodGroup::OPositive),
            emergency_contact: EmergencyContact {
                name: "Sam Doe".to_string(),
                phone: "555-0101".to_string(),
                relationship: String::new(),
            },
            ..NewProfile::default()
        }
    }

    fn admin_headers(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-admin-key", key.parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn should_register_and_fetch_profile() {
        let state = test_state(Some("k"));
        let (status, body) =
            register_profile_handler(State(state.clone()), Json(sample_payload()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let id = body.0["data"]["id"].as_str().unwrap().to_string();

        let fetched = get_profile_handler(State(state), Path(id))
            .await
            .unwrap();
        assert_eq!(fetched.0["data"]["name"], "Jo Doe");
    }

    #[tokio::test]
    async fn should_reject_registration_with_missing_contact_phone() {
        let state = test_state(Some("k"));
        let mut payload = sample_payload();
        payload.emergency_contact.phone = String::new();
        let result = register_profile_handler(State(state.clone()), Json(payload)).await;
        assert!(matches!(
            result,
            Err(RestApiError::Profile(ProfileError::Validation(_)))
        ));
        assert_eq!(state.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_return_invalid_id_before_consulting_store() {
        let state = test_state(Some("k"));
        let result = get_profile_handler(State(state), Path("not-a-uuid".to_string())).await;
        assert!(matches!(
            result,
            Err(RestApiError::Profile(ProfileError::Validation(
                models::ValidationError::InvalidIdentifier(_)
            )))
        ));
    }

    #[tokio::test]
    async fn should_deny_unauthorized_update_without_mutating() {
        let state = test_state(Some("k"));
        let (_, body) = register_profile_handler(State(state.clone()), Json(sample_payload()))
            .await
            .unwrap();
        let id = body.0["data"]["id"].as_str().unwrap().to_string();

        let update = ProfileUpdate {
            name: Some("Mallory".to_string()),
            ..ProfileUpdate::default()
        };
        let result = update_profile_handler(
            State(state.clone()),
            Path(id.clone()),
            admin_headers("wrong"),
            Query(AdminKeyQuery::default()),
            Json(update),
        )
        .await;
        assert!(matches!(
            result,
            Err(RestApiError::Profile(ProfileError::Unauthorized))
        ));

        let fetched = get_profile_handler(State(state), Path(id)).await.unwrap();
        assert_eq!(fetched.0["data"]["name"], "Jo Doe");
    }

    #[tokio::test]
    async fn should_accept_admin_key_from_query_parameter() {
        let state = test_state(Some("k"));
        let listed = list_profiles_handler(
            State(state),
            HeaderMap::new(),
            Query(AdminKeyQuery {
                admin_key: Some("k".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed.0["count"], 0);
    }

    #[tokio::test]
    async fn should_report_misconfiguration_when_admin_key_unset() {
        let state = test_state(None);
        let result =
            list_profiles_handler(State(state), HeaderMap::new(), Query(AdminKeyQuery::default()))
                .await;
        assert!(matches!(
            result,
            Err(RestApiError::Profile(ProfileError::ServerMisconfigured(_)))
        ));
    }

    #[tokio::test]
    async fn should_delete_and_then_miss() {
        let state = test_state(Some("k"));
        let (_, body) = register_profile_handler(State(state.clone()), Json(sample_payload()))
            .await
            .unwrap();
        let id = body.0["data"]["id"].as_str().unwrap().to_string();

        delete_profile_handler(
            State(state.clone()),
            Path(id.clone()),
            admin_headers("k"),
            Query(AdminKeyQuery::default()),
        )
        .await
        .unwrap();

        let result = get_profile_handler(State(state), Path(id)).await;
        assert!(matches!(
            result,
            Err(RestApiError::Profile(ProfileError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn should_generate_qr_with_snapshot_query() {
        let state = test_state(Some("k"));
        let (_, body) = register_profile_handler(State(state.clone()), Json(sample_payload()))
            .await
            .unwrap();
        let id = body.0["data"]["id"].as_str().unwrap().to_string();

        let qr = generate_qr_handler(State(state), Path(id.clone()))
            .await
            .unwrap();
        let profile_url = qr.0["data"]["profileUrl"].as_str().unwrap();
        assert_eq!(
            profile_url,
            format!(
                "http://192.168.1.50:3000/profile/{}?n=Jo%20Doe&bg=O%2B&ecn=Sam%20Doe&ecp=555-0101",
                id
            )
        );
        assert!(
            qr.0["data"]["qrCode"]
                .as_str()
                .unwrap()
                .starts_with("data:image/png;base64,")
        );
        assert_eq!(qr.0["data"]["userId"], id);
    }

    #[tokio::test]
    async fn should_generate_qr_without_snapshot_for_absent_record() {
        let state = test_state(Some("k"));
        let ghost = ProfileId::generate();
        let qr = generate_qr_handler(State(state), Path(ghost.to_string()))
            .await
            .unwrap();
        let profile_url = qr.0["data"]["profileUrl"].as_str().unwrap();
        // No snapshot, no query string; generation still succeeds.
        assert_eq!(
            profile_url,
            format!("http://192.168.1.50:3000/profile/{}", ghost)
        );
    }
}
