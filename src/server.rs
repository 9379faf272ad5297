//! HTTP server exposing key provisioning, signing and verification.
//!
//! ```text
//! GET  /health                 -> {"status":"ok"}
//! POST /users/:user_id/keys    -> {"message": "..."} | {"detail": "..."}
//! POST /sign      (multipart)  -> SignedPackage      | {"detail": "..."}
//! POST /verify    (multipart)  -> VerificationReport
//! ```

use crate::config::Config;
use crate::error::{Result, SignError};
use crate::key_store::UserKeyStore;
use crate::package::{archive_file_name, SignedPackage};
use crate::signer::Signer;
use crate::verifier::{VerificationReport, Verifier};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared state of all request handlers.
pub struct AppState {
    pub config: Config,
    pub store: UserKeyStore,
}

impl AppState {
    /// Open the key store and archive directory named by `config`.
    pub fn new(config: Config) -> Result<Self> {
        let store = UserKeyStore::open(&config.keys_dir)?;
        if let Some(dir) = &config.archive_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self { config, store })
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_body_size;
    Router::new()
        .route("/health", get(handle_health))
        .route("/users/:user_id/keys", post(handle_generate_keys))
        .route("/sign", post(handle_sign))
        .route("/verify", post(handle_verify))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A bound, not yet running, signing server.
pub struct SignServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl SignServer {
    /// Open storage and bind the listen address.
    pub async fn bind(config: Config) -> Result<Self> {
        let listener = TcpListener::bind(config.listen).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, keys_dir = ?config.keys_dir, "Bound docsign server");

        let state = Arc::new(AppState::new(config)?);
        Ok(Self {
            listener,
            router: router(state),
            local_addr,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process ends.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;
        tracing::info!("docsign server stopped");
        Ok(())
    }
}

/// Error response carrying a `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, detail: S) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn bad_request<S: Into<String>>(detail: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    fn internal<S: Into<String>>(detail: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// One multipart field.
struct Upload {
    bytes: Bytes,
    filename: Option<String>,
    content_type: Option<String>,
}

struct Form(HashMap<String, Upload>);

impl Form {
    async fn read(mut multipart: Multipart) -> std::result::Result<Self, ApiError> {
        let mut fields = HashMap::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            fields.insert(
                name,
                Upload {
                    bytes,
                    filename,
                    content_type,
                },
            );
        }
        Ok(Self(fields))
    }

    fn take(&mut self, name: &str) -> std::result::Result<Upload, ApiError> {
        self.0
            .remove(name)
            .ok_or_else(|| ApiError::bad_request(format!("Missing field: {}", name)))
    }

    fn take_text(&mut self, name: &str) -> std::result::Result<String, ApiError> {
        let upload = self.take(name)?;
        String::from_utf8(upload.bytes.to_vec())
            .map_err(|_| ApiError::bad_request(format!("Field {} is not valid UTF-8", name)))
    }
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_generate_keys(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> std::result::Result<Json<Value>, ApiError> {
    let store = state.store.clone();
    let uid = user_id.clone();
    let generated = tokio::task::spawn_blocking(move || store.generate_user_keys(&uid))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    match generated {
        Ok(_) => Ok(Json(json!({
            "message": format!("Keys generated for user {}", user_id)
        }))),
        Err(e @ (SignError::KeysExist(_) | SignError::InvalidUserId(_))) => {
            tracing::warn!(%user_id, error = %e, "key generation rejected");
            Err(ApiError::bad_request(e.to_string()))
        }
        Err(e) => {
            tracing::error!(%user_id, error = %e, "key generation failed");
            Err(ApiError::internal(e.to_string()))
        }
    }
}

async fn handle_sign(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> std::result::Result<Json<SignedPackage>, ApiError> {
    let mut form = Form::read(multipart).await?;
    let user_id = form.take_text("user_id")?;
    let signature_base64 = form.take_text("signature_base64")?;
    let document = form.take("document")?;

    // a base64 error from the task below comes from a key file
    base64::engine::general_purpose::STANDARD
        .decode(signature_base64.trim())
        .map_err(|e| ApiError::bad_request(format!("Invalid signature_base64: {}", e)))?;

    let state = Arc::clone(&state);
    let uid = user_id.clone();
    let signed = tokio::task::spawn_blocking(move || -> Result<SignedPackage> {
        let keypair = state.store.load_keypair(&uid)?;

        let mut signer = Signer::new(&keypair)
            .with_user_id(uid.as_str())
            .with_algorithm(state.config.algorithm);
        if let Some(filename) = document.filename {
            signer = signer.with_filename(filename);
        }
        if let Some(content_type) = document.content_type {
            signer = signer.with_content_type(content_type);
        }
        let package = signer.sign(&document.bytes, &signature_base64)?;

        if let Some(dir) = &state.config.archive_dir {
            package.save(dir.join(archive_file_name(&uid)))?;
        }
        Ok(package)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))?;

    match signed {
        Ok(package) => {
            tracing::info!(%user_id, document_hash = %package.document_hash, "document signed");
            Ok(Json(package))
        }
        Err(SignError::UserNotFound(_) | SignError::InvalidUserId(_)) => {
            Err(ApiError::bad_request("User not found"))
        }
        Err(e) => {
            tracing::error!(%user_id, error = %e, "error signing document");
            Err(ApiError::internal(format!("Error signing document: {}", e)))
        }
    }
}

async fn handle_verify(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> std::result::Result<Response, ApiError> {
    let mut form = Form::read(multipart).await?;
    let document = form.take("document")?;
    let package_upload = form.take("signed_package")?;
    let signature_base64 = form.take_text("signature_base64")?;

    let package = match SignedPackage::from_slice(&package_upload.bytes) {
        Ok(package) => package,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable signed package");
            let report = VerificationReport::invalid_package(&e.to_string(), &package_upload.bytes);
            return Ok((StatusCode::BAD_REQUEST, Json(report)).into_response());
        }
    };

    let store = state.store.clone();
    let checked = tokio::task::spawn_blocking(move || {
        let outcome =
            Verifier::verify_with_store(&document.bytes, &package, &signature_base64, &store);
        (outcome, package)
    })
    .await;

    let response = match checked {
        Ok((Ok(result), _)) => {
            tracing::info!(user_id = %result.user_id, valid = result.valid, "signature verified");
            (StatusCode::OK, Json(VerificationReport::from_result(&result)))
        }
        Ok((Err(e), package)) => {
            tracing::info!(user_id = %package.user_id, error = %e, "verification rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(VerificationReport::from_error(&e, &package)),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "verification task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VerificationReport::internal(&e.to_string())),
            )
        }
    };
    Ok(response.into_response())
}
