//! HTTP server.
//!
//! Axum router exposing the SSR shell, the countries and example-data APIs,
//! and the verification submit endpoint, with allow-list CORS. Requests
//! share only the immutable configuration and reference data; every request
//! assembles its own boot context.

pub mod render;
pub mod validation;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde_json::json;

use crate::boot::BootContextBuilder;
use crate::captcha::{ChallengeProvider, RecaptchaWidget};
use crate::config::AppConfig;
use crate::data;
use crate::form::{SubmitEnvelope, SubmitReceipt};
use crate::i18n::{DetectionContext, LocaleDetector};

use validation::{sanitize_payload, validate_payload, FieldMessage, VerificationPayload};

const DEFAULT_COUNTRY: &str = "AR";

/// Immutable per-process state shared across requests.
pub struct AppState {
    pub config: AppConfig,
    widget: Arc<dyn ChallengeProvider>,
    detector: LocaleDetector,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            widget: Arc::new(RecaptchaWidget::new()),
            detector: LocaleDetector::new(),
        }
    }

    pub fn with_widget(mut self, widget: Arc<dyn ChallengeProvider>) -> Self {
        self.widget = widget;
        self
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(shell_default))
        .route("/{country}", get(shell_for_country))
        .route("/health", get(health))
        .route("/api/countries", get(list_countries))
        .route("/api/example-data/{country}", get(example_data))
        .route("/api/verification/submit", post(submit))
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn serve(config: AppConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("verification microfrontend listening on {addr}");
    axum::serve(listener, router(state)).await
}

async fn cors(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    if let Some(origin) = origin {
        if state.config.origin_allowed(&origin) {
            if let Ok(value) = HeaderValue::from_str(&origin) {
                response
                    .headers_mut()
                    .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
        }
    }
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(
            "Origin, X-Requested-With, Content-Type, Accept, Authorization",
        ),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    response
}

async fn shell_default(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    render_shell(&state, None, query, &headers)
}

async fn shell_for_country(
    State(state): State<Arc<AppState>>,
    Path(country): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return StatusCode::NOT_FOUND.into_response();
    }
    render_shell(&state, Some(country), query, &headers)
}

fn render_shell(
    state: &AppState,
    path_country: Option<String>,
    query: HashMap<String, String>,
    headers: &HeaderMap,
) -> Response {
    let started = Instant::now();

    let path_country = path_country.map(|country| country.to_ascii_uppercase());
    let country = match path_country.as_deref() {
        Some(code) if data::is_supported_country(code) => code.to_string(),
        _ => DEFAULT_COUNTRY.to_string(),
    };

    // An explicit, supported country path pins the locale; anything else
    // goes through the detection chain.
    let locale = match path_country.as_deref().and_then(data::country_by_code) {
        Some(entry) => entry.locale,
        None => state.detector.detect(&detection_context(&query, &headers)),
    };

    let mut boot = BootContextBuilder::new(locale, country).with_query(query);
    if let Some(user_agent) = header_str(&headers, header::USER_AGENT) {
        boot = boot.with_user_agent(user_agent);
    }
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        boot = boot.with_ip(ip);
    }
    let boot = boot.build();

    let widget_markup = state.widget.render(state.config.site_key());
    let page = match render::render_page(&boot, &state.config.performance, &widget_markup, started)
    {
        Ok(page) => page,
        Err(err) => {
            log::error!("SSR render failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render::render_error_page(locale)),
            )
                .into_response();
        }
    };

    let elapsed = started.elapsed();
    if elapsed > state.config.performance.render_timeout() {
        log::warn!("slow render: {}ms", elapsed.as_millis());
    }

    Html(page).into_response()
}

fn detection_context(query: &HashMap<String, String>, headers: &HeaderMap) -> DetectionContext {
    let mut ctx = DetectionContext::new();
    if let Some(locale) = query.get("locale").or_else(|| query.get("lang")) {
        ctx = ctx.with_query_locale(locale.clone());
    }
    if let Some(host) = header_str(headers, header::HOST) {
        ctx = ctx.with_host(host);
    }
    if let Some(referrer) = header_str(headers, header::REFERER) {
        ctx = ctx.with_referrer(referrer);
    }
    if let Some(forwarded) = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get("x-original-host"))
        .and_then(|value| value.to_str().ok())
    {
        ctx = ctx.with_forwarded_host(forwarded);
    }
    if let Some(accept) = header_str(headers, header::ACCEPT_LANGUAGE) {
        ctx = ctx.with_accept_language(accept);
    }
    ctx
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

async fn list_countries() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": data::countries() }))
}

async fn example_data(Path(country): Path<String>) -> Response {
    if country.is_empty() || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return error_envelope(
            StatusCode::BAD_REQUEST,
            "INVALID_COUNTRY",
            "Country parameter is required",
            None,
        );
    }
    if !data::is_supported_country(&country) {
        return error_envelope(
            StatusCode::BAD_REQUEST,
            "UNSUPPORTED_COUNTRY",
            "País no soportado. Solo se permiten AR y BR.",
            None,
        );
    }
    match data::example_data_for(&country) {
        Some(example) => Json(json!({ "success": true, "data": example })).into_response(),
        None => error_envelope(
            StatusCode::NOT_FOUND,
            "DATA_NOT_FOUND",
            "No se encontraron datos de ejemplo para el país especificado.",
            None,
        ),
    }
}

async fn submit(
    State(_state): State<Arc<AppState>>,
    payload: Result<Json<VerificationPayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            log::warn!("rejected submit body: {rejection}");
            return error_envelope(
                StatusCode::BAD_REQUEST,
                "INVALID_JSON",
                "Request body must be valid JSON",
                None,
            );
        }
    };

    let errors = validate_payload(&payload);
    if !errors.is_empty() {
        log::warn!(
            "submit validation failed: {:?}",
            errors.iter().map(|e| e.field.as_str()).collect::<Vec<_>>()
        );
        return error_envelope(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Invalid request data",
            Some(errors),
        );
    }

    // Sanitized before any use or logging; the raw payload is never trusted.
    let sanitized = sanitize_payload(&payload);
    log::info!(
        "verification submitted: name={} country={} referrer={:?}",
        sanitized.name,
        sanitized.country,
        sanitized.context.get("referrer"),
    );

    let envelope = SubmitEnvelope {
        success: true,
        message: Some("Verificación completada exitosamente".into()),
        data: Some(SubmitReceipt {
            id: format!("verification_{}", Utc::now().timestamp_millis()),
            timestamp: Utc::now().to_rfc3339(),
        }),
        ..SubmitEnvelope::default()
    };
    Json(envelope).into_response()
}

fn error_envelope(
    status: StatusCode,
    code: &str,
    message: &str,
    errors: Option<Vec<FieldMessage>>,
) -> Response {
    let mut body = json!({
        "success": false,
        "code": code,
        "message": message,
    });
    if let Some(errors) = errors {
        body["errors"] = json!(errors);
    }
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(AppConfig::default()))
    }

    fn payload(name: &str, country: &str, address: &str, token: &str) -> VerificationPayload {
        VerificationPayload {
            name: name.into(),
            country: country.into(),
            address: address.into(),
            captcha_token: token.into(),
            context: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn submit_accepts_a_valid_payload() {
        let response = submit(
            State(state()),
            Ok(Json(payload(
                "Juan Pérez",
                "AR",
                "Av. Corrientes 1234, Buenos Aires",
                "tok123",
            ))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn submit_rejects_an_invalid_payload_with_400() {
        let response = submit(State(state()), Ok(Json(payload("J", "AR", "short", "t")))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn example_data_discriminates_unsupported_countries() {
        let ok = example_data(Path("AR".to_string())).await;
        assert_eq!(ok.status(), StatusCode::OK);

        let unsupported = example_data(Path("MX".to_string())).await;
        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);

        let invalid = example_data(Path("123".to_string())).await;
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn shell_renders_for_supported_country_paths() {
        let response = shell_for_country(
            State(state()),
            Path("BR".to_string()),
            Query(HashMap::new()),
            HeaderMap::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let not_found = shell_for_country(
            State(state()),
            Path("favicon.ico".to_string()),
            Query(HashMap::new()),
            HeaderMap::new(),
        )
        .await;
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
    }
}
