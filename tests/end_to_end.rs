//! Full-stack flow: the axum server renders the shell, the client half
//! hydrates against the real document, and submissions travel over HTTP to
//! the real endpoint.

use std::sync::{Arc, Mutex};

use url::Url;
use veriform_rs::{
    server::{self, AppState},
    AppConfig, Locale, Microfrontend, MicrofrontendOutput, OutputSink, ReqwestVerificationApi,
    ScriptedChallenge, VerificationApi,
};

const EMBED_ORIGIN: &str = "http://embed.example.com";

async fn spawn_server() -> String {
    let config = AppConfig::builder()
        .with_allowed_origins([EMBED_ORIGIN])
        .build();
    let state = Arc::new(AppState::new(config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[derive(Default)]
struct RecordingSink {
    outputs: Mutex<Vec<MicrofrontendOutput>>,
}

impl RecordingSink {
    fn outputs(&self) -> Vec<MicrofrontendOutput> {
        self.outputs.lock().unwrap().clone()
    }
}

impl OutputSink for RecordingSink {
    fn deliver(&self, output: &MicrofrontendOutput) {
        self.outputs.lock().unwrap().push(output.clone());
    }
}

fn submit_api(base: &str) -> Arc<dyn VerificationApi> {
    let endpoint = Url::parse(&format!("{base}/api/verification/submit")).unwrap();
    Arc::new(ReqwestVerificationApi::new(endpoint).unwrap())
}

#[tokio::test]
async fn verified_submission_round_trips_through_the_real_server() {
    let base = spawn_server().await;
    let html = reqwest::get(format!("{base}/AR"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("<html lang=\"es-AR\">"));

    let sink = Arc::new(RecordingSink::default());
    let mut app = Microfrontend::builder()
        .with_provider(Arc::new(ScriptedChallenge::loading_with_token("tok123")))
        .with_api(submit_api(&base))
        .with_sink(sink.clone())
        .hydrate(&html)
        .unwrap();

    assert_eq!(app.locale(), Locale::EsAr);
    // Seeded example data pre-filled the form.
    assert_eq!(app.form().fields().name, "Juan Pérez");

    let form = app.form_mut();
    form.set_name("Juan Pérez");
    form.set_country("AR");
    form.set_address("Av. Corrientes 1234, Buenos Aires");
    form.captcha_mut().mount().await.unwrap();
    form.captcha_mut().execute().await.unwrap();
    assert!(form.captcha().state().is_verified);

    let output = form.submit().await.expect("submission should succeed");

    assert!(output.verified);
    assert_eq!(output.captcha_token, "tok123");
    let user_data = output.user_data.as_ref().unwrap();
    assert_eq!(user_data["name"], "Juan Pérez");
    assert!(user_data["verificationId"]
        .as_str()
        .unwrap()
        .starts_with("verification_"));

    assert!(form.submission().is_success);
    assert!(form.fields().name.is_empty());
    assert!(!form.captcha().state().is_verified);
    assert_eq!(sink.outputs().len(), 1);
}

#[tokio::test]
async fn unverified_captcha_never_reaches_the_server() {
    let base = spawn_server().await;
    let html = reqwest::get(format!("{base}/AR"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let mut app = Microfrontend::builder()
        .with_provider(Arc::new(ScriptedChallenge::loading_with_token("tok123")))
        .with_api(submit_api(&base))
        .hydrate(&html)
        .unwrap();

    let form = app.form_mut();
    form.set_name("Juan Pérez");
    form.set_country("AR");
    form.set_address("Av. Corrientes 1234, Buenos Aires");
    form.captcha_mut().mount().await.unwrap();

    assert!(form.submit().await.is_none());
    assert_eq!(
        form.submission().error.as_deref(),
        Some(veriform_rs::translate(
            Locale::EsAr,
            "form.errors.captchaRequired"
        ))
    );
}

#[tokio::test]
async fn server_side_validation_rejects_what_the_client_skipped() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/verification/submit"))
        .json(&serde_json::json!({
            "name": "R2D2",
            "country": "AR",
            "address": "Av. Corrientes 1234, Buenos Aires",
            "captchaToken": "tok123",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["errors"][0]["field"], "name");
}

#[tokio::test]
async fn query_locale_beats_referrer_domain() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let html = client
        .get(format!("{base}/?locale=pt-BR"))
        .header("Referer", "https://www.mercadolibre.com.ar/checkout")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("<html lang=\"pt-BR\">"));

    let html = client
        .get(format!("{base}/"))
        .header("Referer", "https://www.mercadolivre.com.br/checkout")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("<html lang=\"pt-BR\">"));
}

#[tokio::test]
async fn explicit_query_context_overrides_example_data() {
    let base = spawn_server().await;
    let customer = serde_json::json!({"firstName": "Ana", "lastName": "García"});
    let encoded = veriform_rs::encode_param(&customer);

    let html = reqwest::get(format!(
        "{base}/AR?customerData={encoded}&referrer=4&token=tx-77"
    ))
    .await
    .unwrap()
    .text()
    .await
    .unwrap();

    let app = Microfrontend::builder()
        .with_api(submit_api(&base))
        .hydrate(&html)
        .unwrap();

    assert_eq!(app.form().fields().name, "Ana García");
    assert_eq!(app.form().context().referrer, 4);
    assert_eq!(app.form().context().token, "tx-77");
    assert!(app.form().context().shipping_data.is_none());
}

#[tokio::test]
async fn countries_and_example_data_endpoints_answer_the_contract() {
    let base = spawn_server().await;

    let body: serde_json::Value = reqwest::get(format!("{base}/api/countries"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["code"], "AR");

    let response = reqwest::get(format!("{base}/api/example-data/BR")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["customerData"]["firstName"], "Maria");

    let response = reqwest::get(format!("{base}/api/example-data/MX")).await.unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNSUPPORTED_COUNTRY");
}

#[tokio::test]
async fn cors_echoes_only_allowed_origins() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let allowed = client
        .get(format!("{base}/api/countries"))
        .header("Origin", EMBED_ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(
        allowed
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some(EMBED_ORIGIN)
    );

    let denied = client
        .get(format!("{base}/api/countries"))
        .header("Origin", "http://evil.example.com")
        .send()
        .await
        .unwrap();
    assert!(denied.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let base = spawn_server().await;
    let body: serde_json::Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}
