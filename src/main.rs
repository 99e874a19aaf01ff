//! Server binary: loads configuration from the environment and serves the
//! microfrontend.

use veriform_rs::{server, AppConfig};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    log::info!(
        "starting veriform-rs {} on port {} (site key configured: {})",
        veriform_rs::VERSION,
        config.port,
        config.site_key.is_some(),
    );

    server::serve(config).await
}
