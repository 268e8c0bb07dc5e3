//! ocbot QQ Gateway
//!
//! Receives QQ group @-message callbacks over HTTP and answers them through
//! the QQ OpenAPI.

use ocbot::channels::QqGroupChannel;
use ocbot::config::{load_config, validate_config};
use ocbot::core::GroupChannel;
use ocbot::gateway::{build_router, GatewayState, WebhookSigner};
use ocbot::{App, Error, Result, VERSION};

use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    ocbot::logging::init(&config.log);

    info!("Starting ocbot gateway v{}", VERSION);

    let validation = validate_config(&config);
    for issue in &validation.warnings {
        warn!("{}", issue);
    }
    if !validation.valid {
        for issue in &validation.errors {
            error!("{}", issue);
        }
        return Err(Error::Config(format!(
            "configuration has {} error(s), run `ocbot config check`",
            validation.errors.len()
        )));
    }

    let qq = config
        .qq
        .clone()
        .ok_or_else(|| Error::Config("QQ bot is not configured".to_string()))?;
    let gateway = config.gateway.clone();

    let app = App::build(config)?;
    let channel: Arc<dyn GroupChannel> = Arc::new(QqGroupChannel::new(&qq)?);
    let signer = Arc::new(WebhookSigner::new(qq.secret.expose_secret())?);

    if app.voice.is_some() {
        info!("Voice replies enabled");
    }
    info!("{} sticker keyword(s) loaded", app.emotions.len());

    let state = GatewayState {
        dispatcher: Arc::new(app.dispatcher(channel)),
        signer,
        verify_signatures: gateway.verify_signatures,
    };
    if !gateway.verify_signatures {
        warn!("Webhook signature verification is disabled");
    }

    let router = build_router(state, &gateway.callback_path);
    let addr = format!("{}:{}", gateway.bind, gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}{}", addr, gateway.callback_path);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Waiting for {} background task(s)", app.tasks.len().await);
    app.shutdown().await;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
