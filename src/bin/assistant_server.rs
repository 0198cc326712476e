use actix_web::{web::Data, App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};

use chat_relay::assistant::AssistantClient;
use chat_relay::config::AssistantServerConfig;
use chat_relay::web::{routes, AssistantAppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting chat relay (assistant variant)");

    let config = match AssistantServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    if config.assistant_id.is_none() {
        // The server still starts so the health route can report the gap.
        warn!("OPENAI_ASSISTANT_ID is not set; /api/chat will fail until it is");
    }

    info!(
        "Relaying to {}, listening on port {}",
        config.base_url, config.port
    );

    let port = config.port;
    let allowed_origin = config.allowed_origin.clone();
    let client = AssistantClient::new(&config);
    let app_state = Data::new(AssistantAppState { config, client });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(routes::cors(&allowed_origin))
            .configure(routes::configure_assistant)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
