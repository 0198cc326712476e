use actix_web::{web::Data, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use chat_relay::completion::CompletionClient;
use chat_relay::config::ChatServerConfig;
use chat_relay::web::{routes, ChatAppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting chat relay (stateless variant)");

    let config = match ChatServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    info!(
        "Relaying to {} as model {}, listening on port {}",
        config.base_url, config.model, config.port
    );

    let port = config.port;
    let allowed_origin = config.allowed_origin.clone();
    let client = CompletionClient::new(&config);
    let app_state = Data::new(ChatAppState { config, client });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(routes::cors(&allowed_origin))
            .configure(routes::configure_chat)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
