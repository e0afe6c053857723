use std::sync::Arc;

use autosalon::config::{config_schema, load_config, DEFAULT_CONFIG_PATH};
use autosalon::startup;
use autosalon::utils::logger::init_logging;
use tracing::error;

/// Environment variable naming the config file to load.
const CONFIG_PATH_VAR: &str = "AUTOSALON_CONFIG";

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--schema") {
        println!("{}", config_schema());
        return;
    }

    let config_path =
        std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = startup::run(Arc::new(config)).await {
        error!(
            event_name = "startup.failed",
            event_domain = "startup",
            error = %e,
            "server stopped with an error"
        );
        std::process::exit(1);
    }
}
