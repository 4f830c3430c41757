//! `promptline serve`: start the HTTP chat gateway.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    println!("promptline gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Default profile: {}", config.chat.default_profile);
    let key_state = if config.has_api_key() {
        "key configured"
    } else {
        "no API key"
    };
    println!("   Generator: {} ({key_state})", config.generator.model);
    println!("   Audit sink: {}", config.audit.sink);

    promptline_gateway::start(config).await?;

    Ok(())
}
