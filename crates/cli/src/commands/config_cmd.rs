//! `promptline config`: configuration management commands.

use promptline_config::{AppConfig, AuditSinkKind};
use std::path::Path;

pub fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    let config = match super::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed successfully");

    if let Err(e) = promptline_gateway::build_registry(&config) {
        println!("   ❌ Profile error: {e}");
        return Err(e.into());
    }
    println!("   ✅ Profiles registered");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Model:     {}", config.generator.model);
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Default:   {}", config.chat.default_profile);
    println!("   Custom:    {}", config.profiles.custom.len());
    println!("   Audit:     {}", config.audit.sink);

    Ok(())
}

fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set GEMINI_API_KEY or PROMPTLINE_API_KEY)");
    }
    if config.gateway.cors_origins.iter().any(|o| o == "*") {
        warnings.push("CORS allows any origin");
    }
    if !config.audit.enabled || config.audit.sink == AuditSinkKind::None {
        warnings.push("Audit logging is disabled");
    }
    warnings
}

pub fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    if config.generator.api_key.is_some() {
        config.generator.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub fn path() {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
}

pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let dir = AppConfig::config_dir();
    let config_path = dir.join("config.toml");
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }
    std::fs::create_dir_all(&dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", config_path.display());
    Ok(())
}
