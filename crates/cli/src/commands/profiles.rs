//! `promptline profiles`: list the profiles the gateway starts with.

use promptline_core::ProfileSummary;
use std::path::Path;

pub fn run(config_path: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = promptline_gateway::build_registry(&config)?;
    let profiles = registry.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
    } else {
        print!("{}", render_table(&profiles, &config.chat.default_profile));
    }
    Ok(())
}

fn render_table(profiles: &[ProfileSummary], default_id: &str) -> String {
    let width = profiles.iter().map(|p| p.id.len()).max().unwrap_or(2).max(2);
    let mut out = format!("  {:<width$}  {:<8}  {:<7}  NAME\n", "ID", "VERSION", "ORIGIN");
    for p in profiles {
        let marker = if p.id == default_id { '*' } else { ' ' };
        let origin = if p.custom { "custom" } else { "builtin" };
        out.push_str(&format!(
            "{marker} {:<width$}  {:<8}  {:<7}  {}\n",
            p.id, p.version, origin, p.name
        ));
    }
    out
}
