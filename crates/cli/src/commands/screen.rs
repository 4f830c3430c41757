//! `promptline screen`: check a prompt file the way registration would.

use promptline_security::{check_prompt_length, screen_prompt};
use std::io::Read;
use std::path::Path;

pub fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)
            .map_err(|e| format!("Failed to read {}: {e}", file.display()))?
    };

    let issues = collect_issues(&text);
    if issues.is_empty() {
        println!("✅ Prompt accepted ({} characters)", text.chars().count());
        return Ok(());
    }

    println!("❌ Prompt rejected:");
    for issue in &issues {
        println!("   - {issue}");
    }
    Err(format!("{} issue(s) found", issues.len()).into())
}

/// Length failures are reported alone, as registration does.
fn collect_issues(text: &str) -> Vec<String> {
    if let Some(issue) = check_prompt_length(text) {
        return vec![issue];
    }
    screen_prompt(text).issues
}
