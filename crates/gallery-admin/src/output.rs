//! Output formatting for the CLI.

use clap::ValueEnum;
use gallery_store::{Effect, User};
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: could not encode output: {}", e),
    }
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "success",
            "message": message,
        })),
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::json!({ "status": "error", "message": message })
        ),
    }
}

/// Print a table row.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label), value);
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "-".repeat(50));
}

/// Print a heading.
pub fn print_heading(text: &str) {
    println!("\n{}", text);
    print_divider();
}

/// One line per effect.
pub fn effect_line(effect: &Effect) -> String {
    let parent = effect
        .parent
        .map(|p| format!("{}@{}", p.id, p.version))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>8}  {}  v{:<4} parent {:<12} {}{}",
        effect.id,
        effect.modified_at.format("%Y-%m-%d %H:%M:%S"),
        effect.latest_version_number().unwrap_or(0),
        parent,
        effect.owner,
        if effect.hidden { "  [hidden]" } else { "" },
    )
}

/// One line per user.
pub fn user_line(user: &User) -> String {
    format!(
        "{:>5}  {:<20} {:<28} {:<10} {:<8} {}:{}  {}",
        user.id,
        user.name,
        user.email,
        user.role.as_str(),
        if user.active { "active" } else { "inactive" },
        user.provider,
        user.provider_id,
        user.created_at.format("%Y-%m-%d"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use gallery_store::{ParentRef, Role, Version};

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_366_033_526, 0).unwrap()
    }

    #[test]
    fn effect_line_marks_hidden_forks() {
        let effect = Effect {
            id: 42,
            created_at: at(),
            modified_at: at(),
            parent: Some(ParentRef { id: 7, version: 2 }),
            owner: "ana".to_string(),
            hidden: true,
            versions: vec![
                Version {
                    created_at: at(),
                    code: "a".to_string(),
                },
                Version {
                    created_at: at(),
                    code: "b".to_string(),
                },
            ],
        };

        let line = effect_line(&effect);
        assert!(line.contains("42"));
        assert!(line.contains("2013-04-15"));
        assert!(line.contains("v1"));
        assert!(line.contains("7@2"));
        assert!(line.ends_with("[hidden]"));
    }

    #[test]
    fn user_line_shows_role_and_provider() {
        let user = User {
            id: 3,
            name: "ana".to_string(),
            password: b"hash".to_vec(),
            email: "ana@example.com".to_string(),
            role: Role::Moderator,
            active: true,
            created_at: at(),
            provider: "password".to_string(),
            provider_id: "ana".to_string(),
        };

        let line = user_line(&user);
        assert!(line.contains("moderator"));
        assert!(line.contains("password:ana"));
        assert!(!line.contains("hash"));
    }
}
