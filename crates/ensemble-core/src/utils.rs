//! Utility helpers: path resolution, timestamps, string manipulation.

use std::path::PathBuf;

/// Ensemble data directory (e.g. `~/.ensemble/`).
pub fn get_data_path() -> PathBuf {
    home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".ensemble")
}

/// Directory for saved builder rosters (e.g. `~/.ensemble/builds/`).
pub fn get_builds_path() -> PathBuf {
    get_data_path().join("builds")
}

/// REPL history file.
pub fn get_history_path() -> PathBuf {
    get_data_path().join("history").join("cli_history")
}

/// Current ISO 8601 timestamp.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Sanitize a string for use as a filename.
pub fn safe_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("USERPROFILE").ok().map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate_string("hello world, this is a long string", 15);
        assert_eq!(result, "hello world,...");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate_string("Времето в София", 9), "Времет...");
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("weather team/v2"), "weather_team_v2");
        assert_eq!(safe_filename("roster-1.json"), "roster-1.json");
    }

    #[test]
    fn test_expand_home_tilde() {
        let expanded = expand_home("~/vendor/autogen");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.ends_with("vendor/autogen"));
    }

    #[test]
    fn test_expand_home_leaves_other_paths() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }

    #[test]
    fn test_timestamp_is_valid() {
        chrono::DateTime::parse_from_rfc3339(&timestamp()).unwrap();
    }

    #[test]
    fn test_data_paths() {
        assert!(get_data_path().ends_with(".ensemble"));
        assert!(get_builds_path().parent().unwrap().ends_with(".ensemble"));
        assert!(get_history_path().ends_with("history/cli_history"));
    }
}
