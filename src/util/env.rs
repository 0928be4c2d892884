//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Only startup code (`AppConfig::from_env`, `LogFormat::from_env`) should call these.
use std::str::FromStr;
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// First non-empty value among `keys`.
pub fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| env_opt(k))
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Clone,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        Err(_) => default,
    }
}

/// Database URL from the first of DATABASE_URL / MONGO_URL / DB_URL.
pub fn db_url() -> anyhow::Result<String> {
    env_first(&["DATABASE_URL", "MONGO_URL", "DB_URL"])
        .ok_or_else(|| anyhow::anyhow!("no database URL env vars set (DATABASE_URL)"))
}

/// Replace the database-name path segment of a DSN. Returns the input unchanged
/// when it does not parse as a URL.
pub fn with_database_name(dsn: &str, name: &str) -> String {
    match url::Url::parse(dsn) {
        Ok(mut u) => {
            u.set_path(&format!("/{}", name.trim_start_matches('/')));
            u.to_string()
        }
        Err(_) => dsn.to_string(),
    }
}

pub fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("KEY") || k.contains("TOKEN")
    {
        return "***".to_string();
    }

    let val_trim = val.trim();

    // Always redact DSN credentials even if the key isn't obviously sensitive.
    if let Ok(mut u) = url::Url::parse(val_trim) {
        let scheme = u.scheme().to_ascii_lowercase();
        if scheme.starts_with("postgres") || scheme.starts_with("mongodb") {
            if !u.username().is_empty() {
                let _ = u.set_username("***");
            }
            if u.password().is_some() {
                let _ = u.set_password(Some("***"));
            }
            return u.to_string();
        }
    }

    val_trim.to_string()
}

/// Validate required keys and log a consolidated, redacted snapshot of configuration.
/// Returns error if any required key is missing.
pub fn preflight_check(title: &str, required: &[&str], also_log: &[&str]) -> anyhow::Result<()> {
    init_env();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|k| env_opt(k).is_none())
        .collect();
    let snapshot: Vec<(String, String)> = also_log
        .iter()
        .map(|&k| {
            let v = env_opt(k).unwrap_or_default();
            (k.to_string(), redact_value(k, &v))
        })
        .collect();
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
    if !missing.is_empty() {
        return Err(anyhow::anyhow!("missing required env: {:?}", missing));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_secrets_and_dsn_credentials() {
        assert_eq!(redact_value("JWT_SECRET", "hunter2"), "***");
        assert_eq!(redact_value("LLM_API_KEY", "sk-123"), "***");
        assert_eq!(
            redact_value("DATABASE_URL", "postgres://vault:pw@db:5432/feedback"),
            "postgres://***:***@db:5432/feedback"
        );
        assert_eq!(redact_value("API_PORT", " 8001 "), "8001");
    }

    #[test]
    fn overrides_database_name() {
        assert_eq!(
            with_database_name("postgres://u:p@localhost:5432/postgres", "feedback_vault"),
            "postgres://u:p@localhost:5432/feedback_vault"
        );
        assert_eq!(
            with_database_name("postgres://localhost/old?sslmode=require", "new"),
            "postgres://localhost/new?sslmode=require"
        );
        assert_eq!(with_database_name("not a url", "x"), "not a url");
    }
}
