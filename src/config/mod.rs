pub mod csrf;

pub use csrf::CsrfConfig;

use std::env;

pub(crate) fn current_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

pub(crate) fn is_production() -> bool {
    current_environment() == "production"
}

pub(crate) fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True")
}

pub(crate) fn env_flag_enabled(key: &str) -> bool {
    env::var(key).map(|value| parse_flag(&value)).unwrap_or(false)
}

pub(crate) fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
