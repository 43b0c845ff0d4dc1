use std::env;
use std::fs;
use std::path::Path;

use homequote_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

const CONFIG_EXIT_CODE: u8 = 2;

struct ConfigField {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> ConfigField {
    ConfigField { key, value, env_keys }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: CONFIG_EXIT_CODE,
                output: format!("config validation failed: {error}"),
            };
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_token = match &config.backend.api_token {
        Some(token) => redact_token(token.expose_secret()),
        None => "<unset>".to_string(),
    };
    let fields = [
        field(
            "backend.base_url",
            config.backend.base_url.clone(),
            &["HOMEQUOTE_BACKEND_BASE_URL"],
        ),
        field("backend.api_token", api_token, &["HOMEQUOTE_BACKEND_API_TOKEN"]),
        field(
            "backend.timeout_secs",
            config.backend.timeout_secs.to_string(),
            &["HOMEQUOTE_BACKEND_TIMEOUT_SECS"],
        ),
        field(
            "backend.business_id",
            config.backend.business_id.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["HOMEQUOTE_BACKEND_BUSINESS_ID"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["HOMEQUOTE_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["HOMEQUOTE_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["HOMEQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "booking.default_audience",
            format!("{:?}", config.booking.default_audience),
            &["HOMEQUOTE_BOOKING_DEFAULT_AUDIENCE"],
        ),
        field(
            "booking.currency",
            config.booking.currency.clone(),
            &["HOMEQUOTE_BOOKING_CURRENCY"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["HOMEQUOTE_LOGGING_LEVEL", "HOMEQUOTE_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["HOMEQUOTE_LOGGING_FORMAT", "HOMEQUOTE_LOG_FORMAT"],
        ),
    ];

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
