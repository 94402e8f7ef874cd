use serde::Deserialize;

use crate::types::ActionUrls;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// TCP port the HTTP server binds to (default: 8000)
    pub http_port: u16,

    /// Path of the JSON snapshot holding all subscribers
    pub subscribers_file: String,

    /// Path of the PEM-encoded P-256 VAPID private key
    pub vapid_private_key_path: String,

    /// VAPID public key handed to browsers when they subscribe
    pub vapid_public_key: Option<String>,

    /// VAPID `sub` claim (a `mailto:` or `https:` contact)
    pub vapid_subject: String,

    /// Time-to-live in seconds the push service keeps an undelivered message
    pub push_ttl_seconds: u32,

    /// URL opened by the primary notification action
    pub primary_action_url: String,

    /// URL opened by the secondary notification action
    pub secondary_action_url: String,

    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            http_port: std::env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_PORT must be a valid u16"))?,
            subscribers_file: std::env::var("SUBSCRIBERS_FILE")
                .unwrap_or_else(|_| "browsers-by-id.json".to_string()),
            vapid_private_key_path: std::env::var("VAPID_PRIVATE_KEY_PATH").map_err(|_| {
                anyhow::anyhow!("VAPID_PRIVATE_KEY_PATH environment variable is required")
            })?,
            vapid_public_key: std::env::var("VAPID_PUBLIC_KEY").ok(),
            vapid_subject: std::env::var("VAPID_SUBJECT")
                .unwrap_or_else(|_| "mailto:contato@lojaintegrada.com.br".to_string()),
            push_ttl_seconds: std::env::var("PUSH_TTL_SECONDS")
                .unwrap_or_else(|_| "2419200".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PUSH_TTL_SECONDS must be a valid u32"))?,
            primary_action_url: std::env::var("PRIMARY_ACTION_URL")
                .unwrap_or_else(|_| ActionUrls::DEFAULT_PRIMARY.to_string()),
            secondary_action_url: std::env::var("SECONDARY_ACTION_URL")
                .unwrap_or_else(|_| ActionUrls::DEFAULT_SECONDARY.to_string()),
            log_json: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    /// Action URLs embedded in every notification payload.
    pub fn action_urls(&self) -> ActionUrls {
        ActionUrls {
            primary: self.primary_action_url.clone(),
            secondary: self.secondary_action_url.clone(),
        }
    }
}
