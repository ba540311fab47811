use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::auth::JwtConfig;
use crate::carrier::CarrierConfig;
use crate::gateway::http_gateway::GatewayConfig;
use crate::rate_limit::RateLimitPolicy;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | /var/lib/store | Working directory (ledger database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | REQUEST_TIMEOUT_MS | 10000 | Outbound request timeout (gateway, carriers) |
/// | GATEWAY_URL | http://localhost:9100 | Payment gateway base URL |
/// | GATEWAY_API_KEY | (empty) | Payment gateway API key |
/// | GATEWAY_WEBHOOK_SECRET | (empty) | Shared secret for callback signatures |
/// | CARRIER_CODES | (empty) | Comma-separated carrier codes, e.g. `acme,slowpost` |
/// | CARRIER_<CODE>_URL | - | Base URL per carrier |
/// | CARRIER_<CODE>_API_KEY | (empty) | API key per carrier |
/// | CARRIER_<CODE>_SECRET | (empty) | Webhook secret per carrier |
/// | CARRIER_<CODE>_PUSH | true | Whether the carrier pushes webhooks |
/// | RATE_LIMIT_STRICT_MAX | 10 | Strict tier requests per window |
/// | RATE_LIMIT_STRICT_WINDOW_SECS | 60 | Strict tier window length |
/// | RATE_LIMIT_STANDARD_MAX | 120 | Standard tier requests per window |
/// | RATE_LIMIT_STANDARD_WINDOW_SECS | 60 | Standard tier window length |
/// | TRACKING_REFRESH_SECS | 900 | Pull-carrier poll interval |
/// | JWT_SECRET | (generated in dev) | Admin token signing secret, >= 32 chars |
/// | JWT_EXPIRATION_MINUTES | 1440 | Admin token lifetime |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/store HTTP_PORT=8080 CARRIER_CODES=acme cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the ledger database and logs
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Payment gateway connection
    pub gateway: GatewayConfig,
    /// Configured carriers
    pub carriers: Vec<CarrierConfig>,
    /// Rate limit tiers
    pub rate_limit: RateLimitSettings,
    /// Pull-carrier poll interval in seconds
    pub tracking_refresh_secs: u64,
    /// Admin JWT configuration
    pub jwt: JwtConfig,
}

/// Tier policies for the public surface
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub strict: RateLimitPolicy,
    pub standard: RateLimitPolicy,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to defaults. A missing `JWT_SECRET` gets
    /// an ephemeral secret with a warning; tokens then stop working across
    /// restarts.
    pub fn from_env() -> Self {
        let request_timeout_ms = env_or("REQUEST_TIMEOUT_MS", 10_000u64);

        let jwt = JwtConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "JWT misconfigured; generating ephemeral admin secret");
            let secret: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(48)
                .map(char::from)
                .collect();
            JwtConfig {
                secret,
                expiration_minutes: 1440,
                issuer: "store-server".to_string(),
                audience: "store-admin".to_string(),
            }
        });

        Self {
            work_dir: env_string("WORK_DIR", "/var/lib/store"),
            http_port: env_or("HTTP_PORT", 3000u16),
            environment: env_string("ENVIRONMENT", "development"),
            gateway: GatewayConfig {
                base_url: env_string("GATEWAY_URL", "http://localhost:9100"),
                api_key: env_string("GATEWAY_API_KEY", ""),
                webhook_secret: env_string("GATEWAY_WEBHOOK_SECRET", ""),
                request_timeout_ms,
            },
            carriers: Self::carriers_from_env(request_timeout_ms),
            rate_limit: RateLimitSettings {
                strict: RateLimitPolicy::strict(
                    env_or("RATE_LIMIT_STRICT_MAX", 10),
                    env_or("RATE_LIMIT_STRICT_WINDOW_SECS", 60),
                ),
                standard: RateLimitPolicy::standard(
                    env_or("RATE_LIMIT_STANDARD_MAX", 120),
                    env_or("RATE_LIMIT_STANDARD_WINDOW_SECS", 60),
                ),
            },
            tracking_refresh_secs: env_or("TRACKING_REFRESH_SECS", 900),
            jwt,
        }
    }

    /// One CarrierConfig per code in `CARRIER_CODES`
    ///
    /// Codes without a `CARRIER_<CODE>_URL` are skipped with a warning
    /// rather than failing startup.
    fn carriers_from_env(request_timeout_ms: u64) -> Vec<CarrierConfig> {
        let codes = env_string("CARRIER_CODES", "");
        codes
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .filter_map(|code| {
                let prefix = format!("CARRIER_{}", code.to_ascii_uppercase());
                let Ok(base_url) = std::env::var(format!("{}_URL", prefix)) else {
                    tracing::warn!(carrier = code, "Carrier listed but {}_URL unset; skipping", prefix);
                    return None;
                };
                Some(CarrierConfig {
                    code: code.to_ascii_lowercase(),
                    base_url,
                    api_key: env_string(&format!("{}_API_KEY", prefix), ""),
                    webhook_secret: env_string(&format!("{}_SECRET", prefix), ""),
                    push_webhooks: env_or(&format!("{}_PUSH", prefix), true),
                    request_timeout_ms,
                })
            })
            .collect()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Path of the ledger database file
    pub fn ledger_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("ledger.redb")
    }
}
