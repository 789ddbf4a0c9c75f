//! config/app_config.rs
//! Configuración global del servicio, leída del entorno (.env vía dotenv).

use serde::Serialize;
use std::time::Duration;

use crate::errors::DispatchError;

/// Marca de valores de ejemplo que nunca deben llegar a un envío real
pub const PLACEHOLDER_MARKER: &str = "YOUR_";

/// Holgura mínima entre el timeout de envío y el barrido de claims colgados
pub const STUCK_MARGIN_SECS: u64 = 60;
/// Tope del timeout de un envío (1 hora)
pub const MAX_SEND_TIMEOUT_SECS: u64 = 60 * 60;
/// Tope del timeout de claims colgados (30 días)
pub const MAX_STUCK_TIMEOUT_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// URL pública del servicio; sin ella no se inyecta el pixel de tracking
    pub app_url: Option<String>,
    pub mail_provider: MailProvider,
    pub smtp: SmtpConfig,
    pub http_mail: HttpMailConfig,
    pub ai: AiConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MailProvider {
    Smtp,
    Http,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub pass: Option<String>,
    pub from_name: String,
}

impl SmtpConfig {
    /// Falla si falta algún dato o quedó un placeholder de ejemplo.
    pub fn validate(&self) -> Result<(), DispatchError> {
        let host_ok = self
            .host
            .as_deref()
            .map(|h| !h.is_empty() && !h.contains(PLACEHOLDER_MARKER))
            .unwrap_or(false);
        let user_ok = self.user.as_deref().map(|u| !u.is_empty()).unwrap_or(false);
        let pass_ok = self.pass.as_deref().map(|p| !p.is_empty()).unwrap_or(false);

        if host_ok && self.port.is_some() && user_ok && pass_ok {
            Ok(())
        } else {
            Err(DispatchError::Configuration(
                "SMTP configuration is incomplete or contains placeholder values. \
                 Please check your .env file and restart the server."
                    .to_string(),
            ))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpMailConfig {
    pub api_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub from: Option<String>,
}

impl HttpMailConfig {
    pub fn validate(&self) -> Result<(), DispatchError> {
        let filled = |v: &Option<String>| {
            v.as_deref()
                .map(|s| !s.is_empty() && !s.contains(PLACEHOLDER_MARKER))
                .unwrap_or(false)
        };
        if filled(&self.api_url) && filled(&self.api_key) && filled(&self.from) {
            Ok(())
        } else {
            Err(DispatchError::Configuration(
                "Mail API configuration is incomplete (MAIL_API_URL, MAIL_API_KEY, MAIL_FROM)."
                    .to_string(),
            ))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AiConfig {
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchConfig {
    /// 0 deshabilita el loop del servidor (solo polling desde clientes)
    pub interval_secs: u64,
    pub max_concurrent_sends: usize,
    pub send_timeout_secs: u64,
    pub stuck_sending_timeout_secs: u64,
}

impl DispatchConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Nunca menor que el timeout de envío más la holgura: un claim vivo no
    /// se puede devolver a `Scheduled` mientras su envío sigue en curso.
    pub fn stuck_timeout(&self) -> chrono::Duration {
        let secs = self
            .stuck_sending_timeout_secs
            .max(self.send_timeout_secs.saturating_add(STUCK_MARGIN_SECS));
        i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Acota los timeouts a rangos representables y coherentes entre sí.
    pub fn normalized(mut self) -> Self {
        if self.send_timeout_secs > MAX_SEND_TIMEOUT_SECS {
            log::warn!(
                "SEND_TIMEOUT_SECS={} fuera de rango, usando {}",
                self.send_timeout_secs,
                MAX_SEND_TIMEOUT_SECS
            );
            self.send_timeout_secs = MAX_SEND_TIMEOUT_SECS;
        }
        let min_stuck = self.send_timeout_secs + STUCK_MARGIN_SECS;
        let stuck = self
            .stuck_sending_timeout_secs
            .clamp(min_stuck, MAX_STUCK_TIMEOUT_SECS);
        if stuck != self.stuck_sending_timeout_secs {
            log::warn!(
                "STUCK_SENDING_TIMEOUT_SECS={} fuera de rango, usando {}",
                self.stuck_sending_timeout_secs,
                stuck
            );
            self.stuck_sending_timeout_secs = stuck;
        }
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            interval_secs: 60,
            max_concurrent_sends: 20,
            send_timeout_secs: 30,
            stuck_sending_timeout_secs: 300,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la config a partir de cualquier fuente clave->valor.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = DispatchConfig::default();

        let mail_provider = match get("MAIL_PROVIDER").as_deref() {
            Some("http") | Some("HTTP") => MailProvider::Http,
            Some("smtp") | Some("SMTP") | None => MailProvider::Smtp,
            Some(other) => {
                log::warn!("MAIL_PROVIDER='{}' desconocido, usando smtp", other);
                MailProvider::Smtp
            }
        };

        AppConfig {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", get("PORT"), 5022),
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:data/campaigns.db".to_string()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 5),
            app_url: get("APP_URL").map(|u| u.trim_end_matches('/').to_string()),
            mail_provider,
            smtp: SmtpConfig {
                host: get("SMTP_HOST"),
                port: get("SMTP_PORT").and_then(|p| p.parse().ok()),
                user: get("SMTP_USER"),
                pass: get("SMTP_PASS"),
                from_name: get("SMTP_FROM_NAME").unwrap_or_else(|| "MailGenius".to_string()),
            },
            http_mail: HttpMailConfig {
                api_url: get("MAIL_API_URL"),
                api_key: get("MAIL_API_KEY"),
                from: get("MAIL_FROM"),
            },
            ai: AiConfig {
                base_url: get("AI_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
                api_key: get("AI_API_KEY"),
                model: get("AI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            },
            dispatch: DispatchConfig {
                interval_secs: parse_or(
                    "DISPATCH_INTERVAL_SECS",
                    get("DISPATCH_INTERVAL_SECS"),
                    defaults.interval_secs,
                ),
                max_concurrent_sends: parse_or(
                    "MAX_CONCURRENT_SENDS",
                    get("MAX_CONCURRENT_SENDS"),
                    defaults.max_concurrent_sends,
                )
                .max(1),
                send_timeout_secs: parse_or(
                    "SEND_TIMEOUT_SECS",
                    get("SEND_TIMEOUT_SECS"),
                    defaults.send_timeout_secs,
                ),
                stuck_sending_timeout_secs: parse_or(
                    "STUCK_SENDING_TIMEOUT_SECS",
                    get("STUCK_SENDING_TIMEOUT_SECS"),
                    defaults.stuck_sending_timeout_secs,
                ),
            }
            .normalized(),
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match raw {
        Some(value) => value.parse().unwrap_or_else(|_| {
            log::warn!("{}='{}' no es válido, usando {}", key, value, default);
            default
        }),
        None => default,
    }
}
