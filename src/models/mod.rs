//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod campaign_model;
pub mod content_model;
pub mod customer_model;
pub mod dispatch_model;
pub mod email_log_model;
pub mod scheduled_email_model;

/// Formato único de timestamps en base de datos: RFC 3339, milisegundos, sufijo `Z`.
pub fn format_ts(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parsea un timestamp RFC 3339 guardado por `format_ts`.
pub fn parse_ts(raw: &str) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    let parsed = chrono::DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("Invalid timestamp '{}': {}", raw, e))?;
    Ok(parsed.with_timezone(&chrono::Utc))
}
