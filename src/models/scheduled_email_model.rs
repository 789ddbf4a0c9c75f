use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Scheduled -> Sending -> (Sent | Failed). `Sending` es el "claim" transitorio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledStatus {
    Scheduled,
    Sending,
    Sent,
    Failed,
}

impl ScheduledStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledStatus::Scheduled => "Scheduled",
            ScheduledStatus::Sending => "Sending",
            ScheduledStatus::Sent => "Sent",
            ScheduledStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduledStatus::Sent | ScheduledStatus::Failed)
    }
}

impl fmt::Display for ScheduledStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduledStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scheduled" => Ok(ScheduledStatus::Scheduled),
            "Sending" => Ok(ScheduledStatus::Sending),
            "Sent" => Ok(ScheduledStatus::Sent),
            "Failed" => Ok(ScheduledStatus::Failed),
            other => Err(anyhow::anyhow!("Unknown scheduled email status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEmail {
    pub id: String,
    pub recipient_email: String,
    pub subject: String,
    pub content: String,
    pub send_at: DateTime<Utc>,
    pub status: ScheduledStatus,
    pub user_id: String,
    pub campaign_id: Option<String>,
    /// Log creado al programar; se actualiza en vez de crear uno nuevo
    pub log_id: Option<String>,
    pub error_message: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl ScheduledEmail {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.send_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct NewScheduledEmail {
    pub recipient_email: String,
    pub subject: String,
    pub content: String,
    pub send_at: DateTime<Utc>,
    pub user_id: String,
    pub campaign_id: Option<String>,
    pub log_id: Option<String>,
}
