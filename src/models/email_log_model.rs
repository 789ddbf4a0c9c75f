use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailLogStatus {
    Sent,
    Scheduled,
    Opened,
    Failed,
}

impl EmailLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailLogStatus::Sent => "Sent",
            EmailLogStatus::Scheduled => "Scheduled",
            EmailLogStatus::Opened => "Opened",
            EmailLogStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for EmailLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailLogStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sent" => Ok(EmailLogStatus::Sent),
            "Scheduled" => Ok(EmailLogStatus::Scheduled),
            "Opened" => Ok(EmailLogStatus::Opened),
            "Failed" => Ok(EmailLogStatus::Failed),
            other => Err(anyhow::anyhow!("Unknown email log status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailLog {
    pub id: String,
    pub campaign_id: Option<String>,
    pub recipient_email: String,
    pub subject: String,
    pub content: String, // HTML
    pub sent_at: DateTime<Utc>,
    pub status: EmailLogStatus,
    pub user_id: String,
    pub opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub campaign_id: Option<String>,
    pub recipient_email: String,
    pub subject: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub status: EmailLogStatus,
    pub user_id: String,
}
