use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::models::{content_model::GeneratedEmail, dispatch_model::DispatchSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "Draft",
            CampaignStatus::Scheduled => "Scheduled",
            CampaignStatus::Sending => "Sending",
            CampaignStatus::Sent => "Sent",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(CampaignStatus::Draft),
            "Scheduled" => Ok(CampaignStatus::Scheduled),
            "Sending" => Ok(CampaignStatus::Sending),
            "Sent" => Ok(CampaignStatus::Sent),
            other => Err(anyhow::anyhow!("Unknown campaign status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub recipient_count: i64,
    /// Solo crece: lo incrementa el registro de aperturas.
    pub opened_count: i64,
    pub user_id: String,
    pub template: Option<String>,
    pub product_name: Option<String>,
    pub custom_prompt: Option<String>,
    pub customer_data: Option<String>,
}

/// Datos para crear un campaign nuevo (contador de aperturas siempre en 0)
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub name: String,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub recipient_count: i64,
    pub user_id: String,
    pub template: Option<String>,
    pub product_name: Option<String>,
    pub custom_prompt: Option<String>,
    pub customer_data: Option<String>,
}

impl NewCampaign {
    pub fn new(
        name: impl Into<String>,
        recipient_count: i64,
        user_id: impl Into<String>,
        created_at: DateTime<Utc>,
        status: CampaignStatus,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            created_at,
            recipient_count,
            user_id: user_id.into(),
            template: None,
            product_name: None,
            custom_prompt: None,
            customer_data: None,
        }
    }
}

/// POST /api/campaigns/send
#[derive(Debug, Clone, Deserialize)]
pub struct SendCampaignRequest {
    pub user_id: String,
    pub emails: Vec<GeneratedEmail>,
}

/// POST /api/campaigns/schedule
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleCampaignRequest {
    pub user_id: String,
    pub emails: Vec<GeneratedEmail>,
    pub send_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleCampaignResponse {
    pub campaign_id: String,
    pub scheduled: usize,
    pub send_at: DateTime<Utc>,
}

/// POST /api/campaigns/draft
#[derive(Debug, Clone, Deserialize)]
pub struct SaveDraftRequest {
    pub user_id: String,
    /// Si viene, se actualiza ese borrador en lugar de crear uno nuevo
    pub campaign_id: Option<String>,
    pub template: Option<String>,
    pub product_name: Option<String>,
    pub custom_prompt: Option<String>,
    pub customer_data: Option<String>,
    #[serde(default)]
    pub recipient_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendCampaignResponse {
    pub campaign_id: String,
    pub summary: DispatchSummary,
}
