use serde::{Deserialize, Serialize};

/// Resultado del generador de contenido
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub summary: String,
}

/// Un email ya personalizado para un destinatario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedEmail {
    pub recipient_email: String,
    pub subject: String,
    pub content: String,
}

/// POST /api/campaigns/generate
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateCampaignRequest {
    pub template: String,
    pub product_name: String,
    pub custom_prompt: Option<String>,
    pub customers: Vec<serde_json::Map<String, serde_json::Value>>,
}
