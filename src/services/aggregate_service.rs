//! services/aggregate_service.rs
//! Contadores y estado agregado de los campaigns.
//!
//! `Sent` en un campaign significa "envío intentado para todos", no "todos
//! entregados": un lote con fallos individuales también termina en `Sent`.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::{
    models::campaign_model::{Campaign, CampaignStatus, NewCampaign},
    services::store_service::CampaignStore,
};

#[derive(Clone)]
pub struct CampaignAggregates {
    store: Arc<dyn CampaignStore>,
}

impl CampaignAggregates {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self { store }
    }

    /// Crea el campaign con `opened_count = 0`.
    pub async fn init_campaign(
        &self,
        name: &str,
        recipient_count: i64,
        user_id: &str,
        timestamp: DateTime<Utc>,
        status: CampaignStatus,
    ) -> Result<Campaign> {
        self.init_with(NewCampaign::new(
            name,
            recipient_count,
            user_id,
            timestamp,
            status,
        ))
        .await
    }

    pub async fn init_with(&self, campaign: NewCampaign) -> Result<Campaign> {
        let created = self
            .store
            .create_campaign(&campaign)
            .await
            .context("Failed to create campaign")?;
        log::info!(
            "(init_campaign) campaign={} status={} recipients={}",
            created.id,
            created.status,
            created.recipient_count
        );
        Ok(created)
    }

    pub async fn finalize_campaign(&self, campaign_id: &str, status: CampaignStatus) -> Result<()> {
        self.store
            .set_campaign_status(campaign_id, status)
            .await
            .with_context(|| format!("Failed to finalize campaign {}", campaign_id))?;
        log::info!("(finalize_campaign) campaign={} -> {}", campaign_id, status);
        Ok(())
    }

    /// Suma atómica en el store, nunca leer-modificar-escribir.
    pub async fn increment_open_count(&self, campaign_id: &str) -> Result<()> {
        self.store
            .increment_opened_count(campaign_id)
            .await
            .with_context(|| format!("Failed to increment opens of campaign {}", campaign_id))
    }

    /// Scheduled -> Sending al reclamar el primer envío de un campaign programado.
    pub async fn begin_sending(&self, campaign_id: &str) -> Result<bool> {
        self.store
            .transition_campaign_status(
                campaign_id,
                CampaignStatus::Scheduled,
                CampaignStatus::Sending,
            )
            .await
            .with_context(|| format!("Failed to mark campaign {} as sending", campaign_id))
    }

    /// Pasa a `Sent` cuando ya no quedan envíos programados ni en curso.
    pub async fn finalize_if_drained(&self, campaign_id: &str) -> Result<bool> {
        let pending = self
            .store
            .count_pending_for_campaign(campaign_id)
            .await
            .with_context(|| format!("Failed to count pending sends of {}", campaign_id))?;

        if pending > 0 {
            return Ok(false);
        }
        self.finalize_campaign(campaign_id, CampaignStatus::Sent)
            .await?;
        Ok(true)
    }
}
