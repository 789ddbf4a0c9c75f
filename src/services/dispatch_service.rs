//! services/dispatch_service.rs
//! Motor de envíos programados.
//!
//! Cada poll lista los `ScheduledEmail` del usuario en estado `Scheduled`,
//! filtra localmente los vencidos y procesa cada uno de forma independiente:
//! claim (compare-and-set Scheduled -> Sending), envío, y registro del
//! resultado. Un fallo en un registro nunca corta el resto del lote.
//!
//! No hay reintentos automáticos: un envío fallido queda en `Failed`. Los
//! registros que quedan colgados en `Sending` (proceso muerto entre el claim y
//! el registro) los devuelve a `Scheduled` el barrido `requeue_stuck`, con lo
//! que un crash justo después de que el proveedor aceptó puede reenviar una vez.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{
    config::app_config::DispatchConfig,
    models::{
        dispatch_model::{DispatchFailure, DispatchOutcome, DispatchSummary},
        email_log_model::{EmailLogStatus, NewEmailLog},
        scheduled_email_model::{ScheduledEmail, ScheduledStatus},
    },
    services::{
        aggregate_service::CampaignAggregates,
        mail_transport::{parse_recipient, MailTransport, SendOutcome},
        store_service::CampaignStore,
    },
};

#[derive(Clone)]
pub struct DispatchEngine {
    store: Arc<dyn CampaignStore>,
    transport: Arc<dyn MailTransport>,
    aggregates: CampaignAggregates,
    config: DispatchConfig,
}

impl DispatchEngine {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        transport: Arc<dyn MailTransport>,
        config: DispatchConfig,
    ) -> Self {
        let aggregates = CampaignAggregates::new(store.clone());
        Self {
            store,
            transport,
            aggregates,
            config,
        }
    }

    /// Un ciclo de polling para un usuario.
    ///
    /// `Err` solo si la consulta inicial falla (no se reclamó nada); cualquier
    /// problema de un registro individual queda en el `DispatchSummary`.
    pub async fn poll_and_dispatch(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DispatchSummary> {
        let pending = self
            .store
            .list_scheduled_by_status(user_id, ScheduledStatus::Scheduled)
            .await
            .with_context(|| format!("Failed to list scheduled emails of user {}", user_id))?;

        let (due, not_due): (Vec<ScheduledEmail>, Vec<ScheduledEmail>) =
            pending.into_iter().partition(|email| email.is_due(now));

        let mut summary = DispatchSummary {
            due: due.len(),
            skipped: not_due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            return Ok(summary);
        }

        log::info!(
            "(poll_and_dispatch) user={} due={} not_due={}",
            user_id,
            summary.due,
            summary.skipped
        );

        let campaign_ids: BTreeSet<String> =
            due.iter().filter_map(|e| e.campaign_id.clone()).collect();

        let engine = self.clone();
        let outcomes: Vec<DispatchOutcome> = stream::iter(due)
            .map(move |email| {
                let engine = engine.clone();
                async move { engine.dispatch_one(email, now).await }
            })
            .buffer_unordered(self.config.max_concurrent_sends.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            summary.record(outcome);
        }

        for campaign_id in &campaign_ids {
            if let Err(e) = self.aggregates.finalize_if_drained(campaign_id).await {
                log::warn!("(poll_and_dispatch) {:#}", e);
            }
        }

        log::info!(
            "(poll_and_dispatch) user={} sent={} failed={} lost_claims={}",
            user_id,
            summary.sent,
            summary.failed,
            summary.lost_claims
        );
        Ok(summary)
    }

    /// Poll de todos los usuarios con envíos pendientes (uso del servidor).
    pub async fn poll_all_users(&self, now: DateTime<Utc>) -> Result<DispatchSummary> {
        let users = self
            .store
            .users_with_scheduled_status(ScheduledStatus::Scheduled)
            .await
            .context("Failed to list users with scheduled emails")?;

        let mut total = DispatchSummary::default();
        for user_id in users {
            match self.poll_and_dispatch(&user_id, now).await {
                Ok(summary) => total.merge(summary),
                Err(e) => log::error!("(poll_all_users) user={}: {:#}", user_id, e),
            }
        }
        Ok(total)
    }

    /// Devuelve a `Scheduled` los claims más viejos que el timeout configurado.
    pub async fn requeue_stuck(&self, now: DateTime<Utc>) -> Result<usize> {
        let sending = self
            .store
            .list_all_scheduled_by_status(ScheduledStatus::Sending)
            .await
            .context("Failed to list in-flight scheduled emails")?;

        let Some(cutoff) = now.checked_sub_signed(self.config.stuck_timeout()) else {
            // Timeout más allá del rango de fechas: ningún claim puede estar vencido
            return Ok(0);
        };
        let mut requeued = 0;

        for email in sending {
            let Some(claimed_at) = email.claimed_at else {
                log::warn!("(requeue_stuck) id={} is Sending without claim time", email.id);
                continue;
            };
            if claimed_at > cutoff {
                continue;
            }
            match self.store.requeue_scheduled(&email.id, claimed_at).await {
                Ok(true) => {
                    log::warn!(
                        "(requeue_stuck) id={} claimed at {} requeued",
                        email.id,
                        claimed_at
                    );
                    requeued += 1;
                }
                Ok(false) => {}
                Err(e) => log::error!("(requeue_stuck) id={}: {}", email.id, e),
            }
        }
        Ok(requeued)
    }

    /// Barrido + poll global: lo que corre cada tick del loop del servidor.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<DispatchSummary> {
        if let Err(e) = self.requeue_stuck(now).await {
            log::error!("(run_cycle) {:#}", e);
        }
        self.poll_all_users(now).await
    }

    // ========================================================================
    // Un registro
    // ========================================================================

    async fn dispatch_one(&self, email: ScheduledEmail, now: DateTime<Utc>) -> DispatchOutcome {
        match self.store.claim_scheduled(&email.id, &email.user_id, now).await {
            Ok(true) => {}
            Ok(false) => {
                log::info!("(dispatch_one) id={} claimed by another dispatcher", email.id);
                return DispatchOutcome::LostClaim;
            }
            Err(e) => {
                // Sin claim el registro sigue en Scheduled; el próximo poll lo reintenta.
                log::error!("(dispatch_one) id={} claim failed: {}", email.id, e);
                return DispatchOutcome::Failed(failure(&email, format!("Dispatch error: {e}")));
            }
        }

        if let Some(campaign_id) = &email.campaign_id {
            if let Err(e) = self.aggregates.begin_sending(campaign_id).await {
                log::warn!("(dispatch_one) {:#}", e);
            }
        }

        if let Err(reason) = validate(&email) {
            log::warn!("(dispatch_one) id={} skipped: {}", email.id, reason);
            return self.record_failure(&email, reason).await;
        }

        match self.send_with_timeout(&email).await {
            Ok(outcome) if outcome.success => self.record_success(&email, now).await,
            Ok(outcome) => self.record_failure(&email, outcome.message).await,
            Err(reason) => self.record_failure(&email, reason).await,
        }
    }

    async fn send_with_timeout(&self, email: &ScheduledEmail) -> Result<SendOutcome, String> {
        send_with_timeout(
            self.transport.as_ref(),
            &email.recipient_email,
            &email.subject,
            &email.content,
            self.config.send_timeout(),
        )
        .await
    }

    async fn record_success(&self, email: &ScheduledEmail, now: DateTime<Utc>) -> DispatchOutcome {
        match self
            .store
            .complete_scheduled(&email.id, ScheduledStatus::Sent, None)
            .await
        {
            Ok(true) => {}
            Ok(false) => log::warn!(
                "(record_success) id={} was no longer Sending when marking Sent",
                email.id
            ),
            Err(e) => log::error!("(record_success) id={} sent but not recorded: {}", email.id, e),
        }

        let log_result = match &email.log_id {
            Some(log_id) => self
                .store
                .set_log_status(log_id, EmailLogStatus::Sent, Some(now))
                .await
                .map(|_| ()),
            None => self
                .store
                .create_log(&NewEmailLog {
                    campaign_id: email.campaign_id.clone(),
                    recipient_email: email.recipient_email.clone(),
                    subject: email.subject.clone(),
                    content: email.content.clone(),
                    sent_at: now,
                    status: EmailLogStatus::Sent,
                    user_id: email.user_id.clone(),
                })
                .await
                .map(|_| ()),
        };
        if let Err(e) = log_result {
            log::error!("(record_success) id={} log not updated: {}", email.id, e);
        }

        log::info!("(dispatch_one) id={} sent to {}", email.id, email.recipient_email);
        DispatchOutcome::Sent
    }

    async fn record_failure(&self, email: &ScheduledEmail, reason: String) -> DispatchOutcome {
        log::error!(
            "(dispatch_one) id={} to {} failed: {}",
            email.id,
            email.recipient_email,
            reason
        );

        match self
            .store
            .complete_scheduled(&email.id, ScheduledStatus::Failed, Some(&reason))
            .await
        {
            Ok(true) => {}
            Ok(false) => log::warn!(
                "(record_failure) id={} was no longer Sending when marking Failed",
                email.id
            ),
            Err(e) => log::error!("(record_failure) id={} failure not recorded: {}", email.id, e),
        }

        if let Some(log_id) = &email.log_id {
            if let Err(e) = self
                .store
                .set_log_status(log_id, EmailLogStatus::Failed, None)
                .await
            {
                log::error!("(record_failure) log={} not updated: {}", log_id, e);
            }
        }

        DispatchOutcome::Failed(failure(email, reason))
    }
}

/// Envío con tope de tiempo. `Err` = el transporte falló de forma inesperada.
pub async fn send_with_timeout(
    transport: &dyn MailTransport,
    to: &str,
    subject: &str,
    html: &str,
    limit: Duration,
) -> Result<SendOutcome, String> {
    match tokio::time::timeout(limit, transport.send(to, subject, html)).await {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => Err(format!("Dispatch error: {e}")),
        Err(_) => Err(format!(
            "Dispatch error: send timed out after {}s",
            limit.as_secs()
        )),
    }
}

fn validate(email: &ScheduledEmail) -> Result<(), String> {
    parse_recipient(&email.recipient_email).map_err(|e| e.to_string())?;
    if email.subject.trim().is_empty() {
        return Err("validation error: empty subject".to_string());
    }
    Ok(())
}

fn failure(email: &ScheduledEmail, reason: String) -> DispatchFailure {
    DispatchFailure {
        scheduled_id: Some(email.id.clone()),
        log_id: email.log_id.clone(),
        recipient: email.recipient_email.clone(),
        reason,
    }
}

/// Loop del servidor: primer ciclo inmediato y luego cada `interval_secs`.
/// Devuelve `None` si el intervalo es 0 (solo polling desde clientes).
pub fn spawn_dispatch_loop(engine: DispatchEngine, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        log::info!("(dispatch_loop) Disabled; relying on client polls");
        return None;
    }

    log::info!("(dispatch_loop) Started (every {}s)", interval_secs);
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match engine.run_cycle(Utc::now()).await {
                Ok(summary) if summary.due > 0 => log::info!(
                    "(dispatch_loop) due={} sent={} failed={} lost_claims={}",
                    summary.due,
                    summary.sent,
                    summary.failed,
                    summary.lost_claims
                ),
                Ok(_) => {}
                Err(e) => log::error!("(dispatch_loop) {:#}", e),
            }
        }
    }))
}
