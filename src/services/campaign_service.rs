//! services/campaign_service.rs
//! Flujos de campaign: generar, enviar ya, programar, borradores y clientes.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use serde_json::{Map, Value};

use crate::{
    config::app_config::DispatchConfig,
    errors::DispatchError,
    models::{
        campaign_model::{
            Campaign, CampaignStatus, NewCampaign, SaveDraftRequest, ScheduleCampaignResponse,
            SendCampaignResponse,
        },
        content_model::{CustomerSummary, GenerateCampaignRequest, GeneratedEmail},
        customer_model::Customer,
        dispatch_model::{DispatchFailure, DispatchOutcome, DispatchSummary},
        email_log_model::{EmailLog, EmailLogStatus, NewEmailLog},
        scheduled_email_model::{NewScheduledEmail, ScheduledEmail},
    },
    services::{
        aggregate_service::CampaignAggregates,
        content_service::ContentGenerator,
        dispatch_service::send_with_timeout,
        mail_transport::{parse_recipient, MailTransport},
        store_service::{CampaignStore, DraftFields, NewCustomer},
        tracking_service::pixel_tag,
    },
};

const UNTITLED_DRAFT: &str = "Untitled Draft";

#[derive(Clone)]
pub struct CampaignService {
    store: Arc<dyn CampaignStore>,
    transport: Arc<dyn MailTransport>,
    generator: Arc<dyn ContentGenerator>,
    aggregates: CampaignAggregates,
    app_url: Option<String>,
    dispatch: DispatchConfig,
}

impl CampaignService {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        transport: Arc<dyn MailTransport>,
        generator: Arc<dyn ContentGenerator>,
        app_url: Option<String>,
        dispatch: DispatchConfig,
    ) -> Self {
        let aggregates = CampaignAggregates::new(store.clone());
        Self {
            store,
            transport,
            generator,
            aggregates,
            app_url,
            dispatch,
        }
    }

    // ========================================================================
    // Generación
    // ========================================================================

    /// Un email personalizado por cliente. Si falla uno, falla toda la generación.
    pub async fn generate_campaign(
        &self,
        request: &GenerateCampaignRequest,
    ) -> Result<Vec<GeneratedEmail>> {
        if request.customers.is_empty() {
            return Err(DispatchError::Validation(
                "Please upload or enter valid customer data first.".into(),
            )
            .into());
        }

        let prompt = build_prompt(
            &request.template,
            &request.product_name,
            request.custom_prompt.as_deref(),
        );
        log::info!(
            "(generate_campaign) Generating {} emails for product '{}'",
            request.customers.len(),
            request.product_name
        );

        let results: Vec<Result<GeneratedEmail>> = stream::iter(request.customers.clone())
            .map(|customer| {
                let generator = self.generator.clone();
                let prompt = prompt.clone();
                async move {
                    let context = format!(
                        "Customer Details: {}",
                        serde_json::to_string_pretty(&customer)?
                    );
                    let content = generator.generate(&prompt, &context).await?;
                    Ok::<_, anyhow::Error>(GeneratedEmail {
                        recipient_email: customer_field(&customer, "email").unwrap_or_default(),
                        subject: content.subject,
                        content: content.body,
                    })
                }
            })
            .buffered(self.dispatch.max_concurrent_sends.max(1))
            .collect()
            .await;

        results.into_iter().collect()
    }

    pub async fn summarize(&self, customer_data: &str) -> Result<CustomerSummary> {
        if customer_data.trim().is_empty() {
            return Err(DispatchError::Validation("customer_data is empty".into()).into());
        }
        Ok(self.generator.summarize(customer_data).await?)
    }

    // ========================================================================
    // Envío inmediato
    // ========================================================================

    pub async fn send_campaign(
        &self,
        user_id: &str,
        emails: Vec<GeneratedEmail>,
        now: DateTime<Utc>,
    ) -> Result<SendCampaignResponse> {
        let name = campaign_name(&emails)?;
        self.warn_if_untracked();

        let campaign = self
            .aggregates
            .init_campaign(
                &name,
                emails.len() as i64,
                user_id,
                now,
                CampaignStatus::Sending,
            )
            .await?;

        let mut summary = DispatchSummary {
            due: emails.len(),
            ..Default::default()
        };

        let service = self.clone();
        let campaign_id = campaign.id.clone();
        let user_id_owned = user_id.to_string();
        let outcomes: Vec<DispatchOutcome> = stream::iter(emails)
            .map(move |email| {
                let service = service.clone();
                let campaign_id = campaign_id.clone();
                let user_id = user_id_owned.clone();
                async move { service.send_one(&user_id, &campaign_id, email, now).await }
            })
            .buffer_unordered(self.dispatch.max_concurrent_sends.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            summary.record(outcome);
        }

        self.aggregates
            .finalize_campaign(&campaign.id, CampaignStatus::Sent)
            .await?;

        log::info!(
            "(send_campaign) campaign={} sent={} failed={}",
            campaign.id,
            summary.sent,
            summary.failed
        );
        Ok(SendCampaignResponse {
            campaign_id: campaign.id,
            summary,
        })
    }

    async fn send_one(
        &self,
        user_id: &str,
        campaign_id: &str,
        email: GeneratedEmail,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let log = match self
            .store
            .create_log(&NewEmailLog {
                campaign_id: Some(campaign_id.to_string()),
                recipient_email: email.recipient_email.clone(),
                subject: email.subject.clone(),
                content: to_html(&email.content),
                sent_at: now,
                status: EmailLogStatus::Sent,
                user_id: user_id.to_string(),
            })
            .await
        {
            Ok(log) => log,
            Err(e) => {
                log::error!("(send_one) log for {} not created: {}", email.recipient_email, e);
                return DispatchOutcome::Failed(DispatchFailure {
                    scheduled_id: None,
                    log_id: None,
                    recipient: email.recipient_email,
                    reason: format!("Dispatch error: {e}"),
                });
            }
        };

        let result = match parse_recipient(&email.recipient_email) {
            Err(e) => Err(e.to_string()),
            Ok(_) => {
                let html = self.render_html(&email.content, &log.id);
                send_with_timeout(
                    self.transport.as_ref(),
                    &email.recipient_email,
                    &email.subject,
                    &html,
                    self.dispatch.send_timeout(),
                )
                .await
                .and_then(|outcome| {
                    if outcome.success {
                        Ok(())
                    } else {
                        Err(outcome.message)
                    }
                })
            }
        };

        match result {
            Ok(()) => DispatchOutcome::Sent,
            Err(reason) => {
                log::error!("(send_one) {} failed: {}", email.recipient_email, reason);
                if let Err(e) = self
                    .store
                    .set_log_status(&log.id, EmailLogStatus::Failed, None)
                    .await
                {
                    log::error!("(send_one) log={} not updated: {}", log.id, e);
                }
                DispatchOutcome::Failed(DispatchFailure {
                    scheduled_id: None,
                    log_id: Some(log.id),
                    recipient: email.recipient_email,
                    reason,
                })
            }
        }
    }

    // ========================================================================
    // Programación
    // ========================================================================

    /// Crea el campaign, un log `Scheduled` y un `ScheduledEmail` por email.
    /// No es atómico: si falla a mitad quedan creados los anteriores.
    pub async fn schedule_campaign(
        &self,
        user_id: &str,
        emails: Vec<GeneratedEmail>,
        send_at: DateTime<Utc>,
    ) -> Result<ScheduleCampaignResponse> {
        let name = campaign_name(&emails)?;
        self.warn_if_untracked();

        let campaign = self
            .aggregates
            .init_campaign(
                &name,
                emails.len() as i64,
                user_id,
                send_at,
                CampaignStatus::Scheduled,
            )
            .await?;

        for email in &emails {
            let log = self
                .store
                .create_log(&NewEmailLog {
                    campaign_id: Some(campaign.id.clone()),
                    recipient_email: email.recipient_email.clone(),
                    subject: email.subject.clone(),
                    content: to_html(&email.content),
                    sent_at: send_at,
                    status: EmailLogStatus::Scheduled,
                    user_id: user_id.to_string(),
                })
                .await
                .with_context(|| format!("Failed to create log for {}", email.recipient_email))?;

            self.store
                .create_scheduled(&NewScheduledEmail {
                    recipient_email: email.recipient_email.clone(),
                    subject: email.subject.clone(),
                    content: self.render_html(&email.content, &log.id),
                    send_at,
                    user_id: user_id.to_string(),
                    campaign_id: Some(campaign.id.clone()),
                    log_id: Some(log.id.clone()),
                })
                .await
                .with_context(|| {
                    format!("Failed to schedule email for {}", email.recipient_email)
                })?;
        }

        log::info!(
            "(schedule_campaign) campaign={} emails={} send_at={}",
            campaign.id,
            emails.len(),
            send_at
        );
        Ok(ScheduleCampaignResponse {
            campaign_id: campaign.id,
            scheduled: emails.len(),
            send_at,
        })
    }

    // ========================================================================
    // Borradores
    // ========================================================================

    pub async fn save_draft(&self, request: &SaveDraftRequest, now: DateTime<Utc>) -> Result<Campaign> {
        let product_name = non_empty(request.product_name.as_deref());
        let customer_data = non_empty(request.customer_data.as_deref());
        if product_name.is_none() && customer_data.is_none() {
            return Err(DispatchError::Validation(
                "Please provide a product name or some customer data.".into(),
            )
            .into());
        }

        let fields = DraftFields {
            name: product_name.clone().unwrap_or_else(|| UNTITLED_DRAFT.to_string()),
            template: request.template.clone(),
            product_name,
            custom_prompt: request.custom_prompt.clone(),
            customer_data,
            recipient_count: request.recipient_count,
        };

        match &request.campaign_id {
            Some(id) => {
                let updated = self
                    .store
                    .update_draft(&request.user_id, id, &fields)
                    .await
                    .with_context(|| format!("Failed to update draft {}", id))?;
                if !updated {
                    return Err(DispatchError::Validation(format!(
                        "campaign {} not found or no longer a draft",
                        id
                    ))
                    .into());
                }
                log::info!("(save_draft) draft={} updated", id);
                self.store
                    .get_campaign(&request.user_id, id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("draft {} disappeared after update", id))
            }
            None => {
                let mut draft = NewCampaign::new(
                    fields.name,
                    fields.recipient_count,
                    &request.user_id,
                    now,
                    CampaignStatus::Draft,
                );
                draft.template = fields.template;
                draft.product_name = fields.product_name;
                draft.custom_prompt = fields.custom_prompt;
                draft.customer_data = fields.customer_data;
                self.aggregates.init_with(draft).await
            }
        }
    }

    // ========================================================================
    // Listados
    // ========================================================================

    pub async fn list_campaigns(&self, user_id: &str) -> Result<Vec<Campaign>> {
        Ok(self.store.list_campaigns(user_id).await?)
    }

    pub async fn list_logs(&self, user_id: &str) -> Result<Vec<EmailLog>> {
        Ok(self.store.list_logs(user_id).await?)
    }

    pub async fn list_scheduled(&self, user_id: &str) -> Result<Vec<ScheduledEmail>> {
        Ok(self.store.list_scheduled(user_id).await?)
    }

    // ========================================================================
    // Clientes
    // ========================================================================

    /// Cada cliente necesita `email`; el resto de columnas se guarda tal cual en `data`.
    pub async fn add_customers(
        &self,
        user_id: &str,
        customers: Vec<Map<String, Value>>,
    ) -> Result<Vec<Customer>> {
        let mut rows = Vec::with_capacity(customers.len());
        for (index, customer) in customers.into_iter().enumerate() {
            let email = customer_field(&customer, "email").ok_or_else(|| {
                DispatchError::Validation(format!("customer #{} has no email", index + 1))
            })?;
            rows.push(NewCustomer {
                name: customer_field(&customer, "name").unwrap_or_default(),
                email,
                data: Value::Object(customer),
            });
        }

        let inserted = self
            .store
            .insert_customers(user_id, &rows)
            .await
            .context("Failed to store customers")?;
        log::info!("(add_customers) user={} added={}", user_id, inserted.len());
        Ok(inserted)
    }

    pub async fn list_customers(&self, user_id: &str) -> Result<Vec<Customer>> {
        Ok(self.store.list_customers(user_id).await?)
    }

    // ========================================================================
    // HTML
    // ========================================================================

    fn render_html(&self, content: &str, log_id: &str) -> String {
        let html = to_html(content);
        match &self.app_url {
            Some(app_url) => format!("{}{}", html, pixel_tag(app_url, log_id)),
            None => html,
        }
    }

    fn warn_if_untracked(&self) {
        if self.app_url.is_none() {
            log::warn!("APP_URL is not set. Open tracking will be disabled.");
        }
    }
}

pub fn build_prompt(template: &str, product_name: &str, custom_prompt: Option<&str>) -> String {
    let details = custom_prompt
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("None");
    format!(
        "Template: {}. Product: {}. Additional details: {}",
        template, product_name, details
    )
}

fn to_html(content: &str) -> String {
    content.replace('\n', "<br>")
}

fn campaign_name(emails: &[GeneratedEmail]) -> Result<String> {
    emails
        .first()
        .map(|e| e.subject.clone())
        .ok_or_else(|| DispatchError::Validation("Please generate an email first.".into()).into())
}

fn customer_field(customer: &Map<String, Value>, key: &str) -> Option<String> {
    customer
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
