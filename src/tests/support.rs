//! tests/support.rs
//! Piezas compartidas: SQLite temporal con migraciones y dobles de prueba.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::{
    config::app_config::DispatchConfig,
    errors::{DispatchError, GenerationError},
    models::{
        campaign_model::{Campaign, CampaignStatus, NewCampaign},
        content_model::{CustomerSummary, GeneratedContent, GeneratedEmail},
        customer_model::Customer,
        email_log_model::{EmailLog, EmailLogStatus, NewEmailLog},
        parse_ts,
        scheduled_email_model::{NewScheduledEmail, ScheduledEmail, ScheduledStatus},
    },
    services::{
        content_service::ContentGenerator,
        mail_transport::{MailTransport, SendOutcome},
        store_service::{
            CampaignStore, DraftFields, NewCustomer, OpenRecord, SqliteStore, StoreResult,
        },
    },
};

pub fn ts(raw: &str) -> DateTime<Utc> {
    parse_ts(raw).expect("valid test timestamp")
}

pub struct TestDb {
    pub sqlite: SqliteStore,
    pub store: Arc<dyn CampaignStore>,
    _dir: TempDir,
}

/// Base nueva por test, en su propio directorio temporal.
pub async fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}", dir.path().join("test.db").display());
    let sqlite = SqliteStore::connect(&url, 5).await.expect("connect sqlite");
    sqlite.run_migrations().await.expect("migrations");

    TestDb {
        store: Arc::new(sqlite.clone()),
        sqlite,
        _dir: dir,
    }
}

pub fn fast_config() -> DispatchConfig {
    DispatchConfig {
        interval_secs: 0,
        max_concurrent_sends: 4,
        send_timeout_secs: 5,
        stuck_sending_timeout_secs: 300,
    }
}

pub fn email(recipient: &str, subject: &str, content: &str) -> GeneratedEmail {
    GeneratedEmail {
        recipient_email: recipient.to_string(),
        subject: subject.to_string(),
        content: content.to_string(),
    }
}

pub async fn seed_campaign(store: &Arc<dyn CampaignStore>, user_id: &str, status: CampaignStatus) -> String {
    store
        .create_campaign(&NewCampaign::new(
            "Seeded",
            1,
            user_id,
            ts("2024-01-01T08:00:00Z"),
            status,
        ))
        .await
        .expect("create campaign")
        .id
}

pub async fn seed_log(
    store: &Arc<dyn CampaignStore>,
    user_id: &str,
    campaign_id: Option<&str>,
    status: EmailLogStatus,
) -> String {
    store
        .create_log(&NewEmailLog {
            campaign_id: campaign_id.map(str::to_string),
            recipient_email: "ana@example.com".to_string(),
            subject: "Hola".to_string(),
            content: "<p>Hola</p>".to_string(),
            sent_at: ts("2024-01-01T09:00:00Z"),
            status,
            user_id: user_id.to_string(),
        })
        .await
        .expect("create log")
        .id
}

pub async fn seed_scheduled(
    store: &Arc<dyn CampaignStore>,
    user_id: &str,
    recipient: &str,
    send_at: DateTime<Utc>,
    campaign_id: Option<&str>,
    log_id: Option<&str>,
) -> ScheduledEmail {
    store
        .create_scheduled(&NewScheduledEmail {
            recipient_email: recipient.to_string(),
            subject: "Big sale".to_string(),
            content: "<p>Deals</p>".to_string(),
            send_at,
            user_id: user_id.to_string(),
            campaign_id: campaign_id.map(str::to_string),
            log_id: log_id.map(str::to_string),
        })
        .await
        .expect("create scheduled")
}

// ----------------------------------------------------------------
// Transporte falso
// ----------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Script {
    Succeed,
    Reject(String),
    Throw(String),
    Hang,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

pub struct FakeTransport {
    default: Script,
    per_recipient: HashMap<String, Script>,
    delay: Option<Duration>,
    calls: Mutex<Vec<SentMail>>,
}

impl FakeTransport {
    pub fn succeeding() -> Self {
        Self::with_default(Script::Succeed)
    }

    pub fn with_default(default: Script) -> Self {
        FakeTransport {
            default,
            per_recipient: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(mut self, recipient: &str, script: Script) -> Self {
        self.per_recipient.insert(recipient.to_string(), script);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<SentMail> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl MailTransport for FakeTransport {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<SendOutcome, DispatchError> {
        self.calls.lock().expect("calls lock").push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.per_recipient.get(to).unwrap_or(&self.default) {
            Script::Succeed => Ok(SendOutcome::sent()),
            Script::Reject(message) => Ok(SendOutcome::failure(message.clone())),
            Script::Throw(message) => Err(DispatchError::Transport(message.clone())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(SendOutcome::sent())
            }
        }
    }
}

// ----------------------------------------------------------------
// Generador falso
// ----------------------------------------------------------------

#[derive(Default)]
pub struct FakeGenerator {
    pub fail: bool,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    pub fn failing() -> Self {
        FakeGenerator {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        customer_context: &str,
    ) -> Result<GeneratedContent, GenerationError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push((prompt.to_string(), customer_context.to_string()));
        if self.fail {
            return Err(GenerationError::Upstream("503 Service Unavailable".into()));
        }
        Ok(GeneratedContent {
            subject: "Your deal is here".to_string(),
            body: format!("Line one\nfor {}", customer_context.len()),
        })
    }

    async fn summarize(&self, customer_data_text: &str) -> Result<CustomerSummary, GenerationError> {
        if self.fail {
            return Err(GenerationError::Upstream("503 Service Unavailable".into()));
        }
        Ok(CustomerSummary {
            summary: format!("{} lines analysed", customer_data_text.lines().count()),
        })
    }
}

// ----------------------------------------------------------------
// Store con fallos por registro
// ----------------------------------------------------------------

/// Delegado sobre `SqliteStore` que falla el claim, el cierre o la
/// actualización del log de los ids elegidos.
pub struct FailingStore {
    inner: SqliteStore,
    fail_claim: HashSet<String>,
    fail_complete: HashSet<String>,
    fail_log_update: HashSet<String>,
}

impl FailingStore {
    pub fn wrap(inner: SqliteStore) -> Self {
        FailingStore {
            inner,
            fail_claim: HashSet::new(),
            fail_complete: HashSet::new(),
            fail_log_update: HashSet::new(),
        }
    }

    pub fn fail_claim(mut self, scheduled_id: &str) -> Self {
        self.fail_claim.insert(scheduled_id.to_string());
        self
    }

    pub fn fail_complete(mut self, scheduled_id: &str) -> Self {
        self.fail_complete.insert(scheduled_id.to_string());
        self
    }

    pub fn fail_log_update(mut self, log_id: &str) -> Self {
        self.fail_log_update.insert(log_id.to_string());
        self
    }

    fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    fn outage() -> DispatchError {
        DispatchError::Store(sqlx::Error::PoolClosed)
    }
}

#[async_trait]
impl CampaignStore for FailingStore {
    async fn create_campaign(&self, campaign: &NewCampaign) -> StoreResult<Campaign> {
        self.inner().create_campaign(campaign).await
    }

    async fn get_campaign(&self, user_id: &str, id: &str) -> StoreResult<Option<Campaign>> {
        self.inner().get_campaign(user_id, id).await
    }

    async fn list_campaigns(&self, user_id: &str) -> StoreResult<Vec<Campaign>> {
        self.inner().list_campaigns(user_id).await
    }

    async fn update_draft(
        &self,
        user_id: &str,
        id: &str,
        fields: &DraftFields,
    ) -> StoreResult<bool> {
        self.inner().update_draft(user_id, id, fields).await
    }

    async fn set_campaign_status(&self, id: &str, status: CampaignStatus) -> StoreResult<()> {
        self.inner().set_campaign_status(id, status).await
    }

    async fn transition_campaign_status(
        &self,
        id: &str,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> StoreResult<bool> {
        self.inner().transition_campaign_status(id, from, to).await
    }

    async fn increment_opened_count(&self, id: &str) -> StoreResult<()> {
        self.inner().increment_opened_count(id).await
    }

    async fn create_log(&self, log: &NewEmailLog) -> StoreResult<EmailLog> {
        self.inner().create_log(log).await
    }

    async fn get_log(&self, id: &str) -> StoreResult<Option<EmailLog>> {
        self.inner().get_log(id).await
    }

    async fn list_logs(&self, user_id: &str) -> StoreResult<Vec<EmailLog>> {
        self.inner().list_logs(user_id).await
    }

    async fn set_log_status(
        &self,
        id: &str,
        status: EmailLogStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        if self.fail_log_update.contains(id) {
            return Err(Self::outage());
        }
        self.inner().set_log_status(id, status, sent_at).await
    }

    async fn record_open(&self, log_id: &str, opened_at: DateTime<Utc>) -> StoreResult<OpenRecord> {
        self.inner().record_open(log_id, opened_at).await
    }

    async fn create_scheduled(&self, email: &NewScheduledEmail) -> StoreResult<ScheduledEmail> {
        self.inner().create_scheduled(email).await
    }

    async fn get_scheduled(&self, id: &str) -> StoreResult<Option<ScheduledEmail>> {
        self.inner().get_scheduled(id).await
    }

    async fn list_scheduled(&self, user_id: &str) -> StoreResult<Vec<ScheduledEmail>> {
        self.inner().list_scheduled(user_id).await
    }

    async fn list_scheduled_by_status(
        &self,
        user_id: &str,
        status: ScheduledStatus,
    ) -> StoreResult<Vec<ScheduledEmail>> {
        self.inner().list_scheduled_by_status(user_id, status).await
    }

    async fn list_all_scheduled_by_status(
        &self,
        status: ScheduledStatus,
    ) -> StoreResult<Vec<ScheduledEmail>> {
        self.inner().list_all_scheduled_by_status(status).await
    }

    async fn users_with_scheduled_status(
        &self,
        status: ScheduledStatus,
    ) -> StoreResult<Vec<String>> {
        self.inner().users_with_scheduled_status(status).await
    }

    async fn claim_scheduled(
        &self,
        id: &str,
        user_id: &str,
        claimed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        if self.fail_claim.contains(id) {
            return Err(Self::outage());
        }
        self.inner().claim_scheduled(id, user_id, claimed_at).await
    }

    async fn complete_scheduled(
        &self,
        id: &str,
        status: ScheduledStatus,
        error_message: Option<&str>,
    ) -> StoreResult<bool> {
        if self.fail_complete.contains(id) {
            return Err(Self::outage());
        }
        self.inner().complete_scheduled(id, status, error_message).await
    }

    async fn requeue_scheduled(&self, id: &str, claimed_at: DateTime<Utc>) -> StoreResult<bool> {
        self.inner().requeue_scheduled(id, claimed_at).await
    }

    async fn count_pending_for_campaign(&self, campaign_id: &str) -> StoreResult<i64> {
        self.inner().count_pending_for_campaign(campaign_id).await
    }

    async fn insert_customers(
        &self,
        user_id: &str,
        customers: &[NewCustomer],
    ) -> StoreResult<Vec<Customer>> {
        self.inner().insert_customers(user_id, customers).await
    }

    async fn list_customers(&self, user_id: &str) -> StoreResult<Vec<Customer>> {
        self.inner().list_customers(user_id).await
    }
}
