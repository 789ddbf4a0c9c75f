//! services/store_service.rs
//! Acceso a datos: trait `CampaignStore` + implementación SQLite con sqlx.
//!
//! Todas las lecturas de usuario filtran por `user_id`. Las únicas escrituras
//! con semántica compare-and-set son el claim de un envío programado y la
//! apertura de un log; el resto son updates simples (último gana).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{str::FromStr, time::Duration};
use uuid::Uuid;

use crate::{
    errors::DispatchError,
    models::{
        campaign_model::{Campaign, CampaignStatus, NewCampaign},
        customer_model::Customer,
        email_log_model::{EmailLog, EmailLogStatus, NewEmailLog},
        format_ts, parse_ts,
        scheduled_email_model::{NewScheduledEmail, ScheduledEmail, ScheduledStatus},
    },
};

pub type StoreResult<T> = std::result::Result<T, DispatchError>;

/// Resultado de marcar un log como abierto
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenRecord {
    Recorded { campaign_id: Option<String> },
    AlreadyOpened,
    UnknownLog,
}

/// Campos editables de un borrador
#[derive(Debug, Clone, Default)]
pub struct DraftFields {
    pub name: String,
    pub template: Option<String>,
    pub product_name: Option<String>,
    pub custom_prompt: Option<String>,
    pub customer_data: Option<String>,
    pub recipient_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    // --- campaigns ---
    async fn create_campaign(&self, campaign: &NewCampaign) -> StoreResult<Campaign>;
    async fn get_campaign(&self, user_id: &str, id: &str) -> StoreResult<Option<Campaign>>;
    async fn list_campaigns(&self, user_id: &str) -> StoreResult<Vec<Campaign>>;
    async fn update_draft(&self, user_id: &str, id: &str, fields: &DraftFields)
        -> StoreResult<bool>;
    async fn set_campaign_status(&self, id: &str, status: CampaignStatus) -> StoreResult<()>;
    /// Cambia el estado solo si sigue en `from`.
    async fn transition_campaign_status(
        &self,
        id: &str,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> StoreResult<bool>;
    async fn increment_opened_count(&self, id: &str) -> StoreResult<()>;

    // --- email logs ---
    async fn create_log(&self, log: &NewEmailLog) -> StoreResult<EmailLog>;
    async fn get_log(&self, id: &str) -> StoreResult<Option<EmailLog>>;
    async fn list_logs(&self, user_id: &str) -> StoreResult<Vec<EmailLog>>;
    /// Nunca pisa un log ya abierto.
    async fn set_log_status(
        &self,
        id: &str,
        status: EmailLogStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool>;
    /// Transacción: marca Opened una sola vez y suma la apertura al campaign.
    async fn record_open(&self, log_id: &str, opened_at: DateTime<Utc>) -> StoreResult<OpenRecord>;

    // --- scheduled emails ---
    async fn create_scheduled(&self, email: &NewScheduledEmail) -> StoreResult<ScheduledEmail>;
    async fn get_scheduled(&self, id: &str) -> StoreResult<Option<ScheduledEmail>>;
    async fn list_scheduled(&self, user_id: &str) -> StoreResult<Vec<ScheduledEmail>>;
    /// Filtro de igualdad sobre (user_id, status); el vencimiento lo decide el llamador.
    async fn list_scheduled_by_status(
        &self,
        user_id: &str,
        status: ScheduledStatus,
    ) -> StoreResult<Vec<ScheduledEmail>>;
    /// Igual que el anterior pero sin filtro de usuario (barrido del servidor).
    async fn list_all_scheduled_by_status(
        &self,
        status: ScheduledStatus,
    ) -> StoreResult<Vec<ScheduledEmail>>;
    async fn users_with_scheduled_status(&self, status: ScheduledStatus)
        -> StoreResult<Vec<String>>;
    /// Claim compare-and-set: Scheduled -> Sending. `true` si este llamador ganó.
    async fn claim_scheduled(
        &self,
        id: &str,
        user_id: &str,
        claimed_at: DateTime<Utc>,
    ) -> StoreResult<bool>;
    /// Sending -> Sent | Failed.
    async fn complete_scheduled(
        &self,
        id: &str,
        status: ScheduledStatus,
        error_message: Option<&str>,
    ) -> StoreResult<bool>;
    /// Sending -> Scheduled, solo si el claim sigue siendo el observado.
    async fn requeue_scheduled(&self, id: &str, claimed_at: DateTime<Utc>) -> StoreResult<bool>;
    async fn count_pending_for_campaign(&self, campaign_id: &str) -> StoreResult<i64>;

    // --- customers ---
    async fn insert_customers(
        &self,
        user_id: &str,
        customers: &[NewCustomer],
    ) -> StoreResult<Vec<Customer>>;
    async fn list_customers(&self, user_id: &str) -> StoreResult<Vec<Customer>>;
}

const CAMPAIGN_COLUMNS: &str = "id, user_id, name, status, created_at, recipient_count, \
     opened_count, template, product_name, custom_prompt, customer_data";
const LOG_COLUMNS: &str =
    "id, user_id, campaign_id, recipient_email, subject, content, sent_at, status, opened_at";
const SCHEDULED_COLUMNS: &str = "id, user_id, campaign_id, log_id, recipient_email, subject, \
     content, send_at, status, error_message, claimed_at";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        SqliteStore { db_pool }
    }

    /// Abre (o crea) la base SQLite en modo WAL.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid DATABASE_URL '{}'", database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let db_pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to {}", database_url))?;

        Ok(Self::new(db_pool))
    }

    /// Corre migraciones con sqlx
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Failed to run store migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.db_pool
    }
}

#[async_trait]
impl CampaignStore for SqliteStore {
    async fn create_campaign(&self, campaign: &NewCampaign) -> StoreResult<Campaign> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, user_id, name, status, created_at, recipient_count,
                opened_count, template, product_name, custom_prompt, customer_data
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(&campaign.user_id)
        .bind(&campaign.name)
        .bind(campaign.status.as_str())
        .bind(format_ts(&campaign.created_at))
        .bind(campaign.recipient_count)
        .bind(&campaign.template)
        .bind(&campaign.product_name)
        .bind(&campaign.custom_prompt)
        .bind(&campaign.customer_data)
        .execute(&self.db_pool)
        .await?;

        Ok(Campaign {
            id,
            name: campaign.name.clone(),
            status: campaign.status,
            created_at: campaign.created_at,
            recipient_count: campaign.recipient_count,
            opened_count: 0,
            user_id: campaign.user_id.clone(),
            template: campaign.template.clone(),
            product_name: campaign.product_name.clone(),
            custom_prompt: campaign.custom_prompt.clone(),
            customer_data: campaign.customer_data.clone(),
        })
    }

    async fn get_campaign(&self, user_id: &str, id: &str) -> StoreResult<Option<Campaign>> {
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1 AND user_id = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?;

        row.as_ref().map(campaign_from_row).transpose()
    }

    async fn list_campaigns(&self, user_id: &str) -> StoreResult<Vec<Campaign>> {
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE user_id = ?1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.db_pool)
            .await?;

        rows.iter().map(campaign_from_row).collect()
    }

    async fn update_draft(
        &self,
        user_id: &str,
        id: &str,
        fields: &DraftFields,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET name = ?3,
                template = ?4,
                product_name = ?5,
                custom_prompt = ?6,
                customer_data = ?7,
                recipient_count = ?8
            WHERE id = ?1 AND user_id = ?2 AND status = 'Draft'
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&fields.name)
        .bind(&fields.template)
        .bind(&fields.product_name)
        .bind(&fields.custom_prompt)
        .bind(&fields.customer_data)
        .bind(fields.recipient_count)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_campaign_status(&self, id: &str, status: CampaignStatus) -> StoreResult<()> {
        sqlx::query("UPDATE campaigns SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    async fn transition_campaign_status(
        &self,
        id: &str,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE campaigns SET status = ?1 WHERE id = ?2 AND status = ?3")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_opened_count(&self, id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE campaigns SET opened_count = opened_count + 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    async fn create_log(&self, log: &NewEmailLog) -> StoreResult<EmailLog> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO email_logs (
                id, user_id, campaign_id, recipient_email, subject,
                content, sent_at, status, opened_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)
            "#,
        )
        .bind(&id)
        .bind(&log.user_id)
        .bind(&log.campaign_id)
        .bind(&log.recipient_email)
        .bind(&log.subject)
        .bind(&log.content)
        .bind(format_ts(&log.sent_at))
        .bind(log.status.as_str())
        .execute(&self.db_pool)
        .await?;

        Ok(EmailLog {
            id,
            campaign_id: log.campaign_id.clone(),
            recipient_email: log.recipient_email.clone(),
            subject: log.subject.clone(),
            content: log.content.clone(),
            sent_at: log.sent_at,
            status: log.status,
            user_id: log.user_id.clone(),
            opened_at: None,
        })
    }

    async fn get_log(&self, id: &str) -> StoreResult<Option<EmailLog>> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM email_logs WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        row.as_ref().map(log_from_row).transpose()
    }

    async fn list_logs(&self, user_id: &str) -> StoreResult<Vec<EmailLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM email_logs WHERE user_id = ?1 ORDER BY sent_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.db_pool)
            .await?;

        rows.iter().map(log_from_row).collect()
    }

    async fn set_log_status(
        &self,
        id: &str,
        status: EmailLogStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE email_logs
            SET status = ?1,
                sent_at = COALESCE(?2, sent_at)
            WHERE id = ?3 AND status <> 'Opened'
            "#,
        )
        .bind(status.as_str())
        .bind(sent_at.as_ref().map(format_ts))
        .bind(id)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_open(&self, log_id: &str, opened_at: DateTime<Utc>) -> StoreResult<OpenRecord> {
        let mut tx = self.db_pool.begin().await?;

        // La escritura va primero: toma el lock de escritura y los demás
        // aperturas concurrentes del mismo log esperan y ven 0 filas.
        let updated = sqlx::query(
            "UPDATE email_logs SET status = 'Opened', opened_at = ?1 \
             WHERE id = ?2 AND status <> 'Opened'",
        )
        .bind(format_ts(&opened_at))
        .bind(log_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            let exists = sqlx::query("SELECT 1 FROM email_logs WHERE id = ?1")
                .bind(log_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            tx.rollback().await?;
            return Ok(if exists {
                OpenRecord::AlreadyOpened
            } else {
                OpenRecord::UnknownLog
            });
        }

        let campaign_id: Option<String> =
            sqlx::query_scalar("SELECT campaign_id FROM email_logs WHERE id = ?1")
                .bind(log_id)
                .fetch_one(&mut *tx)
                .await?;

        if let Some(cid) = &campaign_id {
            sqlx::query("UPDATE campaigns SET opened_count = opened_count + 1 WHERE id = ?1")
                .bind(cid)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(OpenRecord::Recorded { campaign_id })
    }

    async fn create_scheduled(&self, email: &NewScheduledEmail) -> StoreResult<ScheduledEmail> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO scheduled_emails (
                id, user_id, campaign_id, log_id, recipient_email, subject,
                content, send_at, status, error_message, claimed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'Scheduled', NULL, NULL)
            "#,
        )
        .bind(&id)
        .bind(&email.user_id)
        .bind(&email.campaign_id)
        .bind(&email.log_id)
        .bind(&email.recipient_email)
        .bind(&email.subject)
        .bind(&email.content)
        .bind(format_ts(&email.send_at))
        .execute(&self.db_pool)
        .await?;

        Ok(ScheduledEmail {
            id,
            recipient_email: email.recipient_email.clone(),
            subject: email.subject.clone(),
            content: email.content.clone(),
            send_at: email.send_at,
            status: ScheduledStatus::Scheduled,
            user_id: email.user_id.clone(),
            campaign_id: email.campaign_id.clone(),
            log_id: email.log_id.clone(),
            error_message: None,
            claimed_at: None,
        })
    }

    async fn get_scheduled(&self, id: &str) -> StoreResult<Option<ScheduledEmail>> {
        let sql = format!("SELECT {SCHEDULED_COLUMNS} FROM scheduled_emails WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        row.as_ref().map(scheduled_from_row).transpose()
    }

    async fn list_scheduled(&self, user_id: &str) -> StoreResult<Vec<ScheduledEmail>> {
        let sql = format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_emails \
             WHERE user_id = ?1 ORDER BY send_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.db_pool)
            .await?;

        rows.iter().map(scheduled_from_row).collect()
    }

    async fn list_scheduled_by_status(
        &self,
        user_id: &str,
        status: ScheduledStatus,
    ) -> StoreResult<Vec<ScheduledEmail>> {
        let sql = format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_emails WHERE user_id = ?1 AND status = ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(status.as_str())
            .fetch_all(&self.db_pool)
            .await?;

        Ok(decode_skipping_malformed(&rows))
    }

    async fn list_all_scheduled_by_status(
        &self,
        status: ScheduledStatus,
    ) -> StoreResult<Vec<ScheduledEmail>> {
        let sql = format!("SELECT {SCHEDULED_COLUMNS} FROM scheduled_emails WHERE status = ?1");
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.db_pool)
            .await?;

        Ok(decode_skipping_malformed(&rows))
    }

    async fn users_with_scheduled_status(
        &self,
        status: ScheduledStatus,
    ) -> StoreResult<Vec<String>> {
        let users: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM scheduled_emails WHERE status = ?1 ORDER BY user_id",
        )
        .bind(status.as_str())
        .fetch_all(&self.db_pool)
        .await?;
        Ok(users)
    }

    async fn claim_scheduled(
        &self,
        id: &str,
        user_id: &str,
        claimed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_emails
            SET status = 'Sending',
                claimed_at = ?1
            WHERE id = ?2 AND user_id = ?3 AND status = 'Scheduled'
            "#,
        )
        .bind(format_ts(&claimed_at))
        .bind(id)
        .bind(user_id)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete_scheduled(
        &self,
        id: &str,
        status: ScheduledStatus,
        error_message: Option<&str>,
    ) -> StoreResult<bool> {
        if !status.is_terminal() {
            return Err(DispatchError::Validation(format!(
                "complete_scheduled expects a terminal status, got {}",
                status
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE scheduled_emails
            SET status = ?1,
                error_message = ?2
            WHERE id = ?3 AND status = 'Sending'
            "#,
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(id)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn requeue_scheduled(&self, id: &str, claimed_at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_emails
            SET status = 'Scheduled',
                claimed_at = NULL
            WHERE id = ?1 AND status = 'Sending' AND claimed_at = ?2
            "#,
        )
        .bind(id)
        .bind(format_ts(&claimed_at))
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_pending_for_campaign(&self, campaign_id: &str) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scheduled_emails \
             WHERE campaign_id = ?1 AND status IN ('Scheduled', 'Sending')",
        )
        .bind(campaign_id)
        .fetch_one(&self.db_pool)
        .await?;
        Ok(count)
    }

    async fn insert_customers(
        &self,
        user_id: &str,
        customers: &[NewCustomer],
    ) -> StoreResult<Vec<Customer>> {
        let now = Utc::now();
        let created_at = format_ts(&now);
        let mut tx = self.db_pool.begin().await?;
        let mut inserted = Vec::with_capacity(customers.len());

        for customer in customers {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO customers (id, user_id, name, email, data, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&id)
            .bind(user_id)
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(customer.data.to_string())
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;

            inserted.push(Customer {
                id,
                user_id: user_id.to_string(),
                name: customer.name.clone(),
                email: customer.email.clone(),
                data: customer.data.clone(),
                created_at: now,
            });
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn list_customers(&self, user_id: &str) -> StoreResult<Vec<Customer>> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, email, data, created_at FROM customers \
             WHERE user_id = ?1 ORDER BY created_at, name",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        rows.iter().map(customer_from_row).collect()
    }
}

// ----------------------------------------------------------------
// Decodificación de filas
// ----------------------------------------------------------------

fn malformed(e: anyhow::Error) -> DispatchError {
    DispatchError::Validation(format!("{e:#}"))
}

fn opt_ts(raw: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose().map_err(malformed)
}

fn campaign_from_row(row: &SqliteRow) -> StoreResult<Campaign> {
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Campaign {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        status: status.parse().map_err(malformed)?,
        created_at: parse_ts(&created_at).map_err(malformed)?,
        recipient_count: row.try_get("recipient_count")?,
        opened_count: row.try_get("opened_count")?,
        user_id: row.try_get("user_id")?,
        template: row.try_get("template")?,
        product_name: row.try_get("product_name")?,
        custom_prompt: row.try_get("custom_prompt")?,
        customer_data: row.try_get("customer_data")?,
    })
}

fn log_from_row(row: &SqliteRow) -> StoreResult<EmailLog> {
    let status: String = row.try_get("status")?;
    let sent_at: String = row.try_get("sent_at")?;

    Ok(EmailLog {
        id: row.try_get("id")?,
        campaign_id: row.try_get("campaign_id")?,
        recipient_email: row.try_get("recipient_email")?,
        subject: row.try_get("subject")?,
        content: row.try_get("content")?,
        sent_at: parse_ts(&sent_at).map_err(malformed)?,
        status: status.parse().map_err(malformed)?,
        user_id: row.try_get("user_id")?,
        opened_at: opt_ts(row.try_get("opened_at")?)?,
    })
}

fn scheduled_from_row(row: &SqliteRow) -> StoreResult<ScheduledEmail> {
    let status: String = row.try_get("status")?;
    let send_at: String = row.try_get("send_at")?;

    Ok(ScheduledEmail {
        id: row.try_get("id")?,
        recipient_email: row.try_get("recipient_email")?,
        subject: row.try_get("subject")?,
        content: row.try_get("content")?,
        send_at: parse_ts(&send_at).map_err(malformed)?,
        status: status.parse().map_err(malformed)?,
        user_id: row.try_get("user_id")?,
        campaign_id: row.try_get("campaign_id")?,
        log_id: row.try_get("log_id")?,
        error_message: row.try_get("error_message")?,
        claimed_at: opt_ts(row.try_get("claimed_at")?)?,
    })
}

fn customer_from_row(row: &SqliteRow) -> StoreResult<Customer> {
    let data: String = row.try_get("data")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Customer {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        data: serde_json::from_str(&data)
            .map_err(|e| DispatchError::Validation(format!("Invalid customer data: {e}")))?,
        created_at: parse_ts(&created_at).map_err(malformed)?,
    })
}

/// Filas programadas ilegibles se saltan con un warning en vez de tumbar el lote.
fn decode_skipping_malformed(rows: &[SqliteRow]) -> Vec<ScheduledEmail> {
    rows.iter()
        .filter_map(|row| match scheduled_from_row(row) {
            Ok(email) => Some(email),
            Err(e) => {
                let id: String = row.try_get("id").unwrap_or_default();
                log::warn!("(store) Skipping malformed scheduled email id={}: {}", id, e);
                None
            }
        })
        .collect()
}
