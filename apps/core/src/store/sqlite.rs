use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{info, warn};

use super::DataStore;
use crate::error::AppError;
use crate::models::{
    DeliveryStatus, IssueCategory, ParticipationIntent, Record, SatisfactionLevel, SurveyResponse,
};

/// Records kept in a SQLite `records` table, one row per citizen.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

/// Flat row shape of the `records` table.
#[derive(Debug, FromRow)]
struct RecordRow {
    id: String,
    name: String,
    age: Option<i64>,
    neighborhood: String,
    phone: String,
    provider: Option<String>,
    registered_at: i64,
    sent_at: Option<i64>,
    delivered_at: Option<i64>,
    delivery_status: String,
    clicked_at: Option<i64>,
    issue: Option<String>,
    issue_detail: Option<String>,
    satisfaction: Option<String>,
    participation: Option<String>,
    answered_at: Option<i64>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `db_url` and applies the schema.
    pub async fn connect(db_url: &str) -> Result<Self, AppError> {
        info!("Initializing record database at: {}", db_url);

        let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER,
                neighborhood TEXT NOT NULL,
                phone TEXT NOT NULL,
                provider TEXT,
                registered_at INTEGER NOT NULL,
                sent_at INTEGER,
                delivered_at INTEGER,
                delivery_status TEXT NOT NULL DEFAULT 'pending',
                clicked_at INTEGER,
                issue TEXT,
                issue_detail TEXT,
                satisfaction TEXT,
                participation TEXT,
                answered_at INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts or replaces a record. Used by seeding tools and tests; the
    /// query pipeline itself never writes.
    pub async fn upsert_record(&self, record: &Record) -> Result<(), AppError> {
        let survey = record.survey.as_ref();
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO records (
                id, name, age, neighborhood, phone, provider, registered_at,
                sent_at, delivered_at, delivery_status, clicked_at,
                issue, issue_detail, satisfaction, participation, answered_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(record.age.map(i64::from))
        .bind(&record.neighborhood)
        .bind(&record.phone)
        .bind(&record.provider)
        .bind(record.registered_at.timestamp_millis())
        .bind(record.sent_at.map(|t| t.timestamp_millis()))
        .bind(record.delivered_at.map(|t| t.timestamp_millis()))
        .bind(delivery_label(record.delivery_status))
        .bind(record.clicked_at.map(|t| t.timestamp_millis()))
        .bind(survey.map(|s| s.issue.label()))
        .bind(survey.and_then(|s| s.issue_detail.clone()))
        .bind(survey.map(|s| s.satisfaction.label()))
        .bind(survey.map(|s| s.participation.label()))
        .bind(survey.map(|s| s.answered_at.timestamp_millis()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn load_records(&self) -> Result<Vec<Record>, AppError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, name, age, neighborhood, phone, provider, registered_at,
                   sent_at, delivered_at, delivery_status, clicked_at,
                   issue, issue_detail, satisfaction, participation, answered_at
            FROM records
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Record::from).collect())
    }
}

fn delivery_label(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Pending => "pending",
        DeliveryStatus::Sent => "sent",
        DeliveryStatus::Delivered => "delivered",
        DeliveryStatus::Read => "read",
        DeliveryStatus::Failed => "failed",
    }
}

fn millis(value: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value).unwrap_or_default()
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        let survey = match (row.satisfaction.as_deref(), row.issue.as_deref()) {
            (Some(satisfaction), Some(issue)) => {
                match (SatisfactionLevel::parse(satisfaction), IssueCategory::parse(issue)) {
                    (Some(satisfaction), Some(issue)) => Some(SurveyResponse {
                        issue,
                        issue_detail: row.issue_detail,
                        satisfaction,
                        participation: row
                            .participation
                            .as_deref()
                            .map(ParticipationIntent::parse)
                            .unwrap_or_default(),
                        answered_at: row.answered_at.map(millis).unwrap_or_default(),
                    }),
                    _ => {
                        warn!("Record {} has unrecognised survey labels; ignoring survey", row.id);
                        None
                    }
                }
            }
            _ => None,
        };

        Record {
            id: row.id,
            name: row.name,
            age: row.age.and_then(|a| u32::try_from(a).ok()),
            neighborhood: row.neighborhood,
            phone: row.phone,
            provider: row.provider,
            registered_at: millis(row.registered_at),
            sent_at: row.sent_at.map(millis),
            delivered_at: row.delivered_at.map(millis),
            delivery_status: DeliveryStatus::parse(&row.delivery_status),
            clicked_at: row.clicked_at.map(millis),
            survey,
        }
    }
}
