use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set, TransactionTrait,
};

use crate::domain::NewCallRecord;
use crate::entities::{call_records, prelude::*};

pub struct CallRepository {
    conn: DatabaseConnection,
}

impl CallRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn to_active_model(record: &NewCallRecord, now: &str) -> call_records::ActiveModel {
        call_records::ActiveModel {
            calldate: Set(record.calldate.to_rfc3339()),
            src: Set(record.src.clone()),
            dst: Set(record.dst.clone()),
            duration: Set(record.duration),
            billsec: Set(record.billsec),
            disposition: Set(record.disposition.as_str().to_string()),
            answered: Set(record.answered),
            created_at: Set(now.to_string()),
            updated_at: Set(now.to_string()),
            ..Default::default()
        }
    }

    /// Insert a single record, returning the stored row.
    pub async fn insert(&self, record: &NewCallRecord) -> Result<call_records::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = Self::to_active_model(record, &now)
            .insert(&self.conn)
            .await
            .context("Failed to insert call record")?;

        Ok(model)
    }

    /// Insert a validated batch atomically: either every record is committed
    /// or none are.
    pub async fn insert_batch(&self, records: &[NewCallRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let models: Vec<call_records::ActiveModel> = records
            .iter()
            .map(|r| Self::to_active_model(r, &now))
            .collect();

        let txn = self.conn.begin().await?;

        CallRecords::insert_many(models)
            .exec(&txn)
            .await
            .context("Failed to bulk insert call records")?;

        txn.commit().await?;

        Ok(records.len())
    }

    pub async fn count(&self) -> Result<u64> {
        let count = CallRecords::find()
            .count(&self.conn)
            .await
            .context("Failed to count call records")?;

        Ok(count)
    }
}
