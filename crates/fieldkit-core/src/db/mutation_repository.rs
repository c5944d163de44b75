//! Mutation queue and dead-letter repository

use crate::error::{Error, Result};
use crate::models::{FailedMutation, MutationId, MutationItem};
use libsql::{params, Connection, Row, Value};

/// Trait for durable mutation queue operations (async)
#[allow(async_fn_in_trait)]
pub trait MutationRepository {
    /// Insert or update a queued mutation by id, keeping its queue position
    async fn enqueue(&self, item: &MutationItem) -> Result<()>;

    /// All pending mutations, oldest first
    async fn list_pending(&self) -> Result<Vec<MutationItem>>;

    /// Number of pending mutations
    async fn count_pending(&self) -> Result<usize>;

    /// Delete a queued mutation; absent ids are ignored
    async fn remove(&self, id: &MutationId) -> Result<()>;

    /// Store a mutation in the dead-letter log
    async fn add_failed(&self, item: &MutationItem) -> Result<()>;

    /// Dead-lettered mutations, oldest failure first
    async fn list_failed(&self) -> Result<Vec<FailedMutation>>;

    /// Move a dead-lettered mutation back to the tail of the queue
    async fn requeue_failed(&self, id: &MutationId) -> Result<MutationItem>;

    /// Drop every dead-lettered mutation, returning how many were removed
    async fn clear_failed(&self) -> Result<usize>;
}

/// libSQL implementation of `MutationRepository`
pub struct LibSqlMutationRepository<'a> {
    conn: &'a Connection,
}

const QUEUE_COLUMNS: &str = "id, kind, resource, payload, created_at, retry_count, error";

impl<'a> LibSqlMutationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a mutation from the first seven columns of a row
    fn parse_item(row: &Row) -> Result<MutationItem> {
        let id: String = row.get(0)?;
        let kind: String = row.get(1)?;
        let resource: String = row.get(2)?;
        let payload: String = row.get(3)?;
        let retry_count: i64 = row.get(5)?;

        Ok(MutationItem {
            id: id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid mutation ID: {id}")))?,
            kind: kind.parse()?,
            resource: resource.parse()?,
            payload: serde_json::from_str(&payload)?,
            created_at: row.get(4)?,
            retry_count: u32::try_from(retry_count).unwrap_or(0),
            error: optional_text(row, 6)?,
        })
    }

    async fn get_failed(&self, id: &MutationId) -> Result<Option<FailedMutation>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {QUEUE_COLUMNS}, failed_at FROM failed_mutations WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        Ok(Some(FailedMutation {
            item: Self::parse_item(&row)?,
            failed_at: row.get(7)?,
        }))
    }

    /// Statements of a requeue; the caller owns the transaction.
    async fn move_to_queue(&self, item: &MutationItem) -> Result<()> {
        // Drop any stale queue row so the insert lands at the tail
        self.remove(&item.id).await?;
        self.enqueue(item).await?;
        self.conn
            .execute(
                "DELETE FROM failed_mutations WHERE id = ?",
                [item.id.as_str()],
            )
            .await?;
        Ok(())
    }
}

impl MutationRepository for LibSqlMutationRepository<'_> {
    async fn enqueue(&self, item: &MutationItem) -> Result<()> {
        let payload = serde_json::to_string(&item.payload)?;

        self.conn
            .execute(
                "INSERT INTO mutation_queue
                     (id, kind, resource, payload, created_at, retry_count, error)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                     kind = excluded.kind,
                     resource = excluded.resource,
                     payload = excluded.payload,
                     retry_count = excluded.retry_count,
                     error = excluded.error",
                params![
                    item.id.as_str(),
                    item.kind.as_str(),
                    item.resource.as_str(),
                    payload,
                    item.created_at,
                    i64::from(item.retry_count),
                    text_or_null(item.error.as_deref()),
                ],
            )
            .await?;

        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<MutationItem>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {QUEUE_COLUMNS} FROM mutation_queue ORDER BY seq ASC"),
                (),
            )
            .await?;

        let mut items = Vec::new();
        let mut undecodable = Vec::new();
        while let Some(row) = rows.next().await? {
            match Self::parse_item(&row) {
                Ok(item) => items.push(item),
                Err(error) => {
                    let id: String = row.get(0)?;
                    tracing::error!("Dropping undecodable queued mutation {id}: {error}");
                    undecodable.push(id);
                }
            }
        }
        drop(rows);

        for id in undecodable {
            self.conn
                .execute("DELETE FROM mutation_queue WHERE id = ?", [id])
                .await?;
        }

        Ok(items)
    }

    async fn count_pending(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM mutation_queue", ())
            .await?;

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn remove(&self, id: &MutationId) -> Result<()> {
        self.conn
            .execute("DELETE FROM mutation_queue WHERE id = ?", [id.as_str()])
            .await?;
        Ok(())
    }

    async fn add_failed(&self, item: &MutationItem) -> Result<()> {
        let payload = serde_json::to_string(&item.payload)?;
        let now = crate::util::unix_timestamp_millis();

        self.conn
            .execute(
                "INSERT OR REPLACE INTO failed_mutations
                     (id, kind, resource, payload, created_at, retry_count, error, failed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    item.id.as_str(),
                    item.kind.as_str(),
                    item.resource.as_str(),
                    payload,
                    item.created_at,
                    i64::from(item.retry_count),
                    text_or_null(item.error.as_deref()),
                    now,
                ],
            )
            .await?;

        Ok(())
    }

    async fn list_failed(&self) -> Result<Vec<FailedMutation>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {QUEUE_COLUMNS}, failed_at FROM failed_mutations
                     ORDER BY failed_at ASC, rowid ASC"
                ),
                (),
            )
            .await?;

        let mut failed = Vec::new();
        while let Some(row) = rows.next().await? {
            match Self::parse_item(&row) {
                Ok(item) => failed.push(FailedMutation {
                    item,
                    failed_at: row.get(7)?,
                }),
                Err(error) => {
                    tracing::warn!("Skipping undecodable dead-letter row: {error}");
                }
            }
        }

        Ok(failed)
    }

    async fn requeue_failed(&self, id: &MutationId) -> Result<MutationItem> {
        let failed = self
            .get_failed(id)
            .await?
            .ok_or_else(|| Error::not_found("Failed mutation", id))?;

        let mut item = failed.item;
        item.retry_count = 0;
        item.error = None;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        if let Err(error) = self.move_to_queue(&item).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(error);
        }
        if let Err(error) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(error.into());
        }

        Ok(item)
    }

    async fn clear_failed(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM failed_mutations", ()).await?;
        Ok(usize::try_from(removed).unwrap_or(0))
    }
}

fn text_or_null(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

/// Read a nullable TEXT column
pub(crate) fn optional_text(row: &Row, index: i32) -> Result<Option<String>> {
    match row.get_value(index)? {
        Value::Text(text) => Ok(Some(text)),
        Value::Null => Ok(None),
        other => Err(Error::Database(format!(
            "Expected TEXT or NULL in column {index}, found {other:?}"
        ))),
    }
}
