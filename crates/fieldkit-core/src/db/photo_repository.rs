//! Offline photo blob repository

use crate::error::{Error, Result};
use crate::models::{PhotoId, UnsyncedPhoto};
use libsql::{params, Connection, Row, Rows};

/// Trait for offline photo storage operations (async)
#[allow(async_fn_in_trait)]
pub trait PhotoRepository {
    /// Persist a captured photo
    async fn save(&self, photo: &UnsyncedPhoto) -> Result<()>;

    /// Photos not yet uploaded, oldest first
    async fn list_unsynced(&self) -> Result<Vec<UnsyncedPhoto>>;

    /// All photos for an inspection, oldest first
    async fn list_for_inspection(&self, inspection_id: &str) -> Result<Vec<UnsyncedPhoto>>;

    /// Flag a photo as uploaded; the row and its content are kept
    async fn mark_synced(&self, id: &PhotoId) -> Result<()>;
}

/// libSQL implementation of `PhotoRepository`
pub struct LibSqlPhotoRepository<'a> {
    conn: &'a Connection,
}

const PHOTO_COLUMNS: &str =
    "id, inspection_id, caption, category, file_name, mime_type, content, synced, created_at";

impl<'a> LibSqlPhotoRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_photo(row: &Row) -> Result<UnsyncedPhoto> {
        let id: String = row.get(0)?;
        Ok(UnsyncedPhoto {
            id: id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid photo ID: {id}")))?,
            inspection_id: row.get(1)?,
            caption: row.get(2)?,
            category: row.get(3)?,
            file_name: row.get(4)?,
            mime_type: row.get(5)?,
            content: row.get(6)?,
            synced: row.get::<i32>(7)? != 0,
            created_at: row.get(8)?,
        })
    }

    async fn collect_photos(mut rows: Rows) -> Result<Vec<UnsyncedPhoto>> {
        let mut photos = Vec::new();
        while let Some(row) = rows.next().await? {
            photos.push(Self::parse_photo(&row)?);
        }
        Ok(photos)
    }
}

impl PhotoRepository for LibSqlPhotoRepository<'_> {
    async fn save(&self, photo: &UnsyncedPhoto) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO unsynced_photos
                     (id, inspection_id, caption, category, file_name, mime_type, content,
                      synced, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    photo.id.as_str(),
                    photo.inspection_id.clone(),
                    photo.caption.clone(),
                    photo.category.clone(),
                    photo.file_name.clone(),
                    photo.mime_type.clone(),
                    photo.content.clone(),
                    i32::from(photo.synced),
                    photo.created_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_unsynced(&self) -> Result<Vec<UnsyncedPhoto>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {PHOTO_COLUMNS} FROM unsynced_photos
                     WHERE synced = 0
                     ORDER BY created_at ASC, rowid ASC"
                ),
                (),
            )
            .await?;
        Self::collect_photos(rows).await
    }

    async fn list_for_inspection(&self, inspection_id: &str) -> Result<Vec<UnsyncedPhoto>> {
        let rows = self
            .conn
            .query(
                &format!(
                    "SELECT {PHOTO_COLUMNS} FROM unsynced_photos
                     WHERE inspection_id = ?
                     ORDER BY created_at ASC, rowid ASC"
                ),
                [inspection_id],
            )
            .await?;
        Self::collect_photos(rows).await
    }

    async fn mark_synced(&self, id: &PhotoId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE unsynced_photos SET synced = 1 WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::not_found("Photo", id));
        }
        Ok(())
    }
}
