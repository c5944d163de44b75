use std::path::Path;

use fieldkit_core::models::{photo_mime_type, PhotoId, UnsyncedPhoto};

use crate::commands::common::{format_photo_lines, open_database};
use crate::error::CliError;

pub async fn run_photo_add(
    path: &Path,
    inspection_id: &str,
    caption: Option<&str>,
    category: Option<&str>,
    db_path: &Path,
) -> Result<PhotoId, CliError> {
    let content = std::fs::read(path)?;
    if content.is_empty() {
        return Err(CliError::EmptyPhoto(path.display().to_string()));
    }
    let file_name = path
        .file_name()
        .map_or_else(|| "photo".to_string(), |name| name.to_string_lossy().into_owned());

    let mut photo = UnsyncedPhoto::new(
        inspection_id,
        file_name.as_str(),
        photo_mime_type(&file_name),
        content,
    )?;
    if let Some(caption) = caption {
        photo = photo.with_caption(caption);
    }
    if let Some(category) = category {
        photo = photo.with_category(category);
    }

    let db = open_database(db_path).await?;
    db.save_photo(&photo).await?;
    println!("{}", photo.id);
    Ok(photo.id)
}

pub async fn run_photo_list(
    inspection_id: Option<&str>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let photos = match inspection_id {
        Some(inspection_id) => db.list_photos(inspection_id.trim()).await?,
        None => db.list_unsynced_photos().await?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&photos)?);
        return Ok(());
    }

    if photos.is_empty() {
        println!("No photos.");
        return Ok(());
    }

    for line in format_photo_lines(&photos) {
        println!("{line}");
    }
    Ok(())
}
