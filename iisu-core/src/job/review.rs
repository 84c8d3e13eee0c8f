use std::path::{Path, PathBuf};

use iisu_model::{ReviewKind, ReviewRecord};

use crate::error::Result;

/// Write `record` to `{review_dir}/{slug}{suffix}.json`.
pub async fn write_review(
    review_dir: &Path,
    slug: &str,
    kind: ReviewKind,
    record: &ReviewRecord,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(review_dir).await?;
    let path = review_dir.join(kind.file_name(slug));
    let body = serde_json::to_vec_pretty(record)?;
    tokio::fs::write(&path, body).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_pretty_json_with_kind_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let record = ReviewRecord::new("Metroid", "NES").with_error("no art found from any provider");
        let path = write_review(&dir.path().join("nes"), "Metroid", ReviewKind::NoArt, &record)
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "Metroid__no_art.json");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"title\": \"Metroid\""));
        let back: ReviewRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }
}
