use std::path::{Path, PathBuf};

use iisu_model::PlatformKey;
use tracing::{debug, warn};

const FALLBACK_EXTENSIONS: &[&str] = &[".png", ".PNG", ".jpg", ".jpeg"];

/// File stems tried for a platform's fallback icon, in order.
pub fn fallback_name_variants(platform: &PlatformKey) -> Vec<String> {
    let key = platform.as_str();
    let mut names: Vec<String> = Vec::new();
    for name in [
        key.to_string(),
        key.to_uppercase(),
        key.to_lowercase(),
        key.replace('_', " "),
        key.replace(' ', "_"),
    ] {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// First readable `{name}{ext}` across `dirs`, searched in order.
pub async fn find_fallback_icon(
    dirs: &[&Path],
    platform: &PlatformKey,
) -> Option<(PathBuf, Vec<u8>)> {
    let names = fallback_name_variants(platform);
    for dir in dirs {
        for name in &names {
            for ext in FALLBACK_EXTENSIONS {
                let path = dir.join(format!("{name}{ext}"));
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    continue;
                }
                match tokio::fs::read(&path).await {
                    Ok(bytes) => {
                        debug!("[fallback] using {}", path.display());
                        return Some((path, bytes));
                    }
                    Err(err) => warn!("[fallback] cannot read {}: {}", path.display(), err),
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_variants_are_unique() {
        assert_eq!(
            fallback_name_variants(&PlatformKey::new("GAME_BOY")),
            vec!["GAME_BOY", "game_boy", "GAME BOY"]
        );
    }

    #[tokio::test]
    async fn prefers_first_directory() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("nes.png"), b"second").unwrap();

        let platform = PlatformKey::new("NES");
        let (path, bytes) = find_fallback_icon(&[first.path(), second.path()], &platform)
            .await
            .unwrap();
        assert_eq!(path, second.path().join("nes.png"));
        assert_eq!(bytes, b"second");

        std::fs::write(first.path().join("NES.jpg"), b"first").unwrap();
        let (_, bytes) = find_fallback_icon(&[first.path(), second.path()], &platform)
            .await
            .unwrap();
        assert_eq!(bytes, b"first");

        assert!(find_fallback_icon(&[first.path()], &PlatformKey::new("PSP")).await.is_none());
    }
}
