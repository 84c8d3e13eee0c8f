//! Terminal artwork picker for interactive runs.

use async_trait::async_trait;
use dialoguer::Select;
use dialoguer::console::Term;
use iisu_core::job::ArtworkSelector;
use iisu_model::{ArtworkOption, PlatformKey, Selection};
use tracing::warn;

#[derive(Debug, Default)]
pub struct TerminalSelector;

fn option_label(option: &ArtworkOption) -> String {
    let dims = option
        .dimensions
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "?".to_string());
    let url = option.url.as_deref().unwrap_or("-");
    format!("{:<12} {:<24} {:>10}  {}", option.provider.as_str(), option.source.as_str(), dims, url)
}

/// Menu rows: every option, then skip and stop.
fn menu_items(options: &[ArtworkOption]) -> Vec<String> {
    let mut items: Vec<String> = options.iter().map(option_label).collect();
    items.push("Skip this title".to_string());
    items.push("Stop the run".to_string());
    items
}

fn to_selection(picked: Option<usize>, option_count: usize) -> Selection {
    match picked {
        Some(i) if i < option_count => Selection::Chosen(i),
        Some(i) if i == option_count => Selection::Skip,
        _ => Selection::CancelAll,
    }
}

#[async_trait]
impl ArtworkSelector for TerminalSelector {
    async fn select(
        &self,
        title: &str,
        platform: &PlatformKey,
        options: &[ArtworkOption],
    ) -> Selection {
        let prompt = format!("{platform}: {title}");
        let items = menu_items(options);
        let count = options.len();
        let picked = tokio::task::spawn_blocking(move || {
            Select::new()
                .with_prompt(prompt)
                .items(&items)
                .default(0)
                .interact_on_opt(&Term::stderr())
        })
        .await;
        match picked {
            Ok(Ok(choice)) => to_selection(choice, count),
            Ok(Err(err)) => {
                warn!("[select] prompt failed: {}", err);
                Selection::CancelAll
            }
            Err(err) => {
                warn!("[select] prompt task failed: {}", err);
                Selection::CancelAll
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iisu_model::{ArtworkKind, ProviderId, SourceTag};

    #[test]
    fn trailing_rows_mean_skip_and_stop() {
        let option = ArtworkOption::new(
            ProviderId::Libretro,
            SourceTag::new(SourceTag::LIBRETRO_BOXART),
            ArtworkKind::Icon,
            vec![1u8, 2, 3],
        )
        .with_url("https://example.invalid/a.png");
        let items = menu_items(std::slice::from_ref(&option));
        assert_eq!(items.len(), 3);
        assert!(items[0].contains("libretro"));
        assert!(items[0].contains("a.png"));

        assert_eq!(to_selection(Some(0), 1), Selection::Chosen(0));
        assert_eq!(to_selection(Some(1), 1), Selection::Skip);
        assert_eq!(to_selection(Some(2), 1), Selection::CancelAll);
        assert_eq!(to_selection(None, 1), Selection::CancelAll);
    }
}
