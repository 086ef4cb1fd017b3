//! Repository Mining Pipeline
//!
//! Walks a page-object source tree and upserts one atomic action per public
//! action method. Failures are recorded per file or per method and the pass
//! continues; actions stored before a failure stay stored.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use actionkb_common::{AtomicAction, KbError, Result};

use super::extractor::{extract, MethodSignature, SourceLanguage};
use super::path_rules::{brand_for, platform_for, target_screen_for};
use super::scanner::{scan, SourceFile};
use crate::config::MiningSettings;
use crate::domain::collection::Upserted;
use crate::domain::knowledge_base::{stable_id, KnowledgeBase};
use crate::domain::text::{identifier_keywords, to_snake_case};

/// A non-fatal failure during mining
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiningError {
    /// Relative path of the file, or the walk location
    pub location: String,
    pub message: String,
}

/// Outcome of one mining pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MiningStats {
    pub files_scanned: usize,
    pub methods_found: usize,
    pub actions_created: usize,
    pub actions_updated: usize,
    pub errors: Vec<MiningError>,
}

impl MiningStats {
    fn record_error(&mut self, location: impl Into<String>, message: impl ToString) {
        let error = MiningError {
            location: location.into(),
            message: message.to_string(),
        };
        warn!(location = %error.location, "mining error: {}", error.message);
        self.errors.push(error);
    }
}

/// Populates the atomic collection from source code
pub struct RepositoryMiner {
    kb: Arc<KnowledgeBase>,
    settings: MiningSettings,
}

impl RepositoryMiner {
    pub fn new(kb: Arc<KnowledgeBase>, settings: MiningSettings) -> Self {
        Self { kb, settings }
    }

    /// Mine every eligible file under `root`
    ///
    /// Fails only when `root` is not a readable directory.
    #[instrument(skip(self, root), fields(root = %root.display()))]
    pub async fn mine(&self, root: &Path) -> Result<MiningStats> {
        if !root.is_dir() {
            return Err(KbError::Io(format!("not a directory: {}", root.display())));
        }

        let walk_root: PathBuf = root.to_path_buf();
        let settings = self.settings.clone();
        let outcome = tokio::task::spawn_blocking(move || scan(&walk_root, &settings))
            .await
            .map_err(|e| KbError::Internal(format!("source walk failed: {}", e)))?;

        let mut stats = MiningStats::default();
        for message in outcome.errors {
            stats.record_error(root.display().to_string(), message);
        }

        for file in &outcome.files {
            stats.files_scanned += 1;
            if let Err(e) = self.mine_file(file, &mut stats).await {
                stats.record_error(file.relative_path.clone(), e);
            }
        }

        info!(
            files = stats.files_scanned,
            methods = stats.methods_found,
            created = stats.actions_created,
            updated = stats.actions_updated,
            errors = stats.errors.len(),
            "mining complete"
        );
        Ok(stats)
    }

    /// Clear the atomic collection, then mine `root` from scratch
    pub async fn reindex(&self, root: &Path) -> Result<MiningStats> {
        self.kb.atomic_actions().clear().await?;
        info!("atomic actions cleared for reindex");
        self.mine(root).await
    }

    async fn mine_file(&self, file: &SourceFile, stats: &mut MiningStats) -> Result<()> {
        let source = tokio::fs::read_to_string(&file.path).await?;
        let language = file
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(SourceLanguage::Java, SourceLanguage::from_extension);

        let Some(class) = extract(&source, language) else {
            debug!(file = %file.relative_path, "no class declaration");
            return Ok(());
        };

        stats.methods_found += class.methods.len();
        for method in &class.methods {
            let action = self.build_action(file, &class.class_name, method);
            match self.kb.add_atomic_action(&action).await {
                Ok(Upserted::Created) => stats.actions_created += 1,
                Ok(Upserted::Updated) => stats.actions_updated += 1,
                Err(e) => stats.record_error(
                    format!("{}::{}", file.relative_path, method.name),
                    e,
                ),
            }
        }
        Ok(())
    }

    fn build_action(&self, file: &SourceFile, class_name: &str, method: &MethodSignature) -> AtomicAction {
        let key = format!(
            "{}::{}.{}/{}",
            file.relative_path,
            class_name,
            method.name,
            method.parameters.len()
        );
        let keywords = self
            .kb
            .synonyms()
            .expand_keywords(identifier_keywords(&method.name));

        let mut action = AtomicAction::new(
            stable_id("atomic", &key),
            to_snake_case(&method.name),
            method.name.clone(),
            class_name,
        )
        .with_keywords(keywords)
        .with_classification(platform_for(&file.relative_path), brand_for(&file.relative_path))
        .with_location(file.path.display().to_string(), file.relative_path.clone())
        .with_signature(method.return_type.clone(), method.parameters.clone())
        .with_confidence(self.settings.default_confidence);

        if let Some(screen) = target_screen_for(class_name) {
            action = action.with_target_screen(screen);
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::config::KbConfig;
    use actionkb_common::{Brand, Platform};

    const PLAYER_SCREEN: &str = r#"
public class PlayerScreen {
    public void clickPlayButton() {}
    public void skipIntro(int seconds) {}
    public String getTitle() { return ""; }
}
"#;

    async fn miner() -> RepositoryMiner {
        let kb = KnowledgeBase::in_memory(&KbConfig::default()).await.unwrap();
        RepositoryMiner::new(Arc::new(kb), MiningSettings::default())
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_mine_page_object_tree() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ctvscreens/pplus/PlayerScreen.java", PLAYER_SCREEN);
        write(dir.path(), "util/Strings.java", "public class Strings { public void trimAll() {} }");

        let miner = miner().await;
        let stats = miner.mine(dir.path()).await.unwrap();

        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.methods_found, 2);
        assert_eq!(stats.actions_created, 2);
        assert!(stats.errors.is_empty());

        let hits = miner
            .kb
            .atomic_actions()
            .query("click play button", 1, None)
            .await
            .unwrap();
        let action = &hits[0].entity;
        assert_eq!(action.action_name, "click_play_button");
        assert_eq!(action.platform, Platform::Ctv);
        assert_eq!(action.brand, Brand::Pplus);
        assert_eq!(action.target_screen.as_deref(), Some("player"));
        assert_eq!(action.relative_path, "ctvscreens/pplus/PlayerScreen.java");
        assert_eq!(action.confidence, 0.8);
        for keyword in ["click", "play", "button", "tap", "press"] {
            assert!(action.keywords.contains(keyword), "missing {}", keyword);
        }
    }

    #[tokio::test]
    async fn test_remining_upserts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ctvscreens/pplus/PlayerScreen.java", PLAYER_SCREEN);

        let miner = miner().await;
        miner.mine(dir.path()).await.unwrap();
        let second = miner.mine(dir.path()).await.unwrap();

        assert_eq!(second.actions_created, 0);
        assert_eq!(second.actions_updated, 2);
        assert_eq!(miner.kb.stats().await.unwrap().atomic_actions, 2);
    }

    #[tokio::test]
    async fn test_unreadable_file_does_not_stop_mining() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/BrokenScreen.java", "");
        fs::write(dir.path().join("a/BrokenScreen.java"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        write(dir.path(), "b/PlayerScreen.java", PLAYER_SCREEN);

        let stats = miner().await.mine(dir.path()).await.unwrap();

        assert_eq!(stats.files_scanned, 2);
        assert_eq!(stats.errors.len(), 1);
        assert_eq!(stats.errors[0].location, "a/BrokenScreen.java");
        assert_eq!(stats.actions_created, 2);
    }

    #[tokio::test]
    async fn test_reindex_drops_stale_actions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "PlayerScreen.java", PLAYER_SCREEN);

        let miner = miner().await;
        miner.mine(dir.path()).await.unwrap();
        miner
            .kb
            .add_atomic_action(&AtomicAction::new("manual", "open_menu", "openMenu", "MenuScreen"))
            .await
            .unwrap();

        let stats = miner.reindex(dir.path()).await.unwrap();
        assert_eq!(stats.actions_created, 2);
        assert_eq!(miner.kb.stats().await.unwrap().atomic_actions, 2);
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let err = miner().await.mine(Path::new("/definitely/not/here")).await.unwrap_err();
        assert!(matches!(err, KbError::Io(_)));
    }
}
