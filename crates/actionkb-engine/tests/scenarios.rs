//! End-to-end tests for the action knowledge base
//!
//! Runs the public API against the in-process store:
//! - synonym matching of atomic actions
//! - composite expansion with unmapped steps
//! - taught terminology
//! - repository mining

use std::fs;
use std::sync::Arc;

use actionkb_common::{AtomicAction, Brand, CompositeAction, CompositeStep, Platform};
use actionkb_engine::{
    ActionFilters, CompositeResolver, KbConfig, KnowledgeBase, MatchingEngine, RepositoryMiner,
    TranslationSource, Upserted,
};

/// Shared setup for one test
struct TestHarness {
    kb: Arc<KnowledgeBase>,
    engine: MatchingEngine,
    config: KbConfig,
}

impl TestHarness {
    async fn new() -> Self {
        let config = KbConfig::default();
        let kb = Arc::new(KnowledgeBase::in_memory(&config).await.unwrap());
        let engine = MatchingEngine::new(Arc::clone(&kb), config.matching.clone());
        Self { kb, engine, config }
    }

    fn resolver(&self) -> CompositeResolver {
        CompositeResolver::new(self.engine.clone())
    }

    fn miner(&self) -> RepositoryMiner {
        RepositoryMiner::new(Arc::clone(&self.kb), self.config.mining.clone())
    }
}

fn play_button() -> AtomicAction {
    AtomicAction::new("a1", "click_play_button", "clickPlayButton", "PlayerScreen")
        .with_keywords(["click", "play", "button"])
}

#[tokio::test]
async fn test_synonym_query_resolves_atomic_action() {
    let harness = TestHarness::new().await;
    harness.kb.add_atomic_action(&play_button()).await.unwrap();

    let result = harness
        .engine
        .find_atomic_action("tap play", &ActionFilters::none(), None)
        .await
        .unwrap();

    assert!(result.found);
    assert_eq!(result.best_match().unwrap().entity.id, "a1");
    assert!(result.candidates.iter().all(|c| (0.0..=1.0).contains(&c.confidence)));
}

#[tokio::test]
async fn test_composite_with_unresolvable_step() {
    let harness = TestHarness::new().await;
    harness.kb.add_atomic_action(&play_button()).await.unwrap();

    let composite = CompositeAction::new("c1", "play_after_buffer", "start playback once buffered")
        .with_step(CompositeStep::new("click_play_button", 1))
        .with_step(CompositeStep::new("wait_for_buffer_to_clear", 2));
    harness.kb.add_composite_action(&composite).await.unwrap();

    let expanded = harness.resolver().expand_composite_action("c1").await.unwrap();

    assert_eq!(expanded.steps.len(), 2);
    assert!(expanded.has_unmapped_steps);
    assert!(!expanded.steps[0].is_unmapped());
    assert!(expanded.steps[1].is_unmapped());
    assert_eq!(expanded.steps[1].phrase(), "wait_for_buffer_to_clear");
    assert_eq!(expanded.steps[1].order(), 2);
}

#[tokio::test]
async fn test_taught_synonym_translates() {
    let harness = TestHarness::new().await;
    harness
        .kb
        .learn_from_user(
            "skip intro",
            vec!["click_skip_button".to_string()],
            vec!["bypass intro".to_string()],
            "",
        )
        .await
        .unwrap();

    let translation = harness.engine.translate_user_term("bypass intro").await.unwrap();

    assert!(translation.found);
    assert_eq!(translation.expands_to, vec!["click_skip_button"]);
    assert_eq!(translation.source, Some(TranslationSource::LearnedTerminology));
    assert_eq!(translation.source.unwrap().as_str(), "learned_terminology");
}

#[tokio::test]
async fn test_weak_lookups_are_rejected_but_surfaced() {
    let harness = TestHarness::new().await;
    let matching = &harness.config.matching;
    harness.kb.add_atomic_action(&play_button()).await.unwrap();
    harness
        .kb
        .add_composite_action(&CompositeAction::new("c1", "start_playback", "open player and play video"))
        .await
        .unwrap();
    harness
        .kb
        .learn_from_user("skip intro", vec!["click_skip_button".to_string()], vec![], "")
        .await
        .unwrap();

    let atomic = harness
        .engine
        .find_atomic_action("click pause", &ActionFilters::none(), None)
        .await
        .unwrap();
    assert!(!atomic.found);
    assert!(atomic.best_candidate().unwrap().confidence <= matching.atomic_threshold);

    let composite = harness.engine.find_composite_action("video", None).await.unwrap();
    assert!(!composite.found);
    assert_eq!(composite.best_candidate().unwrap().entity.id, "c1");
    assert!(composite.best_candidate().unwrap().distance >= matching.composite_max_distance);

    let translation = harness.engine.translate_user_term("intro").await.unwrap();
    assert!(!translation.found);
    assert_ne!(translation.source, Some(TranslationSource::LearnedTerminology));
}

#[tokio::test]
async fn test_mining_classifies_page_object() {
    let harness = TestHarness::new().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("src/ctvscreens/pplus/PlayerScreen.java");
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(
        &file,
        "public class PlayerScreen {\n    public void clickPlayButton() {\n    }\n}\n",
    )
    .unwrap();

    let stats = harness.miner().mine(dir.path()).await.unwrap();
    assert_eq!(stats.files_scanned, 1);
    assert_eq!(stats.actions_created, 1);

    let filters = ActionFilters::none().platform(Platform::Ctv).brand(Brand::Pplus).screen("player");
    let result = harness
        .engine
        .find_atomic_action("click play button", &filters, None)
        .await
        .unwrap();
    let action = &result.best_match().unwrap().entity;

    assert_eq!(action.platform, Platform::Ctv);
    assert_eq!(action.brand, Brand::Pplus);
    assert_eq!(action.target_screen.as_deref(), Some("player"));
    for keyword in ["click", "play", "button", "tap", "press", "resume"] {
        assert!(action.keywords.contains(keyword), "missing keyword {}", keyword);
    }
}

#[tokio::test]
async fn test_duplicate_add_keeps_one_entity_with_newest_values() {
    let harness = TestHarness::new().await;
    harness.kb.add_atomic_action(&play_button()).await.unwrap();
    let before = harness.kb.stats().await.unwrap().atomic_actions;

    let newer = play_button().with_classification(Platform::Web, Brand::None);
    assert_eq!(harness.kb.add_atomic_action(&newer).await.unwrap(), Upserted::Updated);

    assert_eq!(harness.kb.stats().await.unwrap().atomic_actions, before);
    let stored = harness.kb.atomic_actions().get_one("a1").await.unwrap();
    assert_eq!(stored.platform, Platform::Web);
}

#[tokio::test]
async fn test_usage_increments_every_entity_kind() {
    let harness = TestHarness::new().await;
    let kb = &harness.kb;
    kb.add_atomic_action(&play_button()).await.unwrap();
    kb.add_composite_action(&CompositeAction::new("c1", "start_playback", "").push_step("click_play_button"))
        .await
        .unwrap();
    let term = kb
        .learn_from_user("skip intro", vec!["click_skip_button".into()], vec![], "")
        .await
        .unwrap();

    let atomic_before = kb.atomic_actions().get_one("a1").await.unwrap();
    let atomic_after = kb.record_atomic_usage("a1").await.unwrap();
    assert_eq!(atomic_after.usage_count, atomic_before.usage_count + 1);
    assert!(atomic_after.last_used_at > atomic_before.last_used_at);

    let first = kb.record_composite_usage("c1").await.unwrap();
    let second = kb.record_composite_usage("c1").await.unwrap();
    assert_eq!(second.usage_count, first.usage_count + 1);
    assert!(second.last_used_at.unwrap() > first.last_used_at.unwrap());

    let term_after = kb.record_term_usage(&term.id).await.unwrap();
    assert_eq!(term_after.usage_count, term.usage_count + 1);
}

#[tokio::test]
async fn test_concurrent_adds_of_distinct_ids() {
    let harness = TestHarness::new().await;
    let adds = (0..32).map(|i| {
        let kb = Arc::clone(&harness.kb);
        tokio::spawn(async move {
            let action = AtomicAction::new(
                format!("a{}", i),
                format!("click_button_{}", i),
                format!("clickButton{}", i),
                "MenuScreen",
            );
            kb.add_atomic_action(&action).await
        })
    });

    for handle in futures::future::join_all(adds).await {
        assert_eq!(handle.unwrap().unwrap(), Upserted::Created);
    }
    assert_eq!(harness.kb.stats().await.unwrap().atomic_actions, 32);
}
