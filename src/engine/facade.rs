// ── Limbic: Mood Engine Facade ─────────────────────────────────────────────
// The boundary external collaborators talk to. Sentiment sources and user
// corrections come in through `process_mood` / `provide_feedback`; dashboards
// and cloud sync consume `get_mood_analysis`; the scheduler drives
// `sync_tick` / `retrain_check_tick`.
//
// `MoodEngine` is Clone; clones share the same store and controller.
// Every mutating operation serializes behind the single store mutex —
// transition renormalization is not commutative across interleavings, so
// there is exactly one writer at a time.
//
// Contract: none of these methods return errors. Persistence and retraining
// problems are recovered (or rolled back) internally and logged; callers
// always get a well-formed answer.

use log::error;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::atoms::types::{Context, LimbicConfig, MoodAnalytics};
use crate::engine::persistence::{JsonFileStore, StateStore};
use crate::engine::prediction;
use crate::engine::retraining::{RetrainDecision, RetrainingController};
use crate::engine::store::MoodStore;

#[derive(Clone)]
pub struct MoodEngine {
    store: Arc<Mutex<MoodStore>>,
    controller: Arc<RetrainingController>,
    config: Arc<LimbicConfig>,
}

impl MoodEngine {
    /// Open the engine over the default JSON file backend rooted at
    /// `config.data_dir`.
    pub fn new(config: LimbicConfig) -> Self {
        let backend = Box::new(JsonFileStore::new(config.state_path()));
        Self::with_backend(backend, config)
    }

    /// Open the engine over a custom durable backend.
    pub fn with_backend(backend: Box<dyn StateStore>, config: LimbicConfig) -> Self {
        let store = MoodStore::open(backend);
        let controller = RetrainingController::new(config.model_dir(), config.keep_snapshots);
        Self {
            store: Arc::new(Mutex::new(store)),
            controller: Arc::new(controller),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &LimbicConfig {
        &self.config
    }

    // ── Signal ingestion ───────────────────────────────────────────────────

    /// Record an observed mood and hand it back for the caller to act on.
    pub fn process_mood(&self, mood: &str, context: Option<Context>) -> String {
        self.store.lock().remember_mood(mood, context);
        mood.to_string()
    }

    /// Record user feedback on a prediction of `mood`.
    pub fn provide_feedback(&self, mood: &str, is_correct: bool, context: Option<Context>) {
        self.store.lock().remember_feedback(mood, is_correct, context);
    }

    pub fn set_context_marker(&self, key: &str, value: serde_json::Value) {
        self.store.lock().set_context_marker(key, value);
    }

    // ── Reads ──────────────────────────────────────────────────────────────

    /// Read-only analytics snapshot; zeroed structure on an empty store.
    pub fn get_mood_analysis(&self) -> MoodAnalytics {
        let store = self.store.lock();
        prediction::mood_analytics(&store, &self.config.policy)
    }

    pub fn predict_next_mood(&self, current_mood: &str) -> String {
        let store = self.store.lock();
        prediction::predict_next_mood(&store, current_mood)
    }

    pub fn needs_retraining(&self) -> bool {
        let store = self.store.lock();
        prediction::needs_retraining(&store, &self.config.policy)
    }

    /// The mood `skip` entries back from the most recent.
    pub fn last_mood(&self, skip: usize) -> Option<String> {
        self.store.lock().get_last_mood(skip)
    }

    // ── Maintenance ────────────────────────────────────────────────────────

    pub fn compact(&self, keep_last: usize) {
        self.store.lock().compact(keep_last);
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    // ── Periodic hooks ─────────────────────────────────────────────────────
    // Driven by the scheduler (or any external timer). Both are idempotent
    // no-ops when there is nothing to do.

    /// Flush in-memory state to the durable backend. Also how a degraded
    /// store recovers once the disk comes back.
    pub fn sync_tick(&self) {
        let _ = self.store.lock().save();
    }

    /// Run one retraining cycle if the accuracy gate is open. Failures are
    /// rolled back and logged, never surfaced.
    pub fn retrain_check_tick(&self) -> RetrainDecision {
        let mut store = self.store.lock();
        match self.controller.run_cycle(&mut store, &self.config.policy) {
            Ok(report) => report.decision,
            Err(e) => {
                error!("[limbic:engine] Retrain cycle aborted: {}", e);
                RetrainDecision::Skipped
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Tests
// ═════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_in(dir: &std::path::Path) -> MoodEngine {
        MoodEngine::new(LimbicConfig::at(dir))
    }

    #[test]
    fn calm_excited_learning_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());

        assert_eq!(engine.process_mood("calm", None), "calm");
        engine.process_mood("excited", None);
        engine.process_mood("calm", None);

        let analytics = engine.get_mood_analysis();
        assert!(
            (analytics.transition_probabilities["calm"]["excited"] - 1.0).abs() < 1e-9
        );
        assert!(
            (analytics.transition_probabilities["excited"]["calm"] - 1.0).abs() < 1e-9
        );
        assert_eq!(engine.predict_next_mood("calm"), "excited");
    }

    #[test]
    fn analysis_never_fails_on_empty_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        let analytics = engine.get_mood_analysis();
        assert_eq!(analytics.total_samples, 0);
        assert!(!analytics.needs_retraining);
    }

    #[test]
    fn retrain_tick_is_noop_when_idle() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        assert_eq!(engine.retrain_check_tick(), RetrainDecision::NoOp);
        // Idempotent — a second tick changes nothing.
        assert_eq!(engine.retrain_check_tick(), RetrainDecision::NoOp);
    }

    #[test]
    fn retrain_tick_commits_on_degraded_accuracy() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        engine.process_mood("calm", None);
        engine.process_mood("excited", None);
        engine.provide_feedback("excited", true, None);
        for _ in 0..4 {
            engine.provide_feedback("excited", false, None);
        }

        assert!(engine.needs_retraining());
        assert_eq!(engine.retrain_check_tick(), RetrainDecision::Committed);
        assert!(engine.get_mood_analysis().overall_accuracy > 0.0);
        assert!(engine
            .config()
            .model_dir()
            .join(crate::atoms::constants::EMOTION_MODEL_FILE)
            .exists());
    }

    #[test]
    fn clones_share_state() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        let alias = engine.clone();

        engine.process_mood("calm", None);
        alias.process_mood("excited", None);

        assert_eq!(engine.last_mood(0).as_deref(), Some("excited"));
        assert_eq!(engine.last_mood(1).as_deref(), Some("calm"));
    }

    #[test]
    fn sync_tick_flushes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path());
        engine.process_mood("calm", None);
        engine.sync_tick();

        let reopened = engine_in(dir.path());
        assert_eq!(reopened.last_mood(0).as_deref(), Some("calm"));
    }
}
