// ── Limbic: Mood Store ─────────────────────────────────────────────────────
// Durable, ordered record of mood observations, feedback, and learning
// metrics — the source of truth for everything above it.
//
// Resilience contract:
//   • Load failure or corruption falls back to an empty well-formed state
//     (logged as a warning) rather than failing startup.
//   • Save failure is logged and the store keeps operating in-memory
//     (degraded mode); the next successful save clears the flag. Prediction
//     quality degrades gracefully, the process never crashes over disk state.
//
// Ordering invariants: observation and feedback lists are append-only and
// never reordered. Compaction drops oldest entries only.

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;

use crate::atoms::error::CoreResult;
use crate::atoms::types::{
    Context, FeedbackEvent, LearningMetrics, MoodObservation, MoodState,
};
use crate::engine::persistence::StateStore;
use crate::engine::transitions::TransitionModel;

pub struct MoodStore {
    state: MoodState,
    transitions: TransitionModel,
    backend: Option<Box<dyn StateStore>>,
    /// Set while the last save failed; cleared by the next successful save.
    degraded: bool,
}

impl MoodStore {
    /// Open a store over a durable backend, falling back to an empty state
    /// if the backend cannot produce one.
    pub fn open(backend: Box<dyn StateStore>) -> Self {
        let state = match backend.load() {
            Ok(state) => {
                info!(
                    "[limbic:store] Loaded {} observations, {} feedback events from {}",
                    state.mood_history.len(),
                    state.user_feedback.len(),
                    backend.describe()
                );
                state
            }
            Err(e) => {
                warn!(
                    "[limbic:store] Could not load state from {} ({}); starting empty",
                    backend.describe(),
                    e
                );
                MoodState::default()
            }
        };

        let mut transitions = TransitionModel::from_table(state.transition_probabilities.clone());
        if transitions.is_empty() && state.mood_history.len() > 1 {
            // Older or hand-edited state files carry history but no table —
            // replay the history through the online update to recover it.
            transitions.rebuild_from_history(&state.mood_history);
            info!(
                "[limbic:store] Rebuilt transition table from {} observations",
                state.mood_history.len()
            );
        }

        Self {
            state,
            transitions,
            backend: Some(backend),
            degraded: false,
        }
    }

    /// Purely in-memory store. Used by tests and by hosts that own
    /// persistence themselves.
    pub fn in_memory() -> Self {
        Self {
            state: MoodState::default(),
            transitions: TransitionModel::new(),
            backend: None,
            degraded: false,
        }
    }

    // ── Observations ───────────────────────────────────────────────────────

    /// Append a mood observation stamped with the current time.
    pub fn remember_mood(&mut self, mood: &str, context: Option<Context>) {
        self.remember_mood_at(mood, context, Utc::now());
    }

    /// Timestamped variant for imports and backfill. Appends without
    /// reordering — callers are expected to feed events in order.
    pub fn remember_mood_at(&mut self, mood: &str, context: Option<Context>, at: DateTime<Utc>) {
        if let Some(previous) = self.get_last_mood(0) {
            self.transitions.observe(&previous, mood);
        }

        self.state.mood_history.push(MoodObservation {
            timestamp: at,
            mood: mood.to_string(),
            context: context.unwrap_or_default(),
        });

        self.persist();
    }

    // ── Feedback ───────────────────────────────────────────────────────────

    /// Record user feedback on a prediction of `mood` and update the running
    /// metrics. Any mood label is accepted, observed before or not — the
    /// vocabulary is an open string space.
    pub fn remember_feedback(&mut self, mood: &str, correct: bool, context: Option<Context>) {
        self.remember_feedback_at(mood, correct, context, Utc::now());
    }

    /// Timestamped variant for imports and backfill.
    pub fn remember_feedback_at(
        &mut self,
        mood: &str,
        correct: bool,
        context: Option<Context>,
        at: DateTime<Utc>,
    ) {
        self.state.user_feedback.push(FeedbackEvent {
            timestamp: at,
            mood: mood.to_string(),
            correct,
            context: context.unwrap_or_default(),
        });

        self.state.learning_metrics.total_predictions += 1;
        if correct {
            self.state.learning_metrics.correct_predictions += 1;
        }

        self.persist();
    }

    // ── Queries ────────────────────────────────────────────────────────────

    /// The mood `skip` entries back from the most recent; `None` if the
    /// history is shorter than `skip + 1`.
    pub fn get_last_mood(&self, skip: usize) -> Option<String> {
        let history = &self.state.mood_history;
        if history.len() > skip {
            Some(history[history.len() - 1 - skip].mood.clone())
        } else {
            None
        }
    }

    pub fn history(&self) -> &[MoodObservation] {
        &self.state.mood_history
    }

    pub fn feedback(&self) -> &[FeedbackEvent] {
        &self.state.user_feedback
    }

    pub fn metrics(&self) -> &LearningMetrics {
        &self.state.learning_metrics
    }

    pub fn transitions(&self) -> &TransitionModel {
        &self.transitions
    }

    pub fn observation_count(&self) -> usize {
        self.state.mood_history.len()
    }

    pub fn feedback_count(&self) -> usize {
        self.state.user_feedback.len()
    }

    /// Observation counts per mood label.
    pub fn mood_distribution(&self) -> HashMap<String, u64> {
        let mut distribution: HashMap<String, u64> = HashMap::new();
        for observation in &self.state.mood_history {
            *distribution.entry(observation.mood.clone()).or_insert(0) += 1;
        }
        distribution
    }

    /// Whether the last save attempt failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    // ── Context markers ────────────────────────────────────────────────────

    pub fn set_context_marker(&mut self, key: &str, value: serde_json::Value) {
        self.state.context_markers.insert(key.to_string(), value);
        self.persist();
    }

    pub fn context_marker(&self, key: &str) -> Option<&serde_json::Value> {
        self.state.context_markers.get(key)
    }

    // ── Maintenance ────────────────────────────────────────────────────────

    /// Drop the oldest observations and feedback beyond `keep_last` each.
    /// Remaining entries keep their original order; metrics are untouched.
    pub fn compact(&mut self, keep_last: usize) {
        let dropped_obs = self.state.mood_history.len().saturating_sub(keep_last);
        if dropped_obs > 0 {
            self.state.mood_history.drain(..dropped_obs);
        }
        let dropped_fb = self.state.user_feedback.len().saturating_sub(keep_last);
        if dropped_fb > 0 {
            self.state.user_feedback.drain(..dropped_fb);
        }
        if dropped_obs + dropped_fb > 0 {
            info!(
                "[limbic:store] Compacted {} observations, {} feedback events",
                dropped_obs, dropped_fb
            );
            self.persist();
        }
    }

    /// Explicit whole-store reset to the empty well-formed default.
    pub fn clear(&mut self) {
        self.state = MoodState::default();
        self.transitions = TransitionModel::new();
        self.persist();
        info!("[limbic:store] Store cleared");
    }

    // ── Persistence ────────────────────────────────────────────────────────

    /// Write the full state to the backend. Exposed for explicit sync ticks;
    /// mutating operations already call it internally.
    pub fn save(&mut self) -> CoreResult<()> {
        self.state.transition_probabilities = self.transitions.table().clone();
        let Some(backend) = &self.backend else {
            return Ok(()); // in-memory store, nothing to do
        };
        let result = backend.save(&self.state);
        match &result {
            Ok(()) => {
                if self.degraded {
                    info!("[limbic:store] Persistence recovered");
                    self.degraded = false;
                }
            }
            Err(e) => {
                warn!(
                    "[limbic:store] Save to {} failed ({}); continuing in-memory",
                    backend.describe(),
                    e
                );
                self.degraded = true;
            }
        }
        result
    }

    /// Save-and-swallow used by mutating operations: failure is logged and
    /// flagged, never surfaced to the caller.
    fn persist(&mut self) {
        let _ = self.save();
    }

    // ── Retraining hooks ───────────────────────────────────────────────────
    // Used by the RetrainingController for snapshot and rollback. The table
    // stays exclusively owned by the TransitionModel.

    pub(crate) fn snapshot_state(&self) -> (crate::atoms::types::TransitionTable, LearningMetrics) {
        (
            self.transitions.table().clone(),
            self.state.learning_metrics.clone(),
        )
    }

    pub(crate) fn restore_state(
        &mut self,
        table: crate::atoms::types::TransitionTable,
        metrics: LearningMetrics,
    ) {
        self.transitions = TransitionModel::from_table(table);
        self.state.learning_metrics = metrics;
        self.persist();
    }

    pub(crate) fn mark_retrained(&mut self, at: DateTime<Utc>) {
        self.state.learning_metrics.last_retrain = Some(at);
        self.persist();
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Tests
// ═════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::{CoreError, CoreResult};
    use crate::engine::persistence::JsonFileStore;

    #[test]
    fn last_mood_with_skip() {
        let mut store = MoodStore::in_memory();
        assert_eq!(store.get_last_mood(0), None);

        store.remember_mood("calm", None);
        store.remember_mood("excited", None);
        store.remember_mood("tired", None);

        assert_eq!(store.get_last_mood(0).as_deref(), Some("tired"));
        assert_eq!(store.get_last_mood(1).as_deref(), Some("excited"));
        assert_eq!(store.get_last_mood(2).as_deref(), Some("calm"));
        assert_eq!(store.get_last_mood(3), None);
    }

    #[test]
    fn observations_drive_transitions() {
        let mut store = MoodStore::in_memory();
        store.remember_mood("calm", None);
        store.remember_mood("excited", None);

        assert!((store.transitions().probability("calm", "excited") - 1.0).abs() < 1e-9);

        store.remember_mood("calm", None);
        assert!((store.transitions().probability("excited", "calm") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn feedback_updates_metrics() {
        let mut store = MoodStore::in_memory();
        store.remember_feedback("calm", true, None);
        store.remember_feedback("calm", false, None);
        store.remember_feedback("excited", true, None);

        let metrics = store.metrics();
        assert_eq!(metrics.total_predictions, 3);
        assert_eq!(metrics.correct_predictions, 2);
        assert!(metrics.correct_predictions <= metrics.total_predictions);
    }

    #[test]
    fn feedback_for_unseen_mood_is_accepted() {
        // Mood labels are an open string space — no vocabulary validation.
        let mut store = MoodStore::in_memory();
        store.remember_feedback("never-observed", false, None);
        assert_eq!(store.feedback_count(), 1);
        assert_eq!(store.feedback()[0].mood, "never-observed");
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mood_state.json");

        let mut store = MoodStore::open(Box::new(JsonFileStore::new(&path)));
        store.remember_mood("calm", None);
        store.remember_mood("excited", None);
        store.remember_feedback("excited", true, None);
        store.set_context_marker("session", serde_json::json!("morning"));

        let reloaded = MoodStore::open(Box::new(JsonFileStore::new(&path)));
        assert_eq!(reloaded.observation_count(), 2);
        assert_eq!(reloaded.history()[0].mood, "calm");
        assert_eq!(reloaded.history()[1].mood, "excited");
        assert_eq!(reloaded.feedback_count(), 1);
        assert_eq!(reloaded.metrics().total_predictions, 1);
        assert_eq!(reloaded.metrics().correct_predictions, 1);
        assert_eq!(
            reloaded.context_marker("session"),
            Some(&serde_json::json!("morning"))
        );
        assert!((reloaded.transitions().probability("calm", "excited") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn corrupt_state_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mood_state.json");
        std::fs::write(&path, "{ definitely not json").unwrap();

        let store = MoodStore::open(Box::new(JsonFileStore::new(&path)));
        assert_eq!(store.observation_count(), 0);
        assert_eq!(store.metrics().total_predictions, 0);
    }

    #[test]
    fn compaction_keeps_newest_in_order() {
        let mut store = MoodStore::in_memory();
        for mood in ["a", "b", "c", "d", "e"] {
            store.remember_mood(mood, None);
        }
        store.compact(2);

        assert_eq!(store.observation_count(), 2);
        assert_eq!(store.history()[0].mood, "d");
        assert_eq!(store.history()[1].mood, "e");
    }

    #[test]
    fn clear_resets_everything() {
        let mut store = MoodStore::in_memory();
        store.remember_mood("calm", None);
        store.remember_mood("excited", None);
        store.remember_feedback("excited", true, None);

        store.clear();
        assert_eq!(store.observation_count(), 0);
        assert_eq!(store.feedback_count(), 0);
        assert_eq!(store.metrics().total_predictions, 0);
        assert!(store.transitions().is_empty());
    }

    struct FailingStore;

    impl StateStore for FailingStore {
        fn load(&self) -> CoreResult<MoodState> {
            Err(CoreError::Persistence("disk on fire".into()))
        }
        fn save(&self, _state: &MoodState) -> CoreResult<()> {
            Err(CoreError::Persistence("disk on fire".into()))
        }
        fn describe(&self) -> String {
            "failing-store".into()
        }
    }

    #[test]
    fn failing_backend_degrades_but_keeps_working() {
        let mut store = MoodStore::open(Box::new(FailingStore));
        store.remember_mood("calm", None);
        store.remember_mood("excited", None);

        assert!(store.is_degraded());
        assert_eq!(store.observation_count(), 2);
        assert_eq!(store.transitions().predict_next("calm"), "excited");
    }

    #[test]
    fn table_rebuilt_from_history_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mood_state.json");
        // A legacy-shaped file: history present, no transition table.
        std::fs::write(
            &path,
            serde_json::json!({
                "mood_history": [
                    {"timestamp": "2026-08-01T08:00:00Z", "mood": "calm", "context": {}},
                    {"timestamp": "2026-08-01T09:00:00Z", "mood": "excited", "context": {}},
                    {"timestamp": "2026-08-01T10:00:00Z", "mood": "calm", "context": {}}
                ]
            })
            .to_string(),
        )
        .unwrap();

        let store = MoodStore::open(Box::new(JsonFileStore::new(&path)));
        assert!((store.transitions().probability("calm", "excited") - 1.0).abs() < 1e-9);
        assert!((store.transitions().probability("excited", "calm") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mood_distribution_counts_labels() {
        let mut store = MoodStore::in_memory();
        for mood in ["calm", "excited", "calm", "calm"] {
            store.remember_mood(mood, None);
        }
        let distribution = store.mood_distribution();
        assert_eq!(distribution.get("calm"), Some(&3));
        assert_eq!(distribution.get("excited"), Some(&1));
    }
}
