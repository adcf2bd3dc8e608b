// ── Limbic Atoms: Core Types ───────────────────────────────────────────────
// Persisted state, model artifacts, analytics, and configuration.
//
// Vocabulary note: moods are open strings, not an enum. The engine stores and
// learns over whatever labels the host emits ("calm", "excited", "focused",
// …) and never validates them against a fixed set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::atoms::constants::*;

/// Opaque auxiliary metadata attached to observations and feedback.
/// Stored and round-tripped verbatim; never interpreted by the core.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Row-major transition table: from_mood → (to_mood → probability).
/// Every row with at least one outgoing transition sums to 1.0.
pub type TransitionTable = HashMap<String, HashMap<String, f64>>;

// ═════════════════════════════════════════════════════════════════════════════
// Persisted state
// ═════════════════════════════════════════════════════════════════════════════

/// A single observed mood. Append-only; never mutated once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodObservation {
    pub timestamp: DateTime<Utc>,
    pub mood: String,
    #[serde(default)]
    pub context: Context,
}

/// User feedback on a prediction of `mood`. Append-only.
///
/// There is no foreign key to the prediction being evaluated — feedback
/// conceptually references "the most recent prediction of that mood".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub timestamp: DateTime<Utc>,
    pub mood: String,
    /// Whether the prediction was right. Serialized as `feedback` for
    /// compatibility with the original on-disk layout.
    #[serde(rename = "feedback")]
    pub correct: bool,
    #[serde(default)]
    pub context: Context,
}

/// Running prediction-quality counters.
/// Invariant: `correct_predictions <= total_predictions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningMetrics {
    #[serde(default)]
    pub total_predictions: u64,
    #[serde(default)]
    pub correct_predictions: u64,
    /// Set only by a committed retrain cycle.
    #[serde(default, rename = "last_retrain")]
    pub last_retrain: Option<DateTime<Utc>>,
}

impl LearningMetrics {
    /// Lifetime accuracy; 0.0 when no predictions have been scored yet.
    pub fn overall_accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct_predictions as f64 / self.total_predictions as f64
        }
    }
}

/// The serialized root of the mood store (`mood_state.json`).
///
/// Every field tolerates absence so that truncated or older files still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoodState {
    #[serde(default)]
    pub mood_history: Vec<MoodObservation>,
    #[serde(default)]
    pub user_feedback: Vec<FeedbackEvent>,
    /// Opaque side-band markers the host attaches to the store.
    #[serde(default)]
    pub context_markers: Context,
    #[serde(default)]
    pub learning_metrics: LearningMetrics,
    #[serde(default)]
    pub transition_probabilities: TransitionTable,
}

// ═════════════════════════════════════════════════════════════════════════════
// Model artifacts (model directory)
// ═════════════════════════════════════════════════════════════════════════════

/// Snapshot of the training inputs used by the last retrain
/// (`training_data.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    #[serde(default)]
    pub transition_probabilities: TransitionTable,
    /// Observation counts per mood label.
    #[serde(default)]
    pub mood_distribution: HashMap<String, u64>,
    #[serde(default)]
    pub feedback_history: Vec<FeedbackEvent>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

/// Derived per-mood parameters (`emotion_model.json`).
///
/// This artifact is layered on top of the raw transition table: the table
/// drives prediction, the weights record which moods the user confirmed so
/// downstream consumers can bias or validate predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionModelParams {
    /// Per-mood weight derived from `correct = true` feedback, normalized by
    /// the total correct count. Sums to 1.0 when any correct feedback exists.
    #[serde(default)]
    pub mood_weights: HashMap<String, f64>,
    /// Copy of the transition table at retrain time.
    #[serde(default)]
    pub transition_bias: TransitionTable,
    /// Normalized observation distribution at retrain time.
    #[serde(default)]
    pub distribution_prior: HashMap<String, f64>,
    pub learning_rate: f64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for EmotionModelParams {
    fn default() -> Self {
        Self {
            mood_weights: HashMap::new(),
            transition_bias: TransitionTable::new(),
            distribution_prior: HashMap::new(),
            learning_rate: DEFAULT_LEARNING_RATE,
            last_updated: None,
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Analytics
// ═════════════════════════════════════════════════════════════════════════════

/// Read-only analytics snapshot returned by `get_mood_analysis()`.
/// Always well-formed; an empty store yields the zeroed default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodAnalytics {
    /// Lifetime accuracy over all scored predictions.
    pub overall_accuracy: f64,
    /// Accuracy over the trailing feedback window.
    pub recent_accuracy: f64,
    /// Feedback events inside the trailing window.
    pub recent_samples: usize,
    /// Observation counts per mood label.
    pub mood_distribution: HashMap<String, u64>,
    pub transition_probabilities: TransitionTable,
    /// Probability of the current argmax prediction, per mood row.
    pub prediction_confidence: HashMap<String, f64>,
    /// Total observations recorded.
    pub total_samples: usize,
    pub needs_retraining: bool,
    pub timestamp: DateTime<Utc>,
}

impl Default for MoodAnalytics {
    fn default() -> Self {
        Self {
            overall_accuracy: 0.0,
            recent_accuracy: 0.0,
            recent_samples: 0,
            mood_distribution: HashMap::new(),
            transition_probabilities: TransitionTable::new(),
            prediction_confidence: HashMap::new(),
            total_samples: 0,
            needs_retraining: false,
            timestamp: Utc::now(),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Configuration
// ═════════════════════════════════════════════════════════════════════════════

/// Knobs for the retraining gate. Exposed rather than hardcoded so hosts can
/// tune sensitivity per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainingPolicy {
    /// Windowed accuracy below this triggers retraining.
    pub accuracy_threshold: f64,
    /// Minimum feedback events inside the window before the gate can fire.
    pub min_feedback_samples: usize,
    /// Trailing window, in days.
    pub feedback_window_days: i64,
}

impl Default for RetrainingPolicy {
    fn default() -> Self {
        Self {
            accuracy_threshold: DEFAULT_ACCURACY_THRESHOLD,
            min_feedback_samples: DEFAULT_MIN_FEEDBACK_SAMPLES,
            feedback_window_days: DEFAULT_FEEDBACK_WINDOW_DAYS,
        }
    }
}

/// Engine configuration. Passed at construction — no ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimbicConfig {
    /// Root data directory. State file and model directory live under it.
    pub data_dir: PathBuf,
    pub policy: RetrainingPolicy,
    pub sync_interval_secs: u64,
    pub retrain_check_interval_secs: u64,
    /// Retrain cycles slower than this are logged as errors.
    pub retrain_watchdog_secs: u64,
    /// Backup generations kept under the model directory.
    pub keep_snapshots: usize,
}

impl Default for LimbicConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir().unwrap_or_default().join("openmuse"),
            policy: RetrainingPolicy::default(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            retrain_check_interval_secs: DEFAULT_RETRAIN_CHECK_INTERVAL_SECS,
            retrain_watchdog_secs: DEFAULT_RETRAIN_WATCHDOG_SECS,
            keep_snapshots: DEFAULT_KEEP_SNAPSHOTS,
        }
    }
}

impl LimbicConfig {
    /// Config rooted at an explicit directory, defaults elsewhere.
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE_NAME)
    }

    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join(MODEL_DIR_NAME)
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Tests
// ═════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_serializes_under_legacy_key() {
        let event = FeedbackEvent {
            timestamp: Utc::now(),
            mood: "calm".into(),
            correct: true,
            context: Context::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["feedback"], serde_json::Value::Bool(true));
        assert!(json.get("correct").is_none());
    }

    #[test]
    fn state_loads_from_partial_json() {
        // Older files may lack entire sections — they must still deserialize.
        let state: MoodState = serde_json::from_str(r#"{"mood_history": []}"#).unwrap();
        assert!(state.user_feedback.is_empty());
        assert_eq!(state.learning_metrics.total_predictions, 0);
        assert!(state.transition_probabilities.is_empty());
    }

    #[test]
    fn overall_accuracy_handles_zero() {
        let metrics = LearningMetrics::default();
        assert_eq!(metrics.overall_accuracy(), 0.0);

        let metrics = LearningMetrics {
            total_predictions: 4,
            correct_predictions: 3,
            last_retrain: None,
        };
        assert!((metrics.overall_accuracy() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn config_paths_derive_from_data_dir() {
        let config = LimbicConfig::at("/tmp/muse-test");
        assert_eq!(config.state_path(), PathBuf::from("/tmp/muse-test/mood_state.json"));
        assert_eq!(config.model_dir(), PathBuf::from("/tmp/muse-test/model"));
    }
}
