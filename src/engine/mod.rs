// ── Limbic: Engine Module ──────────────────────────────────────────────────
//
// The adaptive mood engine — an online-learned Markov chain over mood labels
// with feedback-driven self-retraining.
//
// Architecture (leaf-first):
//   persistence  → StateStore trait + JSON file backend (atomic writes)
//   transitions  → first-order transition table, incremental renormalization
//   store        → ordered observation/feedback log + metrics (source of truth)
//   prediction   → read-only prediction, windowed accuracy, retraining gate
//   retraining   → snapshot → retrain → commit-or-rollback state machine
//   facade       → MoodEngine boundary for hosts (never surfaces errors)
//   scheduler    → tokio interval tasks driving the periodic hooks

pub mod facade;
pub mod persistence;
pub mod prediction;
pub mod retraining;
pub mod scheduler;
pub mod store;
pub mod transitions;

// Re-exports for convenience
pub use facade::MoodEngine;
pub use persistence::{JsonFileStore, StateStore};
pub use prediction::{
    mood_analytics, needs_retraining, predict_next_mood, prediction_confidence,
    windowed_accuracy,
};
pub use retraining::{
    derive_model_params, ModelSnapshot, RetrainDecision, RetrainPhase, RetrainReport,
    RetrainingController,
};
pub use scheduler::{spawn_scheduler, SchedulerHandle};
pub use store::MoodStore;
pub use transitions::TransitionModel;
