// ── Limbic Atoms: Constants ────────────────────────────────────────────────
// All named defaults for the crate live here.
// Rationale: collecting constants in one place eliminates magic numbers,
// makes auditing easier, and keeps every layer's code self-documenting.

// ── Retraining gate ────────────────────────────────────────────────────────
// Used by `needs_retraining()` in engine/prediction.rs.
// Retraining fires only when BOTH hold over the trailing feedback window:
// enough samples to be meaningful, and accuracy below the threshold.
pub const DEFAULT_ACCURACY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MIN_FEEDBACK_SAMPLES: usize = 5;
pub const DEFAULT_FEEDBACK_WINDOW_DAYS: i64 = 7;

// ── Scheduler cadence ──────────────────────────────────────────────────────
// Used by `spawn_scheduler()` in engine/scheduler.rs. Both ticks are
// idempotent no-ops when there is nothing to do, so the cadence is a cost
// knob, not a correctness knob.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300; // 5 min
pub const DEFAULT_RETRAIN_CHECK_INTERVAL_SECS: u64 = 3600; // 1 hour

// ── Retrain watchdog ───────────────────────────────────────────────────────
// A retrain cycle slower than this is logged as an error. Cycles are bounded
// by feedback-history size in practice; cancellation is the host's concern.
pub const DEFAULT_RETRAIN_WATCHDOG_SECS: u64 = 120;

// ── Snapshot retention ─────────────────────────────────────────────────────
// Backup generations under <model_dir>/backups/ are pruned to the newest N
// after each committed cycle.
pub const DEFAULT_KEEP_SNAPSHOTS: usize = 5;

// ── Durable file layout ────────────────────────────────────────────────────
// Changing any of these strands existing installs. Treat as stable identifiers.
pub const STATE_FILE_NAME: &str = "mood_state.json";
pub const MODEL_DIR_NAME: &str = "model";
pub const BACKUP_DIR_NAME: &str = "backups";
pub const TRAINING_DATA_FILE: &str = "training_data.json";
pub const EMOTION_MODEL_FILE: &str = "emotion_model.json";

// ── Model parameters ───────────────────────────────────────────────────────
/// Learning rate recorded into emotion_model.json for downstream consumers.
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Tolerance when asserting that a transition row sums to 1.0.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;
