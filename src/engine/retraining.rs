// ── Limbic: Retraining Controller ──────────────────────────────────────────
// Orchestrates safe model retraining when prediction accuracy degrades.
//
// Cycle stages:
//   1. Check       – retraining gate over the trailing feedback window
//   2. Back up     – ModelSnapshot of table + metrics + model artifacts;
//                    must succeed before anything mutates (fail-safe)
//   3. Retrain     – build TrainingSnapshot, derive EmotionModelParams,
//                    persist both artifacts, stamp last_retrain
//   4. Commit      – prune old backups to keep-last-N
//   5. Roll back   – on ANY retrain/persist failure, restore every snapshot
//                    field and file verbatim; last_retrain stays untouched
//
// The cycle is all-or-nothing: the store never reflects a partially-applied
// retrain. A cycle already in flight causes new triggers to return `Skipped`
// rather than overlap.

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

use crate::atoms::constants::{
    BACKUP_DIR_NAME, EMOTION_MODEL_FILE, TRAINING_DATA_FILE,
};
use crate::atoms::error::{CoreError, CoreResult};
use crate::atoms::types::{
    EmotionModelParams, LearningMetrics, RetrainingPolicy, TrainingSnapshot, TransitionTable,
};
use crate::engine::persistence::write_json_atomic;
use crate::engine::prediction;
use crate::engine::store::MoodStore;

// ═════════════════════════════════════════════════════════════════════════════
// Cycle state machine
// ═════════════════════════════════════════════════════════════════════════════

/// Where the controller currently is in its cycle. `Idle` between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainPhase {
    Idle,
    Checking,
    BackingUp,
    Retraining,
}

/// Terminal outcome of one `run_cycle` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainDecision {
    /// Another cycle was already in flight; this trigger was ignored.
    Skipped,
    /// The gate was closed — nothing to do.
    NoOp,
    Committed,
    RolledBack,
}

/// Summary of one retraining cycle.
#[derive(Debug, Clone)]
pub struct RetrainReport {
    pub decision: RetrainDecision,
    /// Backup generation id, present whenever a snapshot was taken.
    pub generation: Option<Uuid>,
    pub windowed_samples: usize,
    pub windowed_accuracy: f64,
    pub duration: std::time::Duration,
}

// ═════════════════════════════════════════════════════════════════════════════
// Model snapshot
// ═════════════════════════════════════════════════════════════════════════════

/// Immutable pre-retrain copy of everything a rollback must restore.
/// Held in memory for the duration of the cycle and mirrored to the backup
/// area; `file` fields are `None` when the artifact did not exist, so a
/// rollback removes files the failed cycle may have created.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub generation: Uuid,
    pub created_at: DateTime<Utc>,
    pub transition_table: TransitionTable,
    pub metrics: LearningMetrics,
    pub training_data_file: Option<String>,
    pub emotion_model_file: Option<String>,
}

// ═════════════════════════════════════════════════════════════════════════════
// Controller
// ═════════════════════════════════════════════════════════════════════════════

pub struct RetrainingController {
    model_dir: PathBuf,
    keep_snapshots: usize,
    phase: Mutex<RetrainPhase>,
}

impl RetrainingController {
    pub fn new(model_dir: impl Into<PathBuf>, keep_snapshots: usize) -> Self {
        Self {
            model_dir: model_dir.into(),
            keep_snapshots,
            phase: Mutex::new(RetrainPhase::Idle),
        }
    }

    pub fn phase(&self) -> RetrainPhase {
        *self.phase.lock()
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Run one full cycle with the default parameter derivation.
    pub fn run_cycle(
        &self,
        store: &mut MoodStore,
        policy: &RetrainingPolicy,
    ) -> CoreResult<RetrainReport> {
        self.run_cycle_with(store, policy, derive_model_params)
    }

    /// Run one full cycle with an explicit parameter-derivation function.
    /// Hosts and tests use this seam to substitute or fault the retrain step.
    pub fn run_cycle_with(
        &self,
        store: &mut MoodStore,
        policy: &RetrainingPolicy,
        derive: impl Fn(&TrainingSnapshot) -> CoreResult<EmotionModelParams>,
    ) -> CoreResult<RetrainReport> {
        let started = Instant::now();
        let now = Utc::now();

        // ── Single-instance guard ────────────────────────────────────────
        {
            let mut phase = self.phase.lock();
            if *phase != RetrainPhase::Idle {
                warn!("[limbic:retrain] Cycle already in flight ({:?}); skipping", *phase);
                return Ok(RetrainReport {
                    decision: RetrainDecision::Skipped,
                    generation: None,
                    windowed_samples: 0,
                    windowed_accuracy: 0.0,
                    duration: started.elapsed(),
                });
            }
            *phase = RetrainPhase::Checking;
        }

        // ── 1. Check the gate ────────────────────────────────────────────
        let (samples, accuracy) =
            prediction::windowed_accuracy(store, policy.feedback_window_days, now);
        let gate_open =
            samples >= policy.min_feedback_samples && accuracy < policy.accuracy_threshold;

        if !gate_open {
            *self.phase.lock() = RetrainPhase::Idle;
            return Ok(RetrainReport {
                decision: RetrainDecision::NoOp,
                generation: None,
                windowed_samples: samples,
                windowed_accuracy: accuracy,
                duration: started.elapsed(),
            });
        }

        info!(
            "[limbic:retrain] Accuracy {:.2} over {} samples below {:.2} — retraining",
            accuracy, samples, policy.accuracy_threshold
        );

        // ── 2. Back up ───────────────────────────────────────────────────
        *self.phase.lock() = RetrainPhase::BackingUp;
        let snapshot = match self.create_snapshot(store, now) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Never retrain without a rollback point.
                error!("[limbic:retrain] Snapshot failed ({}); aborting cycle", e);
                *self.phase.lock() = RetrainPhase::Idle;
                return Err(e);
            }
        };

        // ── 3. Retrain ───────────────────────────────────────────────────
        *self.phase.lock() = RetrainPhase::Retraining;
        let decision = match self.retrain(store, &derive, now) {
            Ok(()) => {
                self.prune_snapshots();
                info!(
                    "[limbic:retrain] Committed generation {} in {:?}",
                    snapshot.generation,
                    started.elapsed()
                );
                RetrainDecision::Committed
            }
            Err(e) => {
                error!("[limbic:retrain] Retrain failed ({}); rolling back", e);
                self.rollback(store, &snapshot);
                RetrainDecision::RolledBack
            }
        };

        *self.phase.lock() = RetrainPhase::Idle;
        Ok(RetrainReport {
            decision,
            generation: Some(snapshot.generation),
            windowed_samples: samples,
            windowed_accuracy: accuracy,
            duration: started.elapsed(),
        })
    }

    // ── Snapshot / rollback ────────────────────────────────────────────────

    fn training_data_path(&self) -> PathBuf {
        self.model_dir.join(TRAINING_DATA_FILE)
    }

    fn emotion_model_path(&self) -> PathBuf {
        self.model_dir.join(EMOTION_MODEL_FILE)
    }

    fn backups_dir(&self) -> PathBuf {
        self.model_dir.join(BACKUP_DIR_NAME)
    }

    fn create_snapshot(&self, store: &MoodStore, now: DateTime<Utc>) -> CoreResult<ModelSnapshot> {
        let generation = Uuid::new_v4();
        let (transition_table, metrics) = store.snapshot_state();

        let training_data_file = read_optional(&self.training_data_path())?;
        let emotion_model_file = read_optional(&self.emotion_model_path())?;

        let snapshot = ModelSnapshot {
            generation,
            created_at: now,
            transition_table,
            metrics,
            training_data_file,
            emotion_model_file,
        };

        // Mirror to the backup area. Directory name sorts chronologically.
        let dir = self.backups_dir().join(format!(
            "{}-{}",
            now.format("%Y%m%d%H%M%S"),
            &generation.simple().to_string()[..8]
        ));
        fs::create_dir_all(&dir)
            .map_err(|e| CoreError::Snapshot(format!("create {}: {e}", dir.display())))?;

        write_json_atomic(
            &dir.join("state_snapshot.json"),
            &serde_json::json!({
                "generation": snapshot.generation.to_string(),
                "created_at": snapshot.created_at,
                "transition_probabilities": snapshot.transition_table,
                "learning_metrics": snapshot.metrics,
            }),
        )?;
        if let Some(raw) = &snapshot.training_data_file {
            fs::write(dir.join(TRAINING_DATA_FILE), raw)
                .map_err(|e| CoreError::Snapshot(e.to_string()))?;
        }
        if let Some(raw) = &snapshot.emotion_model_file {
            fs::write(dir.join(EMOTION_MODEL_FILE), raw)
                .map_err(|e| CoreError::Snapshot(e.to_string()))?;
        }

        info!("[limbic:retrain] Snapshot {} written to {}", generation, dir.display());
        Ok(snapshot)
    }

    fn retrain(
        &self,
        store: &mut MoodStore,
        derive: &impl Fn(&TrainingSnapshot) -> CoreResult<EmotionModelParams>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let training = TrainingSnapshot {
            transition_probabilities: store.transitions().table().clone(),
            mood_distribution: store.mood_distribution(),
            feedback_history: store.feedback().to_vec(),
            generated_at: Some(now),
        };

        let params = derive(&training)?;

        write_json_atomic(&self.training_data_path(), &training)?;
        write_json_atomic(&self.emotion_model_path(), &params)?;

        store.mark_retrained(now);
        Ok(())
    }

    /// Restore every path and field captured in the snapshot, verbatim.
    fn rollback(&self, store: &mut MoodStore, snapshot: &ModelSnapshot) {
        restore_optional(&self.training_data_path(), &snapshot.training_data_file);
        restore_optional(&self.emotion_model_path(), &snapshot.emotion_model_file);

        store.restore_state(snapshot.transition_table.clone(), snapshot.metrics.clone());
        warn!(
            "[limbic:retrain] Rolled back to pre-cycle snapshot {}",
            snapshot.generation
        );
    }

    /// Opportunistic keep-last-N cleanup of the backup area.
    fn prune_snapshots(&self) {
        let dir = self.backups_dir();
        let Ok(entries) = fs::read_dir(&dir) else {
            return;
        };
        let mut names: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        if names.len() <= self.keep_snapshots {
            return;
        }
        // Names start with a timestamp, so lexicographic order is age order.
        names.sort();
        let excess = names.len() - self.keep_snapshots;
        for stale in names.into_iter().take(excess) {
            if let Err(e) = fs::remove_dir_all(&stale) {
                warn!("[limbic:retrain] Could not prune {}: {}", stale.display(), e);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Parameter derivation
// ═════════════════════════════════════════════════════════════════════════════

/// Derive per-mood weights from the training snapshot.
///
/// Weights come from the moods the user confirmed: each mood's count of
/// `correct = true` feedback, normalized by the total correct count. The
/// transition table and observation distribution are recorded alongside as
/// bias and prior for downstream consumers.
pub fn derive_model_params(training: &TrainingSnapshot) -> CoreResult<EmotionModelParams> {
    let mut correct_counts: HashMap<String, u64> = HashMap::new();
    for event in &training.feedback_history {
        if event.correct {
            *correct_counts.entry(event.mood.clone()).or_insert(0) += 1;
        }
    }
    let total_correct: u64 = correct_counts.values().sum();

    let mood_weights = if total_correct == 0 {
        HashMap::new()
    } else {
        correct_counts
            .into_iter()
            .map(|(mood, count)| (mood, count as f64 / total_correct as f64))
            .collect()
    };

    let total_observations: u64 = training.mood_distribution.values().sum();
    let distribution_prior = if total_observations == 0 {
        HashMap::new()
    } else {
        training
            .mood_distribution
            .iter()
            .map(|(mood, count)| (mood.clone(), *count as f64 / total_observations as f64))
            .collect()
    };

    Ok(EmotionModelParams {
        mood_weights,
        transition_bias: training.transition_probabilities.clone(),
        distribution_prior,
        learning_rate: crate::atoms::constants::DEFAULT_LEARNING_RATE,
        last_updated: training.generated_at,
    })
}

// ═════════════════════════════════════════════════════════════════════════════
// Helpers
// ═════════════════════════════════════════════════════════════════════════════

fn read_optional(path: &Path) -> CoreResult<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .map_err(|e| CoreError::Snapshot(format!("read {}: {e}", path.display())))
}

/// Put a file back to its snapshot content, or remove it if it was absent.
fn restore_optional(path: &Path, content: &Option<String>) {
    let result = match content {
        Some(raw) => fs::write(path, raw),
        None => match fs::remove_file(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        },
    };
    if let Err(e) = result {
        error!("[limbic:retrain] Rollback restore of {} failed: {}", path.display(), e);
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Tests
// ═════════════════════════════════════════════════════════════════════════════
