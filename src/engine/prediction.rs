// ── Limbic: Prediction & Analytics ─────────────────────────────────────────
// Read-only layer over the mood store: next-mood prediction, windowed
// accuracy, the retraining gate, and the analytics snapshot.
//
// Nothing here mutates state. Analytics on an empty store returns the zeroed
// default structure — consumers never receive an error from a read.

use chrono::{DateTime, Duration, Utc};

use crate::atoms::types::{MoodAnalytics, RetrainingPolicy};
use crate::engine::store::MoodStore;

/// Highest-probability next mood; identity fallback for unknown moods.
pub fn predict_next_mood(store: &MoodStore, current_mood: &str) -> String {
    store.transitions().predict_next(current_mood)
}

/// Probability of the argmax next mood; 0.0 when the row is unknown.
pub fn prediction_confidence(store: &MoodStore, mood: &str) -> f64 {
    store.transitions().confidence(mood)
}

/// Feedback sample count and accuracy over the trailing window ending at
/// `now`. Accuracy is 0.0 when the window is empty.
pub fn windowed_accuracy(
    store: &MoodStore,
    window_days: i64,
    now: DateTime<Utc>,
) -> (usize, f64) {
    let cutoff = now - Duration::days(window_days);
    let mut total = 0usize;
    let mut correct = 0usize;
    for event in store.feedback() {
        if event.timestamp >= cutoff {
            total += 1;
            if event.correct {
                correct += 1;
            }
        }
    }
    let accuracy = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    };
    (total, accuracy)
}

/// The retraining gate: true iff the trailing window holds at least
/// `min_feedback_samples` events AND their accuracy is below
/// `accuracy_threshold`. Below the sample floor the answer is always false,
/// regardless of accuracy — too little signal to justify a retrain.
pub fn needs_retraining(store: &MoodStore, policy: &RetrainingPolicy) -> bool {
    needs_retraining_at(store, policy, Utc::now())
}

/// Deterministic variant with an explicit "now" for replays and tests.
pub fn needs_retraining_at(
    store: &MoodStore,
    policy: &RetrainingPolicy,
    now: DateTime<Utc>,
) -> bool {
    let (samples, accuracy) = windowed_accuracy(store, policy.feedback_window_days, now);
    samples >= policy.min_feedback_samples && accuracy < policy.accuracy_threshold
}

/// Full read-only analytics snapshot.
pub fn mood_analytics(store: &MoodStore, policy: &RetrainingPolicy) -> MoodAnalytics {
    let now = Utc::now();
    let (recent_samples, recent_accuracy) =
        windowed_accuracy(store, policy.feedback_window_days, now);

    let transitions = store.transitions();
    let prediction_confidence = transitions
        .table()
        .keys()
        .map(|mood| (mood.clone(), transitions.confidence(mood)))
        .collect();

    MoodAnalytics {
        overall_accuracy: store.metrics().overall_accuracy(),
        recent_accuracy,
        recent_samples,
        mood_distribution: store.mood_distribution(),
        transition_probabilities: transitions.table().clone(),
        prediction_confidence,
        total_samples: store.observation_count(),
        needs_retraining: recent_samples >= policy.min_feedback_samples
            && recent_accuracy < policy.accuracy_threshold,
        timestamp: now,
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Tests
// ═════════════════════════════════════════════════════════════════════════════
