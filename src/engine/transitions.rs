// ── Limbic: Transition Model ───────────────────────────────────────────────
// First-order Markov chain over mood labels, learned online.
//
// Update policy: incremental renormalization. On each observed transition the
// target cell is incremented by 1 and the whole row is divided by
// (previous row sum + 1). Each row therefore sums to exactly 1.0 after every
// update, and weight accumulates on frequently observed transitions.
//
// The numeric trajectory is increment-order-dependent — it is NOT equivalent
// to normalizing raw counts in one pass. `rebuild_from_history` replays
// observations pairwise through the same update so recovery reproduces the
// online trajectory exactly.

use std::collections::HashMap;

use crate::atoms::types::{MoodObservation, TransitionTable};

#[derive(Debug, Clone, Default)]
pub struct TransitionModel {
    table: TransitionTable,
}

impl TransitionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an existing table, e.g. one loaded from the durable store.
    pub fn from_table(table: TransitionTable) -> Self {
        Self { table }
    }

    /// Record one observed transition `from_mood → to_mood`.
    pub fn observe(&mut self, from_mood: &str, to_mood: &str) {
        let row = self.table.entry(from_mood.to_string()).or_default();
        let previous_sum: f64 = row.values().sum();

        *row.entry(to_mood.to_string()).or_insert(0.0) += 1.0;

        let denominator = previous_sum + 1.0;
        for probability in row.values_mut() {
            *probability /= denominator;
        }
    }

    /// Highest-probability next mood for `mood`.
    ///
    /// An unknown or empty row returns the input mood unchanged — no
    /// information means "assume the mood persists". This is a designed
    /// degenerate case, not an error.
    pub fn predict_next(&self, mood: &str) -> String {
        match self.best_transition(mood) {
            Some((next, _)) => next.to_string(),
            None => mood.to_string(),
        }
    }

    /// Probability of the argmax next mood; 0.0 for unknown rows.
    pub fn confidence(&self, mood: &str) -> f64 {
        self.best_transition(mood).map(|(_, p)| p).unwrap_or(0.0)
    }

    /// Probability of a specific transition; 0.0 if never observed.
    pub fn probability(&self, from_mood: &str, to_mood: &str) -> f64 {
        self.table
            .get(from_mood)
            .and_then(|row| row.get(to_mood))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row(&self, mood: &str) -> Option<&HashMap<String, f64>> {
        self.table.get(mood)
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn into_table(self) -> TransitionTable {
        self.table
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Discard the learned table and replay the full observation history
    /// pairwise. Used by retraining and recovery paths.
    pub fn rebuild_from_history(&mut self, history: &[MoodObservation]) {
        self.table.clear();
        for pair in history.windows(2) {
            self.observe(&pair[0].mood, &pair[1].mood);
        }
    }

    fn best_transition(&self, mood: &str) -> Option<(&str, f64)> {
        let row = self.table.get(mood)?;
        row.iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(next, p)| (next.as_str(), *p))
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Tests
// ═════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::constants::ROW_SUM_TOLERANCE;
    use crate::atoms::types::Context;
    use chrono::Utc;

    fn row_sum(model: &TransitionModel, mood: &str) -> f64 {
        model.row(mood).map(|r| r.values().sum()).unwrap_or(0.0)
    }

    #[test]
    fn first_transition_gets_full_probability() {
        let mut model = TransitionModel::new();
        model.observe("calm", "excited");
        assert!((model.probability("calm", "excited") - 1.0).abs() < ROW_SUM_TOLERANCE);
    }

    #[test]
    fn rows_always_sum_to_one() {
        let mut model = TransitionModel::new();
        let moods = ["calm", "excited", "calm", "tired", "calm", "excited", "calm"];
        for pair in moods.windows(2) {
            model.observe(pair[0], pair[1]);
        }
        for mood in ["calm", "excited", "tired"] {
            if model.row(mood).is_some() {
                assert!(
                    (row_sum(&model, mood) - 1.0).abs() < ROW_SUM_TOLERANCE,
                    "row {mood} sums to {}",
                    row_sum(&model, mood)
                );
            }
        }
    }

    #[test]
    fn repeated_transitions_accumulate_weight() {
        let mut model = TransitionModel::new();
        model.observe("calm", "excited");
        model.observe("calm", "tired");
        model.observe("calm", "excited");
        assert!(model.probability("calm", "excited") > model.probability("calm", "tired"));
        assert_eq!(model.predict_next("calm"), "excited");
    }

    #[test]
    fn unknown_mood_predicts_identity() {
        let model = TransitionModel::new();
        assert_eq!(model.predict_next("wistful"), "wistful");
        assert_eq!(model.confidence("wistful"), 0.0);
    }

    #[test]
    fn incremental_update_is_order_dependent() {
        // The learning trajectory depends on increment order; two histories
        // with identical counts but different order diverge. Locking this in
        // guards against someone "simplifying" to batch counting.
        let mut ab_first = TransitionModel::new();
        for (from, to) in [("m", "a"), ("m", "a"), ("m", "b")] {
            ab_first.observe(from, to);
        }
        let mut b_first = TransitionModel::new();
        for (from, to) in [("m", "b"), ("m", "a"), ("m", "a")] {
            b_first.observe(from, to);
        }
        assert!(
            (ab_first.probability("m", "a") - b_first.probability("m", "a")).abs() > 1e-3,
            "expected order-dependent trajectories to diverge"
        );
    }

    #[test]
    fn rebuild_matches_online_learning() {
        let labels = ["calm", "excited", "calm", "tired", "excited", "calm"];
        let history: Vec<MoodObservation> = labels
            .iter()
            .map(|m| MoodObservation {
                timestamp: Utc::now(),
                mood: m.to_string(),
                context: Context::new(),
            })
            .collect();

        let mut online = TransitionModel::new();
        for pair in labels.windows(2) {
            online.observe(pair[0], pair[1]);
        }

        let mut rebuilt = TransitionModel::new();
        rebuilt.rebuild_from_history(&history);

        for (from, row) in online.table() {
            for (to, p) in row {
                assert!(
                    (rebuilt.probability(from, to) - p).abs() < ROW_SUM_TOLERANCE,
                    "rebuild diverged at {from}→{to}"
                );
            }
        }
    }

    #[test]
    fn self_transitions_are_learned() {
        let mut model = TransitionModel::new();
        model.observe("calm", "calm");
        model.observe("calm", "calm");
        assert_eq!(model.predict_next("calm"), "calm");
        assert!((row_sum(&model, "calm") - 1.0).abs() < ROW_SUM_TOLERANCE);
    }
}
