// OpenMuse Core — adaptive mood engine library.
//
// Learns Markov-style transition probabilities between observed moods,
// predicts the likely next mood, tracks prediction accuracy from user
// feedback, and retrains itself (snapshot + commit-or-rollback) when
// accuracy degrades.
//
// Hosts integrate through `MoodEngine` and the scheduler:
//
//   let engine = MoodEngine::new(LimbicConfig::default());
//   let scheduler = spawn_scheduler(&engine);
//   engine.process_mood("calm", None);
//   engine.provide_feedback("calm", true, None);
//   let analytics = engine.get_mood_analysis();
//
// Voice I/O, dashboards, and cloud transport are downstream consumers of
// `get_mood_analysis()` and producers of `process_mood()` calls — nothing in
// this crate talks to the network or a UI.

pub mod atoms;
pub mod engine;

pub use atoms::error::{CoreError, CoreResult};
pub use atoms::types::{
    Context, EmotionModelParams, FeedbackEvent, LearningMetrics, LimbicConfig, MoodAnalytics,
    MoodObservation, MoodState, RetrainingPolicy, TrainingSnapshot, TransitionTable,
};
pub use engine::{
    spawn_scheduler, JsonFileStore, MoodEngine, MoodStore, RetrainDecision, RetrainReport,
    RetrainingController, SchedulerHandle, StateStore, TransitionModel,
};
