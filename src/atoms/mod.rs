// ── Limbic Atoms ────────────────────────────────────────────────────────────
// Leaf types shared by every engine layer. No engine imports allowed here.

pub mod constants;
pub mod error;
pub mod types;
