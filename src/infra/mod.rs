// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence and bookkeeping shared by training and serving:
//
//   artifact_store.rs — the artifacts directory; saves/loads the
//                       preprocessing artifact as one JSON file,
//                       written to a temp file then renamed
//
//   checkpoint.rs     — the best-model checkpoint: weights,
//                       optimizer state, TabNetConfig and
//                       training history, committed atomically
//
//   metrics.rs        — per-epoch CSV log, training history,
//                       held-out evaluation report
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

pub mod artifact_store;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger and evaluation report
pub mod metrics;
