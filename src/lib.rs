//! credence: a confidence engine for chess move evaluation.
//!
//! Given a starting position and a played move, credence builds a tree of
//! evaluated positions: the played move, the engine's best move, and the
//! alternatives a shallow search prefers. Every node carries a confidence
//! percentage derived from how well shallow and deep analysis agree on the
//! position and on its principal-variation endpoint. Low-confidence leaves
//! are extended with further best-move chains until a target confidence is
//! met or the budgets run out, and confidence propagates upward as the
//! minimum over children.
//!
//! # Architecture
//!
//! ```text
//! compute_move_confidence()           public API, fail-fast validation
//!     ↕
//! engine::ConfidenceEngine            build / extend / propagate
//!     ↕ async trait calls
//! analyzer::Analyzer                  engine backend (UCI queue, material
//!                                     searcher, scripted table)
//!     ↕
//! tree::NodeStore                     ordered nodes, merge rules, locks
//! ```
//!
//! The payload returned by one call can be fed back as `existing_nodes` on
//! the next: the tree is reloaded with every `initial_confidence` lock
//! intact, analysis is skipped, and only extension and propagation run.

pub mod analyzer;
pub mod confidence;
pub mod engine;
pub mod tree;

pub use analyzer::{Analyzer, AnalyzerError, PvAnalysis, ScoredMove};
pub use engine::{
    compute_move_confidence, compute_position_confidence, ConfidenceEngine, ConfidenceOptions,
    Mode, MoveError,
};
pub use tree::payload::{neutral_report, ConfidenceReport, NodePayload};
