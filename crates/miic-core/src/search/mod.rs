//! The two greedy search steps.
//!
//! - [`subset`]: best conditioning set for one node (Step-1 kernel).
//! - [`prune`]: Step 1 sweeps, vote merging and orientation of survivors.
//! - [`orient`]: Step 2 edge re-orientation with tabu and history.

pub mod orient;
pub mod prune;
pub mod subset;

pub use orient::{
    AcceptedMove, EdgeDelta, OrientReport, Orientation, TabuEntry, TabuList, compute_edge_deltas,
    orient,
};
pub use prune::{PruneReport, PruneVotes, prune};
pub use subset::{SubsetChoice, best_conditioning_set};
