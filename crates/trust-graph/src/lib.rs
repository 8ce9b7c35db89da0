//! Trust graph traversal and reputation scoring.
//!
//! The graph is a set of plain edge records; adjacency is built on demand
//! in one pass and cycles are handled by visited sets, so no shared mutable
//! vertex structure exists anywhere. Only active edges (neither revoked nor
//! expired) participate in traversal and scoring.

pub mod edge;
pub mod index;
pub mod path;
pub mod reputation;

pub use edge::{valid_edges, EdgeStatus, TrustEdge};
pub use index::GraphIndex;
pub use path::{find_path, PathHop, PathOptions, PathResult, MAX_PATH_DEPTH, TRUST_DECAY};
pub use reputation::{reputation, ReputationOptions, ReputationSummary, MAX_REPUTATION_DEPTH};
