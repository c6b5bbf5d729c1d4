//! Per-unit path following, superseded by every new move request

mod controller;
mod state;
mod traversal;

pub use controller::{MoveError, MoveRequest, PathCollaborators, PathMovementController, PathSettings};
pub use state::{PathToken, TraversalOutcome, WaypointPath};
