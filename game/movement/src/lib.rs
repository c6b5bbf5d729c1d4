//! Authoritative path movement for units: plans a route, walks it one waypoint at a time on the
//! tick runtime, streams upcoming waypoints to observers, and lets every new move request
//! supersede the one in flight.

pub use broadcast::{ObserverSet, PathBroadcaster, PathTransport, PathUpdate, TransportError, WireError};
pub use motion::{LinearMotionExecutor, MotionError, MotionExecutor, MotionOutcome};
pub use navigation::{NavigationError, PathfindingService, RegionId, StraightLinePathfinder};
pub use path::{
    MoveError, MoveRequest, PathCollaborators, PathMovementController, PathSettings, PathToken,
    TraversalOutcome, WaypointPath,
};
pub use runtime::{CancellationToken, Runtime, TaskRef};
pub use unit::{Transform, UnitId};
pub use units::{Unit, UnitError, Units};

mod broadcast;
mod motion;
mod navigation;
mod path;
pub mod runtime;
mod unit;
mod units;
