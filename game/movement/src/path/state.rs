use std::rc::Rc;

use common::*;

use crate::motion::MotionError;
use crate::runtime::{CancellationToken, TaskRef};

/// Unit-specific opaque token identifying one version of the path, a new one is issued for every
/// accepted move request
#[derive(Eq, PartialEq, Copy, Clone, Hash)]
pub struct PathToken(u64);

logging::slog_value_debug!(PathToken);

/// Immutable waypoint list. Index 0 is the unit's position when the path was found
#[derive(Clone)]
pub struct WaypointPath {
    token: PathToken,
    waypoints: Rc<[Position]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraversalOutcome {
    /// Reached the last waypoint
    Completed,
    /// Interrupted by a newer move request
    Superseded,
    /// Interrupted by a stop request or teardown
    Stopped,
    Failed(MotionError),
}

/// The in-flight traversal
pub(crate) struct TraversalHandle {
    pub token: PathToken,
    pub cancellation: CancellationToken,
    pub task: TaskRef,
}

pub struct PathMovementState {
    pub(crate) target: Option<Position>,
    pub(crate) path: WaypointPath,
    /// Only set while a traversal is running
    pub(crate) traversal: Option<TraversalHandle>,
    pub(crate) last_outcome: Option<(PathToken, TraversalOutcome)>,
    next_token: u64,
}

impl WaypointPath {
    pub(crate) fn new(token: PathToken, waypoints: Vec<Position>) -> Self {
        Self {
            token,
            waypoints: waypoints.into(),
        }
    }

    pub(crate) fn empty(token: PathToken) -> Self {
        Self::new(token, Vec::new())
    }

    pub fn token(&self) -> PathToken {
        self.token
    }

    pub fn waypoints(&self) -> &[Position] {
        &self.waypoints
    }

    /// Waypoints still to be visited at the start of the traversal, i.e. excluding the start
    pub fn upcoming(&self) -> &[Position] {
        self.waypoints.get(1..).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

impl PathMovementState {
    /// Replaces the path with an empty one under a new token
    pub(crate) fn clear_path(&mut self) -> PathToken {
        let token = PathToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        self.path = WaypointPath::empty(token);
        token
    }

    /// Called by the traversal itself as it finishes or is dropped. Only releases the handle if
    /// it still belongs to this traversal
    pub(crate) fn finish_traversal(&mut self, token: PathToken, outcome: TraversalOutcome) {
        match self.traversal.as_ref() {
            Some(handle) if handle.token == token => {
                self.traversal = None;

                // failed before arriving, the same target may be requested again
                if let TraversalOutcome::Failed(_) = outcome {
                    self.target = None;
                }
            }
            Some(handle) => {
                trace!("traversal finished after being replaced"; "token" => token, "current" => handle.token);
            }
            None => {}
        }

        self.last_outcome = Some((token, outcome));
    }

    pub(crate) fn current_token(&self) -> Option<PathToken> {
        self.traversal.as_ref().map(|t| t.token)
    }
}

impl Default for PathMovementState {
    fn default() -> Self {
        let first = 0x1000;
        Self {
            target: None,
            path: WaypointPath::empty(PathToken(first)),
            traversal: None,
            last_outcome: None,
            next_token: first + 1,
        }
    }
}

impl Debug for PathToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "PathToken({:#x})", self.0)
    }
}

impl Debug for WaypointPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:?}{:?}", self.token, self.waypoints)
    }
}
