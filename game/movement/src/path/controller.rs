use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::*;

use crate::broadcast::PathBroadcaster;
use crate::motion::MotionExecutor;
use crate::navigation::{NavigationError, PathfindingService, RegionId};
use crate::path::state::{
    PathMovementState, PathToken, TraversalHandle, TraversalOutcome, WaypointPath,
};
use crate::path::traversal::{Traversal, TraversalGuard};
use crate::runtime::{CancellationToken, Runtime};
use crate::unit::{Transform, UnitId};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PathSettings {
    pub region: RegionId,
    /// Requests closer than this to the current target are ignored
    pub repath_epsilon: F,
    /// Waypoints per broadcast
    pub broadcast_window: usize,
}

/// Everything a controller talks to, shared between all units
#[derive(Clone)]
pub struct PathCollaborators {
    pub runtime: Runtime,
    pub pathfinder: Rc<dyn PathfindingService>,
    pub broadcaster: PathBroadcaster,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MoveRequest {
    /// Already heading to (or at) this target
    Ignored,
    /// No route, nothing moves
    Unreachable,
    /// Path had no waypoints beyond the start
    AlreadyArrived,
    Started(PathToken),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MoveError {
    #[error("Target {0:?} is not a valid position")]
    InvalidTarget(Position),

    #[error("Pathfinding failed: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Path movement has been torn down")]
    TornDown,
}

/// Sole authority over a unit's in-flight path
pub struct PathMovementController {
    unit: UnitId,
    transform: Transform,
    settings: Cell<PathSettings>,
    collaborators: PathCollaborators,
    motion: Rc<dyn MotionExecutor>,
    state: Rc<RefCell<PathMovementState>>,
    torn_down: Cell<bool>,
}

impl PathMovementController {
    pub fn new(
        unit: UnitId,
        transform: Transform,
        settings: PathSettings,
        collaborators: PathCollaborators,
        motion: Rc<dyn MotionExecutor>,
    ) -> Self {
        Self {
            unit,
            transform,
            settings: Cell::new(settings),
            collaborators,
            motion,
            state: Rc::new(RefCell::new(PathMovementState::default())),
            torn_down: Cell::new(false),
        }
    }

    /// Supersedes any in-flight traversal and starts walking a new path to `target`. The old
    /// traversal is cancelled and released before pathfinding begins
    pub fn move_to(&self, target: Position) -> Result<MoveRequest, MoveError> {
        if self.torn_down.get() {
            return Err(MoveError::TornDown);
        }

        if !target.is_finite_position() {
            return Err(MoveError::InvalidTarget(target));
        }

        let settings = self.settings.get();
        {
            let mut state = self.state.borrow_mut();
            if let Some(current) = state.target {
                if current.is_near(&target, settings.repath_epsilon) {
                    trace!("ignoring move close to current target"; self.unit, "target" => ?target);
                    return Ok(MoveRequest::Ignored);
                }
            }

            state.target = Some(target);
        }

        self.cancel_traversal(TraversalOutcome::Superseded);

        let token = self.state.borrow_mut().clear_path();
        let start = self.transform.position();
        let found = self
            .collaborators
            .pathfinder
            .find_path(settings.region, start, target);

        let waypoints = match found {
            Ok(waypoints) => waypoints,
            Err(NavigationError::NotFound) => {
                debug!("target is unreachable"; self.unit, "target" => ?target, "from" => ?start);
                return Ok(MoveRequest::Unreachable);
            }
            Err(err) => {
                warn!("pathfinding failed"; self.unit, "region" => %settings.region, "error" => %err);

                // let the caller retry the same target
                self.state.borrow_mut().target = None;
                return Err(err.into());
            }
        };

        debug!("found path"; self.unit, "token" => token, "target" => ?target, "waypoints" => waypoints.len());

        if waypoints.is_empty() {
            return Ok(MoveRequest::Unreachable);
        }

        let path = WaypointPath::new(token, waypoints);
        self.state.borrow_mut().path = path.clone();

        if path.upcoming().is_empty() {
            return Ok(MoveRequest::AlreadyArrived);
        }

        let cancellation = CancellationToken::default();
        let traversal = Traversal {
            unit: self.unit,
            transform: self.transform.clone(),
            path,
            cancellation: cancellation.clone(),
            motion: self.motion.clone(),
            broadcaster: self.collaborators.broadcaster.clone(),
            window: settings.broadcast_window.max(1),
        };

        let guard = TraversalGuard::new(&self.state, token);
        let task = self.collaborators.runtime.spawn(traversal.run(guard));

        self.state.borrow_mut().traversal = Some(TraversalHandle {
            token,
            cancellation,
            task,
        });

        Ok(MoveRequest::Started(token))
    }

    /// Cancels the in-flight traversal without starting another. The target is forgotten so the
    /// same target can be requested again. Returns false if nothing was moving
    pub fn stop(&self) -> bool {
        let stopped = self.cancel_traversal(TraversalOutcome::Stopped);
        self.state.borrow_mut().target = None;
        stopped
    }

    /// Cancels and releases any traversal then clears the path and target. Further move requests
    /// fail. Safe to call more than once
    pub fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }

        self.cancel_traversal(TraversalOutcome::Stopped);

        let mut state = self.state.borrow_mut();
        debug_assert!(state.traversal.is_none(), "traversal outlived teardown");
        state.clear_path();
        state.target = None;
        debug!("path movement torn down"; self.unit);
    }

    /// Signals the traversal and waits for it to release its handle, which for a task dropped
    /// outside of its own poll is immediate
    fn cancel_traversal(&self, reason: TraversalOutcome) -> bool {
        let (token, cancellation, task) = match self.state.borrow().traversal.as_ref() {
            Some(handle) => (
                handle.token,
                handle.cancellation.clone(),
                handle.task.clone(),
            ),
            None => return false,
        };

        debug!("cancelling traversal"; self.unit, "token" => token, "task" => ?task.handle(), "reason" => ?reason);
        cancellation.cancel();
        task.cancel();

        let mut state = self.state.borrow_mut();
        if state.current_token() == Some(token) {
            // still polling, the guard will find its handle replaced or gone
            warn!("traversal was not released synchronously"; self.unit, "token" => token);
            state.traversal = None;
        }

        state.last_outcome = Some((token, reason));
        true
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn settings(&self) -> PathSettings {
        self.settings.get()
    }

    /// Applies to the next move request, an in-flight traversal keeps the window it started with
    pub fn set_settings(&self, settings: PathSettings) {
        if self.settings.replace(settings) != settings {
            debug!("path settings changed"; self.unit, "settings" => ?settings);
        }
    }

    pub fn target(&self) -> Option<Position> {
        self.state.borrow().target
    }

    /// The current path version, empty between requests or if no route was found
    pub fn path(&self) -> WaypointPath {
        self.state.borrow().path.clone()
    }

    pub fn is_moving(&self) -> bool {
        self.state.borrow().traversal.is_some()
    }

    /// Token of the in-flight traversal
    pub fn current_token(&self) -> Option<PathToken> {
        self.state.borrow().current_token()
    }

    pub fn last_outcome(&self) -> Option<(PathToken, TraversalOutcome)> {
        self.state.borrow().last_outcome.clone()
    }
}

impl Drop for PathMovementController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            region: RegionId(10001),
            repath_epsilon: 0.1,
            broadcast_window: 3,
        }
    }
}

impl From<&config::Movement> for PathSettings {
    fn from(config: &config::Movement) -> Self {
        Self {
            region: RegionId(config.region),
            repath_epsilon: config.repath_epsilon,
            broadcast_window: config.broadcast_window,
        }
    }
}

impl Debug for PathMovementController {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let state = self.state.borrow();
        f.debug_struct("PathMovementController")
            .field("unit", &self.unit)
            .field("target", &state.target)
            .field("path", &state.path)
            .field("traversal", &state.current_token())
            .finish()
    }
}
