use std::cell::RefCell;
use std::rc::{Rc, Weak};

use common::*;

use crate::broadcast::PathBroadcaster;
use crate::motion::{MotionError, MotionExecutor, MotionOutcome};
use crate::path::state::{PathMovementState, PathToken, TraversalOutcome, WaypointPath};
use crate::runtime::CancellationToken;
use crate::unit::{Transform, UnitId};

/// Walks a single path version, owned by its runtime task
pub(crate) struct Traversal {
    pub unit: UnitId,
    pub transform: Transform,
    pub path: WaypointPath,
    pub cancellation: CancellationToken,
    pub motion: Rc<dyn MotionExecutor>,
    pub broadcaster: PathBroadcaster,
    pub window: usize,
}

/// Releases the controller's handle to the traversal however it ends, including when the task is
/// dropped mid-step by cancellation
pub(crate) struct TraversalGuard {
    state: Weak<RefCell<PathMovementState>>,
    token: PathToken,
    outcome: Option<TraversalOutcome>,
}

impl Traversal {
    pub async fn run(self, mut guard: TraversalGuard) {
        let outcome = match self.walk().await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("traversal failed"; self.unit, "token" => self.path.token(), "error" => %err);
                TraversalOutcome::Failed(err)
            }
        };

        debug!("traversal finished"; self.unit, "token" => self.path.token(), "outcome" => ?outcome);
        guard.outcome = Some(outcome);
    }

    async fn walk(&self) -> Result<TraversalOutcome, MotionError> {
        let waypoints = self.path.waypoints();
        debug!("starting traversal"; self.unit, "token" => self.path.token(), "waypoints" => waypoints.len());

        for (i, &waypoint) in waypoints.iter().enumerate().skip(1) {
            if self.cancellation.is_cancelled() {
                return Ok(TraversalOutcome::Superseded);
            }

            if (i - 1) % self.window == 0 {
                self.broadcaster.broadcast(
                    self.unit,
                    self.transform.position(),
                    waypoints,
                    i,
                    self.window,
                );
            }

            trace!("moving to waypoint"; self.unit, "index" => i, "waypoint" => ?waypoint);
            match self.motion.move_to(waypoint, &self.cancellation).await? {
                MotionOutcome::Arrived => {}
                MotionOutcome::Cancelled => return Ok(TraversalOutcome::Superseded),
            }
        }

        Ok(TraversalOutcome::Completed)
    }
}

impl TraversalGuard {
    pub fn new(state: &Rc<RefCell<PathMovementState>>, token: PathToken) -> Self {
        Self {
            state: Rc::downgrade(state),
            token,
            outcome: None,
        }
    }
}

impl Drop for TraversalGuard {
    fn drop(&mut self) {
        // no outcome means the task was dropped before finishing
        let outcome = self.outcome.take().unwrap_or(TraversalOutcome::Stopped);

        let state = match self.state.upgrade() {
            Some(state) => state,
            None => return,
        };

        match state.try_borrow_mut() {
            Ok(mut state) => state.finish_traversal(self.token, outcome),
            Err(_) => {
                error!("path state is borrowed while releasing traversal"; "token" => self.token);
            }
        };
    }
}
