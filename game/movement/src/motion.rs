use async_trait::async_trait;

use common::*;

use crate::runtime::{yield_now, CancellationToken};
use crate::unit::Transform;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MotionOutcome {
    Arrived,
    /// Stopped wherever it had reached when the token was cancelled
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    #[error("Target {0:?} is not a valid position")]
    InvalidTarget(Position),

    #[error("Motion is unavailable: {0}")]
    Unavailable(String),
}

/// Physically moves a single unit towards one position at a time
#[async_trait(?Send)]
pub trait MotionExecutor {
    /// Completes on arrival, or promptly after `cancellation` is cancelled
    async fn move_to(
        &self,
        target: Position,
        cancellation: &CancellationToken,
    ) -> Result<MotionOutcome, MotionError>;
}

/// Moves in a straight line at a constant distance per tick
pub struct LinearMotionExecutor {
    transform: Transform,
    speed: F,
}

impl LinearMotionExecutor {
    pub fn new(transform: Transform, speed: F) -> Self {
        debug_assert!(speed > 0.0);
        Self { transform, speed }
    }
}

#[async_trait(?Send)]
impl MotionExecutor for LinearMotionExecutor {
    async fn move_to(
        &self,
        target: Position,
        cancellation: &CancellationToken,
    ) -> Result<MotionOutcome, MotionError> {
        if !target.is_finite_position() {
            return Err(MotionError::InvalidTarget(target));
        }

        loop {
            if cancellation.is_cancelled() {
                trace!("motion cancelled"; "position" => ?self.transform.position());
                return Ok(MotionOutcome::Cancelled);
            }

            let current = self.transform.position();
            let delta = target - current;
            let distance = delta.magnitude();

            if distance <= self.speed {
                self.transform.set_position(target);
                return Ok(MotionOutcome::Arrived);
            }

            self.transform
                .set_position(current + delta * (self.speed / distance));
            yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::runtime::Runtime;

    fn spawn_move(
        runtime: &Runtime,
        motion: Rc<LinearMotionExecutor>,
        target: Position,
        token: CancellationToken,
    ) -> Rc<Cell<Option<Result<MotionOutcome, MotionError>>>> {
        let result = Rc::new(Cell::new(None));
        let result2 = result.clone();
        runtime.spawn(async move {
            result2.set(Some(motion.move_to(target, &token).await));
        });
        result
    }

    #[test]
    fn moves_speed_per_tick() {
        let runtime = Runtime::default();
        let transform = Transform::new(Position::zero());
        let motion = Rc::new(LinearMotionExecutor::new(transform.clone(), 0.5));

        let result = spawn_move(
            &runtime,
            motion,
            Position::new(2.0, 0.0, 0.0),
            CancellationToken::default(),
        );

        runtime.tick();
        assert!(transform.position().x.approx_eq(0.5, (1e-5, 2)));

        runtime.tick();
        assert!(transform.position().x.approx_eq(1.0, (1e-5, 2)));

        let ticks = runtime.run_until_idle(10);
        assert_eq!(ticks, 2);
        assert_eq!(transform.position(), Position::new(2.0, 0.0, 0.0));

        let result = result.take();
        assert_eq!(result, Some(Ok(MotionOutcome::Arrived)));
    }

    #[test]
    fn stops_when_cancelled() {
        let runtime = Runtime::default();
        let transform = Transform::new(Position::zero());
        let motion = Rc::new(LinearMotionExecutor::new(transform.clone(), 1.0));
        let token = CancellationToken::default();

        let result = spawn_move(
            &runtime,
            motion,
            Position::new(0.0, 0.0, 10.0),
            token.clone(),
        );

        runtime.tick();
        runtime.tick();
        token.cancel();
        runtime.run_until_idle(10);

        assert_eq!(result.take(), Some(Ok(MotionOutcome::Cancelled)));
        let pos = transform.position();
        assert!(pos.z.approx_eq(2.0, (1e-5, 2)), "stopped at {:?}", pos);
    }

    #[test]
    fn rejects_invalid_target() {
        let runtime = Runtime::default();
        let transform = Transform::new(Position::zero());
        let motion = Rc::new(LinearMotionExecutor::new(transform.clone(), 1.0));

        let target = Position::new(F::NAN, 0.0, 0.0);
        let result = spawn_move(&runtime, motion, target, CancellationToken::default());
        runtime.run_until_idle(10);

        assert!(matches!(
            result.take(),
            Some(Err(MotionError::InvalidTarget(_)))
        ));
        assert_eq!(transform.position(), Position::zero());
    }
}
