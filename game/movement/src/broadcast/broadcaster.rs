use std::rc::Rc;

use common::*;

use crate::broadcast::{PathTransport, PathUpdate};
use crate::unit::UnitId;

/// Sends windows of upcoming waypoints to observers
#[derive(Clone)]
pub struct PathBroadcaster {
    transport: Rc<dyn PathTransport>,
}

impl PathBroadcaster {
    pub fn new(transport: Rc<dyn PathTransport>) -> Self {
        Self { transport }
    }

    /// Up to `window` waypoints from `path[start..]`, stopping early at the end of the path
    pub fn build_update(
        unit: UnitId,
        position: Position,
        path: &[Position],
        start: usize,
        window: usize,
    ) -> PathUpdate {
        let waypoints = path.iter().skip(start).take(window);
        let mut update = PathUpdate::with_capacity(unit, position, waypoints.len());
        waypoints.for_each(|&p| update.push_waypoint(p));
        update
    }

    /// Delivery failures are logged and never retried, the next window carries the then-current
    /// position for observers to resync from
    pub fn broadcast(
        &self,
        unit: UnitId,
        position: Position,
        path: &[Position],
        start: usize,
        window: usize,
    ) {
        let update = Self::build_update(unit, position, path, start, window);
        trace!("broadcasting path update"; unit, "from" => start, "waypoints" => update.len());

        if let Err(err) = self.transport.send(&update) {
            warn!("path update was not delivered"; unit, "error" => %err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::broadcast::TransportError;

    fn path(n: usize) -> Vec<Position> {
        (0..n).map(|i| Position::new(i as F, 0.0, 0.0)).collect()
    }

    #[test]
    fn full_window() {
        let update = PathBroadcaster::build_update(
            UnitId(1),
            Position::new(0.2, 0.0, 0.0),
            &path(10),
            4,
            3,
        );

        assert_eq!(update.xs, vec![4.0, 5.0, 6.0]);
        assert_eq!(update.ys, vec![0.0; 3]);
        assert_eq!(update.zs, vec![0.0; 3]);
        assert_eq!(update.position(), Position::new(0.2, 0.0, 0.0));
        assert_eq!(update.unit(), UnitId(1));
    }

    #[test]
    fn partial_window_at_end() {
        let update = PathBroadcaster::build_update(UnitId(1), Position::zero(), &path(6), 4, 3);
        assert_eq!(update.xs, vec![4.0, 5.0]);

        let update = PathBroadcaster::build_update(UnitId(1), Position::zero(), &path(6), 9, 3);
        assert!(update.is_empty());
    }

    struct FlakyTransport {
        sent: RefCell<Vec<PathUpdate>>,
        attempts: RefCell<usize>,
    }

    impl PathTransport for FlakyTransport {
        fn send(&self, update: &PathUpdate) -> Result<(), TransportError> {
            *self.attempts.borrow_mut() += 1;
            if update.xs.first() == Some(&1.0) {
                return Err(TransportError::Lost {
                    unit: update.unit(),
                    lost: 1,
                    observers: 1,
                });
            }
            self.sent.borrow_mut().push(update.clone());
            Ok(())
        }
    }

    #[test]
    fn lost_updates_are_not_retried() {
        logging::for_tests();
        let transport = Rc::new(FlakyTransport {
            sent: RefCell::new(vec![]),
            attempts: RefCell::new(0),
        });
        let broadcaster = PathBroadcaster::new(transport.clone());
        let path = path(7);

        broadcaster.broadcast(UnitId(5), Position::zero(), &path, 1, 3);
        broadcaster.broadcast(UnitId(5), Position::new(3.0, 0.0, 0.0), &path, 4, 3);

        assert_eq!(*transport.attempts.borrow(), 2);
        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].xs, vec![4.0, 5.0, 6.0]);
        assert_eq!(sent[0].x, 3.0);
    }
}
