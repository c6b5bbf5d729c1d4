use std::cell::RefCell;

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};

use common::*;

use crate::broadcast::PathUpdate;
use crate::unit::UnitId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Update for {unit} was lost by {lost} of {observers} observers")]
    Lost {
        unit: UnitId,
        lost: usize,
        observers: usize,
    },
}

/// Best-effort delivery of path updates to every observer of a unit
pub trait PathTransport {
    fn send(&self, update: &PathUpdate) -> Result<(), TransportError>;
}

/// In-process observers, each receiving updates over its own unbounded channel. Observers whose
/// receiver has been dropped are forgotten on the next send
#[derive(Default)]
pub struct ObserverSet {
    observers: RefCell<Vec<UnboundedSender<PathUpdate>>>,
}

impl ObserverSet {
    pub fn subscribe(&self) -> UnboundedReceiver<PathUpdate> {
        let (tx, rx) = unbounded();
        self.observers.borrow_mut().push(tx);
        rx
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }
}

impl PathTransport for ObserverSet {
    fn send(&self, update: &PathUpdate) -> Result<(), TransportError> {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|tx| tx.unbounded_send(update.clone()).is_ok());

        let lost = before - observers.len();
        if lost > 0 {
            Err(TransportError::Lost {
                unit: update.unit(),
                lost,
                observers: before,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fans_out_to_all() {
        let observers = ObserverSet::default();
        let mut a = observers.subscribe();
        let mut b = observers.subscribe();

        let update = PathUpdate::new(UnitId(1), Position::new(1.0, 1.0, 1.0));
        observers.send(&update).unwrap();

        assert_eq!(a.try_next().unwrap(), Some(update.clone()));
        assert_eq!(b.try_next().unwrap(), Some(update));
    }

    #[test]
    fn dropped_observer_is_lost() {
        let observers = ObserverSet::default();
        let mut alive = observers.subscribe();
        drop(observers.subscribe());

        let update = PathUpdate::new(UnitId(2), Position::zero());
        let err = observers.send(&update).unwrap_err();
        assert_eq!(
            err,
            TransportError::Lost {
                unit: UnitId(2),
                lost: 1,
                observers: 2
            }
        );

        // still delivered to the live one, and the dead one is forgotten
        assert!(alive.try_next().unwrap().is_some());
        assert_eq!(observers.observer_count(), 1);
        assert!(observers.send(&update).is_ok());
    }
}
