use std::cell::Cell;
use std::rc::Rc;

use common::derive_more::{Display, From};
use common::*;

/// Unique identifier of a unit, sent over the wire in path updates
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Display, From)]
#[display(fmt = "U{}", _0)]
pub struct UnitId(pub u64);

logging::slog_kv_debug!(UnitId, "unit");

/// Shared handle to a unit's physical position. Written by the unit's motion executor, read by
/// its path controller when planning and broadcasting
#[derive(Clone)]
pub struct Transform(Rc<Cell<Position>>);

impl Transform {
    pub fn new(position: Position) -> Self {
        Self(Rc::new(Cell::new(position)))
    }

    pub fn position(&self) -> Position {
        self.0.get()
    }

    pub fn set_position(&self, position: Position) {
        self.0.set(position)
    }
}

impl Debug for UnitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "UnitId({})", self.0)
    }
}

impl Debug for Transform {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let pos = self.position();
        write!(f, "Transform({:.2}, {:.2}, {:.2})", pos.x, pos.y, pos.z)
    }
}
