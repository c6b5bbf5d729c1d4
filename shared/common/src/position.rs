use crate::{MetricSpace, Vector3, F};

/// A point in world space
pub type Position = Vector3;

pub trait PositionExt {
    /// All components are finite, i.e. not NaN or infinite
    fn is_finite_position(&self) -> bool;

    /// Strictly closer than `epsilon`
    fn is_near(&self, other: &Self, epsilon: F) -> bool;
}

impl PositionExt for Position {
    fn is_finite_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    fn is_near(&self, other: &Self, epsilon: F) -> bool {
        self.distance(*other) < epsilon
    }
}
