use serde::{Deserialize, Serialize};

use common::*;

use crate::unit::UnitId;

/// Upcoming waypoints of a unit, sent to every observer of it.
///
/// Waypoint coordinates are split per axis into `xs`, `ys` and `zs`, which always have the same
/// length.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PathUpdate {
    pub id: u64,

    /// Actual position of the unit when this was sent
    pub x: f32,
    pub y: f32,
    pub z: f32,

    pub xs: Vec<f32>,
    pub ys: Vec<f32>,
    pub zs: Vec<f32>,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("Malformed path update: {0}")]
    Malformed(#[from] ron::Error),

    #[error("Waypoint axes have different lengths ({xs}, {ys}, {zs})")]
    RaggedAxes { xs: usize, ys: usize, zs: usize },
}

impl PathUpdate {
    pub fn new(unit: UnitId, position: Position) -> Self {
        Self {
            id: unit.0,
            x: position.x,
            y: position.y,
            z: position.z,
            ..Self::default()
        }
    }

    pub fn with_capacity(unit: UnitId, position: Position, waypoints: usize) -> Self {
        Self {
            xs: Vec::with_capacity(waypoints),
            ys: Vec::with_capacity(waypoints),
            zs: Vec::with_capacity(waypoints),
            ..Self::new(unit, position)
        }
    }

    pub fn push_waypoint(&mut self, waypoint: Position) {
        self.xs.push(waypoint.x);
        self.ys.push(waypoint.y);
        self.zs.push(waypoint.z);
    }

    pub fn unit(&self) -> UnitId {
        UnitId(self.id)
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }

    pub fn waypoints(&self) -> impl Iterator<Item = Position> + '_ {
        self.xs
            .iter()
            .zip(&self.ys)
            .zip(&self.zs)
            .map(|((&x, &y), &z)| Position::new(x, y, z))
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn encode(&self) -> Result<String, WireError> {
        Ok(ron::ser::to_string(self)?)
    }

    pub fn decode(s: &str) -> Result<Self, WireError> {
        let update: Self = ron::de::from_str(s)?;
        let (xs, ys, zs) = (update.xs.len(), update.ys.len(), update.zs.len());
        if xs != ys || xs != zs {
            return Err(WireError::RaggedAxes { xs, ys, zs });
        }

        Ok(update)
    }
}
