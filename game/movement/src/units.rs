use std::rc::Rc;

use ahash::AHashMap;

use common::*;

use crate::motion::{LinearMotionExecutor, MotionExecutor};
use crate::path::{MoveError, MoveRequest, PathCollaborators, PathMovementController, PathSettings};
use crate::unit::{Transform, UnitId};

/// A mobile entity
pub struct Unit {
    id: UnitId,
    transform: Transform,
    path: PathMovementController,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnitError {
    #[error("No such unit {0}")]
    NoSuchUnit(UnitId),

    #[error("Move request failed: {0}")]
    Move(#[from] MoveError),
}

/// Owns all units and routes move requests to their path controllers
pub struct Units {
    collaborators: PathCollaborators,
    settings: PathSettings,
    units: AHashMap<UnitId, Unit>,
    next_id: u64,
}

impl Unit {
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.transform.position()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn path(&self) -> &PathMovementController {
        &self.path
    }
}

impl Drop for Unit {
    fn drop(&mut self) {
        // path goes first, its traversal still references the transform and motion
        self.path.teardown();
    }
}

impl Units {
    pub fn new(collaborators: PathCollaborators, settings: PathSettings) -> Self {
        Self {
            collaborators,
            settings,
            units: AHashMap::new(),
            next_id: 1,
        }
    }

    /// `motion` creates the unit's motion executor over its transform
    pub fn spawn(
        &mut self,
        position: Position,
        motion: impl FnOnce(&Transform) -> Rc<dyn MotionExecutor>,
    ) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;

        let transform = Transform::new(position);
        let path = PathMovementController::new(
            id,
            transform.clone(),
            self.settings,
            self.collaborators.clone(),
            motion(&transform),
        );

        debug!("spawned unit"; id, "position" => ?position);
        self.units.insert(
            id,
            Unit {
                id,
                transform,
                path,
            },
        );
        id
    }

    pub fn spawn_linear(&mut self, position: Position, speed: F) -> UnitId {
        self.spawn(position, |transform| {
            Rc::new(LinearMotionExecutor::new(transform.clone(), speed))
        })
    }

    pub fn move_to(&self, unit: UnitId, target: Position) -> Result<MoveRequest, UnitError> {
        let found = self.units.get(&unit).ok_or(UnitError::NoSuchUnit(unit))?;
        Ok(found.path.move_to(target)?)
    }

    /// Tears down the unit's path movement before dropping the rest of it
    pub fn despawn(&mut self, unit: UnitId) -> bool {
        match self.units.remove(&unit) {
            Some(removed) => {
                removed.path.teardown();
                debug!("despawned unit"; unit, "position" => ?removed.position());
                true
            }
            None => false,
        }
    }

    pub fn settings(&self) -> PathSettings {
        self.settings
    }

    /// Pushes new settings to every unit and to units spawned later. Returns false if nothing
    /// changed
    pub fn set_settings(&mut self, settings: PathSettings) -> bool {
        if self.settings == settings {
            return false;
        }

        info!("applying new path settings"; "settings" => ?settings);
        self.settings = settings;
        for unit in self.units.values() {
            unit.path.set_settings(settings);
        }
        true
    }

    pub fn get(&self, unit: UnitId) -> Option<&Unit> {
        self.units.get(&unit)
    }

    /// Sorted by id
    pub fn iter(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.units
            .values()
            .sorted_by_key(|unit| unit.id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn any_moving(&self) -> bool {
        self.units.values().any(|unit| unit.path.is_moving())
    }
}
