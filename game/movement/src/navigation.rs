use ahash::AHashSet;

use common::derive_more::Display;
use common::*;

/// Identifies a navigation mesh region
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display(fmt = "region {}", _0)]
pub struct RegionId(pub u32);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NavigationError {
    #[error("No path found")]
    NotFound,

    #[error("No such navigation region {0:?}")]
    NoSuchRegion(RegionId),
}

/// Finds routes through a navigation region.
///
/// A successful path starts with the start position and ends at (or near) the goal. Identical
/// queries against an unchanged region must return identical routes.
pub trait PathfindingService {
    fn find_path(
        &self,
        region: RegionId,
        start: Position,
        goal: Position,
    ) -> Result<Vec<Position>, NavigationError>;
}

/// Routes in a straight line through open regions, splitting the line into segments no longer
/// than `max_segment_length`
pub struct StraightLinePathfinder {
    regions: AHashSet<RegionId>,
    max_segment_length: F,
}

impl StraightLinePathfinder {
    /// Longer routes are reported as not found
    pub const MAX_SEGMENTS: usize = 4096;

    pub fn new(regions: impl IntoIterator<Item = RegionId>, max_segment_length: F) -> Self {
        debug_assert!(max_segment_length > 0.0);
        Self {
            regions: regions.into_iter().collect(),
            max_segment_length,
        }
    }

    pub fn from_config(config: &config::Navigation) -> Self {
        Self::new(
            config.regions.iter().copied().map(RegionId),
            config.max_segment_length,
        )
    }
}

impl PathfindingService for StraightLinePathfinder {
    fn find_path(
        &self,
        region: RegionId,
        start: Position,
        goal: Position,
    ) -> Result<Vec<Position>, NavigationError> {
        if !self.regions.contains(&region) {
            return Err(NavigationError::NoSuchRegion(region));
        }

        if !start.is_finite_position() || !goal.is_finite_position() {
            return Err(NavigationError::NotFound);
        }

        let distance = start.distance(goal);
        let segments = (distance / self.max_segment_length).ceil().max(1.0);
        if !(segments <= Self::MAX_SEGMENTS as F) {
            debug!("goal is too far for a straight path"; "distance" => distance, "segments" => segments);
            return Err(NavigationError::NotFound);
        }

        let segments = segments as usize;

        let path = (0..=segments)
            .map(|i| match i {
                i if i == segments => goal,
                i => start.lerp(goal, i as F / segments as F),
            })
            .collect_vec();

        trace!("found straight path"; "region" => %region, "waypoints" => path.len());
        Ok(path)
    }
}
