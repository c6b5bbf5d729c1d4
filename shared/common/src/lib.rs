pub use cgmath;
pub use cgmath::{InnerSpace, MetricSpace, VectorSpace, Zero};
pub use float_cmp::ApproxEq;
pub use itertools::*;

pub use logging;
pub use logging::prelude::*;

pub use derive_more;
pub use thiserror::Error;

pub use std::error::Error;
pub use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

pub use position::{Position, PositionExt};

pub type F = f32;
pub type Vector3 = cgmath::Vector3<F>;

mod position;
