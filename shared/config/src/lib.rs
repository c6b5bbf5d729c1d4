mod config;
mod load;

pub use crate::config::{Config, Movement, Navigation, Simulation};
pub use load::{get, init, reload, ConfigError, ConfigType};
