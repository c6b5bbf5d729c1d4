use std::borrow::Cow;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arc_swap::{ArcSwap, Guard};
use notify::{watcher, DebouncedEvent, RecursiveMode, Watcher};
use once_cell::sync::OnceCell;

use common::*;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parsing(#[from] ron::de::Error),

    #[error("Failed to watch config file: {0}")]
    Notify(#[from] notify::Error),

    #[error("Path is not a file")]
    NotAFile,

    #[error("Config has already been initialized")]
    AlreadyInitialized,

    #[error("Invalid config: {0}")]
    Invalid(&'static str),
}

type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub enum ConfigType<'a> {
    String(&'a str),
    WatchedFile(&'a Path),
}

static CONFIG: OnceCell<ArcSwap<Config>> = OnceCell::new();

/// Must be called once only, and before [get]
pub fn init(cfg: ConfigType) -> ConfigResult<()> {
    if CONFIG.get().is_some() {
        return Err(ConfigError::AlreadyInitialized);
    }

    // parse config and fail early
    let config = cfg.load()?;

    // watch directory for changes if requested
    if let ConfigType::WatchedFile(path) = cfg {
        start_watcher(path.to_owned())?;
    }

    CONFIG
        .set(ArcSwap::from_pointee(config))
        .map_err(|_| ConfigError::AlreadyInitialized)
}

/// Falls back to the default config if [init] was never called
pub fn get() -> impl Deref<Target = Config> {
    let cfg = CONFIG.get_or_init(|| {
        debug!("config was not initialized, using defaults");
        ArcSwap::from_pointee(Config::default())
    });
    Guard::into_inner(cfg.load())
}

/// Replaces the global instance with the current contents of `path`. On failure the previous
/// instance is kept
pub fn reload(path: &Path) -> ConfigResult<()> {
    let config = ConfigType::WatchedFile(path).load()?;
    match CONFIG.get() {
        Some(cfg) => cfg.store(Arc::new(config)),
        None => {
            let _ = CONFIG.set(ArcSwap::from_pointee(config));
        }
    }

    debug!("swapped config instance");
    Ok(())
}

fn start_watcher(path: PathBuf) -> ConfigResult<()> {
    let watch_dir = path
        .parent()
        .map(|p| p.to_owned())
        .ok_or(ConfigError::NotAFile)?;
    let watch_file = path
        .file_name()
        .map(|s| s.to_owned())
        .ok_or(ConfigError::NotAFile)?;

    let (tx, rx) = channel();
    let mut watcher = watcher(tx, Duration::from_secs(1))?;
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

    thread::Builder::new()
        .name("cfg-watcher".to_owned())
        .spawn(move || {
            let _watcher = watcher; // keep alive
            let is_config = |p: &PathBuf| p.file_name().map(|f| f == watch_file).unwrap_or(false);

            loop {
                let reload = match rx.recv() {
                    Ok(DebouncedEvent::Write(ref p)) if is_config(p) => true,
                    Ok(DebouncedEvent::Remove(ref p)) if is_config(p) => {
                        warn!("config was deleted");
                        true
                    }
                    Ok(DebouncedEvent::Rename(ref a, ref b)) if is_config(a) || is_config(b) => {
                        warn!("config was renamed");
                        true
                    }
                    Ok(_) => false,
                    Err(_) => {
                        debug!("config watcher channel closed");
                        break;
                    }
                };

                if reload {
                    info!("config was modified, reloading");
                    if let Err(e) = self::reload(&path) {
                        warn!("failed to reload config"; "error" => %e);
                    }
                }
            }
        })?;

    Ok(())
}

impl<'a> ConfigType<'a> {
    /// Parses and validates without touching the global instance
    pub fn load(&self) -> ConfigResult<Config> {
        let bytes = match self {
            ConfigType::String(s) => Cow::Borrowed(*s),
            ConfigType::WatchedFile(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotAFile);
                }
                Cow::Owned(std::fs::read_to_string(*path)?)
            }
        };

        let config: Config = ron::de::from_str(&bytes)?;
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> ConfigResult<()> {
    let movement = &config.movement;
    if movement.broadcast_window == 0 {
        return Err(ConfigError::Invalid("broadcast_window must be at least 1"));
    }
    if !(movement.repath_epsilon >= 0.0) {
        return Err(ConfigError::Invalid("repath_epsilon must not be negative"));
    }
    if !(movement.move_speed > 0.0) {
        return Err(ConfigError::Invalid("move_speed must be positive"));
    }
    if !(config.navigation.max_segment_length > 0.0) {
        return Err(ConfigError::Invalid("max_segment_length must be positive"));
    }

    Ok(())
}
