pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod forces;
pub mod grid;
pub mod input;
pub mod integrator;
pub mod io;
pub mod node;
pub mod partition;
pub mod population;
pub mod profiler;
pub mod render;
pub mod telemetry;

pub mod app;

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));
