//! Incremental builds of OpenSCAD model directories: staleness checks,
//! compiler orchestration, deterministic preview images and a generated
//! model index.

pub mod build;
pub mod compiler;
pub mod config;
pub mod discovery;
pub mod error;
pub mod index;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod preview;
pub mod scaffold;
pub mod staleness;
pub mod watch;

pub use build::{BuildOutcome, Summary};
pub use config::WatchConfig;
pub use error::{Result, ScadwatchError};
pub use pipeline::Pipeline;
