// Library surface for the CLI and integration tests.
pub mod actuator;
pub mod app_dirs;
pub mod clock;
pub mod codec;
pub mod config;
pub mod daily;
pub mod difficulty;
pub mod error;
pub mod keyer;
pub mod lessons;
pub mod phrases;
pub mod practice;
pub mod progress;
pub mod replay;
pub mod scoring;
pub mod selector;
pub mod store;
pub mod timer;
pub mod util;

pub use error::{CoachError, Result};
