//! External muxing capability
//!
//! The pipeline never touches audio/video samples itself; compositing and
//! DASH chapter muxing are delegated to an external tool addressed by file
//! paths and time offsets. The trait + CLI + no-op triple allows graceful
//! degradation when no binary is installed and easy mocking in tests.

mod cli;
mod noop;
mod traits;

pub use cli::CliMuxer;
pub use noop::NoOpMuxer;
pub use traits::{Muxer, MuxerCapabilities};
