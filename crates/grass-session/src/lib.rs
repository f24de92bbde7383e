//! grass-session - run GRASS GIS commands without starting GRASS
//!
//! Sets up (and tears down) everything a GRASS GIS command needs to run as a
//! plain subprocess, as if it were invoked inside an interactive session:
//!
//! - **platform**: host platform identification
//! - **launcher**: locating and invoking the GRASS start script
//! - **environment**: the explicit environment map and its preparation
//! - **session**: the open/close lifecycle, descriptor file, and scoped use
//!
//! ```no_run
//! use grass_session::{OpenOptions, Session, SessionConfig, with_session};
//! use std::process::Command;
//!
//! # fn main() -> grass_session::Result<()> {
//! let mut session = Session::new(SessionConfig::default())?;
//! let options = OpenOptions::new("/data/grassdata", "nc")
//!     .create_opts("EPSG:3035");
//! with_session(&mut session, &options, |session| {
//!     let mut command = Command::new("g.region");
//!     command.arg("-p");
//!     session.env().apply_to(&mut command);
//!     let output = command.output()?;
//!     println!("{}", String::from_utf8_lossy(&output.stdout));
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod environment;
pub mod error;
pub mod launcher;
pub mod platform;
pub mod session;

// Re-export commonly used types
pub use environment::{
    EnvironmentMap, LocalePolicy, cleanup_environment, prepare_environment, startup_environment,
    vars,
};
pub use error::{Error, Result};
pub use platform::Platform;
pub use session::{
    OpenOptions, PERMANENT_MAPSET, Session, SessionConfig, with_session, write_session_rc,
};
