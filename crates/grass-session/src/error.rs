//! Error types for grass-session.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the grass-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for GRASS session operations
#[derive(Error, Debug)]
pub enum Error {
    // Platform errors
    #[error("unknown platform: '{0}'")]
    UnsupportedPlatform(String),

    // Launcher discovery errors
    #[error(
        "cannot find GRASS GIS start script 'grass{}', set the right one using the GRASSBIN environment variable",
        .version.as_deref().unwrap_or_default()
    )]
    BinaryNotFound { version: Option<String> },

    #[error("GRASS GIS configuration query failed: `{command}`\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    InstallationQueryFailed {
        command: String,
        stdout: String,
        stderr: String,
    },

    #[error(
        "GRASS GIS start script `{}` returned an installation path that does not exist: {}",
        .command,
        .path.display()
    )]
    InstallationPathInvalid { command: String, path: PathBuf },

    // Session errors
    #[error("GRASS paths are not set, GISBASE is missing; prepare the environment before opening a session")]
    EnvironmentNotPrepared,

    #[error(
        "cannot create '{}' with options '{}'; executing `{}`\nGRASS said:\n{}\n{}",
        .path.display(),
        .create_opts,
        .command,
        .stdout,
        .stderr
    )]
    CreationFailed {
        path: PathBuf,
        create_opts: String,
        command: String,
        stdout: String,
        stderr: String,
    },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}
