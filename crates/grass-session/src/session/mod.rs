//! GRASS session lifecycle.
//!
//! A [`Session`] walks through three states:
//!
//! ```text
//! Constructed ──open()──► Open ──close()──► Closed
//!      │                    │
//!      │  launcher located  │  gisrc + GIS_LOCK present
//!      │  GISBASE resolved  │  in the environment map
//!      │  environment ready │
//! ```
//!
//! Construction is a fail-fast factory: launcher discovery, the installation
//! root query, and environment preparation all happen in [`Session::new`].
//! [`with_session`] pairs `open` and `close` across every exit path.

mod rc;

pub use rc::write_session_rc;

use crate::environment::{
    EnvironmentMap, LocalePolicy, cleanup_environment, prepare_environment, vars,
};
use crate::error::{Error, Result};
use crate::launcher;
use crate::platform::Platform;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The mapset every location always carries.
pub const PERMANENT_MAPSET: &str = "PERMANENT";

/// Configuration for constructing a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Version token for launcher discovery (e.g. `"78"`); `None` probes the
    /// default name and known versions, newest first.
    pub version: Option<String>,
    /// Explicit launcher path, bypassing discovery.
    pub grassbin: Option<PathBuf>,
    /// Environment map the session operates on; `None` snapshots the process
    /// environment.
    pub env: Option<EnvironmentMap>,
    /// Locale variables written during preparation.
    pub locale: LocalePolicy,
    /// Temporary-session policy: recursively delete any location/mapset this
    /// session created when it closes.
    pub auto_remove: bool,
}

/// Arguments for [`Session::open`].
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Database root directory (`GISDBASE`).
    pub gisdb: PathBuf,
    /// Location name.
    pub location: String,
    /// Mapset name; defaults to [`PERMANENT_MAPSET`].
    pub mapset: Option<String>,
    /// Value for the launcher's `-c` flag (`EPSG:code`, a georeferenced
    /// file, `XY`, or an empty string); `None` opens without creating.
    pub create_opts: Option<String>,
}

impl OpenOptions {
    pub fn new(gisdb: impl Into<PathBuf>, location: impl Into<String>) -> Self {
        Self {
            gisdb: gisdb.into(),
            location: location.into(),
            mapset: None,
            create_opts: None,
        }
    }

    pub fn mapset(mut self, mapset: impl Into<String>) -> Self {
        self.mapset = Some(mapset.into());
        self
    }

    pub fn create_opts(mut self, create_opts: impl Into<String>) -> Self {
        self.create_opts = Some(create_opts.into());
        self
    }
}

/// One logical GRASS working context.
#[derive(Debug)]
pub struct Session {
    grassbin: PathBuf,
    gisbase: PathBuf,
    env: EnvironmentMap,
    platform: Platform,
    auto_remove: bool,
    created_path: Option<PathBuf>,
}

impl Session {
    /// Construct a session: locate the launcher, resolve the installation
    /// root, and prepare the environment map. Fails fast if the toolkit
    /// cannot be found.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let platform = Platform::current()?;
        let mut env = config.env.unwrap_or_else(EnvironmentMap::capture);

        let grassbin = match config.grassbin {
            Some(grassbin) => grassbin,
            None => launcher::locate_launcher(config.version.as_deref(), &env, platform)?,
        };
        let gisbase = launcher::installation_root(&grassbin)?;
        prepare_environment(&gisbase, &mut env, platform, config.locale);

        debug!(
            grassbin = %grassbin.display(),
            gisbase = %gisbase.display(),
            "constructed GRASS session"
        );
        Ok(Self {
            grassbin,
            gisbase,
            env,
            platform,
            auto_remove: config.auto_remove,
            created_path: None,
        })
    }

    /// Construct with an empty [`SessionConfig`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(SessionConfig::default())
    }

    /// Path of the launcher this session invokes.
    pub fn grassbin(&self) -> &Path {
        &self.grassbin
    }

    /// Installation root reported by the launcher.
    pub fn gisbase(&self) -> &Path {
        &self.gisbase
    }

    /// The environment map the session operates on, e.g. for spawning GRASS
    /// commands via [`EnvironmentMap::apply_to`].
    pub fn env(&self) -> &EnvironmentMap {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut EnvironmentMap {
        &mut self.env
    }

    /// Whether the session currently holds an open mapset.
    pub fn is_open(&self) -> bool {
        self.env.contains(vars::GISRC)
    }

    /// Open (optionally create first) a mapset.
    ///
    /// With `create_opts` set, creation targets the location level when the
    /// mapset is [`PERMANENT_MAPSET`] and the location directory does not
    /// exist yet (the launcher then creates `PERMANENT` implicitly), and the
    /// mapset level otherwise. Afterwards the lock marker, database root, and
    /// descriptor file are recorded in the environment map.
    pub fn open(&mut self, options: &OpenOptions) -> Result<()> {
        let mapset = options.mapset.as_deref().unwrap_or(PERMANENT_MAPSET);
        let location_path = options.gisdb.join(&options.location);
        let mapset_path = location_path.join(mapset);

        if let Some(create_opts) = &options.create_opts {
            let target = if mapset == PERMANENT_MAPSET && !location_path.exists() {
                &location_path
            } else {
                &mapset_path
            };
            self.create(target, create_opts)?;
        }

        if !self.env.contains(vars::GISBASE) {
            return Err(Error::EnvironmentNotPrepared);
        }

        self.env
            .set(vars::GIS_LOCK, std::process::id().to_string());
        self.env
            .set(vars::GISDBASE, options.gisdb.display().to_string());
        let rc_path = write_session_rc(&options.gisdb, &options.location, mapset)?;
        self.env.set(vars::GISRC, rc_path.display().to_string());

        debug!(
            gisdb = %options.gisdb.display(),
            location = %options.location,
            mapset,
            "opened GRASS session"
        );
        Ok(())
    }

    /// Create a new location or mapset at `target`.
    ///
    /// Under the temporary-session policy the created path is remembered for
    /// deletion on close.
    pub fn create(&mut self, target: &Path, create_opts: &str) -> Result<()> {
        launcher::create_project(&self.grassbin, target, create_opts)?;
        if self.auto_remove {
            self.created_path = Some(target.to_path_buf());
        }
        Ok(())
    }

    /// Close the session.
    ///
    /// Removes the lock marker and descriptor file (if the session was ever
    /// opened), reverses the path-variable preparation, and, under the
    /// temporary-session policy, deletes the created location/mapset tree.
    /// Safe to call on a session that was never opened.
    pub fn close(&mut self) -> Result<()> {
        if let Some(rc_path) = self.env.remove(vars::GISRC) {
            self.env.remove(vars::GIS_LOCK);
            match fs::remove_file(&rc_path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(%rc_path, "descriptor file already gone");
                }
                Err(err) => return Err(err.into()),
            }
        }

        cleanup_environment(&self.gisbase, &mut self.env, self.platform);

        if let Some(created) = self.created_path.take() {
            match fs::remove_dir_all(&created) {
                Ok(()) => debug!(created = %created.display(), "removed temporary session tree"),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

impl Drop for Session {
    /// Backstop for sessions dropped without an explicit [`Session::close`]:
    /// releases the descriptor/lock and any temporary tree, logging instead
    /// of panicking on failure.
    fn drop(&mut self) {
        if self.is_open() || self.created_path.is_some() {
            if let Err(err) = self.close() {
                warn!("closing GRASS session during drop failed: {err}");
            }
        }
    }
}

/// Run `f` inside an opened session, closing on every exit path.
///
/// `close` runs whether `open` or `f` succeeded or failed; an error from the
/// caller's closure takes precedence over a close error.
pub fn with_session<T, F>(session: &mut Session, options: &OpenOptions, f: F) -> Result<T>
where
    F: FnOnce(&mut Session) -> Result<T>,
{
    let outcome = session.open(options).and_then(|()| f(session));
    let closed = session.close();
    let value = outcome?;
    closed?;
    Ok(value)
}
