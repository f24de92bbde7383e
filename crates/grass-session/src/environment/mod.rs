//! Environment bookkeeping for GRASS subprocesses.
//!
//! GRASS commands only behave like they would inside an interactive session
//! when a handful of variables point at the installation (search path,
//! shared-library path, Python path, locale). This module owns that
//! bookkeeping on an explicit [`EnvironmentMap`] value rather than the live
//! process environment, so callers can inject an isolated map for tests or
//! concurrent use and hand the result to child processes via
//! [`EnvironmentMap::apply_to`].

use crate::platform::Platform;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Well-known variable names read and written by a GRASS session.
pub mod vars {
    pub const GISBASE: &str = "GISBASE";
    pub const GISRC: &str = "GISRC";
    pub const GISDBASE: &str = "GISDBASE";
    pub const GIS_LOCK: &str = "GIS_LOCK";
    pub const GRASSBIN: &str = "GRASSBIN";
    pub const GRASS_ADDON_BASE: &str = "GRASS_ADDON_BASE";
    pub const GRASS_PYTHON: &str = "GRASS_PYTHON";
    pub const GRASS_SH: &str = "GRASS_SH";
    pub const PATH: &str = "PATH";
    pub const LD_LIBRARY_PATH: &str = "LD_LIBRARY_PATH";
    pub const PYTHONPATH: &str = "PYTHONPATH";
    pub const APPDATA: &str = "APPDATA";
    pub const LANG: &str = "LANG";
    pub const LOCALE: &str = "LOCALE";
    pub const LC_ALL: &str = "LC_ALL";
}

/// Per-user GRASS configuration directory name.
const CONFIG_DIRNAME_UNIX: &str = ".grass7";
const CONFIG_DIRNAME_WINDOWS: &str = "GRASS7";

/// How session locale variables are set during preparation.
///
/// Older GRASS session tooling pinned the plain "C" locale; current behavior
/// is a fixed UTF-8 locale. Both survive as an explicit policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalePolicy {
    /// Set `LANG`, `LOCALE`, and `LC_ALL` to `en_US.UTF-8`.
    #[default]
    Utf8,
    /// Set `LANG` and `LC_ALL` to the plain `C` locale.
    LegacyC,
}

/// An explicit environment value: variable names mapped to values.
///
/// Mutated in place by preparation and cleanup, and applied to child
/// processes with [`apply_to`](Self::apply_to). Never writes back to the
/// process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMap {
    inner: BTreeMap<String, String>,
}

impl EnvironmentMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    pub fn capture() -> Self {
        Self {
            inner: std::env::vars().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.inner.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append `entry` to a path-list variable unless it is already present.
    ///
    /// An unset or empty variable becomes exactly `entry`.
    pub fn append_path(&mut self, var: &str, entry: &str, sep: char) {
        let current = self.inner.get(var).map(String::as_str).unwrap_or("");
        if current.is_empty() {
            self.inner.insert(var.to_string(), entry.to_string());
        } else if !current.split(sep).any(|e| e == entry) {
            let extended = format!("{current}{sep}{entry}");
            self.inner.insert(var.to_string(), extended);
        }
    }

    /// Remove every occurrence of `entry` from a path-list variable.
    ///
    /// Doubled separators collapse as a side effect of re-joining. A variable
    /// left without entries is removed entirely; an absent variable or absent
    /// entry is a no-op.
    pub fn remove_path(&mut self, var: &str, entry: &str, sep: char) {
        let Some(value) = self.inner.get(var) else {
            return;
        };
        let remaining = value
            .split(sep)
            .filter(|e| !e.is_empty() && *e != entry)
            .collect::<Vec<_>>()
            .join(&sep.to_string());
        if remaining.is_empty() {
            self.inner.remove(var);
        } else {
            self.inner.insert(var.to_string(), remaining);
        }
    }

    /// Configure a child process to run with exactly this environment.
    pub fn apply_to(&self, command: &mut Command) {
        command.env_clear();
        command.envs(self.inner.iter());
    }
}

impl FromIterator<(String, String)> for EnvironmentMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

static STARTUP_ENV: OnceLock<EnvironmentMap> = OnceLock::new();

/// Pristine snapshot of the process environment, taken before any session
/// preparation mutated anything.
///
/// Launcher invocations (configuration queries, location creation) always run
/// under this snapshot so repeated queries are unaffected by prior
/// preparation.
pub fn startup_environment() -> &'static EnvironmentMap {
    STARTUP_ENV.get_or_init(EnvironmentMap::capture)
}

/// The path fragments preparation manages for one installation root.
///
/// Computed by a single helper so preparation and cleanup cannot drift apart.
struct ManagedPaths {
    search_entries: Vec<String>,
    lib_dir: String,
    python_dir: String,
    addon_base: Option<PathBuf>,
}

fn managed_paths(gisbase: &Path, platform: Platform, env: &EnvironmentMap) -> ManagedPaths {
    let home = dirs::home_dir();
    let addon_base = if platform.is_windows() {
        env.get(vars::APPDATA)
            .map(|appdata| Path::new(appdata).join(CONFIG_DIRNAME_WINDOWS).join("addons"))
    } else {
        home.as_deref()
            .map(|home| home.join(CONFIG_DIRNAME_UNIX).join("addons"))
    };

    let mut search_entries = vec![
        gisbase.join("bin").display().to_string(),
        gisbase.join("scripts").display().to_string(),
    ];
    if let Some(home) = &home {
        search_entries.push(
            home.join(CONFIG_DIRNAME_UNIX)
                .join("addons")
                .join("scripts")
                .display()
                .to_string(),
        );
    }
    if platform.is_windows() {
        search_entries.push(gisbase.join("extrabin").display().to_string());
    }
    if let Some(addon_base) = &addon_base {
        search_entries.push(addon_base.join("bin").display().to_string());
        if !platform.is_windows() {
            search_entries.push(addon_base.join("scripts").display().to_string());
        }
    }

    ManagedPaths {
        search_entries,
        lib_dir: gisbase.join("lib").display().to_string(),
        python_dir: gisbase.join("etc").join("python").display().to_string(),
        addon_base,
    }
}

/// Point an environment map at a GRASS installation.
///
/// Sets `GISBASE`, extends the search path with the installation and add-on
/// directories, defaults `GRASS_PYTHON` (and, on Windows, `GRASS_SH`),
/// extends `LD_LIBRARY_PATH` and `PYTHONPATH`, and pins the locale per
/// `locale`. Every path-list append is membership-checked, so re-applying the
/// preparation to the same map is a no-op.
pub fn prepare_environment(
    gisbase: &Path,
    env: &mut EnvironmentMap,
    platform: Platform,
    locale: LocalePolicy,
) {
    let sep = platform.path_list_separator();
    let paths = managed_paths(gisbase, platform, env);

    env.set(vars::GISBASE, gisbase.display().to_string());

    for entry in &paths.search_entries {
        env.append_path(vars::PATH, entry, sep);
    }

    if !env.contains(vars::GRASS_PYTHON) {
        let python = if platform.is_windows() {
            "python3.exe"
        } else {
            "python3"
        };
        env.set(vars::GRASS_PYTHON, python);
    }
    if platform.is_windows() {
        env.set(
            vars::GRASS_SH,
            gisbase
                .join("msys")
                .join("bin")
                .join("sh.exe")
                .display()
                .to_string(),
        );
    }

    match &paths.addon_base {
        Some(addon_base) => {
            env.set(vars::GRASS_ADDON_BASE, addon_base.display().to_string());
        }
        None => warn!("cannot determine the add-on base directory, skipping add-on paths"),
    }

    env.append_path(vars::LD_LIBRARY_PATH, &paths.lib_dir, sep);
    env.append_path(vars::PYTHONPATH, &paths.python_dir, sep);

    match locale {
        LocalePolicy::Utf8 => {
            env.set(vars::LANG, "en_US.UTF-8");
            env.set(vars::LOCALE, "en_US.UTF-8");
            env.set(vars::LC_ALL, "en_US.UTF-8");
        }
        LocalePolicy::LegacyC => {
            env.set(vars::LANG, "C");
            env.set(vars::LC_ALL, "C");
        }
    }

    debug!(gisbase = %gisbase.display(), "prepared GRASS environment");
}

/// Strip everything [`prepare_environment`] added to the path-list variables.
///
/// Installation and add-on entries leave the search path, the installation's
/// `lib` directory leaves `LD_LIBRARY_PATH`, and its embedded Python support
/// directory leaves `PYTHONPATH`. Absent fragments are tolerated, so the
/// function is safe to call on a map that was never prepared.
pub fn cleanup_environment(gisbase: &Path, env: &mut EnvironmentMap, platform: Platform) {
    let sep = platform.path_list_separator();
    let paths = managed_paths(gisbase, platform, env);

    for entry in &paths.search_entries {
        env.remove_path(vars::PATH, entry, sep);
    }
    env.remove_path(vars::LD_LIBRARY_PATH, &paths.lib_dir, sep);
    env.remove_path(vars::PYTHONPATH, &paths.python_dir, sep);

    debug!(gisbase = %gisbase.display(), "cleaned GRASS environment");
}
