//! Locating and invoking the GRASS GIS start script.
//!
//! Provides the three launcher interactions a session needs:
//! - Discovery of the start script (override variable or PATH scan)
//! - Installation-root query (`grass --config path`)
//! - Location/mapset creation (`grass -c <opts> -e <path>`)
//!
//! Every invocation runs under the pristine startup environment snapshot,
//! never the prepared session map.

use crate::environment::{EnvironmentMap, startup_environment, vars};
use crate::error::{Error, Result};
use crate::platform::Platform;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Version tokens probed when no explicit version is requested, newest first.
const KNOWN_VERSIONS: &[&str] = &["78", "76", "74"];

/// Extensions accepted as executables on the Windows family.
const WINDOWS_EXEC_EXTENSIONS: &[&str] = &["py", "bat", "exe"];

/// Whether `path` points to a file the platform will execute.
///
/// On the Windows family only the `.py`/`.bat`/`.exe` extensions count,
/// regardless of any filesystem execute bit.
pub fn is_executable(path: &Path, platform: Platform) -> bool {
    if !path.is_file() {
        return false;
    }
    if platform.is_windows() {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                WINDOWS_EXEC_EXTENSIONS.contains(&ext.as_str())
            })
    } else {
        has_execute_permission(path)
    }
}

#[cfg(unix)]
fn has_execute_permission(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn has_execute_permission(_path: &Path) -> bool {
    true
}

/// Find the GRASS start script to invoke.
///
/// The `GRASSBIN` variable in `env` wins and is returned verbatim without an
/// existence check. Otherwise the map's `PATH` is scanned for `grass<version>`
/// when a version was requested, or for `grass` followed by the known version
/// tokens newest first. Multiple hits for one candidate are resolved by
/// taking the lexicographically last path.
pub fn locate_launcher(
    version: Option<&str>,
    env: &EnvironmentMap,
    platform: Platform,
) -> Result<PathBuf> {
    if let Some(grassbin) = env.get(vars::GRASSBIN) {
        debug!(grassbin, "using launcher from GRASSBIN override");
        return Ok(PathBuf::from(grassbin));
    }

    let candidates: Vec<String> = match version {
        Some(version) => vec![format!("grass{version}")],
        None => std::iter::once("grass".to_string())
            .chain(KNOWN_VERSIONS.iter().map(|v| format!("grass{v}")))
            .collect(),
    };

    let search_path = env.get(vars::PATH).unwrap_or_default();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    for candidate in &candidates {
        let mut names = vec![candidate.clone()];
        if platform.is_windows() {
            names.extend(
                WINDOWS_EXEC_EXTENSIONS
                    .iter()
                    .map(|ext| format!("{candidate}.{ext}")),
            );
        }

        let mut matches: Vec<PathBuf> = Vec::new();
        for name in &names {
            if let Ok(found) = which::which_in_all(name, Some(search_path), &cwd) {
                matches.extend(found.filter(|path| is_executable(path, platform)));
            }
        }
        matches.sort();
        if let Some(found) = matches.pop() {
            debug!(launcher = %found.display(), "found GRASS launcher on PATH");
            return Ok(found);
        }
    }

    Err(Error::BinaryNotFound {
        version: version.map(String::from),
    })
}

/// Query the start script for the installation root (`GISBASE`).
pub fn installation_root(grassbin: &Path) -> Result<PathBuf> {
    let rendered = format!("{} --config path", grassbin.display());
    let mut command = Command::new(grassbin);
    command.args(["--config", "path"]);
    startup_environment().apply_to(&mut command);

    let output = command.output()?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(Error::InstallationQueryFailed {
            command: rendered,
            stdout,
            stderr,
        });
    }

    let gisbase = PathBuf::from(stdout.trim());
    if !gisbase.exists() {
        return Err(Error::InstallationPathInvalid {
            command: rendered,
            path: gisbase,
        });
    }
    debug!(gisbase = %gisbase.display(), "resolved GRASS installation root");
    Ok(gisbase)
}

/// Create a new location or mapset at `target` and exit.
///
/// `create_opts` is the value of the launcher's `-c` flag (an EPSG code, a
/// georeferenced file, `XY`, or an empty string for an unreferenced mapset);
/// a non-empty string is whitespace-split into arguments. The directory tree
/// the launcher creates at `target` is owned by GRASS.
pub fn create_project(grassbin: &Path, target: &Path, create_opts: &str) -> Result<()> {
    let mut args: Vec<String> = vec!["-c".to_string()];
    args.extend(create_opts.split_whitespace().map(String::from));
    args.push("-e".to_string());
    args.push(target.display().to_string());

    let rendered = format!("{} {}", grassbin.display(), args.join(" "));
    let mut command = Command::new(grassbin);
    command.args(&args);
    startup_environment().apply_to(&mut command);

    let output = command.output()?;
    if !output.status.success() {
        return Err(Error::CreationFailed {
            path: target.to_path_buf(),
            create_opts: create_opts.to_string(),
            command: rendered,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    debug!(target = %target.display(), create_opts, "created location/mapset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_without_existence_check() {
        let mut env = EnvironmentMap::new();
        env.set(vars::GRASSBIN, "grass10k");
        let launcher = locate_launcher(None, &env, Platform::Linux).unwrap();
        assert_eq!(launcher, PathBuf::from("grass10k"));
    }

    #[test]
    fn test_not_found_carries_requested_version() {
        let mut env = EnvironmentMap::new();
        env.set(vars::PATH, "");
        let err = locate_launcher(Some("76"), &env, Platform::Linux).unwrap_err();
        match err {
            Error::BinaryNotFound { version } => assert_eq!(version.as_deref(), Some("76")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn write_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            path
        }

        fn path_env(dirs: &[&Path]) -> EnvironmentMap {
            let mut env = EnvironmentMap::new();
            let value: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
            env.set(vars::PATH, value.join(":"));
            env
        }

        #[test]
        fn test_is_executable_requires_exec_bit() {
            let dir = TempDir::new().unwrap();
            let script = write_file(dir.path(), "grass", 0o755);
            let plain = write_file(dir.path(), "notes.txt", 0o644);
            assert!(is_executable(&script, Platform::Linux));
            assert!(!is_executable(&plain, Platform::Linux));
            assert!(!is_executable(dir.path(), Platform::Linux));
        }

        #[test]
        fn test_windows_rule_checks_extension() {
            let dir = TempDir::new().unwrap();
            let bat = write_file(dir.path(), "grass78.bat", 0o644);
            let bare = write_file(dir.path(), "grass78", 0o755);
            assert!(is_executable(&bat, Platform::Win32));
            assert!(!is_executable(&bare, Platform::Win32));
        }

        #[test]
        fn test_discovery_prefers_newest_known_version() {
            let dir = TempDir::new().unwrap();
            write_file(dir.path(), "grass74", 0o755);
            let expected = write_file(dir.path(), "grass76", 0o755);
            // Present but not executable, so skipped even though newer.
            write_file(dir.path(), "grass78", 0o644);

            let env = path_env(&[dir.path()]);
            let launcher = locate_launcher(None, &env, Platform::Linux).unwrap();
            assert_eq!(launcher, expected);
        }

        #[test]
        fn test_requested_version_is_exact() {
            let dir = TempDir::new().unwrap();
            write_file(dir.path(), "grass74", 0o755);
            let env = path_env(&[dir.path()]);

            let launcher = locate_launcher(Some("74"), &env, Platform::Linux).unwrap();
            assert_eq!(launcher, dir.path().join("grass74"));

            assert!(matches!(
                locate_launcher(Some("76"), &env, Platform::Linux),
                Err(Error::BinaryNotFound { .. })
            ));
        }

        #[test]
        fn test_multiple_matches_pick_lexicographically_last() {
            let first = TempDir::new().unwrap();
            let second = TempDir::new().unwrap();
            let a = write_file(first.path(), "grass", 0o755);
            let b = write_file(second.path(), "grass", 0o755);

            let env = path_env(&[first.path(), second.path()]);
            let launcher = locate_launcher(None, &env, Platform::Linux).unwrap();
            assert_eq!(launcher, std::cmp::max(a, b));
        }
    }
}
