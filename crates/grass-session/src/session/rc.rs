//! The transient `gisrc` session descriptor file.

use crate::error::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write a fresh, uniquely named `gisrc` file and return its path.
///
/// The file carries the three lines GRASS commands read to find the session:
/// database root, location, and mapset. The caller owns deletion.
pub fn write_session_rc(gisdb: &Path, location: &str, mapset: &str) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new().prefix("gisrc").tempfile()?;
    write!(
        file,
        "GISDBASE: {}\nLOCATION_NAME: {}\nMAPSET: {}\n",
        gisdb.display(),
        location,
        mapset
    )?;
    let (_file, path) = file.keep().map_err(|err| err.error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_rc_file_contents() {
        let rc = write_session_rc(Path::new("/tmp"), "location", "PERMANENT").unwrap();
        let contents = fs::read_to_string(&rc).unwrap();
        assert_eq!(
            contents,
            "GISDBASE: /tmp\nLOCATION_NAME: location\nMAPSET: PERMANENT\n"
        );
        fs::remove_file(&rc).unwrap();
    }

    #[test]
    fn test_rc_paths_are_unique() {
        let first = write_session_rc(Path::new("/tmp"), "loc", "PERMANENT").unwrap();
        let second = write_session_rc(Path::new("/tmp"), "loc", "PERMANENT").unwrap();
        assert_ne!(first, second);
        fs::remove_file(first).unwrap();
        fs::remove_file(second).unwrap();
    }
}
