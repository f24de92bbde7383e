//! Host platform identification.
//!
//! GRASS start scripts behave differently per platform (executable
//! extensions, bundled shell, path-list separator), so the rest of the crate
//! branches on a fixed enumeration rather than raw OS strings.

use crate::error::{Error, Result};
use std::fmt;

/// The platforms a GRASS installation can be driven on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Win32,
    Linux,
    Solaris,
    HpUx,
    Aix,
    Darwin,
    FreeBsd,
    OpenBsd,
    NetBsd,
}

impl Platform {
    /// Map a platform identifier string to the known set.
    ///
    /// `win32` and `darwin` match exactly; everything else matches on prefix
    /// (`sunos*` identifies Solaris). Unrecognized identifiers fail with
    /// [`Error::UnsupportedPlatform`].
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        if identifier == "win32" {
            Ok(Self::Win32)
        } else if identifier.starts_with("linux") {
            Ok(Self::Linux)
        } else if identifier.starts_with("sunos") {
            Ok(Self::Solaris)
        } else if identifier.starts_with("hp-ux") {
            Ok(Self::HpUx)
        } else if identifier.starts_with("aix") {
            Ok(Self::Aix)
        } else if identifier == "darwin" {
            Ok(Self::Darwin)
        } else if identifier.starts_with("freebsd") {
            Ok(Self::FreeBsd)
        } else if identifier.starts_with("openbsd") {
            Ok(Self::OpenBsd)
        } else if identifier.starts_with("netbsd") {
            Ok(Self::NetBsd)
        } else {
            Err(Error::UnsupportedPlatform(identifier.to_string()))
        }
    }

    /// Identify the platform this process is running on.
    pub fn current() -> Result<Self> {
        match std::env::consts::OS {
            "windows" => Ok(Self::Win32),
            "linux" => Ok(Self::Linux),
            "solaris" | "illumos" => Ok(Self::Solaris),
            "aix" => Ok(Self::Aix),
            "macos" => Ok(Self::Darwin),
            "freebsd" => Ok(Self::FreeBsd),
            "openbsd" => Ok(Self::OpenBsd),
            "netbsd" => Ok(Self::NetBsd),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Whether this is the Windows family.
    pub fn is_windows(self) -> bool {
        self == Self::Win32
    }

    /// Separator used in PATH-like variable values.
    pub fn path_list_separator(self) -> char {
        if self.is_windows() { ';' } else { ':' }
    }

    /// Canonical identifier string.
    pub fn name(self) -> &'static str {
        match self {
            Self::Win32 => "win32",
            Self::Linux => "linux",
            Self::Solaris => "solaris",
            Self::HpUx => "hp-ux",
            Self::Aix => "aix",
            Self::Darwin => "darwin",
            Self::FreeBsd => "freebsd",
            Self::OpenBsd => "openbsd",
            Self::NetBsd => "netbsd",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_mapping() {
        let cases = [
            ("win32", Platform::Win32),
            ("linux-unknown", Platform::Linux),
            ("sunos-unknown", Platform::Solaris),
            ("hp-ux-unknown", Platform::HpUx),
            ("aix-unknown", Platform::Aix),
            ("darwin", Platform::Darwin),
            ("freebsd-unknown", Platform::FreeBsd),
            ("openbsd-unknown", Platform::OpenBsd),
            ("netbsd-unknown", Platform::NetBsd),
        ];
        for (identifier, expected) in cases {
            assert_eq!(Platform::from_identifier(identifier).unwrap(), expected);
        }
    }

    #[test]
    fn test_exact_match_only_for_win32_and_darwin() {
        assert!(Platform::from_identifier("win32-extra").is_err());
        assert!(Platform::from_identifier("darwin-extra").is_err());
    }

    #[test]
    fn test_unknown_platform() {
        let err = Platform::from_identifier("redox").unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(ref p) if p == "redox"));
    }

    #[test]
    fn test_current_is_supported() {
        // The test host itself must be in the known set.
        Platform::current().unwrap();
    }

    #[test]
    fn test_separator() {
        assert_eq!(Platform::Win32.path_list_separator(), ';');
        assert_eq!(Platform::Linux.path_list_separator(), ':');
    }
}
