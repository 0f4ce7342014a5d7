//! Semantic versions and the API admission gate
//!
//! Versions follow `major.minor.patch[-prerelease][+build]`. Ordering compares
//! the numeric core first, ranks a release above any prerelease of the same
//! core, and compares two prereleases as plain strings. Build metadata is kept
//! for display but never takes part in ordering or equality.

use std::cmp::Ordering;
use std::ffi::CStr;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Incompatibility, VersionError};

macro_rules! current_api_version {
    () => {
        "1.0.0"
    };
}

/// API version this host implements
pub const CURRENT_API_VERSION: &str = current_api_version!();

/// [`CURRENT_API_VERSION`] as a C string, for the exported version symbol
pub const CURRENT_API_VERSION_CSTR: &CStr =
    match CStr::from_bytes_with_nul(concat!(current_api_version!(), "\0").as_bytes()) {
        Ok(s) => s,
        Err(_) => panic!("API version contains a NUL byte"),
    };

/// Oldest plugin API version the host admits
pub const MIN_API_VERSION: &str = "1.0.0";

/// Newest plugin API version the host admits
pub const MAX_API_VERSION: &str = "1.99.99";

const MIN_API: Version = release(MIN_API_VERSION);
const MAX_API: Version = release(MAX_API_VERSION);

/// Numeric core of a `major.minor.patch` constant, evaluated at compile time
const fn release(s: &str) -> Version {
    let bytes = s.as_bytes();
    let mut parts = [0u64; 3];
    let mut part = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'.' => {
                part += 1;
                assert!(part < 3, "too many version components");
            }
            b @ b'0'..=b'9' => parts[part] = parts[part] * 10 + (b - b'0') as u64,
            _ => panic!("invalid character in version constant"),
        }
        i += 1;
    }
    assert!(part == 2, "expected 3 version components");
    Version::new(parts[0], parts[1], parts[2])
}

/// A parsed semantic version
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Prerelease identifier, everything after the first `-`
    pub prerelease: Option<String>,
    /// Build metadata, everything after the first `+`
    pub build: Option<String>,
}

impl Version {
    /// Create a release version with no prerelease or build metadata
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a version string
    ///
    /// # Errors
    ///
    /// [`VersionError::InvalidFormat`] when the string is empty, the core does
    /// not have exactly three dot-separated components, or a component is not
    /// a non-negative integer.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        if s.is_empty() {
            return Err(VersionError::invalid(s, "version string cannot be empty"));
        }

        let (rest, build) = match s.split_once('+') {
            Some((rest, build)) => (rest, non_empty(build)),
            None => (s, None),
        };

        let (core, prerelease) = match rest.split_once('-') {
            Some((core, pre)) => (core, non_empty(pre)),
            None => (rest, None),
        };

        let components: Vec<&str> = core.split('.').collect();
        let [major, minor, patch] = components.as_slice() else {
            return Err(VersionError::invalid(
                s,
                format!("expected 3 components, found {}", components.len()),
            ));
        };

        Ok(Self {
            major: parse_component(s, "major", major)?,
            minor: parse_component(s, "minor", minor)?,
            patch: parse_component(s, "patch", patch)?,
            prerelease,
            build,
        })
    }

    /// Whether this is a prerelease
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Check this version against optional inclusive bounds given as strings
    ///
    /// An absent bound imposes no constraint on that side.
    ///
    /// # Errors
    ///
    /// [`VersionError::InvalidFormat`] if a present bound does not parse.
    pub fn is_compatible(
        &self,
        min: Option<&str>,
        max: Option<&str>,
    ) -> Result<bool, VersionError> {
        Ok(VersionRange::parse(min, max)?.contains(self))
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_component(input: &str, label: &str, raw: &str) -> Result<u64, VersionError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::invalid(
            input,
            format!("invalid {label} version '{raw}'"),
        ));
    }
    raw.parse()
        .map_err(|e| VersionError::invalid(input, format!("invalid {label} version '{raw}': {e}")))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Equality and hashing follow `Ord`, so build metadata is ignored here too.
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.prerelease.hash(state);
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Inclusive range with independently optional bounds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<Version>,
    pub max: Option<Version>,
}

impl VersionRange {
    /// Build a range from already parsed bounds
    pub fn new(min: Option<Version>, max: Option<Version>) -> Self {
        Self { min, max }
    }

    /// Build a range from optional bound strings
    ///
    /// Empty strings are treated as absent bounds.
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self, VersionError> {
        let bound = |raw: Option<&str>| {
            raw.filter(|s| !s.is_empty())
                .map(Version::parse)
                .transpose()
        };
        Ok(Self {
            min: bound(min)?,
            max: bound(max)?,
        })
    }

    /// The host's accepted plugin API window
    pub fn api() -> Self {
        Self {
            min: Some(MIN_API),
            max: Some(MAX_API),
        }
    }

    /// Check a version against the range, reporting which side it fell out of
    pub fn check(&self, version: &Version) -> Result<(), VersionError> {
        if let Some(min) = self.min.as_ref().filter(|min| version < *min) {
            return Err(VersionError::IncompatibleVersion {
                version: version.to_string(),
                bound: min.to_string(),
                direction: Incompatibility::TooOld,
            });
        }
        if let Some(max) = self.max.as_ref().filter(|max| version > *max) {
            return Err(VersionError::IncompatibleVersion {
                version: version.to_string(),
                bound: max.to_string(),
                direction: Incompatibility::TooNew,
            });
        }
        Ok(())
    }

    /// Whether the version lies within the range
    pub fn contains(&self, version: &Version) -> bool {
        self.check(version).is_ok()
    }
}

/// Current API version implemented by this host
pub fn current_api_version() -> &'static str {
    CURRENT_API_VERSION
}

/// The admission gate: accept a plugin's declared API version or explain why not
///
/// Returns the parsed version on success.
pub fn check_api_compatibility(plugin_api_version: &str) -> Result<Version, VersionError> {
    let version = Version::parse(plugin_api_version)?;
    VersionRange::api().check(&version)?;
    Ok(version)
}
