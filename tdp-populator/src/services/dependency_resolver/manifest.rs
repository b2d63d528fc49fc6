//! Version-keyed dependency manifests
//!
//! The manifest is selected from an ordered table keyed by minimum platform
//! version. The last entry whose minimum is at or below the running version
//! wins, so a new platform layout is one more table row.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::PopulateError;

/// Libraries loaded into the process; present in every manifest
pub const CORE_FILES: &[&str] = &[
    "kCura.Relativity.DataReaderClient.dll",
    "kCura.Relativity.ImportAPI.dll",
];

const LEGACY_AUXILIARY_FILES: &[&str] = &[
    "FreeImage.dll",
    "FreeImageNET.dll",
    "itextsharp.dll",
    "kCura.Data.dll",
    "kCura.ImageValidator.dll",
    "kCura.OI.FileID.dll",
    "kCura.Utility.dll",
    "kCura.Windows.Forms.dll",
    "kCura.Windows.Process.dll",
    "kCura.WinEDDS.dll",
    "kCura.WinEDDS.ImportExtension.dll",
    "Relativity.dll",
    "sccfi.dll",
    "sccfut.dll",
    "scclo.dll",
    "sccut.dll",
    "wvcore.dll",
];

const OUTSIDE_IN_AUXILIARY_FILES: &[&str] = &[
    "FreeImage.dll",
    "FreeImageNET.dll",
    "itextsharp.dll",
    "kCura.dll",
    "kCura.ImageValidator.dll",
    "kCura.OI.FileID.dll",
    "kCura.Windows.Forms.dll",
    "kCura.Windows.Process.dll",
    "kCura.WinEDDS.dll",
    "kCura.WinEDDS.ImportExtension.dll",
    "oi.dll",
    "Relativity.dll",
    "oi/cmmap000.bin",
    "oi/oilink.exe",
    "oi/oilink.jar",
    "oi/sccca-R1.dll",
    "oi/sccch-R1.dll",
    "oi/sccda-R1.dll",
    "oi/sccex-R1.dll",
    "oi/sccfa-R1.dll",
    "oi/sccfi-R1.dll",
    "oi/sccfmt-R1.dll",
    "oi/sccfnt-R1.dll",
    "oi/sccfut-R1.dll",
    "oi/sccind-R1.dll",
    "oi/scclo-R1.dll",
    "oi/sccut-R1.dll",
    "oi/wvcore-R1.dll",
];

/// Platform release from which the Outside In layout applies
pub const OUTSIDE_IN_THRESHOLD: PlatformVersion = PlatformVersion::new(9, 5, 253, 62);

/// Manifest table row
pub struct ManifestEntry {
    pub min_version: PlatformVersion,
    pub auxiliary_files: &'static [&'static str],
}

/// Ordered by ascending `min_version`
pub const MANIFEST_TABLE: &[ManifestEntry] = &[
    ManifestEntry {
        min_version: PlatformVersion::new(0, 0, 0, 0),
        auxiliary_files: LEGACY_AUXILIARY_FILES,
    },
    ManifestEntry {
        min_version: OUTSIDE_IN_THRESHOLD,
        auxiliary_files: OUTSIDE_IN_AUXILIARY_FILES,
    },
];

/// Four-part platform version, ordered component-wise
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl PlatformVersion {
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

impl FromStr for PlatformVersion {
    type Err = PopulateError;

    /// Accepts two to four dot-separated numeric components; missing ones are zero
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PopulateError::Configuration(format!("Invalid platform version: {s:?}"));

        let parts = s
            .trim()
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        if !(2..=4).contains(&parts.len()) {
            return Err(invalid());
        }

        let part = |i: usize| parts.get(i).copied().unwrap_or(0);
        Ok(Self::new(part(0), part(1), part(2), part(3)))
    }
}

/// Files required for one platform version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyManifest {
    /// Loaded into the process, in order
    pub core_files: Vec<String>,
    /// Staged alongside the core files but not loaded
    pub auxiliary_files: Vec<String>,
}

impl DependencyManifest {
    /// Core files followed by auxiliary files
    pub fn all_files(&self) -> impl Iterator<Item = &str> {
        self.core_files
            .iter()
            .chain(self.auxiliary_files.iter())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.core_files.len() + self.auxiliary_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Select the manifest for `version`
pub fn resolve_manifest(version: PlatformVersion) -> DependencyManifest {
    let auxiliary = MANIFEST_TABLE
        .iter()
        .filter(|entry| entry.min_version <= version)
        .last()
        .map(|entry| entry.auxiliary_files)
        .unwrap_or(LEGACY_AUXILIARY_FILES);

    DependencyManifest {
        core_files: CORE_FILES.iter().map(|f| f.to_string()).collect(),
        auxiliary_files: auxiliary.iter().map(|f| f.to_string()).collect(),
    }
}
