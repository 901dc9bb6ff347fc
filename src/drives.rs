//! Drive-letter to device-name mapping.
//!
//! Process image paths come back from the kernel in device form
//! (`\Device\HarddiskVolume3\...`). The [`DriveMap`] translates them into the
//! drive-letter form users recognize. Building the map costs one native call
//! per drive, so it is resolved once per batch and shared read-only.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::buffer::{read_wide_multi_string, read_wide_string, DEFAULT_INITIAL_UNITS};
use crate::error::Result;
use crate::native::NativeBoundary;

#[derive(Debug, Clone, PartialEq, Eq)]
struct DriveMapping {
    letter: char,
    device: String,
}

/// Immutable mapping from drive letter to the device name backing it.
///
/// Entries are held longest-device-name-first so that a scan for the first
/// matching prefix can never pick `\Device\HarddiskVolume1` for a path that
/// lives on `\Device\HarddiskVolume10`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveMap {
    entries: Vec<DriveMapping>,
}

impl DriveMap {
    /// Build the map from the OS: read the logical-drive multi-string, then
    /// query every letter's device name. The per-letter queries run
    /// concurrently and none is skipped silently — any failure fails the
    /// whole resolution.
    pub async fn resolve(boundary: &Arc<dyn NativeBoundary>) -> Result<DriveMap> {
        let roots = read_wide_multi_string(
            "GetLogicalDriveStringsW",
            DEFAULT_INITIAL_UNITS,
            |buf| boundary.list_logical_drive_strings(buf),
        )?;

        let lookups = roots.iter().filter_map(|root| root.chars().next()).map(|letter| {
            let boundary = Arc::clone(boundary);
            async move {
                let device =
                    read_wide_string("QueryDosDeviceW", DEFAULT_INITIAL_UNITS, |buf| {
                        boundary.query_device_name(letter, buf)
                    })?;
                Ok((letter, device))
            }
        });

        let map: DriveMap = try_join_all(lookups).await?.into_iter().collect();
        debug!(drives = map.len(), "drive map resolved");
        Ok(map)
    }

    /// Rewrite a device-form path to drive-letter form. The first entry whose
    /// device name prefixes `raw` wins; `None` means no drive backs the path
    /// (network shares, unmounted volumes) and the caller should treat the
    /// path as unknown, not as an error.
    pub fn to_drive_path(&self, raw: &str) -> Option<String> {
        self.entries.iter().find_map(|mapping| {
            raw.strip_prefix(mapping.device.as_str())
                .map(|rest| format!("{}:{}", mapping.letter, rest))
        })
    }

    /// The device name currently mapped for `letter`, if any.
    pub fn device_for(&self, letter: char) -> Option<&str> {
        self.entries
            .iter()
            .find(|m| m.letter == letter)
            .map(|m| m.device.as_str())
    }

    /// Number of mapped drives.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(char, String)> for DriveMap {
    fn from_iter<I: IntoIterator<Item = (char, String)>>(iter: I) -> Self {
        let mut entries: Vec<DriveMapping> = iter
            .into_iter()
            .map(|(letter, device)| DriveMapping { letter, device })
            .collect();
        entries.sort_by(|a, b| b.device.len().cmp(&a.device.len()));
        DriveMap { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(char, &str)]) -> DriveMap {
        pairs
            .iter()
            .map(|&(letter, device)| (letter, device.to_string()))
            .collect()
    }

    #[test]
    fn rewrites_device_prefix_to_drive_letter() {
        let drives = map(&[('C', r"\Device\HarddiskVolume1")]);
        assert_eq!(
            drives.to_drive_path(r"\Device\HarddiskVolume1\Windows\app.exe"),
            Some(r"C:\Windows\app.exe".to_string())
        );
    }

    #[test]
    fn longer_device_names_win_over_their_prefixes() {
        let drives = map(&[
            ('C', r"\Device\HarddiskVolume1"),
            ('D', r"\Device\HarddiskVolume10"),
        ]);
        assert_eq!(
            drives.to_drive_path(r"\Device\HarddiskVolume10\tools\x.exe"),
            Some(r"D:\tools\x.exe".to_string())
        );
        assert_eq!(
            drives.to_drive_path(r"\Device\HarddiskVolume1\tools\x.exe"),
            Some(r"C:\tools\x.exe".to_string())
        );
    }

    #[test]
    fn unmapped_device_is_unknown_not_an_error() {
        let drives = map(&[('C', r"\Device\HarddiskVolume1")]);
        assert_eq!(drives.to_drive_path(r"\Device\Mup\share\x.exe"), None);
    }

    #[test]
    fn device_lookup_by_letter() {
        let drives = map(&[('C', r"\Device\HarddiskVolume1")]);
        assert_eq!(drives.device_for('C'), Some(r"\Device\HarddiskVolume1"));
        assert_eq!(drives.device_for('Z'), None);
    }
}
