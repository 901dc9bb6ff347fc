//! Growable-buffer reader for native wide-string calls.
//!
//! Many Win32 string APIs follow the same shape: the caller hands over a
//! fixed-capacity UTF-16 buffer and the call either fills it or signals that
//! the capacity was insufficient. This module owns the capacity negotiation:
//! start small, double on the insufficient-capacity signal, give up at a hard
//! cap, and decode whatever the call wrote as either a single null-terminated
//! string or a null-separated multi-string.
//!
//! The fill call itself is supplied by the caller, so the protocol is reusable
//! across window titles, process image paths, drive strings and device names.

use tracing::trace;

use crate::error::{Error, FillError, Result};

/// Starting capacity (UTF-16 units) for most reads.
pub const DEFAULT_INITIAL_UNITS: usize = 256;

/// Starting capacity for window titles, which routinely exceed 256 units
/// (browser tabs, document editors). Saves one retry in the common case.
pub const TITLE_INITIAL_UNITS: usize = 1024;

/// Hard cap on buffer growth. Doubling stops here; an insufficient-capacity
/// signal at this size fails with [`Error::BufferTooLarge`] instead of
/// negotiating forever.
pub const MAX_READ_UNITS: usize = 1 << 20;

/// Read a single null-terminated wide string through `fill`, growing the
/// buffer until the call stops reporting insufficient capacity.
///
/// `call` names the native operation for diagnostics and error values.
/// Decoding is lossy: unpaired surrogates become replacement characters
/// rather than failing the resolution.
pub fn read_wide_string<F>(call: &'static str, initial: usize, fill: F) -> Result<String>
where
    F: FnMut(&mut [u16]) -> std::result::Result<usize, FillError>,
{
    let (buf, written) = fill_grown(call, initial, fill)?;
    let data = &buf[..written];
    let end = data.iter().position(|&u| u == 0).unwrap_or(data.len());
    Ok(String::from_utf16_lossy(&data[..end]))
}

/// Read a multi-string (null-terminated runs, terminated by an empty run)
/// through `fill`, growing the buffer as in [`read_wide_string`].
///
/// Returns the non-empty runs in order; the terminating empty run is not part
/// of the result.
pub fn read_wide_multi_string<F>(call: &'static str, initial: usize, fill: F) -> Result<Vec<String>>
where
    F: FnMut(&mut [u16]) -> std::result::Result<usize, FillError>,
{
    let (buf, written) = fill_grown(call, initial, fill)?;
    let data = &buf[..written];

    let mut runs = Vec::new();
    let mut start = 0;
    while start < data.len() {
        let rest = &data[start..];
        let end = rest.iter().position(|&u| u == 0).unwrap_or(rest.len());
        if end == 0 {
            // Empty run: the terminating double null.
            break;
        }
        runs.push(String::from_utf16_lossy(&rest[..end]));
        start += end + 1;
    }
    Ok(runs)
}

/// Run the capacity negotiation: allocate, invoke, double on
/// `InsufficientBuffer`, propagate everything else. Returns the buffer and
/// the written length reported by the call (clamped to the buffer).
fn fill_grown<F>(
    call: &'static str,
    initial: usize,
    mut fill: F,
) -> Result<(Vec<u16>, usize)>
where
    F: FnMut(&mut [u16]) -> std::result::Result<usize, FillError>,
{
    let mut len = initial.clamp(1, MAX_READ_UNITS);
    loop {
        let mut buf = vec![0u16; len];
        match fill(&mut buf) {
            Ok(written) => {
                let written = written.min(buf.len());
                return Ok((buf, written));
            }
            Err(FillError::InsufficientBuffer) => {
                if len >= MAX_READ_UNITS {
                    return Err(Error::BufferTooLarge {
                        call,
                        max: MAX_READ_UNITS,
                    });
                }
                let grown = (len * 2).min(MAX_READ_UNITS);
                trace!(call, from = len, to = grown, "growing read buffer");
                len = grown;
            }
            Err(FillError::Native { call, code }) => {
                return Err(Error::Native { call, code });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode `text` into `buf` with a trailing null, or report insufficiency
    /// the way the real boundary calls do.
    fn write_wide(text: &str, buf: &mut [u16]) -> std::result::Result<usize, FillError> {
        let units: Vec<u16> = text.encode_utf16().collect();
        if units.len() + 1 > buf.len() {
            return Err(FillError::InsufficientBuffer);
        }
        buf[..units.len()].copy_from_slice(&units);
        buf[units.len()] = 0;
        Ok(units.len())
    }

    #[test]
    fn single_string_first_attempt() {
        let mut attempts = 0;
        let out = read_wide_string("Test", 64, |buf| {
            attempts += 1;
            write_wide("notepad", buf)
        })
        .unwrap();
        assert_eq!(out, "notepad");
        assert_eq!(attempts, 1);
    }

    #[test]
    fn grows_until_data_fits_and_never_truncates() {
        let long: String = "x".repeat(700);
        let mut attempts = 0;
        let out = read_wide_string("Test", DEFAULT_INITIAL_UNITS, |buf| {
            attempts += 1;
            write_wide(&long, buf)
        })
        .unwrap();
        assert_eq!(out, long);
        // 256 and 512 are too small for 700 units + null, 1024 fits.
        assert_eq!(attempts, 3);
    }

    #[test]
    fn decode_stops_at_first_null() {
        let out = read_wide_string("Test", 16, |buf| {
            buf[0] = 'h' as u16;
            buf[1] = 'i' as u16;
            buf[2] = 0;
            buf[3] = 'j' as u16; // stale data past the terminator
            Ok(8)
        })
        .unwrap();
        assert_eq!(out, "hi");
    }

    #[test]
    fn multi_string_collects_runs_in_order() {
        let out = read_wide_multi_string("Test", 64, |buf| {
            let units: Vec<u16> = "C:\\\0D:\\\0E:\\\0\0".encode_utf16().collect();
            buf[..units.len()].copy_from_slice(&units);
            Ok(units.len())
        })
        .unwrap();
        assert_eq!(out, vec!["C:\\", "D:\\", "E:\\"]);
    }

    #[test]
    fn multi_string_empty_input() {
        let out = read_wide_multi_string("Test", 16, |buf| {
            buf[0] = 0;
            Ok(1)
        })
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn multi_string_tolerates_missing_final_null() {
        // A boundary that reports the written length without the terminating
        // empty run still decodes cleanly.
        let out = read_wide_multi_string("Test", 64, |buf| {
            let units: Vec<u16> = "C:\\\0D:\\".encode_utf16().collect();
            buf[..units.len()].copy_from_slice(&units);
            Ok(units.len())
        })
        .unwrap();
        assert_eq!(out, vec!["C:\\", "D:\\"]);
    }

    #[test]
    fn native_failure_propagates_unchanged() {
        let err = read_wide_string("Test", 16, |_buf| {
            Err(FillError::Native {
                call: "GetWindowTextW",
                code: 5,
            })
        })
        .unwrap_err();
        assert_eq!(
            err,
            Error::Native {
                call: "GetWindowTextW",
                code: 5
            }
        );
    }

    #[test]
    fn growth_is_capped() {
        let mut attempts = 0;
        let err = read_wide_string("Test", DEFAULT_INITIAL_UNITS, |_buf| {
            attempts += 1;
            Err::<usize, _>(FillError::InsufficientBuffer)
        })
        .unwrap_err();
        assert_eq!(
            err,
            Error::BufferTooLarge {
                call: "Test",
                max: MAX_READ_UNITS
            }
        );
        // 256 << 12 == 1 MiB: one attempt per size, then the cap refuses.
        assert_eq!(attempts, 13);
    }
}
