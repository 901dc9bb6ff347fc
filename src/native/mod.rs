//! The native call boundary.
//!
//! Everything the resolution engine needs from the operating system is
//! expressed as the [`NativeBoundary`] trait: window enumeration, the
//! per-window queries, process handle management, and the drive/device
//! lookups. The engine itself is platform-neutral; [`Win32Boundary`] is the
//! real implementation on Windows, and tests script their own.
//!
//! Buffer-filling calls return [`FillError`] so the growable reader can tell
//! "buffer too small, retry bigger" apart from real failures.

use crate::error::{Error, FillError};
use crate::record::WindowHandle;

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use win32::Win32Boundary;

/// An open handle to a process, scoped to one image-path read.
///
/// Opaque to the engine; only the boundary that produced it can interpret it.
/// The engine guarantees it is passed back to
/// [`NativeBoundary::close_process_handle`] exactly once, on every path
/// including failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle(pub isize);

/// The native capabilities required by the resolution engine.
///
/// Implementations must be cheap to call repeatedly; the engine performs no
/// internal batching beyond its caches. Calls on a stale [`WindowHandle`]
/// (the window closed between enumeration and query) may fail — the engine
/// propagates such failures, it does not mask them.
pub trait NativeBoundary: Send + Sync {
    /// Every top-level window handle, in whatever order the OS visits them.
    fn enumerate_window_handles(&self) -> Result<Vec<WindowHandle>, Error>;

    /// The currently active (foreground) window.
    fn foreground_window_handle(&self) -> Result<WindowHandle, Error>;

    /// Whether the window is visible on screen.
    fn is_window_visible(&self, window: WindowHandle) -> bool;

    /// Fill `buffer` with the window's title. Returns the number of UTF-16
    /// units written; reports [`FillError::InsufficientBuffer`] when the
    /// title does not fit.
    fn read_window_text(
        &self,
        window: WindowHandle,
        buffer: &mut [u16],
    ) -> Result<usize, FillError>;

    /// The process id owning the window.
    fn window_owner_pid(&self, window: WindowHandle) -> Result<u32, Error>;

    /// Open a handle to the process with query-information access only.
    /// Never requests rights that could modify or terminate the process.
    fn open_process_for_query(&self, pid: u32) -> Result<ProcessHandle, Error>;

    /// Release a handle from [`Self::open_process_for_query`].
    fn close_process_handle(&self, process: ProcessHandle);

    /// Fill `buffer` with the process's image path in kernel device form
    /// (`\Device\HarddiskVolumeN\...`). Same capacity contract as
    /// [`Self::read_window_text`].
    fn read_process_image_path(
        &self,
        process: ProcessHandle,
        buffer: &mut [u16],
    ) -> Result<usize, FillError>;

    /// Fill `buffer` with the multi-string of logical drive roots
    /// (`C:\`, `D:\`, ...). Same capacity contract.
    fn list_logical_drive_strings(&self, buffer: &mut [u16]) -> Result<usize, FillError>;

    /// Fill `buffer` with the device name backing `letter:`. Same capacity
    /// contract.
    fn query_device_name(&self, letter: char, buffer: &mut [u16]) -> Result<usize, FillError>;
}
