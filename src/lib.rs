//! winsnap — window metadata snapshots for Windows.
//!
//! Enumerates top-level windows and lazily resolves their metadata:
//!   - Title, visibility, owning process id
//!   - Executable path, rewritten from kernel device form to drive-letter form
//!   - Batch-scoped caches: one drive map and one memoized pid→path lookup
//!     shared across a whole snapshot, so overlapping lookups never duplicate
//!     native work
//!
//! The native boundary is a trait ([`NativeBoundary`]); the engine itself is
//! platform-neutral and fully testable off-Windows. On Windows,
//! [`WindowScanner::new`] wires in the real Win32 implementation.
//!
//! Read-only by design: no window manipulation, no process control. Process
//! handles are opened with query-information access only and released
//! unconditionally.

mod drives;
mod error;
mod process_path;
mod record;
mod scanner;

pub mod buffer;
pub mod native;

pub use drives::DriveMap;
pub use error::{Error, FillError, Result};
pub use native::{NativeBoundary, ProcessHandle};
pub use process_path::ProcessPathCache;
pub use record::{fill_fields, WindowField, WindowHandle, WindowRecord};
pub use scanner::{ScanContext, WindowScanner};

#[cfg(windows)]
pub use native::Win32Boundary;
