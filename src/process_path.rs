//! Process image path resolution with per-pid memoization.
//!
//! Opening a process and reading its image path is the expensive part of a
//! window snapshot, and many windows share one process. The cache memoizes
//! the lookup per pid with a claim-then-compute discipline: the slot is
//! claimed (as a shared, not-yet-settled future) under the lock, atomically
//! with the decision to start the lookup, so concurrent callers for the same
//! pid always share exactly one native open/read/close sequence. Entries are
//! never evicted; the cache lives as long as its [`ScanContext`].
//!
//! [`ScanContext`]: crate::scanner::ScanContext

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::buffer::{read_wide_string, DEFAULT_INITIAL_UNITS};
use crate::drives::DriveMap;
use crate::error::Result;
use crate::native::{NativeBoundary, ProcessHandle};

/// `Ok(None)` means the path could not be mapped to a drive letter and is
/// unknown; it is not a failure.
type PathResult = Result<Option<String>>;

type SharedLookup = Shared<BoxFuture<'static, PathResult>>;

/// Append-only memo of pid → image-path lookup, shared by one batch.
#[derive(Default)]
pub struct ProcessPathCache {
    slots: Mutex<HashMap<u32, SharedLookup>>,
}

impl ProcessPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pids ever requested through this cache (pending included).
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Resolve the executable path for `pid`, in drive-letter form.
    ///
    /// The first caller for a pid starts the native lookup; every caller —
    /// concurrent or later — awaits the same shared outcome, failures
    /// included.
    pub async fn resolve(
        &self,
        pid: u32,
        boundary: &Arc<dyn NativeBoundary>,
        drives: &Arc<DriveMap>,
    ) -> PathResult {
        let lookup = {
            let mut slots = self.slots.lock();
            match slots.entry(pid) {
                Entry::Occupied(slot) => {
                    trace!(pid, "image path cache hit");
                    slot.get().clone()
                }
                Entry::Vacant(slot) => {
                    let fut = lookup_image_path(Arc::clone(boundary), Arc::clone(drives), pid)
                        .boxed()
                        .shared();
                    slot.insert(fut).clone()
                }
            }
        };
        lookup.await
    }
}

impl std::fmt::Debug for ProcessPathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessPathCache")
            .field("len", &self.len())
            .finish()
    }
}

/// Closes the process handle on drop, so the open/read/close sequence stays
/// balanced on the failure paths too.
struct ProcessGuard<'a> {
    boundary: &'a dyn NativeBoundary,
    handle: ProcessHandle,
}

impl<'a> ProcessGuard<'a> {
    fn open(boundary: &'a dyn NativeBoundary, pid: u32) -> Result<Self> {
        let handle = boundary.open_process_for_query(pid)?;
        Ok(Self { boundary, handle })
    }
}

impl Drop for ProcessGuard<'_> {
    fn drop(&mut self) {
        self.boundary.close_process_handle(self.handle);
    }
}

/// One native open/read/close sequence plus the drive-letter rewrite.
async fn lookup_image_path(
    boundary: Arc<dyn NativeBoundary>,
    drives: Arc<DriveMap>,
    pid: u32,
) -> PathResult {
    if pid == 0 {
        // The Idle pseudo-process has no image and cannot be opened.
        return Ok(None);
    }

    let guard = ProcessGuard::open(boundary.as_ref(), pid)?;
    let raw = read_wide_string("GetProcessImageFileNameW", DEFAULT_INITIAL_UNITS, |buf| {
        boundary.read_process_image_path(guard.handle, buf)
    })?;

    let resolved = drives.to_drive_path(&raw);
    if resolved.is_none() {
        debug!(pid, raw = %raw, "no drive maps the image path");
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, FillError};
    use crate::record::WindowHandle;

    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A boundary that refuses every call; proves which paths never touch
    /// the native layer.
    #[derive(Default)]
    struct DeadBoundary {
        opens: AtomicUsize,
    }

    impl NativeBoundary for DeadBoundary {
        fn enumerate_window_handles(&self) -> Result<Vec<WindowHandle>> {
            panic!("unexpected native call");
        }
        fn foreground_window_handle(&self) -> Result<WindowHandle> {
            panic!("unexpected native call");
        }
        fn is_window_visible(&self, _window: WindowHandle) -> bool {
            panic!("unexpected native call");
        }
        fn read_window_text(
            &self,
            _window: WindowHandle,
            _buffer: &mut [u16],
        ) -> std::result::Result<usize, FillError> {
            panic!("unexpected native call");
        }
        fn window_owner_pid(&self, _window: WindowHandle) -> Result<u32> {
            panic!("unexpected native call");
        }
        fn open_process_for_query(&self, _pid: u32) -> Result<ProcessHandle> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Err(Error::Native {
                call: "OpenProcess",
                code: 5,
            })
        }
        fn close_process_handle(&self, _process: ProcessHandle) {
            panic!("close without open");
        }
        fn read_process_image_path(
            &self,
            _process: ProcessHandle,
            _buffer: &mut [u16],
        ) -> std::result::Result<usize, FillError> {
            panic!("unexpected native call");
        }
        fn list_logical_drive_strings(
            &self,
            _buffer: &mut [u16],
        ) -> std::result::Result<usize, FillError> {
            panic!("unexpected native call");
        }
        fn query_device_name(
            &self,
            _letter: char,
            _buffer: &mut [u16],
        ) -> std::result::Result<usize, FillError> {
            panic!("unexpected native call");
        }
    }

    #[tokio::test]
    async fn pid_zero_resolves_to_unknown_without_opening() {
        let dead = Arc::new(DeadBoundary::default());
        let boundary: Arc<dyn NativeBoundary> = dead.clone();
        let drives = Arc::new(DriveMap::default());
        let cache = ProcessPathCache::new();
        assert_eq!(cache.resolve(0, &boundary, &drives).await, Ok(None));
        assert_eq!(dead.opens.load(Ordering::SeqCst), 0);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn open_failure_is_memoized_and_replayed() {
        let dead = Arc::new(DeadBoundary::default());
        let boundary: Arc<dyn NativeBoundary> = dead.clone();
        let drives = Arc::new(DriveMap::default());
        let cache = ProcessPathCache::new();

        let expected = Err(Error::Native {
            call: "OpenProcess",
            code: 5,
        });
        assert_eq!(cache.resolve(7, &boundary, &drives).await, expected);
        assert_eq!(cache.resolve(7, &boundary, &drives).await, expected);
        // Second call replays the memoized failure without a new open.
        assert_eq!(dead.opens.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }
}
