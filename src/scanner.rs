//! Batch enumeration and the shared per-batch caches.
//!
//! [`WindowScanner`] is the entry point: it enumerates handles, builds one
//! [`ScanContext`] per batch (one drive map, one process-path cache) and
//! resolves records in two passes — a cheap title/visibility pass to filter,
//! then the full requested field set for the survivors, reusing the same
//! context so no drive or process lookup runs twice.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::drives::DriveMap;
use crate::error::Result;
use crate::native::NativeBoundary;
use crate::process_path::ProcessPathCache;
use crate::record::{fill_fields, WindowField, WindowHandle, WindowRecord};

/// The shared lookup state for one batch of resolutions: an immutable drive
/// map and an append-only process-path cache.
///
/// A context is normally created per [`WindowScanner::list_windows`] call,
/// but callers can hold one and pass it to
/// [`WindowScanner::list_windows_with_context`] to reuse both caches across
/// batches. Note the drive map is a snapshot; a context held across a volume
/// mount or unmount will translate paths against stale mappings.
pub struct ScanContext {
    boundary: Arc<dyn NativeBoundary>,
    drives: Arc<DriveMap>,
    paths: ProcessPathCache,
}

impl ScanContext {
    /// Build a fresh context: resolves the drive map, starts with an empty
    /// path cache.
    pub async fn new(boundary: Arc<dyn NativeBoundary>) -> Result<Self> {
        let drives = Arc::new(DriveMap::resolve(&boundary).await?);
        Ok(Self {
            boundary,
            drives,
            paths: ProcessPathCache::new(),
        })
    }

    /// The drive map this context translates paths with.
    pub fn drive_map(&self) -> &DriveMap {
        &self.drives
    }

    /// Resolve the executable path for `pid` through this context's caches.
    /// `Ok(None)` means no mounted drive backs the image path.
    pub async fn resolve_path(&self, pid: u32) -> Result<Option<String>> {
        self.paths.resolve(pid, &self.boundary, &self.drives).await
    }

    pub(crate) fn boundary(&self) -> &Arc<dyn NativeBoundary> {
        &self.boundary
    }
}

impl std::fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanContext")
            .field("drives", &self.drives.len())
            .field("paths", &self.paths)
            .finish()
    }
}

/// Enumerates windows and resolves their metadata.
///
/// Dropping a resolution future abandons in-flight native work rather than
/// cancelling it; no timeouts are enforced internally.
pub struct WindowScanner {
    boundary: Arc<dyn NativeBoundary>,
}

impl WindowScanner {
    /// A scanner over the real Win32 boundary.
    #[cfg(windows)]
    pub fn new() -> Self {
        Self::with_boundary(Arc::new(crate::native::Win32Boundary))
    }

    /// A scanner over a caller-supplied boundary (tests, instrumentation).
    pub fn with_boundary(boundary: Arc<dyn NativeBoundary>) -> Self {
        Self { boundary }
    }

    /// Every top-level window handle, unresolved, in OS enumeration order.
    pub fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        self.boundary.enumerate_window_handles()
    }

    /// The currently active window's handle.
    pub fn foreground_window(&self) -> Result<WindowHandle> {
        self.boundary.foreground_window_handle()
    }

    /// A fresh [`ScanContext`] for callers that batch their own lookups.
    pub async fn context(&self) -> Result<ScanContext> {
        ScanContext::new(Arc::clone(&self.boundary)).await
    }

    /// Resolve a single window into a record with `fields` filled. Uses a
    /// fresh context; no batch filtering is applied.
    pub async fn resolve_window(
        &self,
        handle: WindowHandle,
        fields: &[WindowField],
    ) -> Result<WindowRecord> {
        let ctx = self.context().await?;
        let mut record = WindowRecord::new(handle);
        fill_fields(&mut record, fields, &ctx).await?;
        Ok(record)
    }

    /// Snapshot all windows with `fields` resolved.
    ///
    /// With `include_all` false, only windows that are visible and carry a
    /// non-empty title are returned; the cheap title/visibility subset is
    /// resolved for every window first and the remaining fields only for the
    /// survivors. With `include_all` true, no filtering happens and `fields`
    /// is resolved for every window in one pass.
    pub async fn list_windows(
        &self,
        include_all: bool,
        fields: &[WindowField],
    ) -> Result<Vec<WindowRecord>> {
        let ctx = self.context().await?;
        self.list_windows_with_context(include_all, fields, &ctx).await
    }

    /// [`Self::list_windows`] against a caller-held context, so drive and
    /// process-path lookups are shared across batches.
    pub async fn list_windows_with_context(
        &self,
        include_all: bool,
        fields: &[WindowField],
        ctx: &ScanContext,
    ) -> Result<Vec<WindowRecord>> {
        let handles = self.boundary.enumerate_window_handles()?;
        debug!(windows = handles.len(), include_all, "enumerated top-level windows");

        let mut records: Vec<WindowRecord> =
            handles.into_iter().map(WindowRecord::new).collect();

        // First pass: when filtering, only the fields the filter needs;
        // otherwise everything at once.
        let first_pass: &[WindowField] = if include_all {
            fields
        } else {
            &WindowField::FILTER
        };
        try_join_all(
            records
                .iter_mut()
                .map(|record| fill_fields(record, first_pass, ctx)),
        )
        .await?;

        if include_all {
            return Ok(records);
        }

        records.retain(WindowRecord::is_visible_and_titled);
        debug!(windows = records.len(), "windows past visibility filter");

        // Second pass: the requested fields for the survivors, on the same
        // context — already-filled title/visibility are not recomputed.
        try_join_all(
            records
                .iter_mut()
                .map(|record| fill_fields(record, fields, ctx)),
        )
        .await?;

        Ok(records)
    }
}

#[cfg(windows)]
impl Default for WindowScanner {
    fn default() -> Self {
        Self::new()
    }
}
