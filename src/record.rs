//! Window records and lazy field resolution.
//!
//! A [`WindowRecord`] starts as a bare handle and is enriched in place:
//! [`fill_fields`] computes exactly the requested fields that are still
//! absent, never recomputes one that is present, and runs independent field
//! lookups concurrently. The only ordering edge is that the executable path
//! needs the owning pid first; one owner query is shared between the two.

use std::sync::Arc;

use futures::FutureExt;
use tracing::trace;

use crate::buffer::{read_wide_string, TITLE_INITIAL_UNITS};
use crate::error::{Error, Result};
use crate::scanner::ScanContext;

/// Opaque OS-assigned identifier for one top-level window.
///
/// Validity is owned by the OS: a handle can go stale between enumeration and
/// query, in which case the affected field resolutions fail and the failure
/// propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// The resolvable metadata fields of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowField {
    Title,
    ProcessId,
    Path,
    Visible,
}

impl WindowField {
    /// Every field; the default request set.
    pub const ALL: [WindowField; 4] = [
        WindowField::Title,
        WindowField::ProcessId,
        WindowField::Path,
        WindowField::Visible,
    ];

    /// The cheap subset used to filter a batch down to visible, titled
    /// windows before the expensive fields are resolved.
    pub(crate) const FILTER: [WindowField; 2] = [WindowField::Title, WindowField::Visible];
}

/// One window's known metadata at a point in time.
///
/// Every optional field is either absent (never requested, or unknown) or
/// fully resolved; and whenever `path` is present, `process_id` is too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub handle: WindowHandle,
    pub title: Option<String>,
    pub process_id: Option<u32>,
    pub path: Option<String>,
    pub visible: Option<bool>,
}

impl WindowRecord {
    /// A record with only the handle set.
    pub fn new(handle: WindowHandle) -> Self {
        Self {
            handle,
            title: None,
            process_id: None,
            path: None,
            visible: None,
        }
    }

    /// Whether `field` already holds a value.
    pub fn has(&self, field: WindowField) -> bool {
        match field {
            WindowField::Title => self.title.is_some(),
            WindowField::ProcessId => self.process_id.is_some(),
            WindowField::Path => self.path.is_some(),
            WindowField::Visible => self.visible.is_some(),
        }
    }

    /// True when the record passes the batch filter: on screen with a
    /// non-empty title.
    pub(crate) fn is_visible_and_titled(&self) -> bool {
        self.visible == Some(true) && self.title.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Resolve the requested fields that are still absent on `record`, in place.
///
/// Independent fields run concurrently; `path` waits for the owner pid and
/// then goes through the context's shared drive map and path cache. Fields
/// already set on entry are left untouched, so repeated calls with the same
/// request set are no-ops.
///
/// On failure, siblings are not cancelled: every field whose resolution
/// settled successfully is still written before the first error (in field
/// declaration order) is returned. A successfully resolved pid is written
/// even when only `path` was requested, which keeps the path-implies-pid
/// invariant visible on every record.
pub async fn fill_fields(
    record: &mut WindowRecord,
    fields: &[WindowField],
    ctx: &ScanContext,
) -> Result<()> {
    let handle = record.handle;
    let boundary = ctx.boundary();

    let want = |field: WindowField| fields.contains(&field) && !record.has(field);
    let want_title = want(WindowField::Title);
    let want_visible = want(WindowField::Visible);
    let want_path = want(WindowField::Path);
    // The path rewrite needs the pid even when the caller did not ask for it.
    let want_pid = want(WindowField::ProcessId) || want_path;

    // One owner query, shared between the pid field and the path lookup. A
    // pid already on the record is reused instead of re-queried.
    let owner_pid = {
        let boundary = Arc::clone(boundary);
        let known = record.process_id;
        async move {
            match known {
                Some(pid) => Ok(pid),
                None => boundary.window_owner_pid(handle),
            }
        }
        .boxed()
        .shared()
    };

    let title = async {
        if !want_title {
            return Ok(None);
        }
        let text = read_wide_string("GetWindowTextW", TITLE_INITIAL_UNITS, |buf| {
            boundary.read_window_text(handle, buf)
        })?;
        Ok(Some(text))
    };

    let visible = async {
        if !want_visible {
            return Ok::<_, Error>(None);
        }
        Ok(Some(boundary.is_window_visible(handle)))
    };

    let pid = {
        let owner_pid = owner_pid.clone();
        async move {
            if !want_pid {
                return Ok(None);
            }
            owner_pid.await.map(Some)
        }
    };

    let path = {
        let owner_pid = owner_pid.clone();
        async move {
            if !want_path {
                return Ok(None);
            }
            let pid = owner_pid.await?;
            ctx.resolve_path(pid).await
        }
    };

    let (title, visible, pid, path) = futures::join!(title, visible, pid, path);

    let mut first_err: Option<Error> = None;
    let mut keep_err = |err: Error| {
        if first_err.is_none() {
            first_err = Some(err);
        }
    };

    match title {
        Ok(Some(value)) => record.title = Some(value),
        Ok(None) => {}
        Err(err) => keep_err(err),
    }
    match pid {
        Ok(Some(value)) => record.process_id = Some(value),
        Ok(None) => {}
        Err(err) => keep_err(err),
    }
    match path {
        // Ok(None) covers both "not requested" and "no drive maps the raw
        // path"; either way the field stays absent.
        Ok(Some(value)) => record.path = Some(value),
        Ok(None) => {}
        Err(err) => keep_err(err),
    }
    match visible {
        Ok(Some(value)) => record.visible = Some(value),
        Ok(None) => {}
        Err(err) => keep_err(err),
    }

    trace!(handle = handle.0, requested = fields.len(), "fields resolved");
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_only_the_handle() {
        let record = WindowRecord::new(WindowHandle(42));
        assert_eq!(record.handle, WindowHandle(42));
        for field in WindowField::ALL {
            assert!(!record.has(field));
        }
    }

    #[test]
    fn filter_predicate_requires_visible_and_nonempty_title() {
        let mut record = WindowRecord::new(WindowHandle(1));
        assert!(!record.is_visible_and_titled());

        record.visible = Some(true);
        record.title = Some(String::new());
        assert!(!record.is_visible_and_titled());

        record.title = Some("Inbox".into());
        assert!(record.is_visible_and_titled());

        record.visible = Some(false);
        assert!(!record.is_visible_and_titled());
    }
}
