//! Win32 implementation of the native boundary.
//!
//! Thin, mechanical mappings onto the `windows` crate. No retry or caching
//! logic lives here; insufficient-capacity conditions are translated into
//! [`FillError::InsufficientBuffer`] and everything else into the raw OS
//! error code, leaving policy to the platform-neutral engine.

use std::ffi::c_void;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{
    CloseHandle, GetLastError, BOOL, ERROR_INSUFFICIENT_BUFFER, HANDLE, HWND, LPARAM, TRUE,
};
use windows::Win32::Storage::FileSystem::{GetLogicalDriveStringsW, QueryDosDeviceW};
use windows::Win32::System::ProcessStatus::GetProcessImageFileNameW;
use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId, IsWindowVisible,
};

use crate::error::{Error, FillError};
use crate::native::{NativeBoundary, ProcessHandle};
use crate::record::WindowHandle;

/// The real Win32 boundary. Stateless; share one instance freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Boundary;

fn last_error(call: &'static str) -> Error {
    Error::Native {
        call,
        code: unsafe { GetLastError() }.0 as i32,
    }
}

fn fill_last_error(call: &'static str) -> FillError {
    let code = unsafe { GetLastError() };
    if code == ERROR_INSUFFICIENT_BUFFER {
        FillError::InsufficientBuffer
    } else {
        FillError::Native {
            call,
            code: code.0 as i32,
        }
    }
}

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut c_void)
}

unsafe extern "system" fn collect_handles(window: HWND, lparam: LPARAM) -> BOOL {
    let handles = &mut *(lparam.0 as *mut Vec<WindowHandle>);
    handles.push(WindowHandle(window.0 as isize));
    TRUE
}

impl NativeBoundary for Win32Boundary {
    fn enumerate_window_handles(&self) -> Result<Vec<WindowHandle>, Error> {
        let mut handles: Vec<WindowHandle> = Vec::new();
        unsafe {
            EnumWindows(
                Some(collect_handles),
                LPARAM(&mut handles as *mut Vec<WindowHandle> as isize),
            )
        }
        .map_err(|e| Error::Native {
            call: "EnumWindows",
            code: e.code().0,
        })?;
        Ok(handles)
    }

    fn foreground_window_handle(&self) -> Result<WindowHandle, Error> {
        let window = unsafe { GetForegroundWindow() };
        if window.0.is_null() {
            // No foreground window exists, e.g. during session lock.
            return Err(last_error("GetForegroundWindow"));
        }
        Ok(WindowHandle(window.0 as isize))
    }

    fn is_window_visible(&self, window: WindowHandle) -> bool {
        unsafe { IsWindowVisible(hwnd(window)) }.as_bool()
    }

    fn read_window_text(
        &self,
        window: WindowHandle,
        buffer: &mut [u16],
    ) -> Result<usize, FillError> {
        let written = unsafe { GetWindowTextW(hwnd(window), buffer) };
        // GetWindowTextW truncates silently instead of failing; a write that
        // fills the buffer to the brim is indistinguishable from truncation,
        // so report it as insufficient and let the reader grow. A zero-length
        // result is a window with no title, not a failure.
        let written = written.max(0) as usize;
        if written > 0 && written + 1 >= buffer.len() {
            return Err(FillError::InsufficientBuffer);
        }
        Ok(written)
    }

    fn window_owner_pid(&self, window: WindowHandle) -> Result<u32, Error> {
        let mut pid: u32 = 0;
        let thread = unsafe { GetWindowThreadProcessId(hwnd(window), Some(&mut pid)) };
        if thread == 0 {
            return Err(last_error("GetWindowThreadProcessId"));
        }
        Ok(pid)
    }

    fn open_process_for_query(&self, pid: u32) -> Result<ProcessHandle, Error> {
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }
            .map_err(|e| Error::Native {
                call: "OpenProcess",
                code: e.code().0,
            })?;
        Ok(ProcessHandle(handle.0 as isize))
    }

    fn close_process_handle(&self, process: ProcessHandle) {
        unsafe {
            let _ = CloseHandle(HANDLE(process.0 as *mut c_void));
        }
    }

    fn read_process_image_path(
        &self,
        process: ProcessHandle,
        buffer: &mut [u16],
    ) -> Result<usize, FillError> {
        let written =
            unsafe { GetProcessImageFileNameW(HANDLE(process.0 as *mut c_void), buffer) };
        if written == 0 {
            return Err(fill_last_error("GetProcessImageFileNameW"));
        }
        Ok(written as usize)
    }

    fn list_logical_drive_strings(&self, buffer: &mut [u16]) -> Result<usize, FillError> {
        let written = unsafe { GetLogicalDriveStringsW(Some(buffer)) };
        if written == 0 {
            return Err(fill_last_error("GetLogicalDriveStringsW"));
        }
        // On insufficient capacity the return value is the required size
        // rather than the written length.
        if written as usize > buffer.len() {
            return Err(FillError::InsufficientBuffer);
        }
        Ok(written as usize)
    }

    fn query_device_name(&self, letter: char, buffer: &mut [u16]) -> Result<usize, FillError> {
        let device: [u16; 3] = [letter as u16, ':' as u16, 0];
        let written =
            unsafe { QueryDosDeviceW(PCWSTR::from_raw(device.as_ptr()), Some(buffer)) };
        if written == 0 {
            return Err(fill_last_error("QueryDosDeviceW"));
        }
        Ok(written as usize)
    }
}
