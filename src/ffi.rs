//! FFI bindings for fitdash
//!
//! This module provides C-compatible functions for processing FIT files from
//! other languages. Inputs are raw byte buffers; outputs are null-terminated
//! strings that must be freed by the caller using `fitdash_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::slice;

use crate::config::ProcessorConfig;
use crate::error::ComputeError;
use crate::export::to_csv_string;
use crate::pipeline::{process_fit_bytes, ActivityProcessor};
use crate::summary::ActivitySummary;
use crate::types::Outcome;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Borrow a caller buffer; NULL is only accepted together with a zero length
unsafe fn bytes_from_raw<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if data.is_null() {
        return if len == 0 { Some(&[][..]) } else { None };
    }
    Some(slice::from_raw_parts(data, len))
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a result across the boundary: string on success, NULL plus last error otherwise
fn into_c_result(result: Result<String, String>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(msg) => {
            set_last_error(&msg);
            ptr::null_mut()
        }
    }
}

fn outcome_json(outcome: &Outcome) -> Result<String, String> {
    serde_json::to_string(outcome).map_err(|e| ComputeError::from(e).to_string())
}

fn summary_json(outcome: &Outcome) -> Result<String, String> {
    let table = outcome.table().ok_or_else(|| outcome.user_message())?;
    serde_json::to_string(&ActivitySummary::derive(table))
        .map_err(|e| ComputeError::from(e).to_string())
}

fn export_csv(outcome: &Outcome) -> Result<String, String> {
    let table = outcome.table().ok_or_else(|| outcome.user_message())?;
    to_csv_string(table).map_err(|e| ComputeError::from(e).to_string())
}

/// Decode and normalize a buffer, then render the outcome with `render`
unsafe fn run_stateless(
    data: *const u8,
    len: usize,
    render: fn(&Outcome) -> Result<String, String>,
) -> *mut c_char {
    clear_last_error();

    let Some(bytes) = bytes_from_raw(data, len) else {
        set_last_error("Null data pointer");
        return ptr::null_mut();
    };

    into_c_result(
        process_fit_bytes(bytes)
            .map_err(|e| ComputeError::from(e).to_string())
            .and_then(|outcome| render(&outcome)),
    )
}

// ============================================================================
// Stateless API
// ============================================================================

/// Process a FIT file and return the outcome as JSON.
///
/// The JSON is tagged by `status`: `"ready"` carries the table, `"empty"`
/// carries a `reason` code (`no_timestamp_field`, `decode_failed`,
/// `ok_but_empty`) and an optional `detail`.
///
/// # Safety
/// - `data` must point to `len` readable bytes (NULL is allowed when `len` is 0).
/// - Returns a newly allocated string that must be freed with `fitdash_free_string`.
/// - Returns NULL on error; call `fitdash_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitdash_process(data: *const u8, len: usize) -> *mut c_char {
    run_stateless(data, len, outcome_json)
}

/// Process a FIT file and return its activity summary as JSON.
///
/// # Safety
/// - `data` must point to `len` readable bytes (NULL is allowed when `len` is 0).
/// - Returns a newly allocated string that must be freed with `fitdash_free_string`.
/// - Returns NULL when no table could be produced; `fitdash_last_error` then
///   holds the user-facing reason.
#[no_mangle]
pub unsafe extern "C" fn fitdash_summary(data: *const u8, len: usize) -> *mut c_char {
    run_stateless(data, len, summary_json)
}

/// Process a FIT file and return the canonical table as CSV.
///
/// # Safety
/// - `data` must point to `len` readable bytes (NULL is allowed when `len` is 0).
/// - Returns a newly allocated string that must be freed with `fitdash_free_string`.
/// - Returns NULL when no table could be produced; `fitdash_last_error` then
///   holds the user-facing reason.
#[no_mangle]
pub unsafe extern "C" fn fitdash_export_csv(data: *const u8, len: usize) -> *mut c_char {
    run_stateless(data, len, export_csv)
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to an ActivityProcessor
pub struct ActivityProcessorHandle {
    processor: ActivityProcessor,
}

/// Create a processor from a JSON config, or defaults when `config_json` is NULL.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `fitdash_processor_free`.
/// - Returns NULL on error; call `fitdash_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitdash_processor_new(
    config_json: *const c_char,
) -> *mut ActivityProcessorHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        ProcessorConfig::default()
    } else {
        let Some(json) = cstr_to_string(config_json) else {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        };
        match ProcessorConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let handle = Box::new(ActivityProcessorHandle {
        processor: ActivityProcessor::with_config(config),
    });
    Box::into_raw(handle)
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `fitdash_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fitdash_processor_free(processor: *mut ActivityProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Process a FIT file with a stateful processor and return the outcome as JSON.
///
/// Identical bytes are served from the processor's cache.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `fitdash_processor_new`.
/// - `data` must point to `len` readable bytes (NULL is allowed when `len` is 0).
/// - Returns a newly allocated string that must be freed with `fitdash_free_string`.
/// - Returns NULL on error; call `fitdash_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn fitdash_processor_process(
    processor: *mut ActivityProcessorHandle,
    data: *const u8,
    len: usize,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let Some(bytes) = bytes_from_raw(data, len) else {
        set_last_error("Null data pointer");
        return ptr::null_mut();
    };

    into_c_result(
        handle
            .processor
            .process(bytes)
            .map_err(|e| ComputeError::from(e).to_string())
            .and_then(|outcome| outcome_json(&outcome)),
    )
}

/// Drop every cached outcome held by the processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `fitdash_processor_new`.
/// - Returns 0 on success, -1 for a NULL processor.
#[no_mangle]
pub unsafe extern "C" fn fitdash_processor_clear_cache(
    processor: *mut ActivityProcessorHandle,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    (*processor).processor.clear_cache();
    0
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by fitdash functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a fitdash function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn fitdash_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next fitdash call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn fitdash_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn fitdash_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
