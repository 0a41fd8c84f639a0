//! FFI bindings for GenUI Telemetry
//!
//! This module provides C-compatible functions for embedding the engine in a
//! host UI runtime. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using
//! `telemetry_free_string`. Structured values cross the boundary as JSON.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use crate::config::TrackerConfig;
use crate::exchange::{apply_instruction, ProfileUpdateInstruction};
use crate::profile::merge::{to_api_format, ProfileMerger};
use crate::storage::SqliteStorage;
use crate::tracker::aggregator::BehaviorAggregator;
use crate::tracker::types::{InteractionKind, PageLocation, Signal};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize to a newly allocated C string, recording any error
fn json_to_cstr<T: serde::Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Tracker API
// ============================================================================

/// Opaque handle to a BehaviorAggregator
pub struct TrackerHandle {
    tracker: BehaviorAggregator,
}

/// Borrow the tracker behind a handle, recording an error for NULL
unsafe fn tracker_mut<'a>(handle: *mut TrackerHandle) -> Option<&'a mut BehaviorAggregator> {
    if handle.is_null() {
        set_last_error("Null tracker pointer");
        return None;
    }
    Some(&mut (*handle).tracker)
}

/// Create a tracker for `user_id`.
///
/// # Safety
/// - `user_id` must be a valid null-terminated C string.
/// - `config_json` may be NULL for the default configuration.
/// - Returns a pointer that must be freed with `telemetry_tracker_free`.
/// - Returns NULL on error; call `telemetry_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_new(
    user_id: *const c_char,
    config_json: *const c_char,
) -> *mut TrackerHandle {
    clear_last_error();

    let user_id = match cstr_to_string(user_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid user_id string pointer");
            return ptr::null_mut();
        }
    };

    let config = if config_json.is_null() {
        TrackerConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match TrackerConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match BehaviorAggregator::new(user_id, config) {
        Ok(tracker) => Box::into_raw(Box::new(TrackerHandle { tracker })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a tracker.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_free(handle: *mut TrackerHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Start capture at a page. A NULL title is treated as empty.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`.
/// - `path` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_start(
    handle: *mut TrackerHandle,
    path: *const c_char,
    title: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return -1;
    };
    let path = match cstr_to_string(path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid path string pointer");
            return -1;
        }
    };
    let title = cstr_to_string(title).unwrap_or_default();

    tracker.start(PageLocation::new(path, title));
    0
}

/// Record one raw signal given as JSON (`{"type": "click", ...}`).
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`.
/// - `signal_json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_record(
    handle: *mut TrackerHandle,
    signal_json: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return -1;
    };
    let json = match cstr_to_string(signal_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid signal string pointer");
            return -1;
        }
    };

    match serde_json::from_str::<Signal>(&json) {
        Ok(signal) => {
            tracker.record(signal);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Navigate to a page (closes the open visit, opens a new one).
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`.
/// - `path` must be a valid null-terminated C string; `title` may be NULL.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_navigate(
    handle: *mut TrackerHandle,
    path: *const c_char,
    title: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return -1;
    };
    let path = match cstr_to_string(path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid path string pointer");
            return -1;
        }
    };
    let title = cstr_to_string(title).unwrap_or_default();

    tracker.navigate(PageLocation::new(path, title));
    0
}

/// Record a caller-declared element interaction.
///
/// `kind` is one of `click`, `hover`, `focus`, `scroll-into-view`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`.
/// - `element_id`, `element_type` and `kind` must be valid null-terminated C strings.
/// - `metadata_json` may be NULL.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_interaction(
    handle: *mut TrackerHandle,
    element_id: *const c_char,
    element_type: *const c_char,
    kind: *const c_char,
    metadata_json: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(tracker) = tracker_mut(handle) else {
        return -1;
    };
    let (element_id, element_type, kind) = match (
        cstr_to_string(element_id),
        cstr_to_string(element_type),
        cstr_to_string(kind),
    ) {
        (Some(id), Some(ty), Some(kind)) => (id, ty, kind),
        _ => {
            set_last_error("Invalid interaction string pointer");
            return -1;
        }
    };

    let kind: InteractionKind = match serde_json::from_value(serde_json::Value::String(kind)) {
        Ok(kind) => kind,
        Err(e) => {
            set_last_error(&e.to_string());
            return -1;
        }
    };

    let metadata = if metadata_json.is_null() {
        None
    } else {
        match cstr_to_string(metadata_json).map(|s| serde_json::from_str(&s)) {
            Some(Ok(value)) => Some(value),
            Some(Err(e)) => {
                set_last_error(&e.to_string());
                return -1;
            }
            None => {
                set_last_error("Invalid metadata string pointer");
                return -1;
            }
        }
    };

    tracker.track_interaction(element_id, element_type, kind, metadata);
    0
}

/// Fire due timers. Returns the emitted scroll sample as JSON, or `null`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`.
/// - Returns a newly allocated string that must be freed with `telemetry_free_string`.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_tick(handle: *mut TrackerHandle) -> *mut c_char {
    clear_last_error();

    match tracker_mut(handle) {
        Some(tracker) => json_to_cstr(&tracker.tick()),
        None => ptr::null_mut(),
    }
}

/// Stop capture. Safe to call more than once.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_stop(handle: *mut TrackerHandle) -> i32 {
    clear_last_error();

    match tracker_mut(handle) {
        Some(tracker) => {
            tracker.stop();
            0
        }
        None => -1,
    }
}

/// Discard buffered events, keeping the open page visit.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_reset(handle: *mut TrackerHandle) -> i32 {
    clear_last_error();

    match tracker_mut(handle) {
        Some(tracker) => {
            tracker.reset();
            0
        }
        None => -1,
    }
}

/// Compact summary as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`.
/// - Returns a newly allocated string that must be freed with `telemetry_free_string`.
/// - Returns NULL on error; call `telemetry_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_summary(handle: *mut TrackerHandle) -> *mut c_char {
    clear_last_error();

    match tracker_mut(handle) {
        Some(tracker) => json_to_cstr(&tracker.compact_summary()),
        None => ptr::null_mut(),
    }
}

/// Full session record as JSON.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `telemetry_tracker_new`.
/// - Returns a newly allocated string that must be freed with `telemetry_free_string`.
/// - Returns NULL on error; call `telemetry_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn telemetry_tracker_full_record(handle: *mut TrackerHandle) -> *mut c_char {
    clear_last_error();

    match tracker_mut(handle) {
        Some(tracker) => json_to_cstr(&tracker.full_record()),
        None => ptr::null_mut(),
    }
}

// ============================================================================
// Profile API (stateless, against a SQLite file)
// ============================================================================

/// Apply a profile update instruction and return the merge report as JSON.
///
/// # Safety
/// - `db_path`, `user_id` and `instruction_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `telemetry_free_string`.
///   The string is `null` when the instruction declined the update.
/// - Returns NULL on error; call `telemetry_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn telemetry_profile_merge(
    db_path: *const c_char,
    user_id: *const c_char,
    instruction_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let (db_path, user_id, json) = match (
        cstr_to_string(db_path),
        cstr_to_string(user_id),
        cstr_to_string(instruction_json),
    ) {
        (Some(db), Some(user), Some(json)) => (db, user, json),
        _ => {
            set_last_error("Invalid string pointer");
            return ptr::null_mut();
        }
    };

    let instruction: ProfileUpdateInstruction = match serde_json::from_str(&json) {
        Ok(instruction) => instruction,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let storage = match SqliteStorage::open(Path::new(&db_path)) {
        Ok(storage) => storage,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let merger = ProfileMerger::new(storage);
    json_to_cstr(&apply_instruction(&merger, &user_id, &instruction))
}

/// Load a profile in the inference-facing format as JSON.
///
/// # Safety
/// - `db_path` and `user_id` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `telemetry_free_string`.
/// - Returns NULL on error; call `telemetry_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn telemetry_profile_get(
    db_path: *const c_char,
    user_id: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let (db_path, user_id) = match (cstr_to_string(db_path), cstr_to_string(user_id)) {
        (Some(db), Some(user)) => (db, user),
        _ => {
            set_last_error("Invalid string pointer");
            return ptr::null_mut();
        }
    };

    let storage = match SqliteStorage::open(Path::new(&db_path)) {
        Ok(storage) => storage,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let merger = ProfileMerger::new(storage);
    let profile = merger.store().get(&user_id);
    json_to_cstr(&to_api_format(&profile))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by telemetry functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a telemetry function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn telemetry_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next telemetry call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn telemetry_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn telemetry_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
