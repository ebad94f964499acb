//! FFI bindings for Study Pulse
//!
//! This module provides C-compatible functions for embedding Pulse in a host
//! application. All functions take and return JSON as null-terminated C strings.
//! Returned strings are allocated by Pulse and must be freed with `pulse_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::ComputeError;
use crate::pipeline::{
    aggregate_telemetry_json, classify_wellness_json, synthesize_schedule_json,
    IntelligenceEngine,
};
use crate::types::{Subject, WellnessSample};

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

/// NULL means "no subject"; anything else must name one
unsafe fn optional_subject(ptr: *const c_char) -> Result<Option<Subject>, String> {
    if ptr.is_null() {
        return Ok(None);
    }
    let text = cstr_to_string(ptr).ok_or_else(|| "Invalid subject string pointer".to_string())?;
    text.parse::<Subject>()
        .map(Some)
        .map_err(|e| e.to_string())
}

/// Hand a computation result back across the boundary
fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Synthesize a day schedule from routine JSON.
///
/// # Safety
/// - `routine_json` must be a valid null-terminated C string.
/// - `weak_subject` may be NULL; otherwise a valid C string naming a subject.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_synthesize_schedule(
    routine_json: *const c_char,
    weak_subject: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(routine_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid routine JSON string pointer");
            return ptr::null_mut();
        }
    };

    let subject = match optional_subject(weak_subject) {
        Ok(s) => s,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    finish(synthesize_schedule_json(&json_str, subject))
}

/// Aggregate a `{topics, tests}` snapshot.
///
/// # Safety
/// - `snapshot_json` must be a valid null-terminated C string.
/// - `subject_filter` may be NULL; otherwise a valid C string naming a subject.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_aggregate_telemetry(
    snapshot_json: *const c_char,
    subject_filter: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(snapshot_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid snapshot JSON string pointer");
            return ptr::null_mut();
        }
    };

    let subject = match optional_subject(subject_filter) {
        Ok(s) => s,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    finish(aggregate_telemetry_json(&json_str, subject))
}

/// Classify one wellness sample.
///
/// # Safety
/// - `sample_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_classify_wellness(sample_json: *const c_char) -> *mut c_char {
    clear_last_error();

    match cstr_to_string(sample_json) {
        Some(s) => finish(classify_wellness_json(&s)),
        None => {
            set_last_error("Invalid sample JSON string pointer");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Engine API
// ============================================================================

/// Opaque handle to an IntelligenceEngine
pub struct PulseEngineHandle {
    engine: IntelligenceEngine,
}

/// Create a new engine.
///
/// # Safety
/// - `config_toml` may be NULL for the default configuration.
/// - Must be freed with `pulse_engine_free`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_engine_new(config_toml: *const c_char) -> *mut PulseEngineHandle {
    clear_last_error();

    let engine = if config_toml.is_null() {
        IntelligenceEngine::new()
    } else {
        let toml = match cstr_to_string(config_toml) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match IntelligenceEngine::from_config_toml(&toml) {
            Ok(engine) => engine,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    Box::into_raw(Box::new(PulseEngineHandle { engine }))
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pulse_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pulse_engine_free(engine: *mut PulseEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Build a combined study report from a student snapshot.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pulse_engine_new`.
/// - `snapshot_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_engine_report(
    engine: *const PulseEngineHandle,
    snapshot_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    match cstr_to_string(snapshot_json) {
        Some(s) => finish(handle.engine.report_json(&s, None)),
        None => {
            set_last_error("Invalid snapshot JSON string pointer");
            ptr::null_mut()
        }
    }
}

/// Classify a new sample and fold it into the engine's baseline.
///
/// Returns `{"assessment": ..., "trend": ...}`.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pulse_engine_new`.
/// - `sample_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_engine_record_wellness(
    engine: *mut PulseEngineHandle,
    sample_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(sample_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid sample JSON string pointer");
            return ptr::null_mut();
        }
    };

    let result = serde_json::from_str::<WellnessSample>(&json_str)
        .map_err(ComputeError::from)
        .and_then(|sample| handle.engine.record_wellness(&sample))
        .and_then(|(assessment, trend)| {
            serde_json::to_string(&serde_json::json!({
                "assessment": assessment,
                "trend": trend,
            }))
            .map_err(ComputeError::from)
        });

    finish(result)
}

/// Save engine baselines to JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pulse_engine_new`.
/// - Returns a newly allocated string that must be freed with `pulse_free_string`.
/// - Returns NULL on error; call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_engine_save_baselines(
    engine: *const PulseEngineHandle,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    finish((*engine).engine.save_baselines())
}

/// Load engine baselines from JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pulse_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `pulse_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pulse_engine_load_baselines(
    engine: *mut PulseEngineHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.engine.load_baselines(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Pulse functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Pulse function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pulse_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Pulse function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pulse_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Pulse library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pulse_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
