//! FFI bindings for the IMU risk engine
//!
//! This module provides C-compatible functions for driving an engine from a host
//! platform (Android service, iOS app). Strings are null-terminated; functions
//! returning `*mut c_char` allocate, and the caller frees with `imu_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::engine::MotionEngine;
use crate::error::MonitorError;
use crate::sink::EventCollector;
use crate::types::{EngineEvent, Sample};

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

fn events_to_cstr(events: &[EngineEvent]) -> *mut c_char {
    match serde_json::to_string(events) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Engine API
// ============================================================================

/// Opaque handle to a MotionEngine
pub struct MotionEngineHandle {
    engine: MotionEngine,
    collector: EventCollector,
}

/// Create a new engine with an active session.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string
///   holding an `EngineConfig` JSON document.
/// - Must be freed with `imu_engine_free`.
/// - Returns NULL on error; call `imu_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn imu_engine_new(config_json: *const c_char) -> *mut MotionEngineHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        Ok(EngineConfig::default())
    } else {
        match cstr_to_string(config_json) {
            Some(json) => EngineConfig::from_json(&json),
            None => Err(MonitorError::ParseError(
                "Invalid config string pointer".to_string(),
            )),
        }
    };

    match config.and_then(MotionEngine::new) {
        Ok(engine) => Box::into_raw(Box::new(MotionEngineHandle {
            engine,
            collector: EventCollector::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine. Any pending cooldown is discarded.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `imu_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn imu_engine_free(engine: *mut MotionEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Feed one accelerometer sample and return the events it produced as a JSON array.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `imu_engine_new`.
/// - Must not be called concurrently for the same engine.
/// - Returns a newly allocated string that must be freed with `imu_free_string`.
/// - Returns NULL on error; call `imu_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn imu_engine_feed(
    engine: *mut MotionEngineHandle,
    timestamp_ms: i64,
    x: f64,
    y: f64,
    z: f64,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;
    let sample = Sample::new(timestamp_ms, x, y, z);

    match handle.engine.feed(sample, &mut handle.collector) {
        Ok(()) => events_to_cstr(&handle.collector.take()),
        Err(e) => {
            handle.collector.take();
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Advance engine time without a sample and return any events as a JSON array.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `imu_engine_new`.
/// - Must be called on the same serial context as `imu_engine_feed`.
/// - Returns a newly allocated string that must be freed with `imu_free_string`.
/// - Returns NULL on error; call `imu_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn imu_engine_tick(
    engine: *mut MotionEngineHandle,
    now_ms: i64,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &mut *engine;

    match handle.engine.tick(now_ms, &mut handle.collector) {
        Ok(()) => events_to_cstr(&handle.collector.take()),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Start a new session, resetting all engine state.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `imu_engine_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn imu_engine_start(engine: *mut MotionEngineHandle) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;
    handle.collector.take();
    handle.engine.start();
    0
}

/// Stop the current session, discarding partial windows and pending cooldowns.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `imu_engine_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn imu_engine_stop(engine: *mut MotionEngineHandle) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }

    let handle = &mut *engine;
    handle.engine.stop();
    handle.collector.take();
    0
}

/// Return the current session summary as JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `imu_engine_new`.
/// - Returns a newly allocated string that must be freed with `imu_free_string`.
/// - Returns NULL on error; call `imu_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn imu_engine_summary(engine: *const MotionEngineHandle) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }

    let handle = &*engine;

    match serde_json::to_string(&handle.engine.summary()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by an `imu_*` function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an `imu_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn imu_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next `imu_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn imu_last_error() -> *const c_char {
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
pub unsafe extern "C" fn imu_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
