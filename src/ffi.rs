//! FFI bindings for chewsense
//!
//! C-compatible functions for hosts that run their own camera and landmark
//! model and only need the chewing decision engine. Distances go in, decisions
//! come out through out-parameters.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use crate::engine::ChewingDetector;

/// Ingest succeeded
pub const CHEW_OK: i32 = 0;
/// Null handle or invalid argument
pub const CHEW_ERR_INVALID: i32 = -1;

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

/// Opaque handle to a ChewingDetector
pub struct ChewDetectorHandle {
    detector: ChewingDetector,
}

/// Create a detector with the given window size and threshold.
///
/// # Safety
/// - Returns a pointer that must be freed with `chew_detector_free`.
/// - Returns NULL on invalid parameters; call `chew_last_error` for the reason.
#[no_mangle]
pub unsafe extern "C" fn chew_detector_new(
    window_size: u32,
    threshold: f64,
) -> *mut ChewDetectorHandle {
    clear_last_error();

    match ChewingDetector::new(window_size as usize, threshold) {
        Ok(detector) => Box::into_raw(Box::new(ChewDetectorHandle { detector })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a detector.
///
/// # Safety
/// - `handle` must be a pointer returned by `chew_detector_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn chew_detector_free(handle: *mut ChewDetectorHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Ingest one nose-to-mouth distance.
///
/// `out_average` and `out_change_rate` receive NaN while the value is not yet
/// available. Any out-pointer may be NULL to skip it.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `chew_detector_new`.
/// - Non-null out-pointers must be valid for writes.
/// - Returns `CHEW_OK` on success, `CHEW_ERR_INVALID` otherwise.
#[no_mangle]
pub unsafe extern "C" fn chew_detector_ingest(
    handle: *mut ChewDetectorHandle,
    distance: f64,
    out_average: *mut f64,
    out_change_rate: *mut f64,
    out_is_chewing: *mut bool,
) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null detector pointer");
        return CHEW_ERR_INVALID;
    }
    if !distance.is_finite() {
        set_last_error("Distance must be finite");
        return CHEW_ERR_INVALID;
    }

    let handle = &mut *handle;
    let decision = handle.detector.ingest(distance);

    if !out_average.is_null() {
        *out_average = decision.average.unwrap_or(f64::NAN);
    }
    if !out_change_rate.is_null() {
        *out_change_rate = decision.change_rate.unwrap_or(f64::NAN);
    }
    if !out_is_chewing.is_null() {
        *out_is_chewing = decision.is_chewing;
    }
    CHEW_OK
}

/// Clear all history, returning the detector to warm-up.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `chew_detector_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn chew_detector_reset(handle: *mut ChewDetectorHandle) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null detector pointer");
        return CHEW_ERR_INVALID;
    }
    (*handle).detector.reset();
    CHEW_OK
}

/// Get the last error message.
///
/// # Safety
/// - The returned pointer is valid until the next chewsense call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn chew_last_error() -> *const c_char {
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
pub unsafe extern "C" fn chew_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_ffi_detector_lifecycle() {
        unsafe {
            let handle = chew_detector_new(3, 0.3);
            assert!(!handle.is_null());

            let mut average = 0.0;
            let mut rate = 0.0;
            let mut chewing = true;
            let mut flags = Vec::new();

            for distance in [0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 3.0, 3.0] {
                let code = chew_detector_ingest(
                    handle,
                    distance,
                    &mut average,
                    &mut rate,
                    &mut chewing,
                );
                assert_eq!(code, CHEW_OK);
                flags.push(chewing);
            }

            assert_eq!(
                flags,
                vec![false, false, false, false, false, true, true, true]
            );
            assert_eq!(average, 3.0);
            assert_eq!(rate, 1.0);

            assert_eq!(chew_detector_reset(handle), CHEW_OK);
            chew_detector_ingest(handle, 5.0, &mut average, &mut rate, &mut chewing);
            assert!(average.is_nan());
            assert!(rate.is_nan());
            assert!(!chewing);

            chew_detector_free(handle);
        }
    }

    #[test]
    fn test_ffi_rejects_bad_parameters() {
        unsafe {
            let handle = chew_detector_new(0, 0.35);
            assert!(handle.is_null());

            let error = chew_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("window"));

            let code = chew_detector_ingest(
                ptr::null_mut(),
                1.0,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            );
            assert_eq!(code, CHEW_ERR_INVALID);
        }
    }

    #[test]
    fn test_ffi_null_out_params() {
        unsafe {
            let handle = chew_detector_new(1, 0.5);
            let code = chew_detector_ingest(
                handle,
                4.0,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            );
            assert_eq!(code, CHEW_OK);
            assert!(chew_last_error().is_null());
            chew_detector_free(handle);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = chew_version();
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, env!("CARGO_PKG_VERSION"));
        }
    }
}
