//! C FFI for native mobile integration (Android/iOS).
//!
//! Enable with the `ffi` feature flag. Functions return null (or a negative
//! status) on failure; `brisk_last_error` describes the most recent failure on
//! the calling thread.
//!
//! ```c
//! #include "brisk.h"
//! BriskModule* m = brisk_load("model.json");
//! size_t shape[4] = {1, 3, 4, 4};
//! BriskOutput* out = brisk_forward(m, data, shape, 4);
//! brisk_free_output(out);
//! brisk_free(m);
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

use brisk_core::{BriskError, ErrorKind};

use crate::module::{load, HostArray, Module};

/// Opaque module handle for C API.
pub struct BriskModule {
    inner: Module,
}

/// Row-major output array. `shape` has `ndim` entries.
#[repr(C)]
pub struct BriskOutput {
    pub data: *mut f32,
    pub len: usize,
    pub shape: [usize; 4],
    pub ndim: usize,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<(c_int, CString)>> = const { RefCell::new(None) };
}

/// Status code for an error kind: parameter -1, unsupported -2, model -3,
/// registration -4, io -5.
fn status_code(kind: ErrorKind) -> c_int {
    match kind {
        ErrorKind::Parameter => -1,
        ErrorKind::UnsupportedConfiguration => -2,
        ErrorKind::Model => -3,
        ErrorKind::Registration => -4,
        ErrorKind::Io => -5,
    }
}

fn set_error(err: &BriskError) {
    let message = CString::new(err.to_string()).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some((status_code(err.kind()), message)));
}

fn invalid_argument<T>(message: &str) -> *mut T {
    set_error(&BriskError::Parameter(message.into()));
    std::ptr::null_mut()
}

/// Load a model descriptor from a file path. Returns null on failure.
#[no_mangle]
pub unsafe extern "C" fn brisk_load(path: *const c_char) -> *mut BriskModule {
    if path.is_null() {
        return invalid_argument("brisk_load: path is null");
    }

    let path = match CStr::from_ptr(path).to_str() {
        Ok(s) => s,
        Err(_) => return invalid_argument("brisk_load: path is not valid UTF-8"),
    };

    match load(path) {
        Ok(inner) => Box::into_raw(Box::new(BriskModule { inner })),
        Err(e) => {
            set_error(&e);
            std::ptr::null_mut()
        }
    }
}

/// Run the module on a row-major float32 array. Returns null on failure.
#[no_mangle]
pub unsafe extern "C" fn brisk_forward(
    module: *mut BriskModule,
    data: *const f32,
    shape: *const usize,
    ndim: usize,
) -> *mut BriskOutput {
    if module.is_null() || data.is_null() || shape.is_null() {
        return invalid_argument("brisk_forward: null module, data or shape");
    }
    if ndim == 0 {
        return invalid_argument("brisk_forward: ndim must be at least 1");
    }

    let module = &mut (*module).inner;
    let shape = std::slice::from_raw_parts(shape, ndim);
    let len: usize = shape.iter().product();
    let values = std::slice::from_raw_parts(data, len).to_vec();

    let result = HostArray::new(shape, values).and_then(|x| module.forward(&x));
    let output = match result {
        Ok(y) => y,
        Err(e) => {
            set_error(&e);
            return std::ptr::null_mut();
        }
    };

    let mut out_shape = [1usize; 4];
    let dims = output.shape();
    out_shape[..dims.len()].copy_from_slice(dims);
    let ndim = dims.len();
    let data = output.into_data();
    let len = data.len();
    let data_ptr = Box::into_raw(data.into_boxed_slice()) as *mut f32;

    Box::into_raw(Box::new(BriskOutput {
        data: data_ptr,
        len,
        shape: out_shape,
        ndim,
    }))
}

/// Status code of the last failure on this thread, or 0.
#[no_mangle]
pub extern "C" fn brisk_last_status() -> c_int {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map_or(0, |(code, _)| *code))
}

/// Message of the last failure on this thread, or null. Valid until the next
/// failing call on the same thread.
#[no_mangle]
pub extern "C" fn brisk_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(std::ptr::null(), |(_, msg)| msg.as_ptr())
    })
}

/// Free a BriskOutput.
#[no_mangle]
pub unsafe extern "C" fn brisk_free_output(output: *mut BriskOutput) {
    if !output.is_null() {
        let out = Box::from_raw(output);
        if !out.data.is_null() {
            let _ = Box::from_raw(std::slice::from_raw_parts_mut(out.data, out.len) as *mut [f32]);
        }
    }
}

/// Free a BriskModule.
#[no_mangle]
pub unsafe extern "C" fn brisk_free(module: *mut BriskModule) {
    if !module.is_null() {
        let _ = Box::from_raw(module);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_arguments() {
        unsafe {
            assert!(brisk_load(std::ptr::null()).is_null());
            assert!(brisk_forward(std::ptr::null_mut(), std::ptr::null(), std::ptr::null(), 0).is_null());
            brisk_free(std::ptr::null_mut());
            brisk_free_output(std::ptr::null_mut());
        }
    }

    #[test]
    fn test_invalid_arguments_set_parameter_status() {
        let missing = CString::new("/nonexistent/brisk-model.json").unwrap();
        unsafe {
            // Start from a different status so a stale code cannot pass.
            assert!(brisk_load(missing.as_ptr()).is_null());
            assert_eq!(brisk_last_status(), -5);
            assert!(brisk_load(std::ptr::null()).is_null());
            assert_eq!(brisk_last_status(), -1);

            let not_utf8 = CString::new(vec![0xff, 0xfe, b'.', b'j']).unwrap();
            assert!(brisk_load(missing.as_ptr()).is_null());
            assert!(brisk_load(not_utf8.as_ptr()).is_null());
            assert_eq!(brisk_last_status(), -1);

            let data = [0.0f32; 4];
            let shape = [1usize, 1, 2, 2];
            assert!(brisk_load(missing.as_ptr()).is_null());
            assert!(brisk_forward(std::ptr::null_mut(), data.as_ptr(), shape.as_ptr(), 4).is_null());
            assert_eq!(brisk_last_status(), -1);
            let msg = CStr::from_ptr(brisk_last_error()).to_str().unwrap();
            assert!(msg.contains("brisk_forward"), "{msg}");
        }
    }

    #[test]
    fn test_missing_file_sets_error() {
        let path = CString::new("/nonexistent/brisk-model.json").unwrap();
        let module = unsafe { brisk_load(path.as_ptr()) };
        assert!(module.is_null());
        assert_eq!(brisk_last_status(), -5);
        assert!(!brisk_last_error().is_null());
    }
}
