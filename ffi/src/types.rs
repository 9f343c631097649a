//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers plus a `*_len` instead of
//! `Vec`, and enums with explicit discriminants. Conversion functions live
//! here to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::Arc;

use reqplan_core::{BindingError, MalformedDescriptor, RequestDescription, RequestTemplate};

/// Opaque handle to a compiled `RequestTemplate`. C callers receive a
/// pointer to this and pass it back into `reqplan_instantiate`.
pub struct FfiTemplate {
    pub(crate) inner: Arc<RequestTemplate>,
}

/// Copy `s` into a C string owned by the caller.
///
/// Interior NUL bytes cannot be represented and are dropped.
pub(crate) fn to_c_string(s: &str) -> *mut c_char {
    let bytes: Vec<u8> = s.bytes().filter(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}

/// Hand a vector to C as a pointer; empty vectors become null.
///
/// A length past `u32::MAX` cannot be described to C, so the tail beyond it
/// is released here and never handed out.
fn into_raw_parts<T>(mut items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = u32::try_from(items.len()).unwrap_or(u32::MAX);
    items.truncate(len as usize);
    let slice = Box::into_raw(items.into_boxed_slice());
    (slice.cast::<T>(), len)
}

/// Take back a slice handed out by `into_raw_parts`.
///
/// # Safety
/// `ptr` and `len` must come from one `into_raw_parts` call and not have
/// been reclaimed yet. Null yields an empty box.
unsafe fn from_raw_parts<T>(ptr: *mut T, len: u32) -> Box<[T]> {
    if ptr.is_null() {
        return Box::default();
    }
    unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len as usize)) }
}

fn into_raw_pairs(pairs: &[(String, String)]) -> (*mut FfiHeader, u32) {
    into_raw_parts(
        pairs
            .iter()
            .map(|(name, value)| FfiHeader {
                name: to_c_string(name),
                value: to_c_string(value),
            })
            .collect(),
    )
}

/// # Safety
/// Same contract as `from_raw_parts`.
unsafe fn free_pairs(ptr: *mut FfiHeader, len: u32) {
    for pair in unsafe { from_raw_parts(ptr, len) } {
        unsafe {
            free_c_string(pair.name);
            free_c_string(pair.value);
        }
    }
}

/// Free a C string produced by `to_c_string`. Null is ignored.
///
/// # Safety
/// `s` must be null or come from `to_c_string` and not have been freed.
pub(crate) unsafe fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Error codes returned in every result envelope.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Malformed = 1,
    Binding = 2,
    InvalidJson = 3,
    NullArg = 4,
    Panic = 5,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A name-value pair of C strings, used for headers and tags.
#[repr(C)]
pub struct FfiHeader {
    pub name: *mut c_char,
    pub value: *mut c_char,
}

/// A populated request described as C-compatible plain data.
///
/// `query` is the encoded query string without the leading `?`, empty when
/// there are no pairs. `fragment` is null when the request has none.
/// `cookies` holds serialized cookies, `name=value` followed by attributes.
/// `form_body` is null unless the endpoint is form-encoded. `tags` are
/// request attributes for the transport and are not part of the wire form.
#[repr(C)]
pub struct FfiRequestDescription {
    pub method: *mut c_char,
    pub path: *mut c_char,
    pub query: *mut c_char,
    pub fragment: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub cookies: *mut *mut c_char,
    pub cookies_len: u32,
    pub form_body: *mut c_char,
    pub tags: *mut FfiHeader,
    pub tags_len: u32,
}

impl FfiRequestDescription {
    /// Convert a core `RequestDescription` into a heap-allocated value.
    pub(crate) fn from_core(request: RequestDescription) -> *mut Self {
        let query = to_c_string(&request.query_string());
        let fragment = match &request.fragment {
            Some(f) => to_c_string(f),
            None => std::ptr::null_mut(),
        };
        let form_body = match request.form_body() {
            Some(body) => to_c_string(&body),
            None => std::ptr::null_mut(),
        };
        let (headers, headers_len) = into_raw_pairs(&request.headers);
        let (cookies, cookies_len) =
            into_raw_parts(request.cookies.iter().map(|c| to_c_string(c)).collect());
        let (tags, tags_len) = into_raw_pairs(&request.tags);

        Box::into_raw(Box::new(FfiRequestDescription {
            method: to_c_string(request.verb.as_str()),
            path: to_c_string(&request.path),
            query,
            fragment,
            headers,
            headers_len,
            cookies,
            cookies_len,
            form_body,
            tags,
            tags_len,
        }))
    }

    /// Release every C string and array owned by `request`, then the struct.
    ///
    /// # Safety
    /// `request` must be non-null and come from `from_core`.
    pub(crate) unsafe fn free(request: *mut Self) {
        let request = unsafe { Box::from_raw(request) };
        unsafe {
            free_c_string(request.method);
            free_c_string(request.path);
            free_c_string(request.query);
            free_c_string(request.fragment);
            free_c_string(request.form_body);
            free_pairs(request.headers, request.headers_len);
            free_pairs(request.tags, request.tags_len);
            for c in from_raw_parts(request.cookies, request.cookies_len) {
                free_c_string(c);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Result of `reqplan_compile`.
///
/// On success `error_code` is `Ok`, `error_message` is null and `template`
/// points to the compiled template. On failure `template` is null and
/// `error_message` lists every problem found.
///
/// Freeing the result with `reqplan_free_compile_result` does not free the
/// template; take it out and release it with `reqplan_template_free`.
#[repr(C)]
pub struct FfiCompileResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub template: *mut FfiTemplate,
}

impl FfiCompileResult {
    pub(crate) fn ok(template: RequestTemplate) -> *mut Self {
        let template = Box::into_raw(Box::new(FfiTemplate {
            inner: Arc::new(template),
        }));
        Box::into_raw(Box::new(FfiCompileResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            template,
        }))
    }

    pub(crate) fn malformed(err: MalformedDescriptor) -> *mut Self {
        Self::error(FfiErrorCode::Malformed, &err.to_string())
    }

    pub(crate) fn error(error_code: FfiErrorCode, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiCompileResult {
            error_code,
            error_message: to_c_string(msg),
            template: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, &format!("null argument: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, msg)
    }
}

/// Result of `reqplan_instantiate`.
///
/// On success `request` points to the populated request and is released
/// together with the envelope by `reqplan_free_result`.
#[repr(C)]
pub struct FfiInstantiateResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub request: *mut FfiRequestDescription,
}

impl FfiInstantiateResult {
    pub(crate) fn ok(request: RequestDescription) -> *mut Self {
        Box::into_raw(Box::new(FfiInstantiateResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            request: FfiRequestDescription::from_core(request),
        }))
    }

    pub(crate) fn binding(err: BindingError) -> *mut Self {
        Self::error(FfiErrorCode::Binding, &err.to_string())
    }

    pub(crate) fn error(error_code: FfiErrorCode, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiInstantiateResult {
            error_code,
            error_message: to_c_string(msg),
            request: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, &format!("null argument: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, msg)
    }
}
