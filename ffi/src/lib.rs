//! C-ABI wrapper around `reqplan-core`.
//!
//! # Overview
//! Exposes `compile` and `instantiate` through `extern "C"` functions so any
//! language with a C FFI can turn endpoint descriptors into concrete
//! requests. Descriptors and call arguments cross the boundary as JSON; the
//! populated request comes back as plain C data.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A compiled template is an opaque handle; it can be instantiated any
//!   number of times, from any thread, until `reqplan_template_free`.
//! - Result envelopes carry an `FfiErrorCode` and a message, so failures
//!   never surface as bare null pointers.
//! - The C caller owns all returned pointers and must call the matching
//!   `reqplan_free_*` function to release them.
//!
//! The C header is generated into `include/reqplan.h` by `build.rs`.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::catch_unwind;

use reqplan_core::{ArgValue, EndpointDescriptor};

use types::*;

/// Read a JSON document from a C string.
fn read_json<T: serde::de::DeserializeOwned>(ptr: *const c_char) -> Result<T, String> {
    let text = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| format!("invalid UTF-8: {e}"))?;
    serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Compile an endpoint descriptor given as JSON.
///
/// The JSON has the same shape as `EndpointDescriptor`'s serde form.
/// Returns `InvalidJson` if the text does not parse, `Malformed` with every
/// problem listed if the descriptor is invalid.
/// The caller must free the returned pointer with
/// `reqplan_free_compile_result` and the template with
/// `reqplan_template_free`.
#[unsafe(no_mangle)]
pub extern "C" fn reqplan_compile(descriptor_json: *const c_char) -> *mut FfiCompileResult {
    catch_unwind(|| {
        if descriptor_json.is_null() {
            return FfiCompileResult::null_arg("descriptor_json");
        }
        let descriptor: EndpointDescriptor = match read_json(descriptor_json) {
            Ok(d) => d,
            Err(msg) => return FfiCompileResult::error(FfiErrorCode::InvalidJson, &msg),
        };
        match reqplan_core::compile(&descriptor) {
            Ok(template) => FfiCompileResult::ok(template),
            Err(e) => FfiCompileResult::malformed(e),
        }
    })
    .unwrap_or_else(|_| FfiCompileResult::panic("panic in reqplan_compile"))
}

/// Free a template returned inside an `FfiCompileResult`. Safe to call
/// with null.
#[unsafe(no_mangle)]
pub extern "C" fn reqplan_template_free(template: *mut FfiTemplate) {
    if !template.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(template) });
        });
    }
}

/// Number of positional arguments `reqplan_instantiate` expects for
/// `template`, or 0 if `template` is null.
#[unsafe(no_mangle)]
pub extern "C" fn reqplan_template_arity(template: *const FfiTemplate) -> u32 {
    catch_unwind(|| {
        if template.is_null() {
            return 0;
        }
        let template = unsafe { &*template };
        template.inner.arity() as u32
    })
    .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Instantiation
// ---------------------------------------------------------------------------

/// Populate `template` with call arguments given as a JSON array.
///
/// Element `i` of the array is the argument at position `i`; `null` stands
/// for an absent value. Returns `InvalidJson` if the text is not a JSON
/// array, `Binding` if an argument cannot be bound.
/// The caller must free the returned pointer with `reqplan_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn reqplan_instantiate(
    template: *const FfiTemplate,
    args_json: *const c_char,
) -> *mut FfiInstantiateResult {
    catch_unwind(|| {
        if template.is_null() {
            return FfiInstantiateResult::null_arg("template");
        }
        if args_json.is_null() {
            return FfiInstantiateResult::null_arg("args_json");
        }
        let template = unsafe { &*template };
        let args: Vec<serde_json::Value> = match read_json(args_json) {
            Ok(a) => a,
            Err(msg) => return FfiInstantiateResult::error(FfiErrorCode::InvalidJson, &msg),
        };
        let args: Vec<ArgValue> = args.into_iter().map(ArgValue::from).collect();
        match reqplan_core::instantiate(&template.inner, &args) {
            Ok(request) => FfiInstantiateResult::ok(request),
            Err(e) => FfiInstantiateResult::binding(e),
        }
    })
    .unwrap_or_else(|_| FfiInstantiateResult::panic("panic in reqplan_instantiate"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiCompileResult` returned by `reqplan_compile`.
/// Safe to call with null. The template it points to is left alone.
#[unsafe(no_mangle)]
pub extern "C" fn reqplan_free_compile_result(result: *mut FfiCompileResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        unsafe { free_c_string(result.error_message) };
    });
}

/// Free an `FfiInstantiateResult` returned by `reqplan_instantiate`,
/// including the request it carries. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn reqplan_free_result(result: *mut FfiInstantiateResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        unsafe { free_c_string(result.error_message) };
        if !result.request.is_null() {
            unsafe { FfiRequestDescription::free(result.request) };
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn reqplan_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            unsafe { free_c_string(s) };
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn c_str<'a>(ptr: *const c_char) -> &'a str {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()
    }

    fn compile_ok(json: &str) -> *mut FfiTemplate {
        let json = CString::new(json).unwrap();
        let result = reqplan_compile(json.as_ptr());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::Ok);
        assert!(result_ref.error_message.is_null());
        let template = result_ref.template;
        assert!(!template.is_null());
        reqplan_free_compile_result(result);
        template
    }

    const GET_REPO: &str = r#"{
        "name": "getRepo",
        "verb": "GET",
        "path": "repos/{owner}/{repo}",
        "headers": [{ "name": "Accept", "value": "application/json", "order": 0 }],
        "parameters": [
            { "role": "path", "name": "owner", "index": 0 },
            { "role": "path", "name": "repo", "index": 1 },
            { "role": "query", "name": "page", "index": 2 },
            { "role": "cookie", "name": "theme", "index": 3 },
            { "role": "fragment", "index": 4 }
        ]
    }"#;

    #[test]
    fn compile_and_free() {
        let template = compile_ok(GET_REPO);
        assert_eq!(reqplan_template_arity(template), 5);
        reqplan_template_free(template);
    }

    #[test]
    fn compile_null_returns_null_arg() {
        let result = reqplan_compile(std::ptr::null());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::NullArg);
        assert!(result_ref.template.is_null());
        assert!(c_str(result_ref.error_message).contains("descriptor_json"));
        reqplan_free_compile_result(result);
    }

    #[test]
    fn compile_invalid_json() {
        let json = CString::new("{ not json").unwrap();
        let result = reqplan_compile(json.as_ptr());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::InvalidJson);
        assert!(result_ref.template.is_null());
        reqplan_free_compile_result(result);
    }

    #[test]
    fn compile_verb_of_wrong_type_is_invalid_json() {
        let json = CString::new(r#"{ "verb": 42, "path": "x" }"#).unwrap();
        let result = reqplan_compile(json.as_ptr());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::InvalidJson);
        reqplan_free_compile_result(result);
    }

    #[test]
    fn compile_verb_that_is_not_a_token_is_malformed() {
        let json = CString::new(r#"{ "verb": "BAD VERB", "path": "x" }"#).unwrap();
        let result = reqplan_compile(json.as_ptr());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::Malformed);
        assert!(c_str(result_ref.error_message).contains("BAD VERB"));
        reqplan_free_compile_result(result);
    }

    #[test]
    fn compile_lowercase_verb_is_kept_as_custom() {
        let template = compile_ok(r#"{ "verb": "get", "path": "x" }"#);
        let args = CString::new("[]").unwrap();
        let result = reqplan_instantiate(template, args.as_ptr());
        assert_eq!(c_str(unsafe { &*(*result).request }.method), "get");
        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn compile_malformed_descriptor_lists_problem() {
        let json = CString::new(r#"{ "name": "getUser", "verb": "GET", "path": "users/{id}" }"#).unwrap();
        let result = reqplan_compile(json.as_ptr());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::Malformed);
        assert!(result_ref.template.is_null());
        let msg = c_str(result_ref.error_message);
        assert!(msg.contains("getUser"), "{msg}");
        assert!(msg.contains("id"), "{msg}");
        reqplan_free_compile_result(result);
    }

    #[test]
    fn instantiate_returns_populated_request() {
        let template = compile_ok(GET_REPO);
        let args = CString::new(r#"["kingg22", "ktorgen", 2, "dark", "readme"]"#).unwrap();
        let result = reqplan_instantiate(template, args.as_ptr());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::Ok);
        assert!(result_ref.error_message.is_null());

        let req = unsafe { &*result_ref.request };
        assert_eq!(c_str(req.method), "GET");
        assert_eq!(c_str(req.path), "repos/kingg22/ktorgen");
        assert_eq!(c_str(req.query), "page=2");
        assert_eq!(c_str(req.fragment), "readme");

        assert_eq!(req.headers_len, 1);
        let header = unsafe { &*req.headers };
        assert_eq!(c_str(header.name), "Accept");
        assert_eq!(c_str(header.value), "application/json");

        assert_eq!(req.cookies_len, 1);
        assert_eq!(c_str(unsafe { *req.cookies }), "theme=dark");

        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn instantiate_null_optionals_leave_fields_empty() {
        let template = compile_ok(GET_REPO);
        let args = CString::new(r#"["a", "b", null, null, null]"#).unwrap();
        let result = reqplan_instantiate(template, args.as_ptr());
        let req = unsafe { &*(*result).request };
        assert_eq!(c_str(req.query), "");
        assert!(req.fragment.is_null());
        assert_eq!(req.cookies_len, 0);
        assert!(req.cookies.is_null());

        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn instantiate_template_many_times() {
        let template = compile_ok(GET_REPO);
        for owner in ["a", "b", "c"] {
            let args = CString::new(format!(r#"["{owner}", "r", null, null, null]"#)).unwrap();
            let result = reqplan_instantiate(template, args.as_ptr());
            let req = unsafe { &*(*result).request };
            assert_eq!(c_str(req.path), format!("repos/{owner}/r"));
            reqplan_free_result(result);
        }
        reqplan_template_free(template);
    }

    #[test]
    fn instantiate_missing_path_argument_is_binding_error() {
        let template = compile_ok(GET_REPO);
        let args = CString::new(r#"["kingg22"]"#).unwrap();
        let result = reqplan_instantiate(template, args.as_ptr());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::Binding);
        assert!(result_ref.request.is_null());
        assert!(c_str(result_ref.error_message).contains("repo"));

        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn instantiate_form_endpoint_exposes_body_and_tags() {
        let template = compile_ok(
            r#"{
                "verb": "POST",
                "path": "user/edit",
                "form_encoded": true,
                "parameters": [
                    { "role": "field", "name": "name", "index": 0 },
                    { "role": "field", "name": "job", "index": 1 },
                    { "role": "tag", "name": "trace", "index": 2 }
                ]
            }"#,
        );
        let args = CString::new(r#"["Bob Smith", "President", "t-1"]"#).unwrap();
        let result = reqplan_instantiate(template, args.as_ptr());
        let req = unsafe { &*(*result).request };
        assert_eq!(c_str(req.form_body), "name=Bob+Smith&job=President");

        assert_eq!(req.headers_len, 1);
        let header = unsafe { &*req.headers };
        assert_eq!(c_str(header.name), "Content-Type");
        assert_eq!(c_str(header.value), "application/x-www-form-urlencoded");

        assert_eq!(req.tags_len, 1);
        let tag = unsafe { &*req.tags };
        assert_eq!(c_str(tag.name), "trace");
        assert_eq!(c_str(tag.value), "t-1");

        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn instantiate_non_form_endpoint_has_null_body() {
        let template = compile_ok(GET_REPO);
        let args = CString::new(r#"["a", "b", null, null, null]"#).unwrap();
        let result = reqplan_instantiate(template, args.as_ptr());
        let req = unsafe { &*(*result).request };
        assert!(req.form_body.is_null());
        assert!(req.tags.is_null());
        assert_eq!(req.tags_len, 0);

        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn instantiate_header_map_with_crlf_name_is_binding_error() {
        let template = compile_ok(
            r#"{ "verb": "GET", "path": "x", "parameters": [{ "role": "header_map", "index": 0 }] }"#,
        );
        let args = CString::new(r#"[{ "X-A
Injected": "1" }]"#).unwrap();
        let result = reqplan_instantiate(template, args.as_ptr());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::Binding);
        assert!(result_ref.request.is_null());
        assert!(c_str(result_ref.error_message).contains("not a valid header name"));

        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn instantiate_args_must_be_an_array() {
        let template = compile_ok(GET_REPO);
        let args = CString::new(r#"{ "owner": "a" }"#).unwrap();
        let result = reqplan_instantiate(template, args.as_ptr());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::InvalidJson);
        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn instantiate_null_arguments() {
        let args = CString::new("[]").unwrap();
        let result = reqplan_instantiate(std::ptr::null(), args.as_ptr());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::NullArg);
        assert!(c_str(result_ref.error_message).contains("template"));
        reqplan_free_result(result);

        let template = compile_ok(GET_REPO);
        let result = reqplan_instantiate(template, std::ptr::null());
        let result_ref = unsafe { &*result };
        assert_eq!(result_ref.error_code, FfiErrorCode::NullArg);
        assert!(c_str(result_ref.error_message).contains("args_json"));
        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn interior_nul_is_dropped_from_output() {
        let template = compile_ok(r#"{ "verb": "GET", "path": "x", "parameters": [{ "role": "fragment", "index": 0, "encoded": true }] }"#);
        let args = CString::new(r#"["a\u0000b"]"#).unwrap();
        let result = reqplan_instantiate(template, args.as_ptr());
        let req = unsafe { &*(*result).request };
        assert_eq!(c_str(req.fragment), "ab");
        reqplan_free_result(result);
        reqplan_template_free(template);
    }

    #[test]
    fn template_arity_null_is_zero() {
        assert_eq!(reqplan_template_arity(std::ptr::null()), 0);
    }

    #[test]
    fn free_null_is_safe() {
        reqplan_template_free(std::ptr::null_mut());
        reqplan_free_compile_result(std::ptr::null_mut());
        reqplan_free_result(std::ptr::null_mut());
        reqplan_free_string(std::ptr::null_mut());
    }

    #[test]
    fn free_string_releases_library_string() {
        let s = to_c_string("hello");
        assert_eq!(c_str(s), "hello");
        reqplan_free_string(s);
    }
}
