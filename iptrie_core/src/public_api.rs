use crate::{
    constants::VALUE_MAX_LEN,
    errors::{map_error, set_last_error, ErrorCode},
    handle_registry::{register_handle, unregister_handle, with_handle, with_handle_mut, HandleId},
    table::checked_prefix_len,
    IpTrie,
};
use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_int},
};

// ─────────────────────────── helpers ─────────────────────────────────── //

#[inline]
fn cstr<'a>(p: *const c_char) -> Result<&'a str, ErrorCode> {
    if p.is_null() {
        return Err(ErrorCode::Utf8Error);
    }
    unsafe { CStr::from_ptr(p) }
        .to_str()
        .map_err(|_| ErrorCode::Utf8Error)
}

/// Record the outcome as the thread's last error and hand it back.
#[inline]
fn finish(code: ErrorCode) -> ErrorCode {
    set_last_error(code);
    code
}

// ─── small helper to turn Result<T,ErrorCode> into early-return ──────────
macro_rules! try_c { ($expr:expr) => { match $expr {
    Ok(v)  => v,
    Err(e) => return finish(e),
}}}

// ───────────────────────── lifetime ──────────────────────────────────── //

/// Create an empty table.
/// Returns `Success` **and** stores the handle in `*out`
/// -- or an error code otherwise.
#[no_mangle]
pub extern "C" fn iptrie_new(out: *mut HandleId) -> ErrorCode {
    crate::ensure_logging();
    if out.is_null() {
        return finish(ErrorCode::InvalidHandle);
    }
    let id = try_c!(register_handle(IpTrie::new()));
    unsafe { *out = id };
    finish(ErrorCode::Success)
}

#[no_mangle]
pub extern "C" fn iptrie_free(h: HandleId) -> ErrorCode {
    try_c!(unregister_handle(h));
    finish(ErrorCode::Success)
}

// ───────────────────────── CRUD ──────────────────────────────────────── //

#[no_mangle]
pub extern "C" fn iptrie_insert(
    h: HandleId,
    addr_utf8: *const c_char,
    prefix_len: c_int,
    value_utf8: *const c_char,
) -> ErrorCode {
    let addr = try_c!(cstr(addr_utf8));
    let value = try_c!(cstr(value_utf8));
    if value.len() > VALUE_MAX_LEN {
        return finish(ErrorCode::ValueTooLong);
    }
    let plen = try_c!(checked_prefix_len(addr, i64::from(prefix_len)).map_err(|e| map_error(&e)));
    // `value` came from a C string, so it has no interior NUL
    let value = try_c!(CString::new(value).map_err(|_| ErrorCode::Utf8Error));

    let res = try_c!(with_handle_mut(h, |t| t.insert(addr, plen, value)));
    match res {
        Ok(_) => finish(ErrorCode::Success),
        Err(e) => finish(map_error(&e)),
    }
}

/// Remove an exact stored prefix; `*out_removed` (may be NULL) tells whether
/// anything was stored under it.
#[no_mangle]
pub extern "C" fn iptrie_remove(
    h: HandleId,
    addr_utf8: *const c_char,
    prefix_len: c_int,
    out_removed: *mut bool,
) -> ErrorCode {
    let addr = try_c!(cstr(addr_utf8));
    let plen = try_c!(checked_prefix_len(addr, i64::from(prefix_len)).map_err(|e| map_error(&e)));
    let res = try_c!(with_handle_mut(h, |t| t.remove(addr, plen)));
    match res {
        Ok(old) => {
            if !out_removed.is_null() {
                unsafe { *out_removed = old.is_some() };
            }
            finish(ErrorCode::Success)
        }
        Err(e) => finish(map_error(&e)),
    }
}

/// Longest-prefix match. On success the value is copied NUL-terminated into
/// `out_buf` and the matched length into `*out_prefix_len` (may be NULL).
/// `NotFound` on a miss, `BufferTooSmall` if `buf_len` cannot hold the value.
#[no_mangle]
pub extern "C" fn iptrie_find(
    h: HandleId,
    addr_utf8: *const c_char,
    out_buf: *mut c_char,
    buf_len: usize,
    out_prefix_len: *mut u8,
) -> ErrorCode {
    if out_buf.is_null() {
        return finish(ErrorCode::BufferTooSmall);
    }
    let addr = try_c!(cstr(addr_utf8));
    let res = try_c!(with_handle(h, |t| match t.find_match(addr) {
        Ok(Some(m)) => {
            let bytes = m.value.as_bytes_with_nul();
            if bytes.len() > buf_len {
                return ErrorCode::BufferTooSmall;
            }
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, out_buf, bytes.len());
                if !out_prefix_len.is_null() {
                    *out_prefix_len = m.prefix.prefix_len();
                }
            }
            ErrorCode::Success
        }
        Ok(None) => ErrorCode::NotFound,
        Err(e) => map_error(&e),
    }));
    finish(res)
}

// ───────────────────── size & maintenance ────────────────────────────── //

#[no_mangle]
pub extern "C" fn iptrie_len(h: HandleId, out: *mut u64) -> ErrorCode {
    if out.is_null() {
        return finish(ErrorCode::InvalidHandle);
    }
    let n = try_c!(with_handle(h, |t| t.len()));
    unsafe { *out = n as u64 };
    finish(ErrorCode::Success)
}

#[no_mangle]
pub extern "C" fn iptrie_clear(h: HandleId) -> ErrorCode {
    try_c!(with_handle_mut(h, |t| t.clear()));
    finish(ErrorCode::Success)
}

/// Push size gauges through the registered stats callback.
#[no_mangle]
pub extern "C" fn iptrie_report_metrics(h: HandleId) -> ErrorCode {
    try_c!(with_handle(h, |t| t.report_metrics()));
    finish(ErrorCode::Success)
}
