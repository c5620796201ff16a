//! Error handling and C-ABI error codes for iptrie

use std::cell::RefCell;
use std::os::raw::c_char;

/// Error type for trie and loader operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    #[error("invalid prefix length {prefix_len} (family allows 0..={max})")]
    InvalidPrefixLength { prefix_len: i64, max: u8 },
    #[error("malformed CIDR line {line}: {reason}")]
    MalformedLine { line: usize, reason: &'static str },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidAddress = 1,
    InvalidPrefixLength = 2,
    InvalidHandle = 3,
    Utf8Error = 4,
    NotFound = 5,
    BufferTooSmall = 6,
    ValueTooLong = 7,
    Unknown = 255,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::InvalidAddress => "Invalid address",
            ErrorCode::InvalidPrefixLength => "Invalid prefix length",
            ErrorCode::InvalidHandle => "Invalid handle",
            ErrorCode::Utf8Error => "UTF-8 conversion error",
            ErrorCode::NotFound => "Not found",
            ErrorCode::BufferTooSmall => "Buffer too small",
            ErrorCode::ValueTooLong => "Value too long",
            ErrorCode::Unknown => "Unknown error",
        }
    }

    /// Same text as [`as_str`](Self::as_str), NUL-terminated for C callers.
    fn as_cstr(self) -> &'static [u8] {
        match self {
            ErrorCode::Success => b"Success\0",
            ErrorCode::InvalidAddress => b"Invalid address\0",
            ErrorCode::InvalidPrefixLength => b"Invalid prefix length\0",
            ErrorCode::InvalidHandle => b"Invalid handle\0",
            ErrorCode::Utf8Error => b"UTF-8 conversion error\0",
            ErrorCode::NotFound => b"Not found\0",
            ErrorCode::BufferTooSmall => b"Buffer too small\0",
            ErrorCode::ValueTooLong => b"Value too long\0",
            ErrorCode::Unknown => b"Unknown error\0",
        }
    }
}

// Thread-local last error for C-ABI
thread_local! {
    static LAST_ERROR: RefCell<ErrorCode> = const { RefCell::new(ErrorCode::Success) };
}

pub fn set_last_error(code: ErrorCode) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = code);
}

pub fn get_last_error() -> ErrorCode {
    LAST_ERROR.with(|cell| *cell.borrow())
}

#[no_mangle]
pub extern "C" fn iptrie_last_error() -> ErrorCode {
    get_last_error()
}

#[no_mangle]
pub extern "C" fn iptrie_strerror(code: ErrorCode) -> *const c_char {
    code.as_cstr().as_ptr() as *const c_char
}

// Map internal Error to ErrorCode
pub fn map_error(e: &Error) -> ErrorCode {
    match e {
        Error::InvalidAddress(_) => ErrorCode::InvalidAddress,
        Error::InvalidPrefixLength { .. } => ErrorCode::InvalidPrefixLength,
        Error::MalformedLine { .. } | Error::Io(_) => ErrorCode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn strerror_matches_as_str() {
        for code in [
            ErrorCode::Success,
            ErrorCode::InvalidAddress,
            ErrorCode::InvalidPrefixLength,
            ErrorCode::InvalidHandle,
            ErrorCode::Utf8Error,
            ErrorCode::NotFound,
            ErrorCode::BufferTooSmall,
            ErrorCode::ValueTooLong,
            ErrorCode::Unknown,
        ] {
            let c = unsafe { CStr::from_ptr(iptrie_strerror(code)) };
            assert_eq!(c.to_str().unwrap(), code.as_str());
        }
    }

    #[test]
    fn last_error_is_thread_local() {
        set_last_error(ErrorCode::NotFound);
        std::thread::spawn(|| assert_eq!(get_last_error(), ErrorCode::Success))
            .join()
            .unwrap();
        assert_eq!(get_last_error(), ErrorCode::NotFound);
    }
}
