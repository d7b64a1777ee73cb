//! Error translation.
//!
//! SDK calls report failure with a bare sentinel (`RC_ERROR` or a null
//! pointer). The actual code and message are recorded on a handle and must
//! be read back with two further calls. This module is the only place that
//! sequence happens, and the only place an [`ErrorInfo`] is built.

use tracing::debug;

use crate::error::ErrorInfo;
use crate::sdk::{RawHandle, VaultRuntime, RC_SUCCESS};

/// Message reported when a call failed but the handle records success.
const UNREPORTED_FAILURE: &str = "call failed without an error recorded on the handle";

/// Read the error state of `handle`.
///
/// Returns `None` when the runtime reports success on the handle. A null
/// handle yields [`ErrorInfo::InvalidHandle`] without any native call. The
/// handle is only queried, never released.
pub fn translate<R: VaultRuntime + ?Sized>(runtime: &R, handle: RawHandle) -> Option<ErrorInfo> {
    if handle.is_null() {
        return Some(ErrorInfo::InvalidHandle);
    }

    let code = runtime.error_code(handle);
    if code == RC_SUCCESS {
        return None;
    }

    let message = runtime.error_message(handle);
    debug!(code, %message, "vault runtime reported an error");
    Some(ErrorInfo::Native { code, message })
}

/// Translate the error behind a call that returned the failure sentinel.
///
/// Like [`translate`], except a handle that claims success still produces an
/// error: `rc` is reported as the code so the failure is never lost.
pub fn translate_failure<R: VaultRuntime + ?Sized>(
    runtime: &R,
    handle: RawHandle,
    rc: i32,
) -> ErrorInfo {
    translate(runtime, handle).unwrap_or_else(|| {
        debug!(rc, "vault call failed with no error recorded on the handle");
        ErrorInfo::Native {
            code: rc,
            message: UNREPORTED_FAILURE.to_string(),
        }
    })
}
