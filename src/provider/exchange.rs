//! Password retrieval: request handle in, response handle out.

use tracing::debug;

use super::handle::{Handle, HandleRole};
use super::translate::translate_failure;
use crate::error::ErrorInfo;
use crate::sdk::{RawHandle, VaultRuntime, RC_ERROR, RC_SUCCESS};

/// Run the password request and return the response handle.
///
/// The request content is not inspected. On failure the error is read from
/// the **request** handle, since that is where the runtime records it, and
/// no response handle survives the call. On success the caller owns the
/// response and its release.
pub fn fetch_password<'rt, R: VaultRuntime + ?Sized>(
    request: &Handle<'rt, R>,
) -> Result<Handle<'rt, R>, ErrorInfo> {
    let runtime = request.runtime();
    if request.is_null() {
        return Err(translate_failure(runtime, request.raw(), RC_ERROR));
    }

    let mut raw = RawHandle::null();
    let rc = runtime.get_password(request.raw(), &mut raw);
    // SAFETY: `raw` was just written by the runtime and is owned by nobody
    // else. A failing call that still wrote a handle gets it released here.
    let response = unsafe { Handle::from_raw(runtime, raw, HandleRole::Response) };

    if rc != RC_SUCCESS {
        drop(response);
        let err = translate_failure(runtime, request.raw(), rc);
        debug!(rc, code = ?err.code(), "password request failed");
        return Err(err);
    }

    if response.is_null() {
        debug!("password request succeeded without a response handle");
        return Err(translate_failure(runtime, response.raw(), rc));
    }

    debug!("password request succeeded");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::mock::{MockAccount, MockFault, MockRuntime, ERR_OBJECT_NOT_FOUND};
    use std::ffi::CString;

    fn request<'rt>(rt: &'rt MockRuntime, query: &str) -> Handle<'rt, MockRuntime> {
        let raw = rt.create_request(&CString::new("PASSWORD").unwrap());
        rt.set_attribute(
            raw,
            &CString::new("Query").unwrap(),
            &CString::new(query).unwrap(),
        );
        unsafe { Handle::from_raw(rt, raw, HandleRole::Request) }
    }

    fn vault() -> MockRuntime {
        MockRuntime::new().with_account(
            MockAccount::new("Apps", "db-admin").attribute("Password", "hunter2"),
        )
    }

    #[test]
    fn accepted_request_yields_response() {
        let rt = vault();
        let req = request(&rt, "Safe=Apps;Object=db-admin");
        let resp = fetch_password(&req).unwrap();
        assert!(!resp.is_null());
        assert_eq!(resp.role(), HandleRole::Response);
        drop(resp);
        drop(req);
        assert!(rt.is_clean());
    }

    #[test]
    fn rejected_request_reports_request_error() {
        let rt = vault();
        let req = request(&rt, "Safe=Apps;Object=missing");
        let err = fetch_password(&req).unwrap_err();
        assert_eq!(err.code(), Some(ERR_OBJECT_NOT_FOUND));
        assert_eq!(rt.live_handles(), 1);
        drop(req);
        assert!(rt.is_clean());
    }

    #[test]
    fn response_written_on_failure_is_released() {
        let rt = vault().with_fault(MockFault::ResponseOnFailure);
        let req = request(&rt, "Safe=Apps;Object=missing");
        assert!(fetch_password(&req).is_err());
        assert_eq!(rt.handle_releases(), 1);
        drop(req);
        assert!(rt.is_clean());
    }

    #[test]
    fn silent_failure_still_errors() {
        let rt = vault().with_fault(MockFault::SilentFailure);
        let req = request(&rt, "Safe=Apps;Object=db-admin");
        let err = fetch_password(&req).unwrap_err();
        assert!(!err.is_invalid_handle());
        drop(req);
        assert!(rt.is_clean());
    }

    #[test]
    fn success_without_response_is_invalid_handle() {
        let rt = vault().with_fault(MockFault::NullResponseOnSuccess);
        let req = request(&rt, "Safe=Apps;Object=db-admin");
        let calls = rt.native_calls();
        assert_eq!(fetch_password(&req).unwrap_err(), ErrorInfo::InvalidHandle);
        // Only the password call itself; a null response is never queried.
        assert_eq!(rt.native_calls(), calls + 1);
        drop(req);
        assert!(rt.is_clean());
    }

    #[test]
    fn null_request_is_invalid_handle() {
        let rt = vault();
        let req = Handle::null(&rt, HandleRole::Request);
        assert_eq!(fetch_password(&req).unwrap_err(), ErrorInfo::InvalidHandle);
        assert_eq!(rt.native_calls(), 0);
    }
}
