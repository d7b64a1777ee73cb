//! Native credential provider SDK boundary.
//!
//! The vault SDK is a C library built around opaque `ObjectHandle` values.
//! Every call either returns a coarse return code (`RC_SUCCESS` / `RC_ERROR`)
//! or a pointer that is null on failure; the real diagnostic lives on the
//! handle and is fetched with a second call.
//!
//! [`VaultRuntime`] describes that surface one-to-one so the handle
//! discipline in [`crate::provider`] can run against either the linked
//! vendor library ([`native::NativeRuntime`], `native` feature) or the
//! in-process [`mock::MockRuntime`].
//!
//! # Memory management
//! Handles are released with [`VaultRuntime::release_handle`]. Attribute
//! vectors returned by [`VaultRuntime::get_attribute`] are released with
//! [`VaultRuntime::release_attribute_data`]; releasing the response handle
//! does not free them.

use std::ffi::{c_char, c_void, CStr};

pub mod mock;
#[cfg(feature = "native")]
pub mod native;

/// Return code signalling success (`PSDK_RC_SUCCESS`).
pub const RC_SUCCESS: i32 = 0;

/// Return code signalling failure (`PSDK_RC_ERROR`). Carries no detail.
pub const RC_ERROR: i32 = -1;

// ============================================================================
// Raw handles
// ============================================================================

/// A raw `ObjectHandle` as the SDK hands it out.
///
/// Carries no ownership; see [`crate::provider::Handle`] for the owning
/// guard. The wrapped pointer keeps this type `!Send` and `!Sync`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(*mut c_void);

impl RawHandle {
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl Default for RawHandle {
    fn default() -> Self {
        Self::null()
    }
}

/// A raw, null-terminated vector of NUL-terminated strings
/// (`char **`) returned by the attribute query.
pub type RawAttributeVector = *mut *mut c_char;

// ============================================================================
// Runtime trait
// ============================================================================

/// The native operations of the credential provider SDK.
///
/// Methods mirror the C functions and keep their sentinel conventions; no
/// method translates errors. That is the job of
/// [`crate::provider::translate`].
///
/// # Safety
/// Implementors guarantee that a non-null [`RawAttributeVector`] returned by
/// [`get_attribute`](VaultRuntime::get_attribute) points to a null-terminated
/// array of valid NUL-terminated C strings, and stays valid until it is passed
/// to [`release_attribute_data`](VaultRuntime::release_attribute_data).
pub unsafe trait VaultRuntime {
    /// `PSDK_GetErrorCode`: the last error code recorded on `handle`.
    fn error_code(&self, handle: RawHandle) -> i32;

    /// `PSDK_GetErrorMsg`: the last error message recorded on `handle`,
    /// copied out of the SDK's buffer.
    fn error_message(&self, handle: RawHandle) -> String;

    /// `PSDK_ReleaseHandle`: frees `handle` and nulls it.
    fn release_handle(&self, handle: &mut RawHandle);

    /// `PSDK_CreateRequest`: a new request handle of the given type
    /// (normally `"PASSWORD"`), or null.
    fn create_request(&self, request_type: &CStr) -> RawHandle;

    /// `PSDK_SetAttribute` on a request handle.
    fn set_attribute(&self, request: RawHandle, name: &CStr, value: &CStr) -> i32;

    /// `PSDK_GetPassword`: on success writes a new response handle into
    /// `response`.
    fn get_password(&self, request: RawHandle, response: &mut RawHandle) -> i32;

    /// `PSDK_GetAttribute`: the values of `name` on a response, or null.
    fn get_attribute(&self, response: RawHandle, name: &CStr) -> RawAttributeVector;

    /// `PSDK_ReleaseAttributeData`: frees a vector and nulls it.
    fn release_attribute_data(&self, values: &mut RawAttributeVector);
}

unsafe impl<R: VaultRuntime + ?Sized> VaultRuntime for &R {
    fn error_code(&self, handle: RawHandle) -> i32 {
        (**self).error_code(handle)
    }

    fn error_message(&self, handle: RawHandle) -> String {
        (**self).error_message(handle)
    }

    fn release_handle(&self, handle: &mut RawHandle) {
        (**self).release_handle(handle)
    }

    fn create_request(&self, request_type: &CStr) -> RawHandle {
        (**self).create_request(request_type)
    }

    fn set_attribute(&self, request: RawHandle, name: &CStr, value: &CStr) -> i32 {
        (**self).set_attribute(request, name, value)
    }

    fn get_password(&self, request: RawHandle, response: &mut RawHandle) -> i32 {
        (**self).get_password(request, response)
    }

    fn get_attribute(&self, response: RawHandle, name: &CStr) -> RawAttributeVector {
        (**self).get_attribute(response, name)
    }

    fn release_attribute_data(&self, values: &mut RawAttributeVector) {
        (**self).release_attribute_data(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_handle_defaults_to_null() {
        assert!(RawHandle::default().is_null());
        assert_eq!(RawHandle::null(), RawHandle::from_ptr(std::ptr::null_mut()));
    }

    #[test]
    fn sentinels_are_distinct() {
        assert_ne!(RC_SUCCESS, RC_ERROR);
    }
}
