//! Bindings to the vendor credential provider SDK (`libcpasswordsdk`).
//!
//! Only compiled with the `native` feature. The library and `cpasswordsdk.h`
//! ship with the Credential Provider install; on Linux the shared object is
//! expected on the default linker path or under `CPASSWORDSDK_LIB_DIR`.

use std::ffi::{c_char, c_int, c_void, CStr};

use super::{RawAttributeVector, RawHandle, VaultRuntime};

type ObjectHandle = *mut c_void;

#[link(name = "cpasswordsdk")]
extern "C" {
    fn PSDK_GetErrorCode(handle: ObjectHandle) -> c_int;
    fn PSDK_GetErrorMsg(handle: ObjectHandle) -> *const c_char;
    fn PSDK_ReleaseHandle(handle: *mut ObjectHandle);
    fn PSDK_CreateRequest(request_type: *const c_char) -> ObjectHandle;
    fn PSDK_SetAttribute(
        request: ObjectHandle,
        name: *const c_char,
        value: *const c_char,
    ) -> c_int;
    fn PSDK_GetPassword(request: ObjectHandle, response: *mut ObjectHandle) -> c_int;
    fn PSDK_GetAttribute(response: ObjectHandle, name: *const c_char) -> *mut *mut c_char;
    fn PSDK_ReleaseAttributeData(values: *mut *mut *mut c_char);
}

/// The linked vendor SDK.
///
/// Stateless; every method is a direct call into the library. Whether the
/// library tolerates concurrent calls on distinct handles depends on the
/// deployment, so this type is not `Sync`.
#[derive(Debug, Default)]
pub struct NativeRuntime {
    _not_sync: std::marker::PhantomData<*const ()>,
}

impl NativeRuntime {
    pub fn new() -> Self {
        Self::default()
    }
}

// SAFETY: PSDK_GetAttribute returns either null or a NULL-terminated vector
// of C strings owned by the SDK until PSDK_ReleaseAttributeData.
unsafe impl VaultRuntime for NativeRuntime {
    fn error_code(&self, handle: RawHandle) -> i32 {
        unsafe { PSDK_GetErrorCode(handle.as_ptr()) }
    }

    fn error_message(&self, handle: RawHandle) -> String {
        let msg = unsafe { PSDK_GetErrorMsg(handle.as_ptr()) };
        if msg.is_null() {
            return String::new();
        }
        // The buffer belongs to the handle; copy it before anything else
        // touches the handle.
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }

    fn release_handle(&self, handle: &mut RawHandle) {
        let mut ptr = handle.as_ptr();
        unsafe { PSDK_ReleaseHandle(&mut ptr) };
        *handle = RawHandle::from_ptr(ptr);
    }

    fn create_request(&self, request_type: &CStr) -> RawHandle {
        RawHandle::from_ptr(unsafe { PSDK_CreateRequest(request_type.as_ptr()) })
    }

    fn set_attribute(&self, request: RawHandle, name: &CStr, value: &CStr) -> i32 {
        unsafe { PSDK_SetAttribute(request.as_ptr(), name.as_ptr(), value.as_ptr()) }
    }

    fn get_password(&self, request: RawHandle, response: &mut RawHandle) -> i32 {
        let mut out = response.as_ptr();
        let rc = unsafe { PSDK_GetPassword(request.as_ptr(), &mut out) };
        *response = RawHandle::from_ptr(out);
        rc
    }

    fn get_attribute(&self, response: RawHandle, name: &CStr) -> RawAttributeVector {
        unsafe { PSDK_GetAttribute(response.as_ptr(), name.as_ptr()) }
    }

    fn release_attribute_data(&self, values: &mut RawAttributeVector) {
        unsafe { PSDK_ReleaseAttributeData(values) };
    }
}
