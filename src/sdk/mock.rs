//! In-process stand-in for the credential provider SDK.
//!
//! [`MockRuntime`] keeps a small catalogue of accounts, answers password
//! requests the way the vendor library does (sentinel return codes, error
//! code and message recorded on the handle) and tracks every allocation it
//! hands out. Attribute vectors are real heap allocations of C strings, so
//! copy-out and release behave exactly as with the native library.
//!
//! The tracker reports live handles, live vectors and invalid releases
//! (double release or a pointer the runtime never issued), which is what the
//! release discipline in [`crate::provider`] is tested against.

use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};

use parking_lot::Mutex;

use super::{RawAttributeVector, RawHandle, VaultRuntime, RC_ERROR, RC_SUCCESS};

/// Error code recorded when a handle the runtime does not know is queried.
pub const ERR_INVALID_HANDLE: i32 = 1;
/// Error code recorded when the application ID is not authorised.
pub const ERR_APP_NOT_AUTHORIZED: i32 = 2;
/// Error code recorded when no account matches the request query.
pub const ERR_OBJECT_NOT_FOUND: i32 = 3;
/// Error code recorded when a response has no value for an attribute.
pub const ERR_ATTRIBUTE_NOT_FOUND: i32 = 4;
/// Error code recorded when the request is malformed (missing query, etc.).
pub const ERR_BAD_REQUEST: i32 = 5;
/// Error code recorded when the password is being changed and the request
/// asked to fail in that case.
pub const ERR_PASSWORD_CHANGE_IN_PROGRESS: i32 = 6;

const HANDLE_BASE: usize = 0x1000;
const HANDLE_STRIDE: usize = 0x10;

// ============================================================================
// Catalogue
// ============================================================================

/// An account the mock vault can serve.
#[derive(Debug, Clone, Default)]
pub struct MockAccount {
    pub safe: String,
    pub folder: Option<String>,
    pub object: String,
    pub attributes: HashMap<String, Vec<Vec<u8>>>,
    pub password_changing: bool,
}

impl MockAccount {
    pub fn new(safe: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            safe: safe.into(),
            object: object.into(),
            ..Default::default()
        }
    }

    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), vec![value.into().into_bytes()]);
        self
    }

    /// An attribute whose stored value is arbitrary bytes, not necessarily
    /// UTF-8. NUL bytes are dropped when the vector is built.
    pub fn raw_attribute(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.attributes.insert(name.into(), vec![value.into()]);
        self
    }

    pub fn multi_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(|v| v.into().into_bytes()).collect();
        self.attributes.insert(name.into(), values);
        self
    }

    pub fn password_changing(mut self) -> Self {
        self.password_changing = true;
        self
    }

    fn matches(&self, query: &HashMap<String, String>) -> bool {
        let field = |key: &str| query.get(key).map(String::as_str);
        let safe = field("Safe") == Some(self.safe.as_str());
        let object = field("Object") == Some(self.object.as_str());
        if !safe || !object {
            return false;
        }
        match (field("Folder"), self.folder.as_deref()) {
            (None, _) => true,
            (Some(wanted), Some(have)) => wanted == have,
            (Some(wanted), None) => wanted == "Root",
        }
    }
}

/// Misbehaviour the mock can be told to exhibit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFault {
    /// `create_request` returns null.
    CreateRequestNull,
    /// `create_request` returns a handle already carrying this error.
    CreateRequestError { code: i32, message: String },
    /// `set_attribute` fails for the named attribute.
    SetAttributeRejected { name: String },
    /// `get_password` succeeds but writes no response handle.
    NullResponseOnSuccess,
    /// `get_password` fails but still writes a response handle.
    ResponseOnFailure,
    /// `get_password` fails without recording an error on the request.
    SilentFailure,
    /// `get_attribute` returns a vector whose first entry is null.
    EmptyVector,
    /// `get_attribute` returns null for an unknown attribute without
    /// recording an error on the response.
    NullVectorWithoutError,
}

// ============================================================================
// Runtime state
// ============================================================================

#[derive(Debug, Default)]
struct ErrorSlot {
    code: i32,
    message: String,
}

impl ErrorSlot {
    fn set(&mut self, code: i32, message: impl Into<String>) {
        self.code = code;
        self.message = message.into();
    }
}

#[derive(Debug)]
enum MockObject {
    Request {
        attributes: HashMap<String, String>,
        error: ErrorSlot,
    },
    Response {
        values: HashMap<String, Vec<Vec<u8>>>,
        error: ErrorSlot,
    },
    ErrorContext {
        error: ErrorSlot,
    },
}

impl MockObject {
    fn error(&self) -> &ErrorSlot {
        match self {
            MockObject::Request { error, .. }
            | MockObject::Response { error, .. }
            | MockObject::ErrorContext { error } => error,
        }
    }

    fn error_mut(&mut self) -> &mut ErrorSlot {
        match self {
            MockObject::Request { error, .. }
            | MockObject::Response { error, .. }
            | MockObject::ErrorContext { error } => error,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    authorized_apps: Vec<String>,
    accounts: Vec<MockAccount>,
    faults: Vec<MockFault>,

    next_handle: usize,
    objects: HashMap<usize, MockObject>,
    release_counts: HashMap<usize, usize>,
    // Live vectors: address -> slot count including the null terminator.
    vectors: HashMap<usize, usize>,

    native_calls: usize,
    handle_releases: usize,
    vector_releases: usize,
    invalid_releases: usize,
}

impl MockState {
    fn has_fault(&self, fault: &MockFault) -> bool {
        self.faults.contains(fault)
    }

    fn alloc(&mut self, object: MockObject) -> RawHandle {
        let addr = HANDLE_BASE + self.next_handle * HANDLE_STRIDE;
        self.next_handle += 1;
        self.objects.insert(addr, object);
        RawHandle::from_ptr(addr as *mut c_void)
    }

    fn object(&self, handle: RawHandle) -> Option<&MockObject> {
        self.objects.get(&(handle.as_ptr() as usize))
    }

    fn object_mut(&mut self, handle: RawHandle) -> Option<&mut MockObject> {
        self.objects.get_mut(&(handle.as_ptr() as usize))
    }

    fn find_account(&self, query: &HashMap<String, String>) -> Option<&MockAccount> {
        self.accounts.iter().find(|a| a.matches(query))
    }
}

/// Thread-safe mock of the vendor SDK with an allocation tracker.
#[derive(Debug, Default)]
pub struct MockRuntime {
    state: Mutex<MockState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorise an application ID. With no authorised IDs every ID is
    /// accepted.
    pub fn with_app(self, app_id: impl Into<String>) -> Self {
        self.state.lock().authorized_apps.push(app_id.into());
        self
    }

    pub fn with_account(self, account: MockAccount) -> Self {
        self.state.lock().accounts.push(account);
        self
    }

    pub fn with_fault(self, fault: MockFault) -> Self {
        self.state.lock().faults.push(fault);
        self
    }

    /// Allocate a bare handle carrying the given error state, as the SDK
    /// does for error contexts.
    pub fn error_context(&self, code: i32, message: impl Into<String>) -> RawHandle {
        let mut error = ErrorSlot::default();
        error.set(code, message);
        self.state.lock().alloc(MockObject::ErrorContext { error })
    }

    // ------------------------------------------------------------------------
    // Tracker
    // ------------------------------------------------------------------------

    /// Number of calls made through [`VaultRuntime`].
    pub fn native_calls(&self) -> usize {
        self.state.lock().native_calls
    }

    pub fn live_handles(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn live_vectors(&self) -> usize {
        self.state.lock().vectors.len()
    }

    pub fn handle_releases(&self) -> usize {
        self.state.lock().handle_releases
    }

    pub fn vector_releases(&self) -> usize {
        self.state.lock().vector_releases
    }

    /// Releases of pointers that were already released or never issued.
    pub fn invalid_releases(&self) -> usize {
        self.state.lock().invalid_releases
    }

    /// How many times `handle` has been released.
    pub fn release_count(&self, handle: RawHandle) -> usize {
        self.state
            .lock()
            .release_counts
            .get(&(handle.as_ptr() as usize))
            .copied()
            .unwrap_or(0)
    }

    /// No live handles, no live vectors and no invalid releases.
    pub fn is_clean(&self) -> bool {
        let state = self.state.lock();
        state.objects.is_empty() && state.vectors.is_empty() && state.invalid_releases == 0
    }
}

impl Drop for MockRuntime {
    fn drop(&mut self) {
        // Reclaim vectors a leaky caller never released.
        let state = self.state.get_mut();
        for (addr, len) in state.vectors.drain() {
            unsafe { free_vector(addr as RawAttributeVector, len) };
        }
    }
}

// ============================================================================
// Vector allocation
// ============================================================================

fn alloc_vector(values: &[Vec<u8>]) -> (RawAttributeVector, usize) {
    let mut slots: Vec<*mut c_char> = values
        .iter()
        .map(|v| {
            let bytes: Vec<u8> = v.iter().copied().filter(|&b| b != 0).collect();
            CString::new(bytes).unwrap_or_default().into_raw()
        })
        .collect();
    slots.push(std::ptr::null_mut());
    let len = slots.len();
    let ptr = Box::into_raw(slots.into_boxed_slice()) as *mut *mut c_char;
    (ptr, len)
}

fn alloc_empty_vector() -> (RawAttributeVector, usize) {
    let slots = vec![std::ptr::null_mut::<c_char>()].into_boxed_slice();
    (Box::into_raw(slots) as *mut *mut c_char, 1)
}

/// # Safety
/// `ptr` and `len` must come from [`alloc_vector`] / [`alloc_empty_vector`]
/// and must not have been freed.
unsafe fn free_vector(ptr: RawAttributeVector, len: usize) {
    let slots = unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)) };
    for &slot in slots.iter() {
        if !slot.is_null() {
            drop(unsafe { CString::from_raw(slot) });
        }
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split(';')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

// ============================================================================
// VaultRuntime
// ============================================================================

// SAFETY: vectors come from `alloc_vector`, are null-terminated, and are
// only freed by `release_attribute_data` (or when the runtime is dropped).
unsafe impl VaultRuntime for MockRuntime {
    fn error_code(&self, handle: RawHandle) -> i32 {
        let mut state = self.state.lock();
        state.native_calls += 1;
        state
            .object(handle)
            .map_or(ERR_INVALID_HANDLE, |o| o.error().code)
    }

    fn error_message(&self, handle: RawHandle) -> String {
        let mut state = self.state.lock();
        state.native_calls += 1;
        state.object(handle).map_or_else(
            || "Invalid object handle".to_string(),
            |o| o.error().message.clone(),
        )
    }

    fn release_handle(&self, handle: &mut RawHandle) {
        let mut state = self.state.lock();
        state.native_calls += 1;
        if handle.is_null() {
            return;
        }
        let addr = handle.as_ptr() as usize;
        *state.release_counts.entry(addr).or_insert(0) += 1;
        if state.objects.remove(&addr).is_some() {
            state.handle_releases += 1;
        } else {
            state.invalid_releases += 1;
        }
        *handle = RawHandle::null();
    }

    fn create_request(&self, request_type: &CStr) -> RawHandle {
        let mut state = self.state.lock();
        state.native_calls += 1;
        if state.has_fault(&MockFault::CreateRequestNull) {
            return RawHandle::null();
        }
        let mut error = ErrorSlot::default();
        let injected = state.faults.iter().find_map(|f| match f {
            MockFault::CreateRequestError { code, message } => Some((*code, message.clone())),
            _ => None,
        });
        if let Some((code, message)) = injected {
            error.set(code, message);
        } else if request_type.to_bytes() != b"PASSWORD" {
            error.set(
                ERR_BAD_REQUEST,
                format!(
                    "Unsupported request type [{}]",
                    request_type.to_string_lossy()
                ),
            );
        }
        state.alloc(MockObject::Request {
            attributes: HashMap::new(),
            error,
        })
    }

    fn set_attribute(&self, request: RawHandle, name: &CStr, value: &CStr) -> i32 {
        let mut state = self.state.lock();
        state.native_calls += 1;
        let name = name.to_string_lossy().into_owned();
        let rejected = state
            .has_fault(&MockFault::SetAttributeRejected { name: name.clone() });
        match state.object_mut(request) {
            Some(MockObject::Request { attributes, error }) => {
                if rejected {
                    error.set(ERR_BAD_REQUEST, format!("Attribute [{name}] is read-only"));
                    return RC_ERROR;
                }
                attributes.insert(name, value.to_string_lossy().into_owned());
                RC_SUCCESS
            }
            Some(other) => {
                other
                    .error_mut()
                    .set(ERR_BAD_REQUEST, "Attributes can only be set on requests");
                RC_ERROR
            }
            None => RC_ERROR,
        }
    }

    fn get_password(&self, request: RawHandle, response: &mut RawHandle) -> i32 {
        let mut state = self.state.lock();
        state.native_calls += 1;

        let outcome = match state.object(request) {
            Some(MockObject::Request { attributes, .. }) => {
                let app_id = attributes.get("AppDescs.AppID").cloned().unwrap_or_default();
                let query = attributes.get("Query").map(|q| parse_query(q));
                let fail_on_change = attributes
                    .get("FailRequestOnPasswordChange")
                    .is_some_and(|v| v.eq_ignore_ascii_case("true"));

                if !state.authorized_apps.is_empty() && !state.authorized_apps.contains(&app_id) {
                    Err((
                        ERR_APP_NOT_AUTHORIZED,
                        format!("Application [{app_id}] is not authorized"),
                    ))
                } else if let Some(query) = query {
                    match state.find_account(&query) {
                        Some(account) if account.password_changing && fail_on_change => Err((
                            ERR_PASSWORD_CHANGE_IN_PROGRESS,
                            "Password is being changed".to_string(),
                        )),
                        Some(account) => Ok(account.attributes.clone()),
                        None => Err((
                            ERR_OBJECT_NOT_FOUND,
                            "Password object matching query was not found".to_string(),
                        )),
                    }
                } else {
                    Err((ERR_BAD_REQUEST, "Request has no query".to_string()))
                }
            }
            Some(_) => Err((ERR_BAD_REQUEST, "Handle is not a request".to_string())),
            None => return RC_ERROR,
        };

        match outcome {
            Ok(values) => {
                if state.has_fault(&MockFault::SilentFailure) {
                    return RC_ERROR;
                }
                if !state.has_fault(&MockFault::NullResponseOnSuccess) {
                    *response = state.alloc(MockObject::Response {
                        values,
                        error: ErrorSlot::default(),
                    });
                }
                RC_SUCCESS
            }
            Err((code, message)) => {
                if let Some(obj) = state.object_mut(request) {
                    obj.error_mut().set(code, message);
                }
                if state.has_fault(&MockFault::ResponseOnFailure) {
                    *response = state.alloc(MockObject::Response {
                        values: HashMap::new(),
                        error: ErrorSlot::default(),
                    });
                }
                RC_ERROR
            }
        }
    }

    fn get_attribute(&self, response: RawHandle, name: &CStr) -> RawAttributeVector {
        let mut state = self.state.lock();
        state.native_calls += 1;
        let name = name.to_string_lossy().into_owned();
        let empty = state.has_fault(&MockFault::EmptyVector);
        let silent = state.has_fault(&MockFault::NullVectorWithoutError);

        let values = match state.object_mut(response) {
            Some(MockObject::Response { values, error }) => match values.get(&name) {
                Some(v) => v.clone(),
                None if silent => return std::ptr::null_mut(),
                None => {
                    error.set(
                        ERR_ATTRIBUTE_NOT_FOUND,
                        format!("Attribute [{name}] was not found"),
                    );
                    return std::ptr::null_mut();
                }
            },
            Some(other) => {
                other
                    .error_mut()
                    .set(ERR_BAD_REQUEST, "Attributes can only be read from responses");
                return std::ptr::null_mut();
            }
            None => return std::ptr::null_mut(),
        };

        let (ptr, len) = if empty {
            alloc_empty_vector()
        } else {
            alloc_vector(&values)
        };
        state.vectors.insert(ptr as usize, len);
        ptr
    }

    fn release_attribute_data(&self, values: &mut RawAttributeVector) {
        let mut state = self.state.lock();
        state.native_calls += 1;
        if values.is_null() {
            return;
        }
        match state.vectors.remove(&(*values as usize)) {
            Some(len) => {
                unsafe { free_vector(*values, len) };
                state.vector_releases += 1;
            }
            None => state.invalid_releases += 1,
        }
        *values = std::ptr::null_mut();
    }
}
