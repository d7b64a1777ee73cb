//! Attribute extraction from response handles.
//!
//! The runtime answers an attribute query with a vector of C strings that it
//! owns. Values are copied out into [`AttributeValue`]s and the vector is
//! released before the call returns, so nothing handed to the caller points
//! into native memory.

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::fmt;

use tracing::{debug, warn};

use super::handle::Handle;
use super::translate::{translate, translate_failure};
use crate::error::{Error, Result};
use crate::sdk::{RawAttributeVector, VaultRuntime, RC_ERROR};

// ============================================================================
// AttributeValue
// ============================================================================

/// A caller-owned copy of one attribute value.
///
/// `Debug` output is redacted; use [`as_str`](AttributeValue::as_str) to get
/// at the value.
#[derive(Clone, PartialEq, Eq)]
pub struct AttributeValue(String);

impl AttributeValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value with all but its edges masked, for display.
    pub fn redacted(&self) -> String {
        redact_secret(&self.0)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for AttributeValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AttributeValue {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttributeValue").field(&self.redacted()).finish()
    }
}

/// Redact a secret value for display (show first 2 and last 2 chars).
pub fn redact_secret(value: &str) -> String {
    let count = value.chars().count();
    if count <= 6 {
        return "***".to_string();
    }
    let head: String = value.chars().take(2).collect();
    let tail: String = value.chars().skip(count - 2).collect();
    format!("{head}…{tail}")
}

// ============================================================================
// Native vector guard
// ============================================================================

/// An attribute vector owned by the current scope, released on drop.
struct AttributeVector<'rt, R: VaultRuntime + ?Sized> {
    runtime: &'rt R,
    raw: RawAttributeVector,
}

impl<R: VaultRuntime + ?Sized> AttributeVector<'_, R> {
    fn entry(&self, index: usize) -> Option<&CStr> {
        // SAFETY: `raw` is non-null and, per the `VaultRuntime` contract, a
        // null-terminated array of C strings live until released; callers
        // never index past the terminator.
        unsafe {
            let ptr = *self.raw.add(index);
            if ptr.is_null() {
                None
            } else {
                Some(CStr::from_ptr(ptr))
            }
        }
    }

    fn first(&self) -> Option<&CStr> {
        self.entry(0)
    }

    fn all(&self) -> Vec<&CStr> {
        let mut out = Vec::new();
        while let Some(value) = self.entry(out.len()) {
            out.push(value);
        }
        out
    }
}

impl<R: VaultRuntime + ?Sized> Drop for AttributeVector<'_, R> {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            self.runtime.release_attribute_data(&mut self.raw);
            self.raw = std::ptr::null_mut();
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Copy the first value of attribute `name` out of a response.
///
/// Fails with the response handle's own error when the runtime returns no
/// vector, and with [`Error::MissingAttribute`] when it returns an empty one
/// or reports success without a vector.
pub fn get_attribute<R: VaultRuntime + ?Sized>(
    response: &Handle<'_, R>,
    name: &str,
) -> Result<AttributeValue> {
    let vector = query_vector(response, name)?;
    let value = match vector.first() {
        Some(raw) => copy_value(name, raw),
        None => return Err(missing(name)),
    };
    drop(vector);
    Ok(value)
}

/// Copy every value of a multi-valued attribute out of a response, in the
/// order the runtime returns them.
pub fn get_attribute_values<R: VaultRuntime + ?Sized>(
    response: &Handle<'_, R>,
    name: &str,
) -> Result<Vec<AttributeValue>> {
    let vector = query_vector(response, name)?;
    let values: Vec<AttributeValue> = vector
        .all()
        .into_iter()
        .map(|raw| copy_value(name, raw))
        .collect();
    drop(vector);
    if values.is_empty() {
        return Err(missing(name));
    }
    Ok(values)
}

fn query_vector<'rt, R: VaultRuntime + ?Sized>(
    response: &Handle<'rt, R>,
    name: &str,
) -> Result<AttributeVector<'rt, R>> {
    if name.is_empty() {
        return Err(Error::invalid_argument("attribute name", "must not be empty"));
    }
    let c_name = CString::new(name)
        .map_err(|_| Error::invalid_argument("attribute name", "contains a NUL byte"))?;
    let runtime = response.runtime();
    if response.is_null() {
        return Err(translate_failure(runtime, response.raw(), RC_ERROR).into());
    }

    let raw = runtime.get_attribute(response.raw(), &c_name);
    if raw.is_null() {
        let err = translate(runtime, response.raw())
            .map(Error::from)
            .unwrap_or_else(|| missing(name));
        debug!(attribute = name, error = %err, "attribute query failed");
        return Err(err);
    }

    Ok(AttributeVector { runtime, raw })
}

fn copy_value(name: &str, raw: &CStr) -> AttributeValue {
    match raw.to_string_lossy() {
        Cow::Borrowed(s) => AttributeValue(s.to_owned()),
        Cow::Owned(s) => {
            warn!(attribute = name, "attribute value is not valid UTF-8, invalid bytes replaced");
            AttributeValue(s)
        }
    }
}

fn missing(name: &str) -> Error {
    Error::MissingAttribute {
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorInfo;
    use crate::provider::handle::HandleRole;
    use crate::sdk::mock::{MockAccount, MockFault, MockRuntime, ERR_ATTRIBUTE_NOT_FOUND};
    use crate::sdk::{RawHandle, RC_SUCCESS};
    use pretty_assertions::assert_eq;

    fn response(rt: &MockRuntime) -> Handle<'_, MockRuntime> {
        let c = |s: &str| CString::new(s).unwrap();
        let mut req = rt.create_request(&c("PASSWORD"));
        rt.set_attribute(req, &c("Query"), &c("Safe=S;Object=O"));
        let mut resp = RawHandle::null();
        assert_eq!(rt.get_password(req, &mut resp), RC_SUCCESS);
        rt.release_handle(&mut req);
        unsafe { Handle::from_raw(rt, resp, HandleRole::Response) }
    }

    fn vault(account: MockAccount) -> MockRuntime {
        MockRuntime::new().with_account(account)
    }

    #[test]
    fn copies_value_and_releases_vector_once() {
        let rt = vault(MockAccount::new("S", "O").attribute("Password", "s3cr3t"));
        let resp = response(&rt);

        let value = get_attribute(&resp, "Password").unwrap();
        assert_eq!(rt.vector_releases(), 1);
        assert_eq!(rt.live_vectors(), 0);
        // The copy outlives the native vector.
        assert_eq!(value, "s3cr3t");
        assert_eq!(value.len(), "s3cr3t".len());

        drop(resp);
        assert!(rt.is_clean());
    }

    #[test]
    fn only_first_value_is_surfaced() {
        let account =
            MockAccount::new("S", "O").multi_attribute("Address", ["10.0.0.1", "10.0.0.2"]);
        let rt = vault(account);
        let resp = response(&rt);
        assert_eq!(get_attribute(&resp, "Address").unwrap(), "10.0.0.1");
        assert_eq!(rt.vector_releases(), 1);
    }

    #[test]
    fn all_values_on_request() {
        let account = MockAccount::new("S", "O").multi_attribute("Address", ["a", "b", "c"]);
        let rt = vault(account);
        let resp = response(&rt);
        let values = get_attribute_values(&resp, "Address").unwrap();
        let values: Vec<&str> = values.iter().map(AttributeValue::as_str).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
        assert_eq!(rt.vector_releases(), 1);
        assert_eq!(rt.live_vectors(), 0);
    }

    #[test]
    fn null_vector_reports_response_error() {
        let rt = vault(MockAccount::new("S", "O"));
        let resp = response(&rt);
        let err = get_attribute(&resp, "PassProps.Port").unwrap_err();
        let info = err.vault_info().expect("vault error");
        assert_eq!(info.code(), Some(ERR_ATTRIBUTE_NOT_FOUND));
        // Consistent with what the response handle itself reports.
        assert_eq!(rt.error_code(resp.raw()), ERR_ATTRIBUTE_NOT_FOUND);
        assert_eq!(rt.vector_releases(), 0);
    }

    #[test]
    fn empty_vector_is_missing_and_released() {
        let rt = vault(MockAccount::new("S", "O").attribute("Password", "x"))
            .with_fault(MockFault::EmptyVector);
        let resp = response(&rt);
        assert_eq!(
            get_attribute(&resp, "Password").unwrap_err(),
            Error::MissingAttribute {
                name: "Password".into()
            }
        );
        assert_eq!(rt.vector_releases(), 1);
        assert_eq!(
            get_attribute_values(&resp, "Password").unwrap_err(),
            Error::MissingAttribute {
                name: "Password".into()
            }
        );
        assert_eq!(rt.vector_releases(), 2);
    }

    #[test]
    fn bad_names_never_reach_runtime() {
        let rt = vault(MockAccount::new("S", "O"));
        let resp = response(&rt);
        let before = rt.native_calls();
        assert!(matches!(
            get_attribute(&resp, "").unwrap_err(),
            Error::InvalidArgument { .. }
        ));
        assert!(matches!(
            get_attribute(&resp, "Pass\0word").unwrap_err(),
            Error::InvalidArgument { .. }
        ));
        assert_eq!(rt.native_calls(), before);
    }

    #[test]
    fn null_response_is_invalid_handle() {
        let rt = MockRuntime::new();
        let resp = Handle::null(&rt, HandleRole::Response);
        assert_eq!(
            get_attribute(&resp, "Password").unwrap_err(),
            Error::Vault(ErrorInfo::InvalidHandle)
        );
        assert_eq!(rt.native_calls(), 0);
    }

    #[test]
    fn null_vector_with_success_code_is_missing() {
        let rt = vault(MockAccount::new("S", "O")).with_fault(MockFault::NullVectorWithoutError);
        let resp = response(&rt);
        assert_eq!(
            get_attribute(&resp, "Password").unwrap_err(),
            Error::MissingAttribute {
                name: "Password".into()
            }
        );
        assert_eq!(
            get_attribute_values(&resp, "Password").unwrap_err(),
            Error::MissingAttribute {
                name: "Password".into()
            }
        );
        assert_eq!(rt.vector_releases(), 0);
        drop(resp);
        assert!(rt.is_clean());
    }

    #[test]
    fn invalid_utf8_is_copied_lossily() {
        let rt = vault(MockAccount::new("S", "O").raw_attribute("Password", b"a\xffb".to_vec()));
        let resp = response(&rt);

        let value = get_attribute(&resp, "Password").unwrap();
        assert_eq!(value, "a\u{FFFD}b");
        assert_eq!(rt.vector_releases(), 1);
        assert_eq!(rt.live_vectors(), 0);

        let values = get_attribute_values(&resp, "Password").unwrap();
        assert_eq!(values, vec![AttributeValue::from("a\u{FFFD}b".to_string())]);
        assert_eq!(rt.vector_releases(), 2);

        drop(resp);
        assert!(rt.is_clean());
    }

    #[test]
    fn debug_output_is_redacted() {
        let value = AttributeValue::from("mockpass123".to_string());
        let shown = format!("{value:?}");
        assert!(!shown.contains("mockpass123"));
        assert!(shown.contains("mo…23"));
    }

    #[test]
    fn redact_short_value() {
        assert_eq!(redact_secret("abc"), "***");
        assert_eq!(redact_secret("ünïcødé"), "ün…dé");
    }
}
