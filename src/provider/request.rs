//! Request construction.
//!
//! Turns [`RequestParameters`] into a live request handle: create the
//! request, then set the application ID, the account query and the request
//! options on it.

use std::ffi::CString;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::handle::{Handle, HandleRole};
use super::translate::{translate, translate_failure};
use crate::error::{Error, Result};
use crate::sdk::{VaultRuntime, RC_ERROR, RC_SUCCESS};

/// Request type for password objects.
pub const PASSWORD_REQUEST: &str = "PASSWORD";

pub const ATTR_APP_ID: &str = "AppDescs.AppID";
pub const ATTR_QUERY: &str = "Query";
pub const ATTR_FAIL_ON_PASSWORD_CHANGE: &str = "FailRequestOnPasswordChange";
pub const ATTR_REASON: &str = "Reason";

/// Everything needed to address one account in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParameters {
    #[serde(default = "default_request_type")]
    pub request_type: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub safe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Account (object) name.
    #[serde(default)]
    pub object: String,
    /// Fail instead of returning a stale password while it is being changed.
    #[serde(default = "default_true")]
    pub fail_on_password_change: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn default_request_type() -> String {
    PASSWORD_REQUEST.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self {
            request_type: default_request_type(),
            app_id: String::new(),
            safe: String::new(),
            folder: None,
            object: String::new(),
            fail_on_password_change: true,
            reason: None,
        }
    }
}

impl RequestParameters {
    pub fn new(
        app_id: impl Into<String>,
        safe: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            safe: safe.into(),
            object: object.into(),
            ..Default::default()
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The account query, e.g. `Safe=Apps;Folder=Root;Object=db-admin`.
    pub fn query(&self) -> String {
        match &self.folder {
            Some(folder) => format!("Safe={};Folder={};Object={}", self.safe, folder, self.object),
            None => format!("Safe={};Object={}", self.safe, self.object),
        }
    }

    /// Check that every field can be sent to the runtime unchanged.
    pub fn validate(&self) -> Result<()> {
        required("requestType", &self.request_type)?;
        required("appId", &self.app_id)?;
        required("safe", &self.safe)?;
        required("object", &self.object)?;
        query_safe("safe", &self.safe)?;
        query_safe("object", &self.object)?;
        if let Some(folder) = &self.folder {
            required("folder", folder)?;
            query_safe("folder", folder)?;
        }
        for (field, value) in [("requestType", &self.request_type), ("appId", &self.app_id)] {
            no_nul(field, value)?;
        }
        if let Some(reason) = &self.reason {
            no_nul("reason", reason)?;
        }
        Ok(())
    }
}

fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(field, "must not be empty"));
    }
    Ok(())
}

fn no_nul(field: &str, value: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(Error::invalid_argument(field, "contains a NUL byte"));
    }
    Ok(())
}

/// Query fields are joined with `;` and `=`, so neither may appear inside one.
fn query_safe(field: &str, value: &str) -> Result<()> {
    no_nul(field, value)?;
    if value.contains(';') || value.contains('=') {
        return Err(Error::invalid_argument(field, "must not contain ';' or '='"));
    }
    Ok(())
}

fn c_string(field: &str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::invalid_argument(field, "contains a NUL byte"))
}

/// Create a populated request handle.
///
/// The request is released on every failure path; on success the caller owns
/// it.
pub fn create_request<'rt, R: VaultRuntime + ?Sized>(
    runtime: &'rt R,
    params: &RequestParameters,
) -> Result<Handle<'rt, R>> {
    params.validate()?;

    let request_type = c_string("requestType", &params.request_type)?;
    // SAFETY: freshly created, owned by nobody else.
    let request = unsafe {
        Handle::from_raw(
            runtime,
            runtime.create_request(&request_type),
            HandleRole::Request,
        )
    };
    if let Some(err) = translate(runtime, request.raw()) {
        debug!(error = %err, "failed to create vault request");
        return Err(err.into());
    }

    set_attribute(&request, ATTR_APP_ID, &params.app_id)?;
    set_attribute(&request, ATTR_QUERY, &params.query())?;
    let fail = if params.fail_on_password_change {
        "true"
    } else {
        "false"
    };
    set_attribute(&request, ATTR_FAIL_ON_PASSWORD_CHANGE, fail)?;
    if let Some(reason) = &params.reason {
        set_attribute(&request, ATTR_REASON, reason)?;
    }

    debug!(
        safe = %params.safe,
        object = %params.object,
        "created vault request"
    );
    Ok(request)
}

/// Set one attribute on a request handle.
pub fn set_attribute<R: VaultRuntime + ?Sized>(
    request: &Handle<'_, R>,
    name: &str,
    value: &str,
) -> Result<()> {
    let c_name = c_string("attribute name", name)?;
    let c_value = c_string(name, value)?;
    let runtime = request.runtime();
    if request.is_null() {
        return Err(translate_failure(runtime, request.raw(), RC_ERROR).into());
    }

    let rc = runtime.set_attribute(request.raw(), &c_name, &c_value);
    if rc != RC_SUCCESS {
        let err = translate_failure(runtime, request.raw(), rc);
        debug!(attribute = name, error = %err, "failed to set request attribute");
        return Err(err.into());
    }
    Ok(())
}
