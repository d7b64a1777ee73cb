//! High-level retrieval: request parameters and attribute names in, values
//! out.

use std::collections::HashMap;

use tracing::{info, warn};

use super::attribute::{get_attribute, AttributeValue};
use super::exchange::fetch_password;
use super::handle::Handle;
use super::request::{create_request, RequestParameters};
use crate::error::{Error, Result};
use crate::sdk::VaultRuntime;

/// Attribute holding the account password.
pub const PASSWORD_ATTRIBUTE: &str = "Password";

/// Retrieved values keyed by attribute name.
pub type Attributes = HashMap<String, AttributeValue>;

/// Retrieve the named attributes for a populated request.
///
/// One password request is made and every attribute is read from its
/// response. The first failure is returned; the response is released on
/// every path.
pub fn retrieve_attributes<R, S>(request: &Handle<'_, R>, names: &[S]) -> Result<Attributes>
where
    R: VaultRuntime + ?Sized,
    S: AsRef<str>,
{
    if names.is_empty() {
        return Err(Error::invalid_argument("attributes", "at least one name is required"));
    }

    let response = fetch_password(request)?;
    let mut values = Attributes::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let value = get_attribute(&response, name)?;
        values.insert(name.to_string(), value);
    }
    Ok(values)
}

/// An attribute that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFailure {
    pub name: String,
    pub error: Error,
}

/// Outcome of a lenient retrieval.
#[derive(Debug, Default)]
pub struct AttributeReport {
    pub values: Attributes,
    pub failures: Vec<AttributeFailure>,
}

impl AttributeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }
}

/// Client for one vault runtime.
pub struct CredentialProvider<R: VaultRuntime> {
    runtime: R,
}

impl<R: VaultRuntime> CredentialProvider<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Create a request handle for `params`. The caller owns it.
    pub fn request(&self, params: &RequestParameters) -> Result<Handle<'_, R>> {
        create_request(&self.runtime, params)
    }

    /// Fetch the named attributes of the account `params` addresses.
    pub fn fetch_attributes<S: AsRef<str>>(
        &self,
        params: &RequestParameters,
        names: &[S],
    ) -> Result<Attributes> {
        let request = self.request(params)?;
        let values = retrieve_attributes(&request, names)?;
        info!(
            safe = %params.safe,
            object = %params.object,
            count = values.len(),
            "retrieved account attributes"
        );
        Ok(values)
    }

    /// Fetch the account password.
    pub fn fetch_password(&self, params: &RequestParameters) -> Result<AttributeValue> {
        let mut values = self.fetch_attributes(params, &[PASSWORD_ATTRIBUTE])?;
        values
            .remove(PASSWORD_ATTRIBUTE)
            .ok_or_else(|| Error::MissingAttribute {
                name: PASSWORD_ATTRIBUTE.to_string(),
            })
    }

    /// Fetch the named attributes, collecting per-attribute failures
    /// instead of stopping at the first one.
    ///
    /// Failures to build the request or retrieve the password are still
    /// returned as errors.
    pub fn fetch_available_attributes<S: AsRef<str>>(
        &self,
        params: &RequestParameters,
        names: &[S],
    ) -> Result<AttributeReport> {
        if names.is_empty() {
            return Err(Error::invalid_argument("attributes", "at least one name is required"));
        }

        let request = self.request(params)?;
        let response = fetch_password(&request)?;

        let mut report = AttributeReport::default();
        for name in names {
            let name = name.as_ref();
            match get_attribute(&response, name) {
                Ok(value) => {
                    report.values.insert(name.to_string(), value);
                }
                Err(error) => {
                    warn!(attribute = name, %error, "attribute unavailable");
                    report.failures.push(AttributeFailure {
                        name: name.to_string(),
                        error,
                    });
                }
            }
        }

        info!(
            safe = %params.safe,
            object = %params.object,
            resolved = report.values.len(),
            failed = report.failures.len(),
            "retrieved account attributes"
        );
        Ok(report)
    }
}
