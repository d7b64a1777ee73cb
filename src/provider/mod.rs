//! Handle lifecycle and error propagation around the vault SDK.
//!
//! A retrieval runs in four steps:
//! 1. **Request**: create a request handle and populate it ([`request`])
//! 2. **Exchange**: run the password request for a response handle
//!    ([`exchange`])
//! 3. **Extract**: copy attribute values out of the response ([`attribute`])
//! 4. **Release**: every handle goes back to the runtime when its
//!    [`Handle`] guard is released or dropped ([`handle`])
//!
//! Every failure passes through [`translate()`], which turns the runtime's
//! sentinel plus the code/message recorded on the handle into an
//! [`ErrorInfo`](crate::error::ErrorInfo).

pub mod attribute;
pub mod client;
pub mod exchange;
pub mod handle;
pub mod request;
pub mod translate;

pub use attribute::{get_attribute, get_attribute_values, redact_secret, AttributeValue};
pub use client::{
    retrieve_attributes, AttributeFailure, AttributeReport, Attributes, CredentialProvider,
    PASSWORD_ATTRIBUTE,
};
pub use exchange::fetch_password;
pub use handle::{Handle, HandleRole};
pub use request::{create_request, set_attribute, RequestParameters};
pub use translate::{translate, translate_failure};
