//! Client for the credential provider password SDK.
//!
//! The vendor SDK hands out opaque handles, signals failure with bare
//! sentinels and leaves the caller to free both handles and attribute
//! vectors. This crate wraps that protocol so every failure surfaces as a
//! structured [`Error`] and every native resource is released exactly once.
//!
//! # Quick Start
//!
//! ```rust
//! use cpclient::provider::{CredentialProvider, RequestParameters};
//! use cpclient::sdk::mock::{MockAccount, MockRuntime};
//!
//! # fn example() -> cpclient::Result<()> {
//! let runtime = MockRuntime::new()
//!     .with_account(MockAccount::new("Apps", "db-admin").attribute("Password", "s3cr3t"));
//! let client = CredentialProvider::new(runtime);
//!
//! let params = RequestParameters::new("MyApp", "Apps", "db-admin");
//! let password = client.fetch_password(&params)?;
//! assert_eq!(password.as_str(), "s3cr3t");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod sdk;

pub use error::{Error, ErrorInfo, Result};
pub use provider::{AttributeValue, CredentialProvider, Handle, RequestParameters};
pub use sdk::VaultRuntime;
