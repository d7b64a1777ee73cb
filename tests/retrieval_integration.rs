//! Integration tests for the retrieval flow.
//!
//! These tests drive request → password exchange → attribute extraction →
//! release against the mock SDK runtime and check its allocation tracker
//! afterwards, so handle and vector leaks (or double releases) fail the test
//! without the vendor library installed.

use pretty_assertions::assert_eq;

use cpclient::error::{is_error_text, Error, ErrorInfo};
use cpclient::provider::{
    create_request, fetch_password, get_attribute, retrieve_attributes, CredentialProvider,
    RequestParameters, PASSWORD_ATTRIBUTE,
};
use cpclient::sdk::mock::{MockAccount, MockFault, MockRuntime, ERR_OBJECT_NOT_FOUND};

// ============================================================================
// Fixtures
// ============================================================================

fn host_account() -> MockAccount {
    MockAccount::new("IntegrationSafe", "IntegrationHost")
        .folder("Root")
        .attribute(PASSWORD_ATTRIBUTE, "mockpass123")
        .attribute("PassProps.APIKey", "ak-0123456789")
        .attribute("PassProps.Port", "8443")
        .attribute("PassProps.PendingSafename", "Pending")
}

fn vault() -> MockRuntime {
    MockRuntime::new()
        .with_app("BrimstoneApp")
        .with_account(host_account())
        .with_account(
            MockAccount::new("IntegrationSafe", "IntegrationDB")
                .attribute("PassProps.DSN", "postgres://svc@db:5432/app"),
        )
}

fn host_params() -> RequestParameters {
    RequestParameters::new("BrimstoneApp", "IntegrationSafe", "IntegrationHost")
}

// ============================================================================
// Handle lifecycle
// ============================================================================

#[test]
fn end_to_end_password_with_explicit_releases() {
    let rt = vault();

    let mut request = create_request(&rt, &host_params()).unwrap();
    let request_raw = request.raw();

    let mut response = fetch_password(&request).unwrap();
    let response_raw = response.raw();
    assert!(!response.is_null());

    let password = get_attribute(&response, PASSWORD_ATTRIBUTE).unwrap();
    assert_eq!(password.as_str(), "mockpass123");

    response.release();
    request.release();
    // Guards dropping afterwards must not release again.
    drop(response);
    drop(request);

    assert_eq!(rt.release_count(response_raw), 1);
    assert_eq!(rt.release_count(request_raw), 1);
    assert_eq!(rt.vector_releases(), 1);
    assert!(rt.is_clean());

    // The copied value does not depend on any native memory.
    assert_eq!(password, "mockpass123");
}

#[test]
fn rejected_request_leaks_nothing() {
    let rt = vault().with_fault(MockFault::ResponseOnFailure);
    let params = RequestParameters::new("BrimstoneApp", "IntegrationSafe", "NoSuchObject");

    let request = create_request(&rt, &params).unwrap();
    let err = fetch_password(&request).unwrap_err();
    assert_eq!(err.code(), Some(ERR_OBJECT_NOT_FOUND));
    assert!(is_error_text(&err.to_string()));
    drop(request);

    assert_eq!(rt.live_handles(), 0);
    assert!(rt.is_clean());
}

#[test]
fn several_attributes_share_one_response() {
    let rt = vault();
    let request = create_request(&rt, &host_params()).unwrap();

    let values = retrieve_attributes(
        &request,
        &["PassProps.APIKey", "PassProps.Port", "PassProps.PendingSafename"],
    )
    .unwrap();
    drop(request);

    assert_eq!(values["PassProps.APIKey"], "ak-0123456789");
    assert_eq!(values["PassProps.Port"], "8443");
    assert_eq!(values["PassProps.PendingSafename"], "Pending");
    // One request, one response.
    assert_eq!(rt.handle_releases(), 2);
    assert_eq!(rt.vector_releases(), 3);
    assert!(rt.is_clean());
}

// ============================================================================
// Client
// ============================================================================

#[test]
fn client_fetches_host_and_database_accounts() {
    let rt = vault();
    let client = CredentialProvider::new(&rt);

    let host = client
        .fetch_attributes(&host_params().with_folder("Root"), &["PassProps.Port"])
        .unwrap();
    assert_eq!(host["PassProps.Port"], "8443");

    let db = client
        .fetch_attributes(
            &RequestParameters::new("BrimstoneApp", "IntegrationSafe", "IntegrationDB"),
            &["PassProps.DSN"],
        )
        .unwrap();
    assert_eq!(db["PassProps.DSN"], "postgres://svc@db:5432/app");

    assert!(rt.is_clean());
}

#[test]
fn client_owns_its_runtime() {
    let client = CredentialProvider::new(vault());
    let password = client.fetch_password(&host_params()).unwrap();
    assert_eq!(password, "mockpass123");
    assert!(client.runtime().is_clean());
}

#[test]
fn missing_attribute_surfaces_native_error() {
    let rt = vault();
    let client = CredentialProvider::new(&rt);

    let err = client
        .fetch_attributes(&host_params(), &["PassProps.Port", "PassProps.DSN"])
        .unwrap_err();
    match &err {
        Error::Vault(ErrorInfo::Native { message, .. }) => {
            assert!(message.contains("PassProps.DSN"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(rt.is_clean());
}

#[test]
fn lenient_fetch_keeps_what_resolved() {
    let rt = vault();
    let client = CredentialProvider::new(&rt);

    let report = client
        .fetch_available_attributes(
            &host_params(),
            &["PassProps.Port", "PassProps.GitGuardianAPIURL"],
        )
        .unwrap();

    assert_eq!(report.values.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "PassProps.GitGuardianAPIURL");
    assert!(rt.is_clean());
}

#[test]
fn values_are_redacted_in_debug_output() {
    let client = CredentialProvider::new(vault());
    let values = client
        .fetch_attributes(&host_params(), &["PassProps.APIKey"])
        .unwrap();
    let shown = format!("{values:?}");
    assert!(!shown.contains("ak-0123456789"));
}
