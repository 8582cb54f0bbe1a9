mod common;

use locker_console_client::{Call, Credential, CredentialStore, Error};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{authorizations_on, fixture};

async fn server_rejecting_everything() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parcel/detail"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn missing_refresh_token_ends_session_without_exchange() {
    let server = server_rejecting_everything().await;
    let fx = fixture(&server, Some(Credential::new("A1", "")));

    let err = fx
        .client
        .dispatcher()
        .dispatch(&Call::get("/parcel/detail").query("id", 42))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SessionAbsent));
    assert!(err.is_session_ending());
    assert_eq!(fx.session.count(), 1);
    assert_eq!(fx.store.get(), None);
    assert_eq!(fx.client.dispatcher().coordinator().cycles_started(), 0);
}

#[tokio::test]
async fn empty_store_sends_unauthenticated_and_ends_session() {
    let server = server_rejecting_everything().await;
    let fx = fixture(&server, None);

    let err = fx
        .client
        .dispatcher()
        .dispatch(&Call::get("/parcel/detail"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SessionAbsent));
    assert_eq!(fx.session.count(), 1);
    assert_eq!(authorizations_on(&server, "/parcel/detail").await, vec![None]);
}
