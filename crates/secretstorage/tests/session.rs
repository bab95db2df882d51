//! Session negotiation and secret transfer against the mock service.

use secretstorage::{
    constants::{BUS_NAME, COLLECTION_IFACE},
    open_session,
    traits::TransportError,
    BusAddress, ObjectPath, SecretService, SecretServiceError, SecretServiceSettings,
    ServiceProxy, Value,
};
use secretstorage_test::{error_reply, MockConfig, MockSecretService};

const LOGIN: &str = "/org/freedesktop/secrets/collection/login";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn connect(mock: &MockSecretService) -> SecretService<MockSecretService> {
    SecretService::new(mock.clone(), SecretServiceSettings::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn service_decodes_secret_sent_over_encrypted_session() {
    init_logger();
    let mock = MockSecretService::default();
    let service = connect(&mock).await;

    let session = service.open_session().await.unwrap();
    assert!(session.is_encrypted());
    assert_eq!(mock.is_encrypted_session(session.path()).await, Some(true));

    let secret = service.encode_secret(&session, "hunter2");
    assert_eq!(secret.parameters.len(), 16);
    assert_eq!(secret.value.len(), 16);
    assert_eq!(secret.content_type, "text/plain; charset=utf8");

    assert_eq!(mock.decode_secret(&secret).await, Some(b"hunter2".to_vec()));
}

#[tokio::test]
async fn client_decodes_secret_sent_by_service() {
    init_logger();
    let mock = MockSecretService::default();
    let service = connect(&mock).await;
    let session = service.open_session().await.unwrap();

    let secret = mock
        .encode_secret(session.path(), b"correct horse battery staple", "text/plain")
        .await
        .unwrap();

    assert_eq!(
        secret.decode(&session).unwrap(),
        b"correct horse battery staple"
    );
}

#[tokio::test]
async fn falls_back_to_plain_session() {
    init_logger();
    let mock = MockSecretService::new(MockConfig {
        dh_supported: false,
        ..Default::default()
    });
    let service = connect(&mock).await;

    let session = service.open_session().await.unwrap();

    assert!(!session.is_encrypted());
    assert_eq!(mock.is_encrypted_session(session.path()).await, Some(false));
    assert_eq!(
        mock.call_members().await,
        vec!["AddMatch", "OpenSession", "OpenSession"]
    );

    let secret = service.encode_secret(&session, "hunter2");
    assert!(secret.parameters.is_empty());
    assert_eq!(secret.value, b"hunter2");
    assert_eq!(mock.decode_secret(&secret).await, Some(b"hunter2".to_vec()));
}

#[tokio::test]
async fn each_session_gets_its_own_key() {
    init_logger();
    let mock = MockSecretService::default();
    let service = connect(&mock).await;

    let first = service.open_session().await.unwrap();
    let second = service.open_session().await.unwrap();

    assert_ne!(first.path(), second.path());
    assert_ne!(first.symmetric_key(), second.symmetric_key());

    let secret = service.encode_secret(&first, "hunter2");
    assert!(matches!(
        secret.decode(&second),
        Err(SecretServiceError::Protocol(_))
    ));
}

#[tokio::test]
async fn unavailable_service_is_reported() {
    init_logger();
    let mock = MockSecretService::default();
    let service = connect(&mock).await;
    mock.set_available(false).await;

    let result = service.open_session().await;

    assert!(matches!(
        result,
        Err(SecretServiceError::ServiceUnavailable(message)) if message.contains("org.freedesktop.secrets")
    ));
}

#[tokio::test]
async fn unknown_errors_pass_through() {
    init_logger();
    let mock = MockSecretService::default();
    let service = connect(&mock).await;
    mock.fail_next(
        "OpenSession",
        error_reply("org.example.Error.Custom", "something else"),
    )
    .await;

    let result = service.open_session().await;

    match result {
        Err(SecretServiceError::Transport(TransportError::ErrorReply { name, .. })) => {
            assert_eq!(name, "org.example.Error.Custom")
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn reads_and_writes_properties() {
    init_logger();
    let mock = MockSecretService::default();
    mock.set_label(ObjectPath::new(LOGIN), "Login").await;
    let service = connect(&mock).await;
    let collection = ServiceProxy::new(
        service.connection(),
        BusAddress::new(BUS_NAME, LOGIN, COLLECTION_IFACE),
    );

    assert_eq!(
        collection.get_property("Label").await.unwrap(),
        Value::from("Login")
    );

    collection
        .set_property("Label", "s", Value::from("Passwords"))
        .await
        .unwrap();
    assert_eq!(
        mock.label(&ObjectPath::new(LOGIN)).await.as_deref(),
        Some("Passwords")
    );

    let result = collection
        .set_property("Label", "s", Value::Bool(true))
        .await;
    assert!(matches!(result, Err(SecretServiceError::Protocol(_))));
}

#[tokio::test]
async fn missing_object_is_item_not_found() {
    init_logger();
    let mock = MockSecretService::default();
    let service = connect(&mock).await;
    let item = ServiceProxy::new(
        service.connection(),
        BusAddress::new(BUS_NAME, "/org/freedesktop/secrets/collection/gone", COLLECTION_IFACE),
    );

    let result = item.get_property("Label").await;

    assert!(matches!(result, Err(SecretServiceError::ItemNotFound)));
}

#[tokio::test]
async fn closed_connection_is_service_unavailable() {
    init_logger();
    let mock = MockSecretService::default();
    let service = connect(&mock).await;

    service.close().await;
    let result = open_session(&mock).await;

    assert!(matches!(
        result,
        Err(SecretServiceError::ServiceUnavailable(_))
    ));
}
