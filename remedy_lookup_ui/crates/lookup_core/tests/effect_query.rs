use lookup_core::config::service_base_url;
use lookup_core::effect_client::{
    EffectQuery, EffectQueryClient, QueryError, QueryErrorKind, GENERIC_STATUS_MESSAGE,
};
use remedy_mock_service::{spawn, Fixture, Scripted, NO_DATA_MESSAGE};
use reqwest::StatusCode;

fn client_for(base: &str) -> EffectQueryClient {
    EffectQueryClient::new(reqwest::Client::new(), &service_base_url(base).unwrap()).unwrap()
}

#[tokio::test]
async fn success_keeps_remedy_order() {
    let mock = spawn("127.0.0.1:0", Fixture::sample()).await.unwrap();
    let client = client_for(&mock.base_url());

    let result = client.query("Aspirin").await.unwrap();
    assert_eq!(
        result.effect,
        "For the temporary relief of minor aches and pains."
    );
    let names: Vec<&str> = result.remedies.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Willow bark", "Ginger"]);
    assert_eq!(result.remedies[0].match_score, 0.8333);
}

#[tokio::test]
async fn empty_remedy_list_is_a_success() {
    let mock = spawn("127.0.0.1:0", Fixture::sample()).await.unwrap();
    let result = client_for(&mock.base_url())
        .query("Acetaminophen")
        .await
        .unwrap();
    assert!(result.remedies.is_empty());
}

#[tokio::test]
async fn server_error_field_is_surfaced() {
    let mock = spawn("127.0.0.1:0", Fixture::sample()).await.unwrap();
    mock.set_answer(
        "unknownmed",
        Scripted::Fail {
            status: 404,
            body: r#"{"error":"not found"}"#.to_string(),
        },
    );
    let client = client_for(&mock.base_url());

    let err = client.query("unknownmed").await.unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::ServerReported);
    assert_eq!(err.user_message(), "not found");

    let err = client.query("unobtainium").await.unwrap_err();
    assert!(matches!(
        err,
        QueryError::ServerReported { status, .. } if status == StatusCode::NOT_FOUND
    ));
    assert_eq!(err.user_message(), NO_DATA_MESSAGE);

    let err = client.query("Metoprolol").await.unwrap_err();
    assert_eq!(err.user_message(), "Request to FDA API timed out.");
}

#[tokio::test]
async fn unusable_failure_bodies_get_the_generic_message() {
    let mock = spawn("127.0.0.1:0", Fixture::sample()).await.unwrap();
    mock.set_answer(
        "silent",
        Scripted::Fail {
            status: 500,
            body: String::new(),
        },
    );
    let client = client_for(&mock.base_url());

    for medicine in ["silent", "Ketorolac"] {
        let err = client.query(medicine).await.unwrap_err();
        assert_eq!(err.kind(), QueryErrorKind::ServerReported);
        assert_eq!(err.user_message(), GENERIC_STATUS_MESSAGE);
    }
}

#[tokio::test]
async fn malformed_success_body_is_a_transport_failure() {
    let mock = spawn("127.0.0.1:0", Fixture::sample()).await.unwrap();
    let err = client_for(&mock.base_url())
        .query("Amoxicillin")
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Malformed(_)));
    assert_eq!(err.kind(), QueryErrorKind::Transport);
    assert!(!err.user_message().is_empty());
}

#[tokio::test]
async fn unreachable_service_is_a_transport_failure() {
    // Bind then drop to get a local port with nothing listening.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let err = client_for(&format!("http://{addr}/"))
        .query("Aspirin")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), QueryErrorKind::Transport);
    let message = err.user_message();
    assert!(!message.is_empty());
    assert!(!message.contains('\n'));
}

#[tokio::test]
async fn every_call_reaches_the_service() {
    let mock = spawn("127.0.0.1:0", Fixture::sample()).await.unwrap();
    let client = client_for(&mock.base_url());

    client.query("Aspirin").await.unwrap();
    client.query("Aspirin").await.unwrap();
    assert_eq!(mock.requests(), ["Aspirin", "Aspirin"]);
}

#[tokio::test]
async fn reserved_characters_arrive_intact() {
    let mock = spawn("127.0.0.1:0", Fixture::sample()).await.unwrap();
    let client = client_for(&mock.base_url());

    let name = "Tylenol & Co/500mg?x=1";
    let err = client.query(name).await.unwrap_err();
    assert_eq!(err.user_message(), NO_DATA_MESSAGE);
    assert_eq!(mock.requests(), [name]);
}
