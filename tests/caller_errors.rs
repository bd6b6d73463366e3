use anyhow::Result;
use rillquery::testing::MockTransport;
use rillquery::{Error, FilterKind};
use serde_json::json;

#[tokio::test]
async fn transport_failure_resolves_to_error_result() -> Result<()> {
    let mock = MockTransport::new().with_failure(Error::MalformedBody("connection reset".into()));
    let client = mock.client();

    let res = client.from("users").select("*").await?;

    assert!(res.data.is_none());
    let err = res.error.expect("transport error");
    assert!(err.message.contains("connection reset"));
    assert_eq!(mock.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn status_failure_keeps_remote_message() -> Result<()> {
    let mock = MockTransport::new().with_failure(Error::Status {
        status: 401,
        message: "JWT expired".into(),
    });
    let client = mock.client();

    let res = client.from("users").await?;

    let err = res.error.expect("status error");
    assert_eq!(err.message, "JWT expired");
    assert_eq!(err.code_str().as_deref(), Some("401"));
    Ok(())
}

#[tokio::test]
async fn non_object_body_is_reported_not_thrown() -> Result<()> {
    let mock = MockTransport::new().with_body(json!("oops"));
    let client = mock.client();

    let res = client.from("users").await?;

    assert!(res.data.is_none());
    assert!(res.error.is_some());
    Ok(())
}

#[tokio::test]
async fn empty_collection_fails_before_io() -> Result<()> {
    let mock = MockTransport::new();
    let client = mock.client();

    let err = client.from("  ").select("*").await.expect_err("missing collection");

    assert!(matches!(err, Error::MissingCollection));
    assert!(err.is_caller_error());
    assert_eq!(mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn negative_limit_fails_before_io() -> Result<()> {
    let mock = MockTransport::new();
    let client = mock.client();

    let err = client.from("t").limit(-1).await.expect_err("negative limit");

    assert!(matches!(err, Error::NegativeLimit(-1)));
    assert_eq!(mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn single_and_maybe_single_conflict() -> Result<()> {
    let mock = MockTransport::new();
    let client = mock.client();

    let err = client
        .from("t")
        .single()
        .maybe_single()
        .await
        .expect_err("conflicting cardinality");

    assert!(matches!(err, Error::ConflictingCardinality));
    assert_eq!(mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn repeating_the_same_cardinality_is_allowed() -> Result<()> {
    let mock = MockTransport::new().with_rows(json!([{"id": 1}]));
    let client = mock.client();

    let res = client.from("t").single().single().await?;

    assert_eq!(res.data, Some(json!({"id": 1})));
    Ok(())
}

#[tokio::test]
async fn nested_negation_fails_before_io() -> Result<()> {
    let mock = MockTransport::new();
    let client = mock.client();

    let err = client
        .from("t")
        .not("a", FilterKind::Not, 1)
        .await
        .expect_err("nested negation");

    assert!(matches!(err, Error::NestedNegation));
    assert_eq!(mock.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn collaborator_stubs_report_not_implemented() -> Result<()> {
    let client = MockTransport::new().client();

    let err = client.auth().session().await.expect_err("stub auth");
    assert!(matches!(err, Error::NotImplemented("auth.session")));
    assert!(client.storage().public_url("avatars", "a.png").is_err());
    assert!(client.realtime().subscribe("room:1").await.is_err());
    Ok(())
}
