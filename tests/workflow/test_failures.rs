//! Failing runs: configuration is checked first, teardown always happens

use tempfile::tempdir;
use telegram_uploader::progress::NoProgress;
use telegram_uploader::workflow;
use telegram_uploader::{Error, Invocation, Recipient};

use super::stub::{Call, StubClient};
use super::{env, full_env, invocation, write_file};

#[tokio::test]
async fn missing_api_id_makes_no_network_calls() {
    let dir = tempdir().unwrap();
    let files = vec![write_file(dir.path(), "a.txt", b"a")];
    let mut client = StubClient::new();

    let err = workflow::run(
        &mut client,
        env(&[("API_HASH", "abc"), ("BOT_TOKEN", "1:tok")]),
        &invocation("@examplechannel", "m", &files),
        &mut NoProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Configuration(ref m) if m.contains("API_ID")));
    assert_ne!(err.exit_code(), 0);
    assert!(client.calls.is_empty());
}

#[tokio::test]
async fn any_missing_credential_makes_no_network_calls() {
    let dir = tempdir().unwrap();
    let files = vec![write_file(dir.path(), "a.txt", b"a")];
    let all = [("API_ID", "1"), ("API_HASH", "abc"), ("BOT_TOKEN", "1:tok")];

    for skip in 0..all.len() {
        let vars: Vec<_> = all
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, kv)| *kv)
            .collect();
        let mut client = StubClient::new();

        let err = workflow::run(
            &mut client,
            env(&vars),
            &invocation("@examplechannel", "m", &files),
            &mut NoProgress,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains(all[skip].0));
        assert_eq!(client.connects(), 0);
    }
}

#[tokio::test]
async fn missing_recipient_or_files_fail_before_connect() {
    let mut client = StubClient::new();
    let no_to = Invocation {
        to: None,
        message: None,
        files: vec!["a.txt".into()],
    };
    let err = workflow::run(&mut client, full_env(), &no_to, &mut NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let no_files = Invocation {
        to: Some("@examplechannel".into()),
        message: None,
        files: vec![],
    };
    let err = workflow::run(&mut client, full_env(), &no_files, &mut NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let bad_to = Invocation {
        to: Some("me".into()),
        message: None,
        files: vec!["a.txt".into()],
    };
    let err = workflow::run(&mut client, full_env(), &bad_to, &mut NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    assert!(client.calls.is_empty());
}

#[tokio::test]
async fn nonexistent_file_is_upload_error_and_nothing_is_sent() {
    let dir = tempdir().unwrap();
    let good = write_file(dir.path(), "build.log", b"ok");
    let missing = dir.path().join("missing.txt");
    let mut client = StubClient::new();

    let err = workflow::run(
        &mut client,
        full_env(),
        &invocation("@examplechannel", "m", &[good, missing]),
        &mut NoProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Upload(ref m) if m.contains("missing.txt")));
    assert_eq!(err.exit_code(), 5);
    assert!(client.sends().is_empty());
    assert_eq!(client.disconnects(), 1);
}

#[tokio::test]
async fn authentication_failure_skips_everything_else() {
    let dir = tempdir().unwrap();
    let files = vec![write_file(dir.path(), "a.txt", b"a")];
    let mut client = StubClient::new();
    client.fail_connect = true;

    let err = workflow::run(
        &mut client,
        full_env(),
        &invocation("@examplechannel", "m", &files),
        &mut NoProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert_eq!(client.calls, vec![Call::Connect]);
}

#[tokio::test]
async fn resolution_failure_still_disconnects_once() {
    let dir = tempdir().unwrap();
    let files = vec![write_file(dir.path(), "a.txt", b"a")];
    let mut client = StubClient::new();
    client.fail_resolve = true;

    let err = workflow::run(
        &mut client,
        full_env(),
        &invocation("@nosuchchannel", "m", &files),
        &mut NoProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Resolution(_)));
    assert!(client.sends().is_empty());
    assert_eq!(client.disconnects(), 1);
    assert_eq!(client.calls.last(), Some(&Call::Disconnect));
}

#[tokio::test]
async fn send_failure_is_upload_error_and_disconnects_once() {
    let dir = tempdir().unwrap();
    let files = vec![write_file(dir.path(), "a.txt", b"a")];
    let mut client = StubClient::new();
    client.fail_send = true;

    let err = workflow::run(
        &mut client,
        full_env(),
        &invocation("@examplechannel", "m", &files),
        &mut NoProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Upload(ref m) if m.contains("MEDIA_INVALID")));
    assert_eq!(client.sends().len(), 1);
    assert_eq!(client.disconnects(), 1);
}

#[tokio::test]
async fn short_confirmation_still_succeeds() {
    let dir = tempdir().unwrap();
    let files = vec![
        write_file(dir.path(), "a.txt", b"a"),
        write_file(dir.path(), "b.txt", b"b"),
    ];
    let mut client = StubClient::new();
    client.drop_one_message = true;

    let result = workflow::run(
        &mut client,
        full_env(),
        &invocation("@examplechannel", "m", &files),
        &mut NoProgress,
    )
    .await
    .unwrap();

    assert_eq!(result.message_ids, vec![100]);
    assert_eq!(result.message_urls, vec!["https://t.me/examplechannel/100"]);
    assert_eq!(client.sends().len(), 1);
    assert_eq!(client.disconnects(), 1);
}

#[tokio::test]
async fn unconfirmed_album_is_upload_error() {
    let dir = tempdir().unwrap();
    let files = vec![
        write_file(dir.path(), "a.txt", b"a"),
        write_file(dir.path(), "b.txt", b"b"),
    ];
    let mut client = StubClient::new();
    client.deliver_nothing = true;

    let err = workflow::run(
        &mut client,
        full_env(),
        &invocation("@examplechannel", "m", &files),
        &mut NoProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Upload(_)));
    assert!(err.to_string().contains("none of 2 files"));
    assert_eq!(client.disconnects(), 1);
}

#[tokio::test]
async fn unusual_name_reaches_the_platform() {
    let dir = tempdir().unwrap();
    let files = vec![write_file(dir.path(), "a.txt", b"a")];
    let mut client = StubClient::new();
    client.fail_resolve = true;

    let err = workflow::run(
        &mut client,
        full_env(),
        &invocation("not a handle", "", &files),
        &mut NoProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Resolution(_)));
    assert_eq!(
        client.calls[1],
        Call::Resolve(Recipient::Username("not a handle".into()))
    );
    assert!(client.sends().is_empty());
    assert_eq!(client.disconnects(), 1);
}
