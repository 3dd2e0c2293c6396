//! REST API scenarios driven through a scripted transport.

use socialgraph_core::{Adapter, AdapterError, AdapterEvent, AdapterStatus, ScriptedTransport, Session};
use socialgraph_twitter::{TwitterBackend, TwitterConfig, TwitterConnection, TwitterType};

const ADA: &str = r#"{"id":12,"id_str":"12","name":"Ada","screen_name":"ada","followers_count":3}"#;

fn session(transport: ScriptedTransport) -> Session<TwitterBackend, ScriptedTransport> {
    let backend = TwitterBackend::new(TwitterConfig::new("TOKEN")).unwrap();
    Session::new(Adapter::ready(backend), transport)
}

fn identifiers(session: &Session<TwitterBackend, ScriptedTransport>) -> Vec<String> {
    let adapter = session.adapter();
    (0..adapter.model().len())
        .filter_map(|i| adapter.row(i))
        .map(|row| row.identifier.to_string())
        .collect()
}

fn param(session: &Session<TwitterBackend, ScriptedTransport>, request: usize, key: &str) -> Option<String> {
    session.transport().sent()[request]
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn user_timeline_pages_both_ways() {
    let transport = ScriptedTransport::new();
    transport
        .respond_json("/1.1/users/show.json", ADA)
        .respond_json(
            "/1.1/statuses/user_timeline.json",
            r#"[{"id_str":"300","text":"c","created_at":"Wed Aug 27 13:08:45 +0000 2008","user":{"id_str":"12"}},
                {"id_str":"200","text":"b","created_at":"Tue Aug 26 09:00:00 +0000 2008","user":{"id_str":"12"}}]"#,
        )
        .respond_json("/1.1/statuses/user_timeline.json", r#"[{"id_str":"100","text":"a"}]"#)
        .respond_json("/1.1/statuses/user_timeline.json", r#"[{"id_str":"400","text":"d"}]"#)
        .respond_json("/1.1/statuses/user_timeline.json", "[]");

    let mut session = session(transport);
    session
        .adapter_mut()
        .populate("12", vec![TwitterConnection::Tweets.filter().shared()])
        .unwrap();
    assert_eq!(session.run().await, 2);

    let adapter = session.adapter();
    assert_eq!(adapter.status(), AdapterStatus::Idle);
    assert_eq!(adapter.node_entry().unwrap().type_tag(), TwitterType::User.tag());
    assert_eq!(adapter.row(0).unwrap().type_tag, TwitterType::Tweet.tag());
    assert_eq!(adapter.row(0).unwrap().section, "Aug 27 2008");
    assert!(adapter.has_previous());
    assert!(adapter.has_next());
    assert_eq!(identifiers(&session), vec!["300", "200"]);
    assert_eq!(param(&session, 0, "user_id").as_deref(), Some("12"));
    assert_eq!(param(&session, 1, "user_id").as_deref(), Some("12"));

    session.adapter_mut().load_next().unwrap();
    session.run().await;
    assert_eq!(param(&session, 2, "max_id").as_deref(), Some("199"));
    assert_eq!(identifiers(&session), vec!["300", "200", "100"]);

    session.adapter_mut().load_previous().unwrap();
    session.run().await;
    assert_eq!(param(&session, 3, "since_id").as_deref(), Some("300"));
    assert_eq!(identifiers(&session), vec!["400", "300", "200", "100"]);

    session.adapter_mut().load_previous().unwrap();
    session.run().await;
    assert_eq!(param(&session, 4, "since_id").as_deref(), Some("400"));
    assert_eq!(identifiers(&session), vec!["400", "300", "200", "100"]);
    assert!(!session.adapter().has_previous());
    assert!(session.adapter().has_next());
}

#[tokio::test]
async fn me_resolves_through_credentials() {
    let transport = ScriptedTransport::new();
    transport
        .respond_json("/1.1/account/verify_credentials.json", ADA)
        .respond_json(
            "/1.1/friends/list.json",
            r#"{"users":[{"id_str":"7","name":"bob","screen_name":"bob"}],
                "previous_cursor_str":"0","next_cursor_str":"1489"}"#,
        );

    let mut session = session(transport);
    session
        .adapter_mut()
        .populate("me", vec![TwitterConnection::Friends.filter().shared()])
        .unwrap();
    assert_eq!(session.run().await, 2);

    let adapter = session.adapter_mut();
    assert_eq!(adapter.current_user_identifier(), Some("12"));
    assert!(adapter
        .take_events()
        .contains(&AdapterEvent::CurrentUserChanged("12".into())));
    assert_eq!(adapter.row(0).unwrap().identifier, "7");
    assert_eq!(adapter.row(0).unwrap().section, "B");
    assert!(adapter.has_next());
    assert!(!adapter.has_previous());

    let sent = session.transport().sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].header("authorization"), Some("Bearer TOKEN"));
    assert!(sent[1].url.query().unwrap().contains("skip_status=true"));
}

#[tokio::test]
async fn api_errors_surface_on_node() {
    let transport = ScriptedTransport::new();
    transport.respond_json(
        "/1.1/users/show.json",
        r#"{"errors":[{"message":"User not found.","code":50}]}"#,
    );

    let mut session = session(transport);
    session.adapter_mut().populate("404", vec![]).unwrap();
    session.run().await;

    assert_eq!(session.adapter().status(), AdapterStatus::Error);
    assert_eq!(session.adapter().failure().unwrap().message, "User not found.");
}

#[test]
fn one_filter_per_node() {
    let backend = TwitterBackend::new(TwitterConfig::new("TOKEN")).unwrap();
    let mut adapter = Adapter::ready(backend);
    let err = adapter
        .populate(
            "12",
            vec![
                TwitterConnection::Friends.filter().shared(),
                TwitterConnection::Followers.filter().shared(),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, AdapterError::ExclusiveConnection(_)));
}
