//! Graph API scenarios driven through a scripted transport.

use socialgraph_core::{Adapter, AdapterEvent, AdapterStatus, ScriptedTransport, Session};
use socialgraph_facebook::{FacebookBackend, FacebookConfig, FacebookConnection, FacebookType};

fn session(transport: ScriptedTransport) -> Session<FacebookBackend, ScriptedTransport> {
    let backend = FacebookBackend::new(FacebookConfig::new("TOKEN")).unwrap();
    Session::new(Adapter::ready(backend), transport)
}

#[tokio::test]
async fn friends_of_me() {
    let transport = ScriptedTransport::new();
    transport
        .respond_json("/me", r#"{"id":"1000","name":"Ann","first_name":"Ann","gender":"female"}"#)
        .respond_json(
            "/1000",
            r#"{"id":"1000",
                "friends":{"data":[{"id":"2","name":"bob"},{"id":"3","name":"Cy"}],
                           "paging":{"next":"https://graph.facebook.com/1000/friends?limit=2&offset=2"}},
                "picture":{"data":{"url":"https://cdn.test/p.jpg"}}}"#,
        );

    let mut session = session(transport);
    session
        .adapter_mut()
        .populate("me", vec![FacebookConnection::Friends.filter().shared()])
        .unwrap();
    assert_eq!(session.run().await, 2);

    let adapter = session.adapter_mut();
    assert_eq!(adapter.status(), AdapterStatus::Idle);
    assert_eq!(adapter.current_user_identifier(), Some("1000"));
    assert_eq!(adapter.node_entry().unwrap().type_tag(), FacebookType::User.tag());
    assert!(adapter.node_entry().unwrap().data().contains_key("picture"));

    assert_eq!(adapter.model().len(), 2);
    let first = adapter.row(0).unwrap();
    assert_eq!(first.identifier, "2");
    assert_eq!(first.type_tag, FacebookType::User.tag());
    assert_eq!(first.section, "B");
    assert!(adapter.has_next());

    let events = adapter.take_events();
    assert!(events.contains(&AdapterEvent::CurrentUserChanged("1000".into())));
    assert!(events.iter().any(|e| matches!(e, AdapterEvent::EntryChanged { fields, .. }
        if fields.iter().any(|f| f.as_str() == "picture"))));

    let sent = session.transport().sent();
    let fields = sent[1].url.query_pairs().find(|(k, _)| k == "fields").unwrap().1;
    assert_eq!(fields, "friends");
    assert!(sent[1].url.query().unwrap().starts_with("access_token=TOKEN"));
}

#[tokio::test]
async fn photo_comments_page_until_empty() {
    let transport = ScriptedTransport::new();
    transport
        .respond_json(
            "/",
            r#"{"me":{"id":"1000","name":"Ann"},"p1":{"id":"p1","width":720,"source":"https://cdn.test/p1.jpg"}}"#,
        )
        .respond_json(
            "/p1",
            r#"{"id":"p1","likes":{"data":[],"summary":{"total_count":3}},
                "comments":{"data":[],"summary":{"total_count":1}}}"#,
        )
        .respond_json(
            "/p1",
            r#"{"id":"p1","comments":{
                "data":[{"id":"c1","message":"hi","like_count":0,"created_time":"2013-01-02T10:00:00+0000"}],
                "paging":{"cursors":{"before":"B","after":"A"},"next":"https://graph.facebook.com/p1/comments?after=A"}}}"#,
        )
        .respond_json("/p1", r#"{"id":"p1","comments":{"data":[]}}"#);

    let mut session = session(transport);
    session
        .adapter_mut()
        .populate("p1", vec![FacebookConnection::Comments.filter().shared()])
        .unwrap();
    assert_eq!(session.run().await, 3);

    let adapter = session.adapter();
    assert_eq!(adapter.current_user_identifier(), Some("1000"));
    assert_eq!(adapter.node_entry().unwrap().type_tag(), FacebookType::Photo.tag());
    assert!(adapter.node_entry().unwrap().data().contains_key("likes"));
    assert_eq!(adapter.row(0).unwrap().section, "2013-01-02");
    assert!(adapter.has_next());

    session.adapter_mut().load_next().unwrap();
    assert_eq!(session.run().await, 1);

    let adapter = session.adapter();
    assert_eq!(adapter.model().len(), 1);
    assert!(!adapter.has_next());

    let sent = session.transport().sent();
    let secondary = sent[1].url.query_pairs().find(|(k, _)| k == "fields").unwrap().1;
    assert_eq!(secondary, "likes.summary(true).limit(0),comments.summary(true).limit(0)");
    let paged = sent[3].url.query_pairs().find(|(k, _)| k == "fields").unwrap().1;
    assert_eq!(paged, "comments.after(A)");
}

#[tokio::test]
async fn graph_error_surfaces_on_node() {
    let transport = ScriptedTransport::new();
    transport.respond_json(
        "/",
        r#"{"error":{"message":"Invalid OAuth access token.","type":"OAuthException","code":190}}"#,
    );

    let mut session = session(transport);
    session.adapter_mut().populate("42", vec![]).unwrap();
    session.run().await;

    let sent = session.transport().sent();
    assert_eq!(sent[0].url.path(), "/");
    let failure = session.adapter().failure().unwrap();
    assert_eq!(failure.message, "Invalid OAuth access token.");
}
