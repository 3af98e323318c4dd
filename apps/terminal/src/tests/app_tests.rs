use super::*;

use std::time::Duration;

use chrono::DateTime;
use client_core::{FailureKind, RenderedMessage, SyncFailure};
use reqwest::StatusCode;
use shared::protocol::{Message, User};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

fn failure(operation: SyncOperation) -> ChatEvent {
    ChatEvent::Failure(SyncFailure {
        operation,
        kind: FailureKind::Transport,
        detail: "connection refused".into(),
    })
}

fn app(url: &str, input: &'static str) -> App<BufReader<&'static [u8]>> {
    let client = ResourceClient::new(url, Duration::from_secs(2)).expect("client");
    let prompt = Prompt::new(BufReader::new(input.as_bytes()).lines());
    App::new(client, ChatOptions::default(), prompt)
}

async fn unused_url() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn messages_render_with_sender_name() {
    let message = Message {
        href: "/threads/7/messages/1".into(),
        thread: Link::new("/threads/7"),
        from: Link::new("/users/3"),
        content: "hi there".into(),
        time: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").expect("time"),
    };
    let event = ChatEvent::Message(RenderedMessage {
        sender_name: "bob".into(),
        message,
    });
    assert_eq!(event_line(&event).as_deref(), Some("bob sent : hi there"));
}

#[test]
fn only_visible_failures_are_printed() {
    assert_eq!(
        event_line(&failure(SyncOperation::Send)).as_deref(),
        Some("(message not sent)")
    );
    assert!(event_line(&failure(SyncOperation::ResolveThread)).is_some());
    assert_eq!(event_line(&failure(SyncOperation::Poll)), None);
    assert_eq!(event_line(&failure(SyncOperation::InitialLoad)), None);
    assert_eq!(
        event_line(&ChatEvent::Sent {
            content: "x".into()
        }),
        None
    );
    assert_eq!(
        event_line(&ChatEvent::Participant {
            link: Link::new("/users/3"),
            name: "bob".into(),
        })
        .as_deref(),
        Some("Participant: bob")
    );
}

#[test]
fn rejected_requests_show_status() {
    let err = ClientError::RequestFailed {
        expected: StatusCode::OK,
        actual: StatusCode::UNAUTHORIZED,
    };
    assert_eq!(failure_hint(&err), "server answered 401 Unauthorized");
}

#[tokio::test]
async fn exit_choice_ends_main_menu() {
    let mut app = app("http://localhost:8080", "3\n");
    app.run().await.expect("run");
}

#[tokio::test]
async fn failed_login_returns_to_main_menu() {
    let url = unused_url().await;
    let mut app = app(&url, "9\n1\nalice\npw1\n2\nbob\npw2\n");
    app.run().await.expect("menu survives failed requests");
}

#[tokio::test]
async fn forwarding_keeps_every_event_past_channel_capacity() {
    let (tx, mut rx) = mpsc::channel(8);
    let producer = async move {
        for index in 0..3000 {
            tx.send(ChatEvent::Sent {
                content: index.to_string(),
            })
            .await
            .expect("receiver open");
        }
        "done"
    };

    let mut seen = Vec::new();
    let outcome = forward_events(producer, &mut rx, |event| seen.push(event)).await;
    assert_eq!(outcome, "done");
    assert_eq!(seen.len(), 3000);
    for (index, event) in seen.iter().enumerate() {
        assert_eq!(
            event,
            &ChatEvent::Sent {
                content: index.to_string()
            }
        );
    }
}

#[tokio::test]
async fn huge_participant_count_does_not_abort_the_menu() {
    let mut session = SessionContext::from_user(User {
        href: "/users/42".into(),
        name: "alice".into(),
        secret: Some("s3cr3t".into()),
    })
    .expect("session");
    let mut app = app("http://localhost:8080", "9223372036854775807\n/users/3\n");

    // Input ends while participants are still being read.
    let flow = app.new_thread(&mut session).await.expect("menu");
    assert_eq!(flow, Flow::Exit);
    assert!(session.threads().is_empty());
}
