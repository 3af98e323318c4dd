use std::future::Future;

use anyhow::Result;
use client_core::{
    login, register, threads::create_thread, ChatEvent, ChatOptions, ChatSession, ClientError,
    ResourceClient, SendLoopExit, SessionContext, SyncOperation, QUIT_COMMAND,
};
use shared::domain::Link;
use tokio::{io::AsyncBufRead, sync::mpsc};
use tracing::{info, warn};

use crate::prompt::Prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct App<R> {
    client: ResourceClient,
    options: ChatOptions,
    prompt: Prompt<R>,
}

impl<R> App<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(client: ResourceClient, options: ChatOptions, prompt: Prompt<R>) -> Self {
        Self {
            client,
            options,
            prompt,
        }
    }

    /// Main menu until the user exits or input ends.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            println!();
            println!("1. Login");
            println!("2. Register");
            println!("3. Exit");
            let Some(choice) = self.prompt.read_number("Choice").await? else {
                return Ok(());
            };
            let session = match choice {
                1 => self.account(Account::Login).await?,
                2 => self.account(Account::Register).await?,
                3 => return Ok(()),
                _ => {
                    println!("Unknown option");
                    continue;
                }
            };
            let Some(mut session) = session else {
                continue;
            };
            if self.thread_menu(&mut session).await? == Flow::Exit {
                return Ok(());
            }
        }
    }

    async fn account(&mut self, account: Account) -> Result<Option<SessionContext>> {
        let Some(name) = self.prompt.read_field("Name").await? else {
            return Ok(None);
        };
        let Some(password) = self.prompt.read_field("Password").await? else {
            return Ok(None);
        };

        let result = match account {
            Account::Login => login(&self.client, &name, &password).await,
            Account::Register => register(&self.client, &name, &password).await,
        };
        let mut session = match result {
            Ok(session) => session,
            Err(err) => {
                println!("{} failed: {}", account.label(), failure_hint(&err));
                return Ok(None);
            }
        };
        println!("Welcome {}", session.name());

        if account == Account::Login {
            let authed = session.authorize(&self.client);
            if let Err(err) = session.refresh_threads(&authed).await {
                warn!(error = %err, "app: thread refresh failed");
                println!("Could not load threads: {}", failure_hint(&err));
            }
        }
        Ok(Some(session))
    }

    async fn thread_menu(&mut self, session: &mut SessionContext) -> Result<Flow> {
        loop {
            println!();
            println!("1. Show current threads");
            println!("2. Create new thread");
            println!("3. Exit");
            let Some(choice) = self.prompt.read_number("Choice").await? else {
                return Ok(Flow::Exit);
            };
            let flow = match choice {
                1 => self.select_thread(session).await?,
                2 => self.new_thread(session).await?,
                3 => return Ok(Flow::Continue),
                _ => {
                    println!("Unknown option");
                    Flow::Continue
                }
            };
            if flow == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }
    }

    async fn select_thread(&mut self, session: &mut SessionContext) -> Result<Flow> {
        loop {
            println!();
            for (index, thread) in session.threads().iter().enumerate() {
                println!("{index} : {thread}");
            }
            println!("-1 : back");
            let Some(choice) = self.prompt.read_number("Thread").await? else {
                return Ok(Flow::Exit);
            };
            if choice == -1 {
                return Ok(Flow::Continue);
            }
            let thread = usize::try_from(choice)
                .ok()
                .and_then(|index| session.thread(index))
                .cloned();
            match thread {
                Some(thread) => return self.chat(session, thread).await,
                None => println!("No thread with index {choice}"),
            }
        }
    }

    async fn new_thread(&mut self, session: &mut SessionContext) -> Result<Flow> {
        let Some(count) = self
            .prompt
            .read_number("Enter number of participants excluding you")
            .await?
        else {
            return Ok(Flow::Exit);
        };

        let mut participants = Vec::new();
        for index in 0..count.max(0) {
            let Some(href) = self
                .prompt
                .read_field(&format!("Participant {} link", index + 1))
                .await?
            else {
                return Ok(Flow::Exit);
            };
            if !href.is_empty() {
                participants.push(Link::new(href));
            }
        }

        let authed = session.authorize(&self.client);
        match create_thread(&authed, participants).await {
            Ok(thread) => {
                println!("Created {}", thread.href);
                session.add_thread(thread.link());
            }
            Err(err) => println!("Could not create thread: {}", failure_hint(&err)),
        }
        Ok(Flow::Continue)
    }

    async fn chat(&mut self, session: &SessionContext, thread: Link) -> Result<Flow> {
        let (chat, mut events) =
            ChatSession::new(&self.client, session, thread.clone(), self.options.clone());
        println!();
        println!("Entered {thread}, type {QUIT_COMMAND} to leave");

        let outcome =
            forward_events(chat.run(self.prompt.lines_mut()), &mut events, print_event).await;

        match outcome {
            Ok(outcome) => {
                info!(thread = %thread, exit = ?outcome.exit, "app: left chat");
                Ok(if outcome.exit == SendLoopExit::EndOfInput {
                    Flow::Exit
                } else {
                    Flow::Continue
                })
            }
            Err(err) => {
                warn!(thread = %thread, error = %err, "app: chat ended with error");
                println!("Chat ended: {}", failure_hint(&err));
                Ok(Flow::Exit)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Account {
    Login,
    Register,
}

impl Account {
    fn label(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Register => "Registration",
        }
    }
}

/// Drives `run` while handing every event to `sink`, then flushes what is
/// still queued once `run` has finished.
pub async fn forward_events<F, T>(
    run: F,
    events: &mut mpsc::Receiver<ChatEvent>,
    mut sink: impl FnMut(ChatEvent),
) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(run);
    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            Some(event) = events.recv() => sink(event),
        }
    };
    while let Ok(event) = events.try_recv() {
        sink(event);
    }
    outcome
}

fn print_event(event: ChatEvent) {
    if let Some(line) = event_line(&event) {
        println!("{line}");
    }
}

/// Terminal rendering of a chat event; `None` for events that stay silent.
pub fn event_line(event: &ChatEvent) -> Option<String> {
    match event {
        ChatEvent::Participant { name, .. } => Some(format!("Participant: {name}")),
        ChatEvent::Message(message) => Some(message.line()),
        ChatEvent::Sent { .. } => None,
        ChatEvent::Failure(failure) => match failure.operation {
            SyncOperation::Send => Some("(message not sent)".to_string()),
            SyncOperation::ResolveThread => Some("(could not load thread)".to_string()),
            SyncOperation::ResolveParticipant
            | SyncOperation::InitialLoad
            | SyncOperation::Poll => None,
        },
    }
}

/// Short user-facing reason for a failed request.
pub fn failure_hint(err: &ClientError) -> String {
    match err {
        ClientError::RequestFailed { actual, .. } => format!("server answered {actual}"),
        err if err.is_timeout() => "request timed out".to_string(),
        ClientError::Transport(_) => "service unreachable".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
