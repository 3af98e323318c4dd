use reqwest::StatusCode;
use shared::{
    domain::Link,
    protocol::{AllThreads, NewThread, Thread, User},
};
use tracing::info;

use crate::{
    error::Result,
    transport::{read_json, Auth, ResourceClient},
};

const THREADS_PATH: &str = "/threads";

pub async fn list_threads(client: &ResourceClient) -> Result<Vec<Link>> {
    let response = client.get(THREADS_PATH, Auth::Required).await?;
    let all: AllThreads = read_json(response, StatusCode::OK).await?;
    Ok(all.threads)
}

/// Creates a thread with `participants`; the service adds the caller.
pub async fn create_thread(client: &ResourceClient, participants: Vec<Link>) -> Result<Thread> {
    let response = client
        .post(THREADS_PATH, &NewThread { participants }, Auth::Required)
        .await?;
    let thread: Thread = read_json(response, StatusCode::CREATED).await?;
    info!(
        thread = %thread.href,
        participants = thread.participants.len(),
        "threads: created"
    );
    Ok(thread)
}

pub async fn fetch_thread(client: &ResourceClient, thread: &Link) -> Result<Thread> {
    let response = client.get(thread.as_str(), Auth::Required).await?;
    read_json(response, StatusCode::OK).await
}

pub async fn fetch_user(client: &ResourceClient, user: &Link) -> Result<User> {
    let response = client.get(user.as_str(), Auth::Required).await?;
    read_json(response, StatusCode::OK).await
}
