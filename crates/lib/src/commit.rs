//! Commit orchestration: read the current file, decide append vs. write, compose, write once.
//!
//! Read → decide → compose → write, strictly in that order and without retries. The write
//! carries exactly the revision the read returned, so a concurrent change between the two is
//! rejected by the store rather than merged here.

use crate::error::InboundError;
use crate::message::InboundMessage;
use crate::path::{resolve_path_at, ResolvedTarget};
use crate::render::{render_body, HtmlConverter};
use crate::sender::is_allowed;
use crate::store::{FileStore, RemoteFileState, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Prefix of every commit message.
const COMMIT_TAG: &str = "PomeraHub";

/// How the new content relates to what is in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Existing text, a blank line, then the new entry.
    Append,
    /// New entry only; creates the file or replaces it.
    Write,
}

/// Where and how a message ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub path: String,
    pub branch: String,
    pub commit: Option<String>,
}

/// Append only when asked to and the file is there; otherwise create or overwrite.
pub fn decide_mode(append_requested: bool, existing: &RemoteFileState) -> WriteMode {
    if append_requested && existing.exists() {
        WriteMode::Append
    } else {
        WriteMode::Write
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Footer appended to each entry. Starts with a blank line, has no trailing newline.
pub fn metadata_footer(received: &str, sender: &str) -> String {
    format!("\n\n---\nReceived: {}\nFrom: {}", received, sender)
}

/// Full file text to write.
pub fn compose(mode: WriteMode, existing_text: &str, body: &str, footer: &str) -> String {
    match mode {
        WriteMode::Append => format!("{}\n\n{}{}\n", existing_text.trim_end(), body, footer),
        WriteMode::Write => format!("{}{}\n", body, footer),
    }
}

pub fn commit_message(mode: WriteMode, path: &str, timestamp: &str, message_id: &str) -> String {
    let tag = match mode {
        WriteMode::Append => "(append)",
        WriteMode::Write => "",
    };
    format!(
        "{}{}: {} @ {}\n\nMessage-Id: {}",
        COMMIT_TAG, tag, path, timestamp, message_id
    )
}

/// Commit one rendered entry to `target` on `branch`.
pub async fn commit_entry(
    store: &dyn FileStore,
    target: &ResolvedTarget,
    branch: &str,
    body: &str,
    sender: &str,
    message_id: &str,
    now: DateTime<Utc>,
) -> Result<CommitResult, StoreError> {
    let existing = store.get_file(&target.path, branch).await?;
    let mode = decide_mode(target.append_mode, &existing);
    if target.append_mode && mode == WriteMode::Write {
        log::debug!("append requested but {} does not exist; creating", target.path);
    }

    let timestamp = format_timestamp(now);
    let footer = metadata_footer(&timestamp, sender);
    let text = compose(mode, &existing.text, body, &footer);
    let message = commit_message(mode, &target.path, &timestamp, message_id);

    let put = store
        .put_file(
            &target.path,
            &text,
            &message,
            branch,
            existing.revision.as_deref(),
        )
        .await?;
    log::info!(
        "committed {} to {} ({:?}, commit {})",
        target.path,
        branch,
        mode,
        put.commit.as_deref().unwrap_or("unknown")
    );
    Ok(CommitResult {
        path: target.path.clone(),
        branch: branch.to_string(),
        commit: put.commit,
    })
}

/// Everything a request needs besides the message itself. Built once at startup.
pub struct InboundContext<'a> {
    pub store: &'a dyn FileStore,
    pub converter: &'a dyn HtmlConverter,
    pub allowed_senders: &'a [String],
    pub default_branch: &'a str,
}

/// Authorize, resolve, render and commit one message.
pub async fn process_inbound(
    ctx: &InboundContext<'_>,
    msg: &InboundMessage,
    now: DateTime<Utc>,
) -> Result<CommitResult, InboundError> {
    if !is_allowed(&msg.sender, ctx.allowed_senders) {
        log::warn!("rejecting message from {}", msg.sender);
        return Err(InboundError::SenderNotAllowed(msg.sender.clone()));
    }
    let target = resolve_path_at(&msg.subject, now);
    let body = render_body(&msg.body_plain, &msg.body_html, ctx.converter);
    let branch = msg.branch_or(ctx.default_branch);
    log::debug!(
        "inbound from {} -> {} (append requested: {}, branch {})",
        msg.sender,
        target.path,
        target.append_mode,
        branch
    );
    commit_entry(
        ctx.store,
        &target,
        branch,
        &body,
        &msg.sender,
        &msg.message_id,
        now,
    )
    .await
    .map_err(InboundError::from)
}
