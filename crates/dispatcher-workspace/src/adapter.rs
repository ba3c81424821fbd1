use async_trait::async_trait;
use dashmap::DashSet;
use dispatcher_escalation::{Action, Ticket};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{Result, WorkspaceError};
use crate::types::RoleLabel;

/// Posts tickets/messages to the agent workspace and edits ticket cards as
/// their state changes. One dispatcher session maps to one workspace thread.
#[async_trait]
pub trait WorkspaceAdapter: Send + Sync {
    async fn post_ticket(&self, ticket: &Ticket) -> Result<String>;

    async fn edit_ticket(&self, workspace_thread_key: &str, new_body: &str, new_actions: &[Action]) -> Result<()>;

    async fn post_thread_message(&self, workspace_thread_key: &str, text: &str, role_label: RoleLabel) -> Result<()>;
}

/// Tracks `(workspace_thread_key, event_id)` pairs already processed so
/// retried webhook deliveries are no-ops. Bounded only by process lifetime —
/// acceptable here since the relay hub is the sole consumer and restarts are
/// infrequent relative to event volume.
#[derive(Default)]
pub struct EventDedup {
    seen: DashSet<(String, String)>,
}

impl EventDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time this pair is seen, `false` on replay.
    pub fn first_seen(&self, workspace_thread_key: &str, event_id: &str) -> bool {
        self.seen
            .insert((workspace_thread_key.to_string(), event_id.to_string()))
    }
}

#[derive(Serialize)]
struct PostTicketBody<'a> {
    title: &'a str,
    body: &'a str,
    actions: &'a [Action],
}

#[derive(Serialize)]
struct EditTicketBody<'a> {
    body: &'a str,
    actions: &'a [Action],
}

#[derive(Serialize)]
struct ThreadMessageBody<'a> {
    text: &'a str,
    role_label: &'a str,
}

/// REST adapter talking to a self-hosted agent workspace over plain HTTP
/// endpoints. No platform SDK (e.g. Slack's, Discord's) is assumed; any
/// workspace UI can sit behind these three routes.
pub struct RestWorkspaceAdapter {
    client: Client,
    base_url: String,
}

impl RestWorkspaceAdapter {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            Err(WorkspaceError::Api { status, message })
        }
    }
}

#[async_trait]
impl WorkspaceAdapter for RestWorkspaceAdapter {
    #[instrument(skip(self, ticket), fields(title = %ticket.title))]
    async fn post_ticket(&self, ticket: &Ticket) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/tickets", self.base_url))
            .json(&PostTicketBody {
                title: &ticket.title,
                body: &ticket.body,
                actions: &ticket.actions,
            })
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let parsed: serde_json::Value = resp.json().await?;
        let key = parsed
            .get("workspace_thread_key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WorkspaceError::Api {
                status: 200,
                message: "response missing workspace_thread_key".to_string(),
            })?
            .to_string();
        info!(workspace_thread_key = %key, "ticket posted");
        Ok(key)
    }

    #[instrument(skip(self, new_body), fields(%workspace_thread_key))]
    async fn edit_ticket(&self, workspace_thread_key: &str, new_body: &str, new_actions: &[Action]) -> Result<()> {
        let resp = self
            .client
            .patch(format!("{}/tickets/{workspace_thread_key}", self.base_url))
            .json(&EditTicketBody {
                body: new_body,
                actions: new_actions,
            })
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    #[instrument(skip(self, text), fields(%workspace_thread_key, %role_label))]
    async fn post_thread_message(&self, workspace_thread_key: &str, text: &str, role_label: RoleLabel) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/tickets/{workspace_thread_key}/messages", self.base_url))
            .json(&ThreadMessageBody {
                text,
                role_label: role_label.as_str(),
            })
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }
}

impl std::fmt::Display for RoleLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
