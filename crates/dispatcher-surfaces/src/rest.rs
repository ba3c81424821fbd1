//! REST adapter pushing outbound replies to a per-surface callback URL. No
//! platform SDK assumed, same stance `RestWorkspaceAdapter` takes towards the
//! agent workspace — any surface UI can sit behind these two routes.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{Result, SurfaceError};
use crate::surface::UserSurface;
use crate::types::ActionChoice;

#[derive(Serialize)]
struct SendTextBody<'a> {
    channel_key: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct SendActionsBody<'a> {
    channel_key: &'a str,
    prompt_text: &'a str,
    actions: &'a [ActionChoice],
}

pub struct RestUserSurface {
    client: Client,
    name: String,
    base_url: String,
}

impl RestUserSurface {
    pub fn new(client: Client, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
            base_url: base_url.into(),
        }
    }

    async fn check_status(resp: reqwest::Response) -> Result<()> {
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            Err(SurfaceError::SendFailed(format!("{status}: {message}")))
        }
    }
}

#[async_trait]
impl UserSurface for RestUserSurface {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, text), fields(surface = %self.name, %channel_key))]
    async fn send_text(&self, channel_key: &str, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/send", self.base_url))
            .json(&SendTextBody { channel_key, text })
            .send()
            .await
            .map_err(|e| SurfaceError::SendFailed(e.to_string()))?;
        Self::check_status(resp).await?;
        info!(surface = %self.name, %channel_key, "text delivered");
        Ok(())
    }

    #[instrument(skip(self, prompt_text, actions), fields(surface = %self.name, %channel_key))]
    async fn send_actions(&self, channel_key: &str, prompt_text: &str, actions: &[ActionChoice]) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/send-actions", self.base_url))
            .json(&SendActionsBody {
                channel_key,
                prompt_text,
                actions,
            })
            .send()
            .await
            .map_err(|e| SurfaceError::SendFailed(e.to_string()))?;
        Self::check_status(resp).await?;
        info!(surface = %self.name, %channel_key, "actions delivered");
        Ok(())
    }
}
