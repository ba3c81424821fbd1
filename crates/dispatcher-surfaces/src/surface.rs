use async_trait::async_trait;

use crate::error::Result;
use crate::types::ActionChoice;

/// Outbound half of a user-facing surface. Every transport the system talks
/// to (web-chat widget, a public web form, future channels) implements this
/// so the relay never special-cases a transport by name.
#[async_trait]
pub trait UserSurface: Send + Sync {
    /// Stable lowercase identifier, matching `Surface::to_string()`.
    fn name(&self) -> &str;

    async fn send_text(&self, channel_key: &str, text: &str) -> Result<()>;

    /// Send a prompt accompanied by clickable actions (e.g. numbered slot
    /// offers). Surfaces with no native button support may render this as
    /// plain text listing `label`s.
    async fn send_actions(&self, channel_key: &str, prompt_text: &str, actions: &[ActionChoice]) -> Result<()>;
}
