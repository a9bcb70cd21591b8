//! Role-labelled transcript rendering.

use parley_core::types::{AuthorRole, ChatMessage};

/// Render history as `User: <text>` / `Bot: <text>` lines joined by `\n`.
///
/// An empty history renders as an empty string.
pub fn render_transcript(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|msg| match msg.author_role {
            AuthorRole::User => format!("User: {}", msg.message),
            _ => format!("Bot: {}", msg.message),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
