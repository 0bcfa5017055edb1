// src/notify/mod.rs
// =============================================================================
// Sends crawl results to a Slack incoming webhook.
//
// Submodules:
// - format: turns the raw output/error text into a readable message
// - slack: the JSON payload and the HTTP POST
// =============================================================================

mod format;
mod slack;

pub use format::format_message;
pub use slack::{post, NotifyError, Webhook};
