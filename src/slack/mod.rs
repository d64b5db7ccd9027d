//! All Slack-specific functionality

pub mod client;
pub mod listener;
pub mod reactions;
pub mod router;

// Re-export main types for convenience
pub use client::SlackClient;
pub use listener::run_socket_mode;
pub use reactions::{FeedbackReactor, ReactionKind, ReactionSink};
pub use router::{MessageDisposition, MessageRouter};
