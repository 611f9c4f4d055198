pub mod client;
pub mod error;
pub mod poll;
pub mod session;

pub use client::AgentClient;
pub use error::ClientError;
pub use poll::PollConfig;
pub use session::AgentSession;
