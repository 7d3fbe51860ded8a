pub mod audit;
pub mod clock;
pub mod config;
pub mod current_state;
pub mod document;
pub mod error;
pub mod handoff;
pub mod hooks;
pub mod init;
pub mod io;
pub mod lint;
pub mod paths;
pub mod policy;
pub mod request_id;
pub mod rules;
pub mod security;
pub mod types;

pub use error::{AgentError, Result};
