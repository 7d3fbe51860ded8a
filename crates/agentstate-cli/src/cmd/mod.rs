pub mod audit;
pub mod check;
pub mod config;
pub mod handoff;
pub mod hooks;
pub mod init;
pub mod lint;
pub mod rules;
pub mod security;
pub mod state;
