use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("not initialized: run 'agentstate init'")]
    NotInitialized,

    #[error("no current-state file for agent: {0}")]
    AgentNotFound(String),

    #[error("agent '{0}' is not registered in .cursor/agents/config.yaml")]
    UnknownAgent(String),

    #[error("invalid agent id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidAgentId(String),

    #[error("invalid request id '{0}': expected PREFIX-YYYY-MM-DD-NNN")]
    InvalidRequestId(String),

    #[error("request id {id} cannot be used: {reason}")]
    RequestIdRejected { id: String, reason: String },

    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("agent '{agent}' already has an active task ({request_id}, {status})")]
    ActiveTask {
        agent: String,
        request_id: String,
        status: String,
    },

    #[error("agent '{0}' has no active task")]
    NoActiveTask(String),

    #[error("handoff not found: {0}")]
    HandoffNotFound(String),

    #[error("invalid handoff: {0}")]
    InvalidHandoff(String),

    #[error("invalid rule file {path}: {reason}")]
    InvalidRuleFile { path: String, reason: String },

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("malformed current-state file: field '{field}' has invalid value '{value}'")]
    InvalidField { field: String, value: String },

    #[error("git repository not found: {0} does not exist")]
    GitNotFound(String),

    #[error(transparent)]
    Glob(#[from] globset::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
