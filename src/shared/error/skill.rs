use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("Skill query failed: {0}")]
    QueryFailed(String),
    #[error("Location not found: {0}")]
    LocationNotFound(String),
    #[error("No result")]
    NoResult,
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),
}
