/// Domain-specific error types for strategy evaluation.
/// Every failure is scoped to one strategy. The batch must:
/// - Log the failing strategy and keep going
/// - Never write an artifact for a strategy that failed
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for StrategyError {
    fn from(e: std::io::Error) -> Self {
        StrategyError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StrategyError {
    fn from(e: serde_json::Error) -> Self {
        StrategyError::Parse(e.to_string())
    }
}

pub type StrategyResult<T> = Result<T, StrategyError>;
