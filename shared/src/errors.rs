/// Error codes for the matching engine, following the `E{service}{sequence}` pattern
/// used across the rest of the codebase.
///
/// Ranges:
/// - E0xxx: shared/infrastructure errors
/// - E3xxx: matching errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotInitialized,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "E3000",
        }
    }
}

/// The engine performs no I/O, so its error taxonomy is deliberately small: the only
/// failure mode is calling an operation before `configure`. "No match" is never an
/// error — see `MatchingEngine::search`, which returns `Ok(None)` on a clean miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("matching engine has not been configured")]
    NotInitialized,
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
