use thiserror::Error;

use crate::lua_value::LuaValue;

pub type LuaResult<T> = Result<T, LuaError>;

/// Crate-wide error type. The compile-time variants carry source positions;
/// `Runtime` carries the thrown Lua value, since `error(v)` may throw
/// anything, not just strings.
#[derive(Debug, Clone, Error)]
pub enum LuaError {
    /// Malformed token (unterminated string, bad escape, bad numeral).
    #[error("lex error at line {line}: {message}")]
    Lex { line: u32, message: String },

    /// Grammar violation.
    #[error("parse error at line {line}: {message}")]
    Parse { line: u32, message: String },

    /// Register/scope invariant violation found while generating code.
    #[error("codegen error: {message}")]
    Codegen { message: String },

    /// Header mismatch or truncated stream while decoding a binary chunk.
    #[error("bad binary chunk: {0}")]
    ChunkFormat(String),

    /// Runtime fault; unwinds to the nearest protected call.
    #[error("{0}")]
    Runtime(LuaValue),

    /// Coroutine misuse (resume on dead/running coroutine, illegal yield).
    #[error("{0}")]
    Coroutine(String),

    /// Internal control signal: a coroutine is suspending. Never observed
    /// by callers of the public API; `resume` consumes it.
    #[error("coroutine yield")]
    Yield,
}

impl LuaError {
    /// The value a protected call or `resume` hands back for this error.
    pub fn fault_value(&self) -> LuaValue {
        match self {
            LuaError::Runtime(v) => v.clone(),
            other => LuaValue::from_string(other.to_string()),
        }
    }
}
