//! Per-invocation state machine.
//!
//! ```text
//! Received → Normalized → Routed → {MiddlewarePre}* → HandlerExecuting
//!          → {MiddlewarePost}* → Finalized
//! ```
//!
//! `Aborted` is reachable from any non-terminal state. Transitions never go
//! backward and nothing leaves a terminal state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

/// Where an invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum InvocationState {
    Received = 0,
    Normalized = 1,
    Routed = 2,
    MiddlewarePre = 3,
    HandlerExecuting = 4,
    MiddlewarePost = 5,
    /// Completed with a response, successful or structured error.
    Finalized = 6,
    /// Unrecognized event, no route, or an unrecovered panic.
    Aborted = 7,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Aborted)
    }

    /// Middleware phases repeat once per middleware layer.
    fn is_repeatable(self) -> bool {
        matches!(self, Self::MiddlewarePre | Self::MiddlewarePost)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Normalized => "normalized",
            Self::Routed => "routed",
            Self::MiddlewarePre => "middleware_pre",
            Self::HandlerExecuting => "handler_executing",
            Self::MiddlewarePost => "middleware_post",
            Self::Finalized => "finalized",
            Self::Aborted => "aborted",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Received,
            1 => Self::Normalized,
            2 => Self::Routed,
            3 => Self::MiddlewarePre,
            4 => Self::HandlerExecuting,
            5 => Self::MiddlewarePost,
            6 => Self::Finalized,
            _ => Self::Aborted,
        }
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid invocation transition {from} -> {to}")]
pub struct TransitionError {
    pub from: InvocationState,
    pub to: InvocationState,
}

/// Atomic holder for an [`InvocationState`].
#[derive(Debug)]
pub struct Lifecycle(AtomicU8);

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Starts in [`InvocationState::Received`].
    pub fn new() -> Self {
        Self::starting_at(InvocationState::Received)
    }

    pub(crate) fn starting_at(state: InvocationState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn current(&self) -> InvocationState {
        InvocationState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `to`, returning the previous state.
    pub fn advance(&self, to: InvocationState) -> Result<InvocationState, TransitionError> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let from = InvocationState::from_u8(current);
            let allowed = !from.is_terminal()
                && (to > from || (to == from && from.is_repeatable()));
            if !allowed {
                return Err(TransitionError { from, to });
            }
            match self.0.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InvocationState::*;
    use super::*;

    #[test]
    fn full_path_with_nested_middleware() {
        let lc = Lifecycle::new();
        for state in [
            Normalized,
            Routed,
            MiddlewarePre,
            MiddlewarePre,
            HandlerExecuting,
            MiddlewarePost,
            MiddlewarePost,
            Finalized,
        ] {
            lc.advance(state).unwrap();
        }
        assert_eq!(lc.current(), Finalized);
    }

    #[test]
    fn never_moves_backward() {
        let lc = Lifecycle::new();
        lc.advance(Routed).unwrap();
        let err = lc.advance(Normalized).unwrap_err();
        assert_eq!(err.from, Routed);
        assert_eq!(err.to, Normalized);
        assert!(lc.advance(Routed).is_err());
    }

    #[test]
    fn terminal_states_are_final() {
        let lc = Lifecycle::new();
        lc.advance(Aborted).unwrap();
        assert!(lc.advance(Finalized).is_err());
        assert!(lc.advance(Aborted).is_err());
        assert_eq!(lc.current(), Aborted);
    }

    #[test]
    fn short_circuit_skips_handler_phase() {
        let lc = Lifecycle::new();
        lc.advance(Routed).unwrap();
        lc.advance(MiddlewarePre).unwrap();
        lc.advance(MiddlewarePost).unwrap();
        lc.advance(Finalized).unwrap();
    }
}
