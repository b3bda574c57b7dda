//! Learner context for per-learner operations
//!
//! Every ledger, session and goal operation is scoped by the learner the
//! request acts for. The identity is opaque here; authenticating it is the
//! transport layer's job.

use crate::error::ProgressError;

/// Learner context passed to all per-learner operations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LearnerContext {
    /// Opaque learner identifier
    pub learner_id: String,
}

impl LearnerContext {
    /// Create a new learner context with the specified learner ID
    pub fn new(learner_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
        }
    }

    /// Create a context, rejecting blank identifiers
    pub fn parse(learner_id: &str) -> Result<Self, ProgressError> {
        let trimmed = learner_id.trim();
        if trimmed.is_empty() {
            return Err(ProgressError::invalid("learner id is required"));
        }
        Ok(Self::new(trimmed))
    }

    /// Get the learner_id as a string reference
    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }
}

impl std::fmt::Display for LearnerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LearnerContext({})", self.learner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let ctx = LearnerContext::parse("  learner-7 ").unwrap();
        assert_eq!(ctx.learner_id(), "learner-7");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(matches!(
            LearnerContext::parse("   "),
            Err(ProgressError::InvalidInput(_))
        ));
    }
}
