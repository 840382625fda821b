//! Parse outcome for best-effort parsing
//!
//! Hard failures travel as `Err`. A successful parse and a parse that fell
//! back to a default value are different outcomes, and callers can tell them
//! apart instead of receiving a silently substituted value.

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// Input parsed as expected
    Parsed(T),
    /// Input could not be parsed; `value` is the default that was applied
    Defaulted { value: T, reason: String },
}

impl<T> ParseOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            Self::Parsed(value) | Self::Defaulted { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Parsed(value) | Self::Defaulted { value, .. } => value,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted { .. })
    }

    /// Why the default was applied, if it was
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Parsed(_) => None,
            Self::Defaulted { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_accessors() {
        let outcome = ParseOutcome::Parsed(3);
        assert_eq!(*outcome.value(), 3);
        assert!(!outcome.is_defaulted());
        assert_eq!(outcome.reason(), None);
    }

    #[test]
    fn test_defaulted_accessors() {
        let outcome = ParseOutcome::Defaulted {
            value: 1,
            reason: "bad input".to_string(),
        };
        assert!(outcome.is_defaulted());
        assert_eq!(outcome.reason(), Some("bad input"));
        assert_eq!(outcome.into_value(), 1);
    }
}
