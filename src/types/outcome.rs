use std::fmt;

use super::Value;

/// The result of running a node.
///
/// Both states carry the same payload type: a failing child's value is fed as
/// input to the next alternative of a selector, just as a succeeding child's
/// value is fed to the next step of a sequence.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Outcome {
    Success(Value),
    Failure(Value),
}

impl Outcome {
    /// Returns `true` if this outcome is `Success`.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Returns `true` if this outcome is `Failure`.
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            Outcome::Success(v) | Outcome::Failure(v) => v,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Outcome::Success(v) | Outcome::Failure(v) => v,
        }
    }

    /// Swaps the tag, keeping the payload.
    pub fn invert(self) -> Self {
        match self {
            Outcome::Success(v) => Outcome::Failure(v),
            Outcome::Failure(v) => Outcome::Success(v),
        }
    }

    /// Forces the `Success` tag, keeping the payload.
    pub fn into_success(self) -> Self {
        Outcome::Success(self.into_value())
    }

    /// Forces the `Failure` tag, keeping the payload.
    pub fn into_failure(self) -> Self {
        Outcome::Failure(self.into_value())
    }

    /// Converts into a `Result`, for callers that treat failure as an error.
    pub fn into_result(self) -> Result<Value, Value> {
        match self {
            Outcome::Success(v) => Ok(v),
            Outcome::Failure(v) => Err(v),
        }
    }
}

impl From<Result<Value, Value>> for Outcome {
    fn from(result: Result<Value, Value>) -> Self {
        match result {
            Ok(v) => Outcome::Success(v),
            Err(v) => Outcome::Failure(v),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(v) => write!(f, "Success({v})"),
            Outcome::Failure(v) => write!(f, "Failure({v})"),
        }
    }
}
