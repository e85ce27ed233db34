//! Message envelopes and the handler outcome type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state result of handling a single message.
///
/// Anything other than [`Outcome::Good`] is terminal for the current
/// dispatcher run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum Outcome {
    /// The message was handled
    Good = 1,
    /// Handling this message failed
    Error = 0,
    /// An earlier message already failed, this one was skipped
    PreviousError = -1,
}

impl Outcome {
    /// Returns `true` for [`Outcome::Good`].
    pub fn is_good(self) -> bool {
        self == Outcome::Good
    }

    /// Returns `true` for anything but [`Outcome::Good`].
    pub fn is_failure(self) -> bool {
        !self.is_good()
    }

    /// Collapse a fresh outcome with an earlier one: once something failed,
    /// every later step reports `PreviousError`.
    pub fn then(self, next: impl FnOnce() -> Outcome) -> Outcome {
        if self.is_good() {
            next()
        } else {
            Outcome::PreviousError
        }
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Good
    }
}

impl From<bool> for Outcome {
    fn from(ok: bool) -> Self {
        if ok { Outcome::Good } else { Outcome::Error }
    }
}

impl<T, E> From<Result<T, E>> for Outcome {
    fn from(result: Result<T, E>) -> Self {
        result.is_ok().into()
    }
}

impl From<Outcome> for i8 {
    fn from(outcome: Outcome) -> Self {
        outcome as i8
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Good => f.write_str("good"),
            Outcome::Error => f.write_str("error"),
            Outcome::PreviousError => f.write_str("previous error"),
        }
    }
}

/// A message made of an op code and two operands.
///
/// # Examples
///
/// ```rust
/// use relayq::GenericMessage;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Op { Add, Sub }
///
/// let msg = GenericMessage::new(Op::Add, 2u32, 3u32);
/// assert_eq!(msg.op, Op::Add);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GenericMessage<Op, Lower, Upper> {
    /// Message type / op code
    pub op: Op,
    /// First operand
    pub lower: Lower,
    /// Second operand
    pub upper: Upper,
}

impl<Op, Lower, Upper> GenericMessage<Op, Lower, Upper> {
    /// Build a message from its three parts.
    pub fn new(op: Op, lower: Lower, upper: Upper) -> Self {
        Self { op, lower, upper }
    }

    /// Split the message back into its parts.
    pub fn into_parts(self) -> (Op, Lower, Upper) {
        (self.op, self.lower, self.upper)
    }
}

/// A message made of an op code and three operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QuadMessage<Op, Lower, Upper, Last> {
    /// Message type / op code
    pub op: Op,
    /// First operand
    pub lower: Lower,
    /// Second operand
    pub upper: Upper,
    /// Third operand
    pub last: Last,
}

impl<Op, Lower, Upper, Last> QuadMessage<Op, Lower, Upper, Last> {
    /// Build a message from its four parts.
    pub fn new(op: Op, lower: Lower, upper: Upper, last: Last) -> Self {
        Self {
            op,
            lower,
            upper,
            last,
        }
    }

    /// Split the message back into its parts.
    pub fn into_parts(self) -> (Op, Lower, Upper, Last) {
        (self.op, self.lower, self.upper, self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_predicates() {
        assert!(Outcome::Good.is_good());
        assert!(Outcome::Error.is_failure());
        assert!(Outcome::PreviousError.is_failure());
        assert_eq!(Outcome::default(), Outcome::Good);
    }

    #[test]
    fn test_outcome_discriminants() {
        assert_eq!(i8::from(Outcome::Good), 1);
        assert_eq!(i8::from(Outcome::Error), 0);
        assert_eq!(i8::from(Outcome::PreviousError), -1);
    }

    #[test]
    fn test_outcome_conversions() {
        assert_eq!(Outcome::from(true), Outcome::Good);
        assert_eq!(Outcome::from(false), Outcome::Error);

        let ok: Result<u32, String> = Ok(1);
        let err: Result<u32, String> = Err("nope".to_string());
        assert_eq!(Outcome::from(ok), Outcome::Good);
        assert_eq!(Outcome::from(err), Outcome::Error);
    }

    #[test]
    fn test_outcome_chaining() {
        assert_eq!(Outcome::Good.then(|| Outcome::Good), Outcome::Good);
        assert_eq!(Outcome::Good.then(|| Outcome::Error), Outcome::Error);
        assert_eq!(
            Outcome::Error.then(|| panic!("must not run")),
            Outcome::PreviousError
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::PreviousError).unwrap();
        assert_eq!(json, "\"PreviousError\"");
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Outcome::PreviousError);
    }

    #[test]
    fn test_envelopes() {
        let msg = GenericMessage::new('+', 4i64, 5i64);
        assert_eq!(msg.clone().into_parts(), ('+', 4, 5));

        let quad = QuadMessage::new("mul", 2u8, 3u8, String::from("tag"));
        let (op, lower, upper, last) = quad.into_parts();
        assert_eq!(op, "mul");
        assert_eq!(lower * upper, 6);
        assert_eq!(last, "tag");
    }
}
