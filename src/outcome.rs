//! Gate and delegate outcomes.

/// What the gate decided for one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<P> {
    /// The delegate produced work to execute. The lock stays held.
    Proceed(P),
    /// The delegate found nothing to do. The lock has been released.
    Empty,
    /// The lock is held elsewhere. Re-drive the trigger later.
    Later,
}

impl<P> Outcome<P> {
    pub fn is_later(&self) -> bool {
        matches!(self, Outcome::Later)
    }

    pub fn payload(&self) -> Option<&P> {
        match self {
            Outcome::Proceed(p) => Some(p),
            _ => None,
        }
    }
}

/// What a delegate may return.
///
/// There is no `Later` here: contention is synthesized by the gate and never
/// observed by the delegate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<P> {
    Proceed(P),
    Empty,
}

impl<P> From<Decision<P>> for Outcome<P> {
    fn from(decision: Decision<P>) -> Self {
        match decision {
            Decision::Proceed(p) => Outcome::Proceed(p),
            Decision::Empty => Outcome::Empty,
        }
    }
}
