//! Delegate computations run while the lock is held.

mod command;
mod template;

pub use command::CommandDelegate;
pub use template::{TemplateError, render_template};

use crate::error::Result;
use crate::outcome::Decision;

/// The unit of work behind the gate.
///
/// Only invoked while the resource lock is held. A returned error is
/// propagated verbatim by the gate, which leaves the lock held.
pub trait Delegate<T: ?Sized> {
    type Payload;

    fn invoke(&self, trigger: &T) -> Result<Decision<Self::Payload>>;
}

impl<T: ?Sized, D: Delegate<T> + ?Sized> Delegate<T> for &D {
    type Payload = D::Payload;

    fn invoke(&self, trigger: &T) -> Result<Decision<Self::Payload>> {
        (**self).invoke(trigger)
    }
}
