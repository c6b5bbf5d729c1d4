use std::cell::Cell;
use std::rc::Rc;

/// Shared cancellation flag, clones observe the same flag. Tasks check it between steps, the
/// runtime drops them outright through [TaskRef::cancel](super::TaskRef::cancel)
#[derive(Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    /// Returns false if already cancelled
    pub fn cancel(&self) -> bool {
        !self.0.replace(true)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
