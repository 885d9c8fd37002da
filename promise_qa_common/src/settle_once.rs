use std::sync::{Mutex, MutexGuard, PoisonError};

/// A single-use slot that hands its value out at most once, across threads.
///
/// Two continuations that both hold the same `SettleOnce` race to `take` the
/// value; exactly one of them receives it, every later caller gets `None`.
///
/// # Example
///
/// ```rust
/// use promise_qa_common::SettleOnce;
/// use std::sync::Arc;
///
/// let slot = Arc::new(SettleOnce::new("done"));
/// let other = slot.clone();
///
/// assert_eq!(slot.take(), Some("done"));
/// assert_eq!(other.take(), None);
/// assert!(other.is_settled());
/// ```
#[derive(Debug)]
pub struct SettleOnce<T> {
    slot: Mutex<Option<T>>,
}

impl<T> SettleOnce<T> {
    /// Creates a slot holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Some(value)),
        }
    }

    /// Takes the value out, leaving the slot settled.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    /// Runs `f` on the value if it is still present, consuming it.
    ///
    /// Returns `true` if `f` ran.
    pub fn settle_with(&self, f: impl FnOnce(T)) -> bool {
        // Release the lock before running `f` so it may touch the slot again.
        let value = self.take();
        match value {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    /// Returns true once the value has been taken.
    pub fn is_settled(&self) -> bool {
        self.lock().is_none()
    }

    // A panic while holding the lock cannot leave the Option half-written.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
