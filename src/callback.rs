//! Completion callbacks and the wrapper that isolates them from the reactor.
//!
//! A single reactor serves every call of a client, so a callback that panics
//! must not be able to take down the task that completes the call. The
//! [`CallbackWrapper`] policy decides what happens to such panics.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::Error;

/// User code notified when a call finishes.
///
/// Exactly one of the three methods is invoked per call, before the call's
/// handle resolves. Keep them short; hand heavy work to another task.
///
/// Callbacks normally run on a reactor thread. A call dispatched on a closed
/// client never reaches the reactor: its `failed` notification runs on the
/// dispatching thread before `send_with` returns, and under
/// [`CallbackWrapper::Propagate`] a panic from it unwinds out of `send_with`.
pub trait Callback<T>: Send + 'static {
    /// The call succeeded with `value`.
    fn completed(&mut self, value: &T);

    /// The call failed with `error`.
    fn failed(&mut self, error: &Error);

    /// The call was cancelled through its handle.
    fn cancelled(&mut self);

    /// Identifies the callback in log output.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// What a call ended with, as seen by a closure callback.
#[derive(Debug)]
pub enum Outcome<'a, T> {
    /// The call succeeded.
    Completed(&'a T),
    /// The call failed.
    Failed(&'a Error),
    /// The call was cancelled.
    Cancelled,
}

/// A [`Callback`] backed by a closure, see [`from_fn`].
pub struct FnCallback<F>(F);

/// Builds a callback from a closure receiving the call's [`Outcome`].
///
/// # Examples
///
/// ```
/// use xms::callback::{self, Outcome};
/// use xms::Tags;
///
/// let callback = callback::from_fn(|outcome: Outcome<'_, Tags>| {
///     if let Outcome::Completed(tags) = outcome {
///         println!("tags now {:?}", tags.tags);
///     }
/// });
/// # let _ = callback;
/// ```
pub fn from_fn<T, F>(f: F) -> FnCallback<F>
where
    F: FnMut(Outcome<'_, T>) + Send + 'static,
{
    FnCallback(f)
}

impl<T, F> Callback<T> for FnCallback<F>
where
    F: FnMut(Outcome<'_, T>) + Send + 'static,
{
    fn completed(&mut self, value: &T) {
        (self.0)(Outcome::Completed(value))
    }

    fn failed(&mut self, error: &Error) {
        (self.0)(Outcome::Failed(error))
    }

    fn cancelled(&mut self) {
        (self.0)(Outcome::Cancelled)
    }
}

/// Policy applied to panics raised by user callbacks.
///
/// Under either policy the call's handle resolves with the call's own
/// outcome; a callback panic never replaces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallbackWrapper {
    /// Panics are held until the call's outcome has been delivered to its
    /// handle, then resumed on the reactor task that ran the callback.
    Propagate,

    /// Panics are caught, logged with the triggering event and callback name,
    /// and dropped.
    #[default]
    ExceptionDropper,
}

impl CallbackWrapper {
    /// Wraps `callback` according to this policy. `None` absorbs every outcome.
    pub fn wrap<T: 'static>(self, callback: Option<Box<dyn Callback<T>>>) -> WrappedCallback<T> {
        WrappedCallback {
            inner: callback,
            policy: self,
            pending: None,
        }
    }
}

/// A callback guarded by a [`CallbackWrapper`] policy.
pub struct WrappedCallback<T: 'static> {
    inner: Option<Box<dyn Callback<T>>>,
    policy: CallbackWrapper,
    pending: Option<Box<dyn Any + Send>>,
}

impl<T: 'static> WrappedCallback<T> {
    /// Notifies success.
    pub fn completed(&mut self, value: &T) {
        self.invoke("completed", |cb| cb.completed(value));
    }

    /// Notifies failure.
    pub fn failed(&mut self, error: &Error) {
        self.invoke("failed", |cb| cb.failed(error));
    }

    /// Notifies cancellation.
    pub fn cancelled(&mut self) {
        self.invoke("cancelled", |cb| cb.cancelled());
    }

    /// Returns `true` if a panic is held for [`resume_panic`](WrappedCallback::resume_panic).
    pub fn has_pending_panic(&self) -> bool {
        self.pending.is_some()
    }

    /// Resumes a panic held under [`CallbackWrapper::Propagate`], if any.
    ///
    /// Call this once the outcome has been handed to whoever waits for it.
    pub fn resume_panic(&mut self) {
        if let Some(payload) = self.pending.take() {
            panic::resume_unwind(payload);
        }
    }

    fn invoke(&mut self, event: &'static str, f: impl FnOnce(&mut dyn Callback<T>)) {
        let Some(callback) = self.inner.as_mut() else {
            return;
        };

        let name = callback.name();
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(callback.as_mut()))) else {
            return;
        };

        match self.policy {
            CallbackWrapper::Propagate => {
                tracing::debug!(
                    event = event,
                    callback = name,
                    "Callback panicked, resuming after delivery"
                );
                self.pending.get_or_insert(payload);
            }
            CallbackWrapper::ExceptionDropper => {
                tracing::warn!(
                    event = event,
                    callback = name,
                    panic = %panic_message(payload.as_ref()),
                    "Callback panicked, dropping"
                );
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
