//! Undispatched calls and handles to in-flight calls.

use std::future::{Future, IntoFuture};
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};

use crate::callback::{panic_message, Callback};
use crate::classify::{Classifier, Decode};
use crate::client::Client;
use crate::descriptor::RequestDescriptor;
use crate::error::{Error, ExecutionFault, Result};

/// One API call that has not been dispatched yet.
///
/// Nothing touches the network until the call is sent: through
/// [`send`](Call::send), [`send_with`](Call::send_with),
/// [`blocking`](Call::blocking), or by awaiting it.
///
/// # Examples
///
/// ```no_run
/// use xms::{Client, GroupId};
///
/// # async fn example(client: Client) -> xms::Result<()> {
/// // Dispatch and await in one go.
/// let group = client.fetch_group(&GroupId::from("g1")).await?;
///
/// // Or keep a handle around.
/// let mut handle = client.fetch_group(&GroupId::from("g2")).send();
/// if !handle.is_finished() {
///     handle.cancel();
/// }
/// # Ok(())
/// # }
/// ```
#[must_use = "calls do nothing until sent or awaited"]
pub struct Call<D: Decode> {
    client: Client,
    descriptor: Result<RequestDescriptor>,
    classifier: Classifier<D>,
}

impl<D: Decode> Call<D> {
    pub(crate) fn new(
        client: Client,
        descriptor: Result<RequestDescriptor>,
        classifier: Classifier<D>,
    ) -> Self {
        Self {
            client,
            descriptor,
            classifier,
        }
    }

    /// The request this call will issue, or `None` if its body failed to serialize.
    pub fn descriptor(&self) -> Option<&RequestDescriptor> {
        self.descriptor.as_ref().ok()
    }

    /// Dispatches the call.
    pub fn send(self) -> CallHandle<D::Output> {
        self.client.dispatch(self.descriptor, self.classifier, None)
    }

    /// Dispatches the call and notifies `callback` when it finishes.
    pub fn send_with(self, callback: impl Callback<D::Output>) -> CallHandle<D::Output> {
        self.client
            .dispatch(self.descriptor, self.classifier, Some(Box::new(callback)))
    }

    /// Dispatches the call and blocks the current thread until it finishes.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking(self) -> Result<D::Output> {
        self.send().blocking_get()
    }
}

impl<D: Decode> IntoFuture for Call<D> {
    type Output = Result<D::Output>;
    type IntoFuture = CallHandle<D::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.send()
    }
}

enum Inner<T> {
    /// Waiting for the reactor task to deliver the outcome.
    Running {
        result: oneshot::Receiver<Result<T>>,
        task: JoinHandle<()>,
    },
    /// The task ended without delivering; its join result explains why.
    Joining(JoinHandle<()>),
    Ready(Result<T>),
    Taken,
}

/// Handle to a dispatched call.
///
/// Awaiting the handle yields the call's result. Dropping the handle, or
/// abandoning an await of it, does not cancel the call; only
/// [`cancel`](CallHandle::cancel) does.
#[must_use = "dropping a handle detaches the call"]
pub struct CallHandle<T> {
    inner: Inner<T>,
    cancel: Option<oneshot::Sender<()>>,
    runtime: Handle,
}

impl<T> Unpin for CallHandle<T> {}

impl<T> CallHandle<T> {
    pub(crate) fn running(
        result: oneshot::Receiver<Result<T>>,
        task: JoinHandle<()>,
        cancel: oneshot::Sender<()>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Inner::Running { result, task },
            cancel: Some(cancel),
            runtime,
        }
    }

    pub(crate) fn ready(result: Result<T>, runtime: Handle) -> Self {
        Self {
            inner: Inner::Ready(result),
            cancel: None,
            runtime,
        }
    }

    /// Returns `true` once the task running the call has ended (or the outcome was taken).
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            Inner::Running { task, .. } | Inner::Joining(task) => task.is_finished(),
            Inner::Ready(_) | Inner::Taken => true,
        }
    }

    /// Takes the result if the call has an outcome, without waiting.
    ///
    /// Returns `None` while the call is still in flight.
    pub fn try_result(&mut self) -> Option<Result<T>> {
        let mut cx = Context::from_waker(Waker::noop());
        match Pin::new(self).poll(&mut cx) {
            Poll::Ready(result) => Some(result),
            Poll::Pending => None,
        }
    }

    /// Requests cancellation of the in-flight call.
    ///
    /// The transport request is dropped, any partial body is discarded without
    /// classification, the callback is told the call was cancelled, and the
    /// handle resolves to [`Error::Interrupted`]. Returns `false` if the call
    /// had already finished or was cancelled before.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Blocks the current thread until the call finishes.
    ///
    /// Only the calling thread blocks; the reactor keeps serving other calls.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_get(mut self) -> Result<T> {
        if let Some(result) = self.try_result() {
            return result;
        }

        let runtime = self.runtime.clone();
        runtime.block_on(self)
    }
}

impl<T> Future for CallHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            match mem::replace(&mut this.inner, Inner::Taken) {
                Inner::Running { mut result, task } => match Pin::new(&mut result).poll(cx) {
                    Poll::Ready(Ok(outcome)) => return Poll::Ready(outcome),
                    Poll::Ready(Err(_)) => this.inner = Inner::Joining(task),
                    Poll::Pending => {
                        this.inner = Inner::Running { result, task };
                        return Poll::Pending;
                    }
                },
                Inner::Joining(mut task) => match Pin::new(&mut task).poll(cx) {
                    Poll::Ready(joined) => return Poll::Ready(undelivered(joined)),
                    Poll::Pending => {
                        this.inner = Inner::Joining(task);
                        return Poll::Pending;
                    }
                },
                Inner::Ready(result) => return Poll::Ready(result),
                Inner::Taken => return Poll::Ready(Err(ExecutionFault::ResultTaken.into())),
            }
        }
    }
}

/// Maps the end of a task that never delivered an outcome.
fn undelivered<T>(joined: std::result::Result<(), JoinError>) -> Result<T> {
    match joined {
        Ok(()) => Err(ExecutionFault::Internal("call task ended without an outcome").into()),
        Err(e) if e.is_panic() => {
            let message = panic_message(e.into_panic().as_ref());
            Err(ExecutionFault::Panicked(message).into())
        }
        Err(_) => Err(Error::Interrupted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_call<F>(body: F) -> CallHandle<u32>
    where
        F: FnOnce(oneshot::Sender<Result<u32>>) + Send + 'static,
    {
        let (cancel_tx, _cancel_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        let task = tokio::spawn(async move { body(result_tx) });
        CallHandle::running(result_rx, task, cancel_tx, Handle::current())
    }

    #[tokio::test]
    async fn panic_after_delivery_keeps_the_outcome() {
        let handle = spawn_call(|tx| {
            let _ = tx.send(Ok(7));
            panic!("after delivery");
        });

        assert_eq!(handle.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn panic_before_delivery_is_an_execution_fault() {
        let handle = spawn_call(|tx| {
            let _tx = tx;
            panic!("before delivery");
        });

        match handle.await {
            Err(Error::Execution(ExecutionFault::Panicked(message))) => {
                assert_eq!(message, "before delivery")
            }
            other => panic!("expected panic fault, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn task_ending_silently_is_an_internal_fault() {
        let handle = spawn_call(drop);

        assert!(matches!(
            handle.await,
            Err(Error::Execution(ExecutionFault::Internal(_)))
        ));
    }

    #[tokio::test]
    async fn result_is_taken_once() {
        let mut handle = spawn_call(|tx| {
            let _ = tx.send(Ok(1));
        });

        assert_eq!((&mut handle).await.unwrap(), 1);
        assert!(handle.is_finished());
        assert!(matches!(
            handle.try_result(),
            Some(Err(Error::Execution(ExecutionFault::ResultTaken)))
        ));
    }
}
