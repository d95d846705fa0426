//! The queued unit of work.

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::domain::{Message, MessageId};
use crate::error::DeliveryError;

/// Outcome reported back to the waiting caller.
pub(crate) type Outcome = Result<(), DeliveryError>;

/// A message paired with its single-use result signal.
///
/// Ownership moves from the dispatcher to whichever worker dequeues it.
/// [`report`](Self::report) consumes the unit, so the result can be
/// signalled at most once; dropping an unreported unit closes the channel
/// and the caller sees [`DeliveryError::Dropped`].
pub(crate) struct SendUnit {
    pub(crate) message: Message,
    result: oneshot::Sender<Outcome>,
    cancel: CancellationToken,
}

impl SendUnit {
    /// Create a unit plus the receiving half and the caller's cancel handle.
    pub(crate) fn new(message: Message) -> (Self, oneshot::Receiver<Outcome>, CancellationToken) {
        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let unit = Self {
            message,
            result: tx,
            cancel: cancel.clone(),
        };
        (unit, rx, cancel)
    }

    pub(crate) fn id(&self) -> MessageId {
        self.message.id
    }

    /// True once the caller stopped waiting for this unit.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Signal the outcome. A caller that already gave up is ignored.
    pub(crate) fn report(self, outcome: Outcome) {
        let _ = self.result.send(outcome);
    }
}
