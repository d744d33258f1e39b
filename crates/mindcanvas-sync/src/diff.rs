use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One categorized change record. `Removed` carries the last known document
/// so consumers can erase by id without a second lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct DocChange<T> {
    pub kind: ChangeKind,
    pub doc: T,
}

impl<T> DocChange<T> {
    pub fn added(doc: T) -> Self {
        Self {
            kind: ChangeKind::Added,
            doc,
        }
    }

    pub fn modified(doc: T) -> Self {
        Self {
            kind: ChangeKind::Modified,
            doc,
        }
    }

    pub fn removed(doc: T) -> Self {
        Self {
            kind: ChangeKind::Removed,
            doc,
        }
    }
}

/// Changes delivered together, in the order the store applied them.
pub type DiffBatch<T> = Vec<DocChange<T>>;

/// Handle for a push-style change-notification subscription. Dropping the
/// handle cancels it; the store prunes cancelled watchers on its next
/// publish.
pub struct Subscription<T> {
    rx: Receiver<DiffBatch<T>>,
    cancelled: Arc<AtomicBool>,
    closed: bool,
}

impl<T> Subscription<T> {
    pub(crate) fn new(rx: Receiver<DiffBatch<T>>, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            rx,
            cancelled,
            closed: false,
        }
    }

    /// Non-blocking poll, meant to be drained once per UI frame.
    pub fn try_next(&mut self) -> Option<DiffBatch<T>> {
        match self.rx.try_recv() {
            Ok(batch) => Some(batch),
            Err(crossbeam_channel::TryRecvError::Empty) => None,
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    /// True once the publishing side has gone away and every pending batch
    /// has been drained.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
