//! Change notification.
//!
//! Receivers subscribe to the registry and are told about every mutation of
//! every binding created in the same environment, after the mutation has
//! taken effect. A receiver can never influence the mutation: its failures
//! are logged and dropped.

use crate::id::Identifier;
use log::warn;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct NotifyError(pub String);

/// An observer of binding mutations.
pub trait Receiver {
    fn modified(&self, id: &Identifier) -> Result<(), NotifyError>;
}

/// Handle returned by [`NotifierRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

#[derive(Default)]
pub struct NotifierRegistry {
    receivers: RefCell<Vec<(SubscriptionId, Rc<dyn Receiver>)>>,
    next_id: Cell<u32>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, receiver: Rc<dyn Receiver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.receivers.borrow_mut().push((id, receiver));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let mut receivers = self.receivers.borrow_mut();
        let before = receivers.len();
        receivers.retain(|(sub, _)| *sub != id);
        receivers.len() != before
    }

    pub fn len(&self) -> usize {
        self.receivers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.borrow().is_empty()
    }

    /// Tell every receiver that `id` changed.
    pub fn modified(&self, id: &Identifier) {
        // Receivers may (un)register while being notified.
        let receivers: Vec<_> = self
            .receivers
            .borrow()
            .iter()
            .map(|(_, r)| Rc::clone(r))
            .collect();
        for receiver in receivers {
            if let Err(err) = receiver.modified(id) {
                warn!("change notification for `{}` failed: {}", id.name(), err);
            }
        }
    }
}

impl fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierRegistry")
            .field("receivers", &self.len())
            .finish()
    }
}
