// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Synchronous change notification.
//!
//! Listeners run in registration order inside the mutating call. A listener
//! may register further listeners while an event is being delivered; those
//! start receiving events from the next emission. A listener may also
//! unsubscribe itself or others during delivery; a removed listener is not
//! called again.

use crate::*;

use core::cell::RefCell;
use core::fmt;

/// Payload delivered to change listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChange {
    /// Facet whose filter state was mutated.
    pub facet_id: Rc<str>,
}

/// Handle returned by listener registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&FilterChange)>;

#[derive(Default)]
struct NotifierInner {
    listeners: Vec<(ListenerId, Listener)>,
    // Listeners taken out of `listeners` by an emission in progress.
    delivering: Vec<ListenerId>,
    // Delivering listeners unsubscribed before being put back.
    removed: Vec<ListenerId>,
    next_id: u64,
}

/// A list of change listeners. Cloning yields another handle to the same list.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Rc<RefCell<NotifierInner>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.len())
            .finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl FnMut(&FilterChange) + 'static) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(lid, _)| *lid != id);
        if before != inner.listeners.len() {
            return true;
        }
        if inner.delivering.contains(&id) && !inner.removed.contains(&id) {
            inner.removed.push(id);
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.borrow();
        inner.listeners.len() + inner.delivering.len() - inner.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every listener. Nested emissions triggered from a
    /// listener are delivered only to listeners not already running.
    pub fn emit(&self, event: &FilterChange) {
        let mut active = {
            let mut inner = self.inner.borrow_mut();
            let active = core::mem::take(&mut inner.listeners);
            inner.delivering.extend(active.iter().map(|(id, _)| *id));
            active
        };

        for (id, listener) in active.iter_mut() {
            if self.inner.borrow().removed.contains(id) {
                continue;
            }
            listener(event);
        }

        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        inner
            .delivering
            .retain(|id| !active.iter().any(|(aid, _)| aid == id));
        let removed = &mut inner.removed;
        active.retain(|(id, _)| match removed.iter().position(|r| r == id) {
            Some(idx) => {
                removed.swap_remove(idx);
                false
            }
            None => true,
        });
        let added = core::mem::replace(&mut inner.listeners, active);
        inner.listeners.extend(added);
    }
}
