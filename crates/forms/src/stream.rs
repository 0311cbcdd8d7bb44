//! Multicast change streams with replay of the current value.
//!
//! A subscriber is called synchronously with the owner's current value at
//! subscription time and then with every emitted value. There is no
//! buffering: emission happens inside the mutating call.

use std::fmt;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

type Callback<T> = Box<dyn FnMut(&T)>;

pub(crate) struct Subject<T> {
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Subject<T> {
    pub(crate) fn new() -> Self {
        Subject {
            subscribers: Vec::new(),
        }
    }

    /// Register `callback`, replaying `current` to it immediately.
    pub(crate) fn subscribe(&mut self, id: SubscriptionId, current: &T, mut callback: Callback<T>) {
        callback(current);
        self.subscribers.push((id, callback));
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub(crate) fn next(&mut self, value: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(value);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn replays_current_then_forwards() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut subject = Subject::new();
        let sink = Rc::clone(&seen);
        subject.subscribe(SubscriptionId(1), &1, Box::new(move |v| sink.borrow_mut().push(*v)));
        subject.next(&2);
        subject.next(&3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let seen = Rc::new(RefCell::new(0));
        let mut subject = Subject::new();
        let sink = Rc::clone(&seen);
        subject.subscribe(SubscriptionId(7), &0, Box::new(move |_| *sink.borrow_mut() += 1));
        assert!(subject.unsubscribe(SubscriptionId(7)));
        assert!(!subject.unsubscribe(SubscriptionId(7)));
        subject.next(&1);
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(subject.len(), 0);
    }
}
