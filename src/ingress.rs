//! C3: the cross-thread ingress FIFO. Any non-CPU thread deposits
//! events here; the CPU thread alone drains it, inside `MoveEvents`.
//!
//! Grounded on `src/sid_emulated.rs`'s `AudioBuffer` pattern
//! (`Arc<Mutex<VecDeque<_>>>` shared between the audio callback thread
//! and the player thread): a plain mutex-guarded deque, writers
//! serialize on the lock, the single reader drains it wholesale.
//! Unlike a channel, this gives `do_state` (§4.7) something concrete to
//! hold for its whole duration to block concurrent ingress.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::queue::Event;

#[derive(Clone, Default)]
pub struct IngressQueue {
    inner: Arc<Mutex<VecDeque<Event>>>,
}

impl IngressQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Deposit an event from any thread. Unbounded — callers are trusted
    /// per spec §4.4.
    pub fn push(&self, event: Event) {
        self.inner.lock().unwrap().push_back(event);
    }

    /// Drain everything currently queued, in FIFO order. Intended to be
    /// called only from the CPU thread (inside `MoveEvents`).
    pub fn drain_all(&self) -> Vec<Event> {
        let mut guard = self.inner.lock().unwrap();
        guard.drain(..).collect()
    }

    /// Acquire the write lock for the duration of the closure. Used by
    /// `do_state` to block concurrent ingress across the whole save/load,
    /// per spec §4.7 step 1.
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut VecDeque<Event>) -> R) -> R {
        let mut guard = self.inner.lock().unwrap();
        f(&mut guard)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn ev(deadline: i64) -> Event {
        Event {
            deadline,
            userdata: 0,
            type_id: 0,
        }
    }

    #[test]
    fn drains_in_fifo_order() {
        let q = IngressQueue::new();
        q.push(ev(1));
        q.push(ev(2));
        q.push(ev(3));
        let drained: Vec<_> = q.drain_all().iter().map(|e| e.deadline).collect();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(q.is_empty());
    }

    #[test]
    fn multiple_writer_threads_lose_nothing() {
        let q = IngressQueue::new();
        let mut handles = Vec::new();
        for t in 0..8 {
            let q = q.clone();
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    q.push(ev(t * 1000 + i));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(q.drain_all().len(), 8 * 50);
    }
}
