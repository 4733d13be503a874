use std::collections::VecDeque;
use std::sync::Mutex;

/// Fixed set of work, loaded up front and drained by workers.
///
/// There is no push after construction, so the length only ever shrinks and
/// an empty queue means the run is done.
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    total: usize,
}

impl<T> WorkQueue<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let items: VecDeque<T> = items.into_iter().collect();
        let total = items.len();

        Self {
            items: Mutex::new(items),
            total,
        }
    }

    pub fn try_dequeue(&self) -> Option<T> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total(&self) -> usize {
        self.total
    }

    // A panicking worker cannot leave the deque half-modified, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
