//! Controllable loops and serialised id generation.

use std::sync::{Condvar, Mutex, MutexGuard};

use strum::Display;

/// Requested position of a controllable loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LoopPosition {
    Resume,
    Pause,
    Stop,
}

/// Pause/resume/stop switch for a loop running on another thread.
///
/// The loop calls [`check`](Self::check) between iterations. While paused,
/// `check` blocks on a condition variable until the position changes.
#[derive(Debug)]
pub struct LoopControl {
    position: Mutex<LoopPosition>,
    changed: Condvar,
}

impl LoopControl {
    /// Create a control in the `Resume` position.
    pub fn new() -> Self {
        Self {
            position: Mutex::new(LoopPosition::Resume),
            changed: Condvar::new(),
        }
    }

    /// Current position.
    pub fn position(&self) -> LoopPosition {
        *self.lock()
    }

    /// Update the position and wake a paused loop.
    pub fn set_position(&self, position: LoopPosition) {
        *self.lock() = position;
        self.changed.notify_all();
    }

    /// Pause the loop at its next check.
    pub fn pause(&self) {
        self.set_position(LoopPosition::Pause);
    }

    /// Resume a paused loop.
    pub fn resume(&self) {
        self.set_position(LoopPosition::Resume);
    }

    /// Stop the loop at its next check.
    pub fn stop(&self) {
        self.set_position(LoopPosition::Stop);
    }

    /// Block while paused; return whether the loop may continue.
    pub fn check(&self) -> bool {
        let mut position = self.lock();
        while *position == LoopPosition::Pause {
            position = self
                .changed
                .wait(position)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *position == LoopPosition::Resume
    }

    /// Run `block` for each item until it returns `false` or the loop is stopped.
    ///
    /// Returns the number of items the block ran on.
    pub fn run_for_each<I, F>(&self, items: I, mut block: F) -> usize
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> bool,
    {
        let mut count = 0;
        for item in items {
            if !self.check() {
                break;
            }
            count += 1;
            if !block(item) {
                break;
            }
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, LoopPosition> {
        self.position
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LoopControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Hands out ids, one caller at a time.
///
/// `last` always holds the most recently issued id; `next` derives the
/// following one with the creator.
pub struct IdFactory<I> {
    last: Mutex<I>,
    creator: Box<dyn Fn(&I) -> I + Send + Sync>,
}

impl<I: Clone> IdFactory<I> {
    /// Create a factory that starts after `init`.
    pub fn new(init: I, creator: impl Fn(&I) -> I + Send + Sync + 'static) -> Self {
        Self {
            last: Mutex::new(init),
            creator: Box::new(creator),
        }
    }

    /// Issue the next id.
    pub fn next(&self) -> I {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = (self.creator)(&last);
        *last = next.clone();
        next
    }
}

impl IdFactory<u64> {
    /// Sequential numeric ids starting after `init`.
    pub fn sequential(init: u64) -> Self {
        Self::new(init, |last| last + 1)
    }
}

impl<I: std::fmt::Debug> std::fmt::Debug for IdFactory<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdFactory")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_run_for_each_stops_on_block() {
        let control = LoopControl::new();
        let ran = control.run_for_each(0..10, |i| i < 3);
        assert_eq!(ran, 4);
    }

    #[test]
    fn test_stop_before_start() {
        let control = LoopControl::new();
        control.stop();
        assert_eq!(control.run_for_each(0..10, |_| true), 0);
        assert_eq!(control.position().to_string(), "stop");
    }

    #[test]
    fn test_pause_blocks_until_resume() {
        let control = Arc::new(LoopControl::new());
        let counter = Arc::new(AtomicUsize::new(0));
        control.pause();

        let worker = {
            let control = Arc::clone(&control);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                control.run_for_each(0..5, |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    true
                })
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        control.resume();
        assert_eq!(worker.join().unwrap(), 5);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_stop_wakes_paused_loop() {
        let control = Arc::new(LoopControl::new());
        control.pause();

        let worker = {
            let control = Arc::clone(&control);
            thread::spawn(move || control.run_for_each(0..5, |_| true))
        };

        thread::sleep(Duration::from_millis(20));
        control.stop();
        assert_eq!(worker.join().unwrap(), 0);
    }

    #[test]
    fn test_id_factory_sequential() {
        let ids = IdFactory::sequential(0);
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
    }

    #[test]
    fn test_id_factory_concurrent_unique() {
        let ids = Arc::new(IdFactory::sequential(100));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..50).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 200);
    }

    #[test]
    fn test_id_factory_custom_creator() {
        let ids = IdFactory::new(String::from("a"), |last: &String| format!("{last}a"));
        assert_eq!(ids.next(), "aa");
        assert_eq!(ids.next(), "aaa");
    }
}
