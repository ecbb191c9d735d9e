//! Shared state of the 16-key hex keypad.
//!
//! Key state is a lock-free bitmask, so `is_pressed` never blocks the interpreter. Every
//! transition is also appended to a short, ordered event log guarded by a mutex, which is
//! what the blocking "wait for a key" instruction consumes.
use core::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use heapless::Deque;
use log::{trace, warn};
use thiserror::Error;

pub const KEY_COUNT: u8 = 16;

/// How many transitions are remembered before the oldest ones are dropped
const EVENT_LOG_CAPACITY: usize = 32;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Down(u8),
    Up(u8),
}

/// A blocking wait was abandoned because cancellation was requested
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("key wait interrupted")]
pub struct Interrupted;

/// Progress of a single "press then release" wait
///
/// Only events published after the watch was created are considered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReleaseWatch {
    since: u64,
    armed: Option<u8>,
}

struct EventLog {
    queue: Deque<(u64, KeyEvent), EVENT_LOG_CAPACITY>,
    next_seq: u64,
}

impl EventLog {
    fn push(&mut self, event: KeyEvent) {
        if self.queue.is_full() {
            self.queue.pop_front();
        }
        // Cannot fail, a slot was freed above
        let _ = self.queue.push_back((self.next_seq, event));
        self.next_seq += 1;
    }

    /// Feed all unseen events into `watch`, returning the key once it was pressed and released
    fn advance(&self, watch: &mut ReleaseWatch) -> Option<u8> {
        let since = watch.since;
        for &(seq, event) in self.queue.iter().filter(|(seq, _)| *seq >= since) {
            watch.since = seq + 1;
            match event {
                KeyEvent::Down(key) => watch.armed = Some(key),
                KeyEvent::Up(key) if watch.armed == Some(key) => return Some(key),
                KeyEvent::Up(_) => {}
            }
        }
        None
    }
}

pub struct KeyPad {
    pressed: AtomicU16,
    events: Mutex<EventLog>,
    signal: Condvar,
}

impl KeyPad {
    pub fn new() -> Self {
        Self {
            pressed: AtomicU16::new(0),
            events: Mutex::new(EventLog {
                queue: Deque::new(),
                next_seq: 0,
            }),
            signal: Condvar::new(),
        }
    }

    pub fn key_down(&self, idx: u8) {
        if idx >= KEY_COUNT {
            warn!("Ignoring key down of unknown key {}", idx);
            return;
        }
        self.pressed.fetch_or(1 << idx, Ordering::AcqRel);
        self.publish(KeyEvent::Down(idx));
    }

    pub fn key_up(&self, idx: u8) {
        if idx >= KEY_COUNT {
            warn!("Ignoring key up of unknown key {}", idx);
            return;
        }
        self.pressed.fetch_and(!(1 << idx), Ordering::AcqRel);
        self.publish(KeyEvent::Up(idx));
    }

    /// Whether key `idx` is held right now; indices outside the keypad are never pressed
    pub fn is_pressed(&self, idx: u8) -> bool {
        idx < KEY_COUNT && self.pressed.load(Ordering::Acquire) & (1 << idx) != 0
    }

    /// Bitmask of all held keys, bit `n` for key `n`
    pub fn pressed_mask(&self) -> u16 {
        self.pressed.load(Ordering::Acquire)
    }

    /// Start watching for a key that is pressed and released from now on
    pub fn watch(&self) -> ReleaseWatch {
        ReleaseWatch {
            since: self.log().next_seq,
            armed: None,
        }
    }

    /// Non-blocking check of `watch`
    pub fn poll_release(&self, watch: &mut ReleaseWatch) -> nb::Result<u8, Infallible> {
        self.log().advance(watch).ok_or(nb::Error::WouldBlock)
    }

    /// Block until `watch` sees a key pressed and released, or until `cancel` is raised
    ///
    /// Whoever raises `cancel` has to call [`wake`](Self::wake) afterwards.
    pub fn await_release(
        &self,
        watch: &mut ReleaseWatch,
        cancel: &AtomicBool,
    ) -> Result<u8, Interrupted> {
        let mut log = self.log();
        loop {
            if let Some(key) = log.advance(watch) {
                trace!("Key {:X} released", key);
                return Ok(key);
            }
            if cancel.load(Ordering::Acquire) {
                return Err(Interrupted);
            }
            log = self
                .signal
                .wait(log)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wake every waiter so it re-checks its cancellation flag
    pub fn wake(&self) {
        let _log = self.log();
        self.signal.notify_all();
    }

    fn publish(&self, event: KeyEvent) {
        self.log().push(event);
        self.signal.notify_all();
    }

    fn log(&self) -> MutexGuard<'_, EventLog> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for KeyPad {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for KeyPad {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPad")
            .field("pressed", &format_args!("{:#018b}", self.pressed_mask()))
            .finish()
    }
}
