//! Single-writer arbitration for the ledger store.
//!
//! Every component that mutates the store first waits for its turn here.
//! Turns are granted strictly in arrival order across all writer classes,
//! and the turn ends when the returned [`WriteGuard`] is dropped.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Areas of the node that write to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Writer {
    ConfirmationHeight,
    ProcessBatch,
    Wallet,
    /// Used in tests to hold the store open.
    Testing,
}

#[derive(Default)]
struct Turns {
    queue: VecDeque<(u64, Writer)>,
    next_ticket: u64,
}

#[derive(Default)]
pub struct WriteQueue {
    turns: Mutex<Turns>,
    condition: Condvar,
}

/// Exclusive write access. Dropping it hands the turn to the next waiter.
pub struct WriteGuard<'a> {
    queue: &'a WriteQueue,
    ticket: u64,
    writer: Writer,
}

impl WriteGuard<'_> {
    pub fn writer(&self) -> Writer {
        self.writer
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let mut turns = self.queue.turns.lock().unwrap();
        turns.queue.retain(|(ticket, _)| *ticket != self.ticket);
        drop(turns);
        self.queue.condition.notify_all();
        tracing::trace!(writer = ?self.writer, "write turn released");
    }
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until it is `writer`'s turn.
    pub fn wait(&self, writer: Writer) -> WriteGuard<'_> {
        let mut turns = self.turns.lock().unwrap();
        let ticket = turns.next_ticket;
        turns.next_ticket += 1;
        turns.queue.push_back((ticket, writer));
        let _turns = self
            .condition
            .wait_while(turns, |t| t.queue.front().map(|(id, _)| *id) != Some(ticket))
            .unwrap();
        WriteGuard {
            queue: self,
            ticket,
            writer,
        }
    }

    /// Take the turn only if nobody holds or waits for it.
    pub fn try_lock(&self, writer: Writer) -> Option<WriteGuard<'_>> {
        let mut turns = self.turns.lock().unwrap();
        if !turns.queue.is_empty() {
            return None;
        }
        let ticket = turns.next_ticket;
        turns.next_ticket += 1;
        turns.queue.push_back((ticket, writer));
        Some(WriteGuard {
            queue: self,
            ticket,
            writer,
        })
    }

    /// Whether `writer` holds or waits for a turn.
    pub fn contains(&self, writer: Writer) -> bool {
        self.turns
            .lock()
            .unwrap()
            .queue
            .iter()
            .any(|(_, w)| *w == writer)
    }

    pub fn len(&self) -> usize {
        self.turns.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
