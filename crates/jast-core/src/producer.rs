//! Lexer running on its own thread.
//!
//! [`LexerTask`] owns a spawned thread that lexes its input and sends tokens
//! over a channel with room for exactly one token. The thread blocks while
//! that token is unconsumed, so it never runs more than one token ahead of
//! the parser.
//!
//! Cancelling sets a shared flag and drops the receiving end. A lexer blocked
//! in `send` wakes up with an error, sees the flag, and exits; the task then
//! joins it. Cancelling twice is a no-op, and dropping the task cancels it.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::trace;

use crate::lexer::Lexer;
use crate::token::Token;

pub struct LexerTask {
    receiver: Option<Receiver<Token>>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LexerTask {
    /// Start lexing `input` on a new thread.
    pub fn spawn(input: String) -> io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let handle = thread::Builder::new()
            .name("jast-lexer".to_string())
            .spawn(move || {
                trace!(bytes = input.len(), "lexer thread started");
                let mut sent = 0usize;
                for token in Lexer::new(&input) {
                    if flag.load(Ordering::Acquire) || sender.send(token).is_err() {
                        break;
                    }
                    sent += 1;
                }
                trace!(sent, "lexer thread exiting");
            })?;

        Ok(Self {
            receiver: Some(receiver),
            cancelled,
            handle: Some(handle),
        })
    }

    /// Stop the lexer thread and wait for it to exit.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.receiver = None;
        if let Some(handle) = self.handle.take() {
            trace!("cancelling lexer thread");
            if handle.join().is_err() {
                trace!("lexer thread panicked");
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Iterator for LexerTask {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.is_cancelled() {
            return None;
        }
        self.receiver.as_ref()?.recv().ok()
    }
}

impl Drop for LexerTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
