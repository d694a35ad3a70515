//! In-memory transport that behaves like the panel firmware

use super::Transport;
use crate::error::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Scriptable byte channel for tests and dry runs
///
/// Handles are cheap clones over shared state: keep one in the test and give
/// another to the device under test. Each `write_all` is logged as one
/// frame. With an auto-reply set, every successful write queues that byte,
/// the way the controller answers `'K'` after displaying a frame. An empty
/// reply queue reads as a timeout.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    replies: VecDeque<u8>,
    frames: Vec<Vec<u8>>,
    auto_reply: Option<u8>,
    fail_writes: bool,
    fail_clear: bool,
    reads: usize,
    clears: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that answers every frame with `reply`
    pub fn replying(reply: u8) -> Self {
        let mock = Self::new();
        mock.set_auto_reply(Some(reply));
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue bytes for the host to read
    pub fn queue_reply(&self, bytes: &[u8]) {
        self.state().replies.extend(bytes);
    }

    pub fn set_auto_reply(&self, reply: Option<u8>) {
        self.state().auto_reply = reply;
    }

    /// Make subsequent writes fail with a broken-pipe error
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Make subsequent `clear` calls fail, like a port that vanished after opening
    pub fn set_fail_clear(&self, fail: bool) {
        self.state().fail_clear = fail;
    }

    /// Every successful write, one entry per call
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state().frames.clone()
    }

    /// All written bytes, concatenated
    pub fn written(&self) -> Vec<u8> {
        self.state().frames.concat()
    }

    /// Drain the write log
    pub fn take_frames(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state().frames)
    }

    /// Bytes queued but not yet read
    pub fn pending_replies(&self) -> usize {
        self.state().replies.len()
    }

    /// Number of `read` calls
    pub fn read_count(&self) -> usize {
        self.state().reads
    }

    /// Number of `clear` calls
    pub fn clear_count(&self) -> usize {
        self.state().clears
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut state = self.state();
        state.reads += 1;
        let n = state.replies.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(state.replies.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "mock write failure").into());
        }
        state.frames.push(data.to_vec());
        if let Some(reply) = state.auto_reply {
            state.replies.push_back(reply);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut state = self.state();
        state.clears += 1;
        if state.fail_clear {
            return Err(std::io::Error::new(std::io::ErrorKind::NotConnected, "mock clear failure").into());
        }
        state.replies.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_queue_reads_as_timeout() {
        let mut transport = MockTransport::new();
        assert_eq!(transport.read_byte().unwrap(), None);

        transport.queue_reply(b"KE");
        assert_eq!(transport.read_byte().unwrap(), Some(b'K'));
        assert_eq!(transport.pending_replies(), 1);
        assert_eq!(transport.read_count(), 2);
    }

    #[test]
    fn test_clear_discards_queued_replies() {
        let mut transport = MockTransport::new();
        transport.queue_reply(b"KKK");
        transport.clear().unwrap();
        assert_eq!(transport.pending_replies(), 0);
        assert_eq!(transport.clear_count(), 1);
    }

    #[test]
    fn test_auto_reply_per_write() {
        let handle = MockTransport::replying(b'K');
        let mut owned: Box<dyn Transport> = Box::new(handle.clone());

        owned.write_all(&[1, 2]).unwrap();
        owned.write_all(&[3]).unwrap();
        assert_eq!(handle.frames(), vec![vec![1, 2], vec![3]]);
        assert_eq!(handle.written(), vec![1, 2, 3]);
        assert_eq!(handle.pending_replies(), 2);

        handle.set_fail_writes(true);
        assert!(owned.write_all(&[4]).is_err());
        assert_eq!(handle.take_frames().len(), 2);
        assert!(handle.frames().is_empty());
        assert_eq!(handle.pending_replies(), 2);
    }
}
