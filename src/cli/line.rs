//! Line accumulator.
//!
//! Pulls bytes one at a time from the transport into a bounded buffer and
//! scans for the configured terminator sequence. Overflowed or stalled
//! partial lines are dropped and the buffer reset, so a single broken line
//! can never wedge the interface.

use super::Port;
use super::error::Error;

/// Reception buffer size in bytes.
///
/// A line longer than this (including the terminator) is an overrun and is
/// discarded.
pub const RX_BUF_SIZE: usize = 256;

/// Safety margin kept free at the end of the reception buffer.
///
/// Guarantees room for a terminator byte while the scan is still pending.
const RX_BUF_MARGIN: usize = 2;

/// Upper bound on bytes drained in a single poll.
///
/// Keeps one very fast or bursty source from starving the rest of the
/// cooperative loop; remaining bytes stay queued in the transport.
const ESCAPE_LIMIT: u32 = 10_000;

/// Byte accumulator turning a stream into discrete command lines.
pub(crate) struct LineAccumulator {
    buf: [u8; RX_BUF_SIZE],
    len: usize,
    line_len: usize,
    /// Timestamp of the first byte of the current incomplete line.
    first_byte_ms: Option<u32>,
}

impl LineAccumulator {
    pub(crate) const fn new() -> Self {
        Self {
            buf: [0; RX_BUF_SIZE],
            len: 0,
            line_len: 0,
            first_byte_ms: None,
        }
    }

    /// Drain bytes from `port` until a full line is captured, the transport
    /// runs dry or the per-call byte budget is spent.
    ///
    /// Returns `Ok(true)` when a complete line is available through
    /// [`line`](Self::line). At most one line is captured per call; any
    /// further buffered input is left in the transport for the next call.
    ///
    /// A stale partial line (older than `timeout_ms`) or a buffer overrun
    /// resets the accumulator and reports the corresponding error; both are
    /// recoverable and the next line starts fresh.
    pub(crate) fn poll<P: Port>(
        &mut self,
        port: &mut P,
        now_ms: u32,
        terminator: &str,
        timeout_ms: Option<u32>,
    ) -> Result<bool, Error> {
        debug_assert!(!terminator.is_empty());

        // Staleness check runs before draining, so a stalled line times out
        // on the first call after the deadline regardless of byte pacing.
        if let (Some(t0), Some(timeout)) = (self.first_byte_ms, timeout_ms) {
            if self.len > 0 && now_ms.wrapping_sub(t0) > timeout {
                self.reset();
                return Err(Error::Timeout);
            }
        }

        let mut escape_cnt: u32 = 0;

        while escape_cnt < ESCAPE_LIMIT {
            let byte = match port.receive()? {
                Some(b) => b,
                None => break,
            };

            if self.len == 0 {
                self.first_byte_ms = Some(now_ms);
            }

            self.buf[self.len] = byte;

            if let Some(pos) = find_subslice(&self.buf[..self.len + 1], terminator.as_bytes()) {
                self.line_len = pos;
                self.reset();
                return Ok(true);
            } else if self.len < RX_BUF_SIZE - RX_BUF_MARGIN {
                self.len += 1;
            } else {
                self.reset();
                return Err(Error::Overrun);
            }

            escape_cnt += 1;
        }

        Ok(false)
    }

    /// The most recently completed line, without its terminator.
    ///
    /// Only meaningful directly after [`poll`](Self::poll) returned
    /// `Ok(true)`; the content is overwritten as soon as new bytes arrive.
    pub(crate) fn line(&self) -> &[u8] {
        &self.buf[..self.line_len]
    }

    fn reset(&mut self) {
        self.len = 0;
        self.first_byte_ms = None;
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FeedPort {
        data: heapless::Deque<u8, 1024>,
        ms: u32,
    }

    impl FeedPort {
        fn new(bytes: &[u8]) -> Self {
            let mut data = heapless::Deque::new();
            for &b in bytes {
                data.push_back(b).unwrap();
            }
            Self { data, ms: 0 }
        }
    }

    impl Port for FeedPort {
        fn transmit(&mut self, _data: &[u8]) -> Result<(), Error> {
            Ok(())
        }
        fn receive(&mut self) -> Result<Option<u8>, Error> {
            Ok(self.data.pop_front())
        }
        fn now_ms(&mut self) -> u32 {
            self.ms
        }
    }

    #[test]
    fn captures_line_up_to_terminator() {
        let mut port = FeedPort::new(b"hello\r\nrest");
        let mut acc = LineAccumulator::new();

        let got = acc.poll(&mut port, 0, "\r\n", None).unwrap();
        assert!(got);
        assert_eq!(acc.line(), b"hello");
        // "rest" has no terminator yet
        assert!(!acc.poll(&mut port, 0, "\r\n", None).unwrap());
    }

    #[test]
    fn one_line_per_poll() {
        let mut port = FeedPort::new(b"a\r\nb\r\n");
        let mut acc = LineAccumulator::new();

        assert!(acc.poll(&mut port, 0, "\r\n", None).unwrap());
        assert_eq!(acc.line(), b"a");
        assert!(acc.poll(&mut port, 0, "\r\n", None).unwrap());
        assert_eq!(acc.line(), b"b");
    }

    #[test]
    fn single_byte_terminator() {
        let mut port = FeedPort::new(b"ping\n");
        let mut acc = LineAccumulator::new();

        assert!(acc.poll(&mut port, 0, "\n", None).unwrap());
        assert_eq!(acc.line(), b"ping");
    }

    #[test]
    fn overrun_resets_and_recovers() {
        let mut junk = [b'x'; RX_BUF_SIZE - 1];
        junk[RX_BUF_SIZE - 2] = b'y';
        let mut port = FeedPort::new(&junk);
        let mut acc = LineAccumulator::new();

        assert_eq!(acc.poll(&mut port, 0, "\r\n", None), Err(Error::Overrun));

        // Next line parses cleanly after the overrun.
        let mut port = FeedPort::new(b"ok\r\n");
        assert!(acc.poll(&mut port, 0, "\r\n", None).unwrap());
        assert_eq!(acc.line(), b"ok");
    }

    #[test]
    fn stale_partial_line_times_out() {
        let mut port = FeedPort::new(b"par");
        let mut acc = LineAccumulator::new();

        assert!(!acc.poll(&mut port, 0, "\r\n", Some(100)).unwrap());
        // Nothing new arrived and the deadline passed.
        assert_eq!(
            acc.poll(&mut port, 101, "\r\n", Some(100)),
            Err(Error::Timeout)
        );

        // Fresh line afterwards is unaffected.
        let mut port = FeedPort::new(b"ok\r\n");
        assert!(acc.poll(&mut port, 200, "\r\n", Some(100)).unwrap());
        assert_eq!(acc.line(), b"ok");
    }

    #[test]
    fn slow_trickle_times_out_from_first_byte() {
        // One byte per poll, 60 ms apart: the line as a whole exceeds the
        // 100 ms budget even though each gap is below it.
        let mut acc = LineAccumulator::new();
        let mut port = FeedPort::new(b"a");
        assert!(!acc.poll(&mut port, 0, "\r\n", Some(100)).unwrap());
        let mut port = FeedPort::new(b"b");
        assert!(!acc.poll(&mut port, 60, "\r\n", Some(100)).unwrap());
        let mut port = FeedPort::new(b"c");
        assert_eq!(
            acc.poll(&mut port, 120, "\r\n", Some(100)),
            Err(Error::Timeout)
        );
    }

    #[test]
    fn no_timeout_when_disabled() {
        let mut port = FeedPort::new(b"par");
        let mut acc = LineAccumulator::new();

        assert!(!acc.poll(&mut port, 0, "\r\n", None).unwrap());
        let mut port = FeedPort::new(b"tial\r\n");
        assert!(acc.poll(&mut port, 100_000, "\r\n", None).unwrap());
        assert_eq!(acc.line(), b"partial");
    }

    #[test]
    fn find_subslice_basics() {
        assert_eq!(find_subslice(b"abc\r\n", b"\r\n"), Some(3));
        assert_eq!(find_subslice(b"abc", b"\r\n"), None);
        assert_eq!(find_subslice(b"\r\n", b"\r\n"), Some(0));
        assert_eq!(find_subslice(b"a", b"ab"), None);
    }
}
