use std::io::Read;

use crate::error::{CborError, Result};

use super::recycler;

/// Buffered input: an owned, fixed-capacity byte buffer refilled from an
/// underlying stream.
///
/// The buffer never grows; callers that need `n` contiguous bytes ask
/// [`ByteInput::ensure`], which moves any unread tail down and refills.
/// Items larger than the buffer go through the byte-at-a-time paths.
pub(crate) struct ByteInput<R> {
    source: Option<R>,
    buf: Vec<u8>,
    /// Next unread byte.
    ptr: usize,
    /// One past the last valid byte.
    end: usize,
    /// Bytes consumed in buffer loads that came before the current one.
    processed: u64,
    recycled: bool,
}

impl<R: Read> ByteInput<R> {
    pub(crate) fn new(source: R) -> Self {
        Self {
            source: Some(source),
            buf: recycler::acquire_read_buffer(),
            ptr: 0,
            end: 0,
            processed: 0,
            recycled: true,
        }
    }

    /// Test hook: a custom capacity exercises refill boundaries without
    /// multi-kilobyte fixtures.
    #[cfg(test)]
    pub(crate) fn with_capacity(source: R, capacity: usize) -> Self {
        Self {
            source: Some(source),
            buf: vec![0; capacity],
            ptr: 0,
            end: 0,
            processed: 0,
            recycled: false,
        }
    }

    /// Absolute offset of the next unread byte, for error reporting.
    pub(crate) fn offset(&self) -> u64 {
        self.processed + self.ptr as u64
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn available(&self) -> usize {
        self.end - self.ptr
    }

    pub(crate) fn has_byte(&self) -> bool {
        self.ptr < self.end
    }

    /// The unread portion of the buffer.
    pub(crate) fn window(&self) -> &[u8] {
        &self.buf[self.ptr..self.end]
    }

    pub(crate) fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.available());
        self.ptr += n;
    }

    pub(crate) fn next_byte(&mut self) -> Result<u8> {
        if self.ptr >= self.end {
            self.load_more_guaranteed()?;
        }
        let b = self.buf[self.ptr];
        self.ptr += 1;
        Ok(b)
    }

    /// Loads if needed and returns the next byte without consuming it.
    pub(crate) fn peek_byte(&mut self) -> Result<u8> {
        if self.ptr >= self.end {
            self.load_more_guaranteed()?;
        }
        Ok(self.buf[self.ptr])
    }

    /// Single-shot refill. Returns `false` at end of input.
    pub(crate) fn load_more(&mut self) -> Result<bool> {
        debug_assert_eq!(self.ptr, self.end, "unread bytes would be lost");
        self.processed += self.end as u64;
        self.ptr = 0;
        self.end = 0;
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        let count = source.read(&mut self.buf)?;
        if count == 0 {
            return Ok(false);
        }
        self.end = count;
        Ok(true)
    }

    pub(crate) fn load_more_guaranteed(&mut self) -> Result<()> {
        if self.load_more()? {
            Ok(())
        } else {
            Err(CborError::unexpected_eof(self.offset()))
        }
    }

    /// Makes at least `min` contiguous bytes available, moving the unread
    /// tail to the front of the buffer and refilling as needed. Returns
    /// `false` if the input ends first.
    pub(crate) fn load_to_have_at_least(&mut self, min: usize) -> Result<bool> {
        debug_assert!(min <= self.buf.len());
        let amount = self.end - self.ptr;
        if amount > 0 && self.ptr > 0 {
            self.processed += self.ptr as u64;
            self.buf.copy_within(self.ptr..self.end, 0);
            self.end = amount;
        } else if amount == 0 {
            self.processed += self.end as u64;
            self.end = 0;
        }
        self.ptr = 0;
        while self.end < min {
            let Some(source) = self.source.as_mut() else {
                return Ok(false);
            };
            let count = source.read(&mut self.buf[self.end..])?;
            if count == 0 {
                return Ok(false);
            }
            self.end += count;
        }
        Ok(true)
    }

    /// Guarantees `min` contiguous unread bytes or fails with an
    /// unexpected-end-of-input error. `min` must not exceed the buffer
    /// capacity.
    pub(crate) fn ensure(&mut self, min: usize) -> Result<()> {
        if self.available() >= min {
            return Ok(());
        }
        if min > self.buf.len() {
            return Err(CborError::malformed(
                format!("fixed-size item of {min} bytes exceeds the input buffer"),
                self.offset(),
            ));
        }
        if self.load_to_have_at_least(min)? {
            Ok(())
        } else {
            Err(CborError::unexpected_eof(self.offset()))
        }
    }

    pub(crate) fn skip_bytes(&mut self, mut len: u64) -> Result<()> {
        loop {
            let step = len.min(self.available() as u64) as usize;
            self.ptr += step;
            len -= step as u64;
            if len == 0 {
                return Ok(());
            }
            self.load_more_guaranteed()?;
        }
    }

    /// Hands any unread buffered bytes to `out` and reports how many
    /// there were. Does not touch the underlying stream.
    pub(crate) fn release_buffered(&mut self, out: &mut dyn std::io::Write) -> Result<usize> {
        let count = self.available();
        if count == 0 {
            return Ok(0);
        }
        out.write_all(&self.buf[self.ptr..self.end])?;
        self.ptr = self.end;
        Ok(count)
    }

    /// Returns the buffer to the recycler and optionally drops (closes)
    /// the source. Safe to call more than once.
    pub(crate) fn release(&mut self, drop_source: bool) {
        if drop_source {
            self.source = None;
        }
        if !self.buf.is_empty() {
            self.processed += self.ptr as u64;
            self.ptr = 0;
            self.end = 0;
            let buf = core::mem::take(&mut self.buf);
            if self.recycled {
                recycler::release_read_buffer(buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that doles out its data a fixed number of bytes per call.
    struct Dribble<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Dribble<'_> {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(self.data.len()).min(out.len());
            out[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn next_byte_across_refills() {
        let data: Vec<u8> = (0..40).collect();
        let mut input = ByteInput::with_capacity(Dribble { data: &data, step: 7 }, 16);
        for expected in 0..40u8 {
            assert_eq!(input.next_byte().unwrap(), expected);
        }
        assert!(matches!(
            input.next_byte(),
            Err(CborError::Malformed { .. })
        ));
    }

    #[test]
    fn ensure_moves_tail_down() {
        let data: Vec<u8> = (0..32).collect();
        let mut input = ByteInput::with_capacity(&data[..], 16);
        input.ensure(16).unwrap();
        input.advance(10);
        // 6 unread bytes left; asking for 12 forces a move + refill.
        input.ensure(12).unwrap();
        assert_eq!(input.window()[0], 10);
        assert!(input.available() >= 12);
        assert_eq!(input.offset(), 10);
    }

    #[test]
    fn ensure_rejects_oversized_requests() {
        let mut input = ByteInput::with_capacity(&[0u8; 4][..], 16);
        assert!(input.ensure(17).is_err());
    }

    #[test]
    fn skip_spans_refills() {
        let data = vec![7u8; 100];
        let mut input = ByteInput::with_capacity(&data[..], 16);
        input.skip_bytes(99).unwrap();
        assert_eq!(input.next_byte().unwrap(), 7);
        assert!(input.next_byte().is_err());
    }

    #[test]
    fn release_buffered_hands_back_tail() {
        let data: Vec<u8> = (0..10).collect();
        let mut input = ByteInput::with_capacity(&data[..], 16);
        input.ensure(10).unwrap();
        input.advance(4);
        let mut sink = Vec::new();
        assert_eq!(input.release_buffered(&mut sink).unwrap(), 6);
        assert_eq!(sink, &[4, 5, 6, 7, 8, 9]);
        assert_eq!(input.release_buffered(&mut sink).unwrap(), 0);
    }
}
