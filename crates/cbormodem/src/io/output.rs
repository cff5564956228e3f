use std::io::Write;

use crate::error::Result;

use super::recycler;

/// Buffered output: an owned byte buffer drained to an underlying sink.
///
/// After [`ByteOutput::ensure_room`] returns, at least that many bytes
/// can be appended with the unchecked [`ByteOutput::push`] /
/// [`ByteOutput::append`] pair without an intervening drain, so the
/// tight header-emission paths never check capacity per byte.
pub(crate) struct ByteOutput<W: Write> {
    sink: Option<W>,
    buf: Vec<u8>,
    /// Next free byte.
    tail: usize,
    /// Bytes already handed to the sink (excludes the buffered tail).
    written: u64,
    recycled: bool,
}

impl<W: Write> ByteOutput<W> {
    pub(crate) fn new(sink: W) -> Self {
        Self {
            sink: Some(sink),
            buf: recycler::acquire_write_buffer(),
            tail: 0,
            written: 0,
            recycled: true,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_capacity(sink: W, capacity: usize) -> Self {
        Self {
            sink: Some(sink),
            buf: vec![0; capacity],
            tail: 0,
            written: 0,
            recycled: false,
        }
    }

    /// Total bytes handed to the underlying sink so far.
    pub(crate) fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Guarantees room for `n` more bytes without a drain. `n` must not
    /// exceed the buffer capacity.
    pub(crate) fn ensure_room(&mut self, n: usize) -> Result<()> {
        debug_assert!(n <= self.buf.len());
        if self.tail + n > self.buf.len() {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Unchecked append; callers hold a prior `ensure_room` guarantee.
    #[inline]
    pub(crate) fn push(&mut self, b: u8) {
        self.buf[self.tail] = b;
        self.tail += 1;
    }

    /// Unchecked bulk append under a prior `ensure_room` guarantee.
    #[inline]
    pub(crate) fn append(&mut self, bytes: &[u8]) {
        self.buf[self.tail..self.tail + bytes.len()].copy_from_slice(bytes);
        self.tail += bytes.len();
    }

    pub(crate) fn write_byte(&mut self, b: u8) -> Result<()> {
        if self.tail >= self.buf.len() {
            self.flush_buffer()?;
        }
        self.buf[self.tail] = b;
        self.tail += 1;
        Ok(())
    }

    /// Appends `data`, draining through the sink in buffer-sized chunks
    /// when it does not fit outright.
    pub(crate) fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if self.tail + data.len() <= self.buf.len() {
            self.buf[self.tail..self.tail + data.len()].copy_from_slice(data);
            self.tail += data.len();
            return Ok(());
        }
        self.write_bytes_long(data)
    }

    fn write_bytes_long(&mut self, mut data: &[u8]) -> Result<()> {
        loop {
            let room = self.buf.len() - self.tail;
            let step = room.min(data.len());
            self.buf[self.tail..self.tail + step].copy_from_slice(&data[..step]);
            self.tail += step;
            data = &data[step..];
            if data.is_empty() {
                return Ok(());
            }
            self.flush_buffer()?;
        }
    }

    /// Drains the buffered tail to the sink.
    pub(crate) fn flush_buffer(&mut self) -> Result<()> {
        if self.tail > 0 {
            if let Some(sink) = self.sink.as_mut() {
                sink.write_all(&self.buf[..self.tail])?;
            }
            self.written += self.tail as u64;
            self.tail = 0;
        }
        Ok(())
    }

    /// Drains the buffer and, when requested, forwards the flush to the
    /// underlying sink.
    pub(crate) fn flush(&mut self, flush_sink: bool) -> Result<()> {
        self.flush_buffer()?;
        if flush_sink {
            if let Some(sink) = self.sink.as_mut() {
                sink.flush()?;
            }
        }
        Ok(())
    }

    /// Returns the buffer to the recycler and optionally drops (closes)
    /// the sink. Safe to call more than once.
    pub(crate) fn release(&mut self, drop_sink: bool) {
        if drop_sink {
            self.sink = None;
        }
        if !self.buf.is_empty() {
            self.tail = 0;
            let buf = core::mem::take(&mut self.buf);
            if self.recycled {
                recycler::release_write_buffer(buf);
            }
        }
    }

    /// Takes the sink out, leaving the output detached.
    pub(crate) fn take_sink(&mut self) -> Option<W> {
        self.sink.take()
    }

    /// Flushes and hands back the sink, for callers that own it.
    #[cfg(test)]
    pub(crate) fn into_sink(mut self, flush_sink: bool) -> Result<W> {
        self.flush(flush_sink)?;
        self.release(false);
        Ok(self.sink.take().expect("sink taken twice"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_writes_stay_buffered() {
        let mut out = ByteOutput::with_capacity(Vec::new(), 8);
        out.write_byte(1).unwrap();
        out.write_bytes(&[2, 3]).unwrap();
        assert_eq!(out.bytes_written(), 0);
        out.flush_buffer().unwrap();
        assert_eq!(out.bytes_written(), 3);
        assert_eq!(out.into_sink(false).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn oversized_write_drains_in_chunks() {
        let data: Vec<u8> = (0..30).collect();
        let mut out = ByteOutput::with_capacity(Vec::new(), 8);
        out.write_byte(0xEE).unwrap();
        out.write_bytes(&data).unwrap();
        let sink = out.into_sink(false).unwrap();
        assert_eq!(sink[0], 0xEE);
        assert_eq!(&sink[1..], &data[..]);
    }

    #[test]
    fn push_and_append_under_ensured_room() {
        let mut out = ByteOutput::with_capacity(Vec::new(), 8);
        out.ensure_room(4).unwrap();
        out.push(0x63);
        out.append(b"abc");
        assert_eq!(out.into_sink(false).unwrap(), b"\x63abc");
    }

    #[test]
    fn ensure_room_drains_when_tight() {
        let mut out = ByteOutput::with_capacity(Vec::new(), 8);
        out.write_bytes(&[9; 6]).unwrap();
        out.ensure_room(4).unwrap();
        assert_eq!(out.bytes_written(), 6);
    }
}
