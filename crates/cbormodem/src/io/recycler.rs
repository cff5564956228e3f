//! Thread-local recycling of codec byte buffers.
//!
//! A decoder or encoder acquires its buffer here on construction and
//! returns it on close, so a thread that runs many short-lived codec
//! instances reuses one allocation instead of churning. Buffers never
//! migrate across threads.

use std::cell::RefCell;

/// Size of both the read and write buffers. Must comfortably exceed the
/// largest fixed-width item (9 bytes) and the short-string reserve.
pub(crate) const DEFAULT_BUFFER_LEN: usize = 16 * 1024;

/// How many spare buffers a thread keeps per role.
const MAX_POOLED: usize = 4;

thread_local! {
    static READ_POOL: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
    static WRITE_POOL: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn acquire_read_buffer() -> Vec<u8> {
    READ_POOL
        .with(|pool| pool.borrow_mut().pop())
        .unwrap_or_else(|| vec![0; DEFAULT_BUFFER_LEN])
}

pub(crate) fn release_read_buffer(buf: Vec<u8>) {
    if buf.len() != DEFAULT_BUFFER_LEN {
        return; // not one of ours (shrunk or custom-sized); let it drop
    }
    READ_POOL.with(|pool| {
        let mut pool = pool.borrow_mut();
        if pool.len() < MAX_POOLED {
            pool.push(buf);
        }
    });
}

pub(crate) fn acquire_write_buffer() -> Vec<u8> {
    WRITE_POOL
        .with(|pool| pool.borrow_mut().pop())
        .unwrap_or_else(|| vec![0; DEFAULT_BUFFER_LEN])
}

pub(crate) fn release_write_buffer(buf: Vec<u8>) {
    if buf.len() != DEFAULT_BUFFER_LEN {
        return;
    }
    WRITE_POOL.with(|pool| {
        let mut pool = pool.borrow_mut();
        if pool.len() < MAX_POOLED {
            pool.push(buf);
        }
    });
}
