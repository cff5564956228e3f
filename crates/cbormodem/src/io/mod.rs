//! Buffered byte I/O substrate shared by the decoder and encoder: owned,
//! recycled buffers with contiguity guarantees so the inner decode and
//! encode loops can index freely.

mod input;
mod output;
mod recycler;

pub(crate) use input::ByteInput;
pub(crate) use output::ByteOutput;
