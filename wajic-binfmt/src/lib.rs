//! Binary codec primitives for the WebAssembly module format.
//!
//! This is the leaf of the pipeline: variable-length integer read/write,
//! UTF-8 decode/encode, and a growable output buffer. Nothing here
//! understands sections or imports — that is [`wajic_module`](../wajic_module)'s job.

mod buffer;
pub mod constants;
mod leb128;
mod utf8;

pub use buffer::GrowableBuffer;
pub use leb128::{leb128_byte_length, read_leb128_u32, write_leb128};
pub use utf8::{read_utf8, write_utf8};
