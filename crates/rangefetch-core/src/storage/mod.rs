//! Output file I/O.
//!
//! Opens and pre-sizes the output file (fallocate on Linux when available,
//! else set_len) and supports concurrent positional writes (pwrite) from
//! many workers at disjoint offsets.

mod writer;

pub use writer::FileWriter;
