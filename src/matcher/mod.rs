//! Lookup path over a [`SuffixDatabase`](crate::SuffixDatabase).
//!
//! Layered leaf-first:
//! - [`huffman`]: decodes a stored label bit by bit and compares it against
//!   input without materializing the label
//! - [`tree`]: picks the child of a tree node matching one input label,
//!   applying wildcard and exception rules
//! - [`domain`]: walks a hostname's labels right to left and derives where
//!   the registrable domain starts
//!
//! Nothing here allocates, logs, or mutates the database.

pub(crate) mod huffman;
mod domain;
mod tree;
