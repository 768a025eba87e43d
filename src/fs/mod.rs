//! Filesystem utilities for pinboard.
//!
//! The directory-backed document store relies on these to replace document
//! files without ever exposing a half-written one to a concurrent reader.

pub mod atomic;

pub use atomic::atomic_write_file;
