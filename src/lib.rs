/*
MIT License

Copyright (c) 2023 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Library to inspect USTAR archives in place, without unpacking them.
//!
//! A [`TarArchive`] wraps any [`ArchiveSource`]: a byte slice, or, with the
//! `std` feature, a seekable stream such as a [`std::fs::File`] via
//! [`IoSource`]. It answers structural questions about the entries of the
//! archive and serves bounded reads of file contents:
//!
//! - [`TarArchive::validate`] checks magic, version and checksum of every header,
//! - [`TarArchive::exists`], [`TarArchive::entry_kind`] and friends look up a path,
//! - [`TarArchive::children`] lists the immediate children of a directory,
//! - [`TarArchive::read_file`] copies a range of a file into a caller buffer.
//!
//! Every operation walks the headers from the beginning of the archive; no
//! index is built and nothing is cached between calls. Symlinks are followed
//! by listing and reading, at most [`MAX_SYMLINK_HOPS`] times in a row.
//!
//! Only the POSIX "ustar" format is supported. GNU and PAX extensions,
//! compression and writing archives are out of scope.
//!
//! ```
//! use ustar_inspect::TarArchive;
//!
//! # fn entry(name: &str, size: usize, typeflag: u8) -> [u8; 512] {
//! #     let mut h = [0; 512];
//! #     h[..name.len()].copy_from_slice(name.as_bytes());
//! #     h[124..136].copy_from_slice(format!("{size:011o}\0").as_bytes());
//! #     h[156] = typeflag;
//! #     h[257..265].copy_from_slice(b"ustar\x0000");
//! #     h[148..156].fill(b' ');
//! #     let sum: u32 = h.iter().map(|&b| u32::from(b)).sum();
//! #     h[148..156].copy_from_slice(format!("{sum:06o}\0 ").as_bytes());
//! #     h
//! # }
//! # let mut bytes = entry("hello.txt", 5, b'0').to_vec();
//! # bytes.extend_from_slice(b"world");
//! # bytes.resize(512 * 4, 0);
//! let mut archive = TarArchive::new(bytes.as_slice());
//! assert_eq!(archive.validate(), Ok(1));
//! assert_eq!(archive.is_file("hello.txt"), Ok(true));
//!
//! let mut buf = [0; 5];
//! let read = archive.read_file("hello.txt", 0, &mut buf).unwrap();
//! assert_eq!((read.written(), read.remaining()), (5, 0));
//! assert_eq!(&buf, b"world");
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_doc_code_examples)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations)]

#[cfg(feature = "alloc")]
extern crate alloc;

/// Each Archive Entry (either Header or Data Block) is a block of 512 bytes.
pub const BLOCKSIZE: usize = 512;

/// Width of the name and linkname fields of a header.
pub const NAME_LEN: usize = 100;

/// Width of the prefix field of a header.
pub const PREFIX_LEN: usize = 155;

/// Maximum length of a full path: prefix, `/` and name.
pub const PATH_LEN: usize = PREFIX_LEN + 1 + NAME_LEN;

mod archive;
mod error;
mod header;
mod scanner;
mod source;
mod tar_format_types;
#[cfg(test)]
mod test_utils;

pub use archive::*;
pub use error::*;
pub use header::*;
pub use scanner::*;
pub use source::*;
pub use tar_format_types::*;
