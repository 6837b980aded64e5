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
//! Errors of archive traversal and file reads.

use core::fmt::{Debug, Display, Formatter};

/// A header block that is not a valid USTAR header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeaderError {
    /// The magic field is not `"ustar\0"`.
    InvalidMagic,
    /// The version field is not `"00"`.
    InvalidVersion,
    /// The stored checksum is missing or differs from the computed one.
    InvalidChecksum {
        stored: Option<u32>,
        computed: u32,
    },
    /// A numeric field that is required for traversal can't be decoded.
    MalformedField(&'static str),
}

impl Display for HeaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidMagic => f.write_str("invalid magic"),
            Self::InvalidVersion => f.write_str("invalid version"),
            Self::InvalidChecksum {
                stored: Some(stored),
                computed,
            } => write!(f, "invalid checksum: stored {stored:o}, computed {computed:o}"),
            Self::InvalidChecksum {
                stored: None,
                computed,
            } => write!(f, "invalid checksum: unreadable, computed {computed:o}"),
            Self::MalformedField(field) => write!(f, "malformed header field '{field}'"),
        }
    }
}

impl core::error::Error for HeaderError {}

/// Failure while walking the headers of an archive. `E` is the error type of
/// the underlying [`crate::ArchiveSource`].
#[derive(Debug, PartialEq, Eq)]
pub enum ArchiveError<E> {
    /// The source failed. Fatal for the current operation.
    Io(E),
    /// The header block starting at byte `offset` is corrupt.
    Header { offset: u64, error: HeaderError },
}

impl<E> ArchiveError<E> {
    /// The header error, if this is one.
    pub const fn header_error(&self) -> Option<HeaderError> {
        match self {
            Self::Header { error, .. } => Some(*error),
            Self::Io(_) => None,
        }
    }
}

impl<E: Display> Display for ArchiveError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read archive: {e}"),
            Self::Header { offset, error } => write!(f, "header at byte {offset}: {error}"),
        }
    }
}

impl<E: Debug + Display + core::error::Error + 'static> core::error::Error for ArchiveError<E> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Header { error, .. } => Some(error),
        }
    }
}

/// Errors of [`crate::TarArchive::read_file`].
#[derive(Debug, PartialEq, Eq)]
pub enum ReadError<E> {
    /// No entry with that path.
    NotFound,
    /// The entry (after following symlinks) is not a regular file.
    NotAFile,
    /// The offset is at or behind the end of the file.
    OffsetOutOfRange { offset: u64, size: u64 },
    /// More than [`crate::MAX_SYMLINK_HOPS`] symlinks in a row.
    SymlinkLoop,
    Archive(ArchiveError<E>),
}

impl<E> From<ArchiveError<E>> for ReadError<E> {
    fn from(value: ArchiveError<E>) -> Self {
        Self::Archive(value)
    }
}

impl<E: Display> Display for ReadError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => f.write_str("no such entry"),
            Self::NotAFile => f.write_str("entry is not a regular file"),
            Self::OffsetOutOfRange { offset, size } => {
                write!(f, "offset {offset} is out of range for file of {size} bytes")
            }
            Self::SymlinkLoop => f.write_str("too many levels of symbolic links"),
            Self::Archive(e) => Display::fmt(e, f),
        }
    }
}

impl<E: Debug + Display + core::error::Error + 'static> core::error::Error for ReadError<E> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Archive(e) => Some(e),
            _ => None,
        }
    }
}
