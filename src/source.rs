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
//! Module for [`ArchiveSource`], the byte storage behind a [`crate::TarArchive`].
//!
//! Every read names its absolute offset. Nothing depends on a cursor that
//! survives between two reads, so one operation can never observe the scan
//! position of another.

/// Random access to the bytes of an archive image.
pub trait ArchiveSource {
    type Error;

    /// Reads up to `buf.len()` bytes starting at `offset`. Fewer bytes are
    /// only returned at the end of the data.
    ///
    /// # Errors
    /// Source specific, e.g. I/O failures of a stream.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl ArchiveSource for &[u8] {
    type Error = core::convert::Infallible;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let data: &[u8] = self;
        let begin = usize::try_from(offset).map_or(data.len(), |offset| offset.min(data.len()));
        let available = &data[begin..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        Ok(count)
    }
}

#[cfg(feature = "alloc")]
impl ArchiveSource for alloc::vec::Vec<u8> {
    type Error = core::convert::Infallible;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.as_slice().read_at(offset, buf)
    }
}

#[cfg(feature = "std")]
pub use io_source::IoSource;

#[cfg(feature = "std")]
mod io_source {
    use super::ArchiveSource;
    use std::io::{ErrorKind, Read, Seek, SeekFrom};

    /// Adapter for seekable streams, such as [`std::fs::File`].
    ///
    /// The archive starts at the position the stream had when the adapter was
    /// created. Every read seeks first, the stream position after an
    /// operation is unspecified.
    #[derive(Debug)]
    pub struct IoSource<R> {
        inner: R,
        start: u64,
    }

    impl<R: Read + Seek> IoSource<R> {
        /// Wraps `inner`; its current position becomes archive offset zero.
        ///
        /// # Errors
        /// If the stream position can't be queried.
        pub fn new(mut inner: R) -> std::io::Result<Self> {
            let start = inner.stream_position()?;
            Ok(Self { inner, start })
        }

        /// Returns the stream.
        pub fn into_inner(self) -> R {
            self.inner
        }
    }

    impl<R: Read + Seek> ArchiveSource for IoSource<R> {
        type Error = std::io::Error;

        fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error> {
            self.inner.seek(SeekFrom::Start(self.start + offset))?;
            let mut filled = 0;
            while filled < buf.len() {
                match self.inner.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            Ok(filled)
        }
    }
}
