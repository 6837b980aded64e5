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
//! Module for [`Scanner`], the forward-only walk over the headers of an archive.

use crate::header::PosixHeader;
use crate::{
    ArchiveError, ArchiveSource, EntryKind, HeaderError, ModeError, ModeFlags, TarFormatString,
    BLOCKSIZE, NAME_LEN, PATH_LEN,
};

/// One header of an archive, together with its position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Entry {
    header: PosixHeader,
    header_offset: u64,
    size: u64,
}

impl Entry {
    /// The decoded header.
    pub const fn header(&self) -> &PosixHeader {
        &self.header
    }

    /// Full path, see [`PosixHeader::path`].
    pub fn path(&self) -> TarFormatString<PATH_LEN> {
        self.header.path()
    }

    /// Kind of the entry, `None` for unsupported type flags.
    pub fn kind(&self) -> Option<EntryKind> {
        self.header.entry_kind()
    }

    /// Declared payload size in bytes.
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Byte offset of the header block in the archive.
    pub const fn header_offset(&self) -> u64 {
        self.header_offset
    }

    /// Byte offset of the first payload byte in the archive.
    pub const fn data_offset(&self) -> u64 {
        self.header_offset + BLOCKSIZE as u64
    }

    /// The target of a symlink, `None` for other entries.
    pub fn link_target(&self) -> Option<TarFormatString<NAME_LEN>> {
        let linkname = self.header.linkname;
        (self.kind() == Some(EntryKind::Symlink)).then_some(linkname)
    }

    /// Permission bits.
    ///
    /// # Errors
    /// If the mode field is malformed.
    pub fn mode(&self) -> Result<ModeFlags, ModeError> {
        let mode = self.header.mode;
        mode.to_flags()
    }

    /// Modification time in seconds since the epoch, if it can be decoded.
    pub fn mtime(&self) -> Option<u64> {
        let mtime = self.header.mtime;
        mtime.as_number::<u64>().ok()
    }

    /// Owner user and group id, if they can be decoded.
    pub fn owner(&self) -> Option<(u32, u32)> {
        let (uid, gid) = (self.header.uid, self.header.gid);
        Some((uid.as_number::<u32>().ok()?, gid.as_number::<u32>().ok()?))
    }
}

/// Iterator over the headers of an archive. Each iteration step starts
/// at the next Tar header block and skips the data region of the previous
/// entry, which is `ceil(size / 512) * 512` bytes long (zero for symlinks).
///
/// The walk ends at two consecutive zero blocks, at a header that is cut
/// short by the end of the data, or after the first error.
#[derive(Debug)]
pub struct Scanner<'a, S> {
    source: &'a mut S,
    offset: u64,
    verify: bool,
    done: bool,
}

impl<'a, S: ArchiveSource> Scanner<'a, S> {
    /// Starts at the first block of `source`.
    pub fn new(source: &'a mut S) -> Self {
        Self {
            source,
            offset: 0,
            verify: false,
            done: false,
        }
    }

    /// Additionally checks magic, version and checksum of every header.
    #[must_use]
    pub fn verifying(mut self) -> Self {
        self.verify = true;
        self
    }

    /// Byte offset of the next block that will be read.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the block at `offset`, `None` if less than a full block is left.
    fn read_block(
        &mut self,
        offset: u64,
    ) -> Result<Option<[u8; BLOCKSIZE]>, ArchiveError<S::Error>> {
        let mut block = [0; BLOCKSIZE];
        let count = self
            .source
            .read_at(offset, &mut block)
            .map_err(ArchiveError::Io)?;
        if count < BLOCKSIZE {
            if count > 0 {
                log::warn!("Partial block of {count} bytes at byte {offset}, ignoring it");
            }
            return Ok(None);
        }
        Ok(Some(block))
    }

    fn advance(&mut self) -> Result<Option<Entry>, ArchiveError<S::Error>> {
        loop {
            let Some(block) = self.read_block(self.offset)? else {
                log::warn!("Reached end of Tar archive data without finding zero/end blocks!");
                return Ok(None);
            };
            let hdr = PosixHeader::from_block(&block);

            // check if we found end of archive
            if hdr.is_zero_block() {
                match self.read_block(self.offset + BLOCKSIZE as u64)? {
                    Some(next) if !PosixHeader::from_block(&next).is_zero_block() => {
                        log::warn!("Skipping lone zero block at byte {}", self.offset);
                        self.offset += BLOCKSIZE as u64;
                        continue;
                    }
                    // gracefully terminated Archive
                    Some(_) => log::debug!("End of Tar archive with two zero blocks!"),
                    None => log::warn!(
                        "Zero block found at end of Tar archive, but only one instead of two!"
                    ),
                }
                return Ok(None);
            }

            let header_offset = self.offset;
            let corrupt = move |error: HeaderError| ArchiveError::<S::Error>::Header {
                offset: header_offset,
                error,
            };
            if self.verify {
                hdr.validate().map_err(corrupt)?;
            }
            let size = hdr.payload_size().map_err(corrupt)?;
            let data_len = hdr.data_region_len().map_err(corrupt)?;

            log::trace!(
                "header at byte {header_offset}: {:?}, type={:?}, size={size}",
                hdr.path().as_str(),
                hdr.typeflag,
            );

            // in next iteration: start at next Archive entry header
            self.offset = header_offset + BLOCKSIZE as u64 + data_len;

            return Ok(Some(Entry {
                header: *hdr,
                header_offset,
                size,
            }));
        }
    }
}

impl<S: ArchiveSource> Iterator for Scanner<'_, S> {
    type Item = Result<Entry, ArchiveError<S::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.advance().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}
