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
//! Module for [`TarArchive`].
//!
//! Every operation walks the headers from the first block of the archive.
//! No index is kept between two calls.

use crate::scanner::{Entry, Scanner};
use crate::{
    ArchiveError, ArchiveSource, EntryKind, ReadError, TarFormatString, NAME_LEN, PATH_LEN,
};
#[cfg(feature = "alloc")]
use alloc::{string::String, vec::Vec};

/// Maximum number of symlinks followed in a row before giving up.
pub const MAX_SYMLINK_HOPS: usize = 32;

/// Outcome of a successful [`TarArchive::read_file`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FileRead {
    written: usize,
    remaining: u64,
}

impl FileRead {
    /// Number of bytes written to the destination buffer.
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Number of bytes of the file behind the copied range. Zero if the read
    /// reached the end of the file.
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }
}

/// Result of following a chain of symlinks.
enum Lookup {
    Found(Entry),
    Missing,
    Loop,
}

/// Wrapper type around the byte source, which represents an archive.
///
/// All methods take `&mut self`: the archive is owned by exactly one caller
/// for the duration of each operation. For concurrent queries over the same
/// bytes create one `TarArchive` per thread, e.g. over a shared `&[u8]`.
#[derive(Debug)]
pub struct TarArchive<S> {
    source: S,
}

impl<S: ArchiveSource> TarArchive<S> {
    /// Interprets the provided source as Tar archive. Nothing is read yet.
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Iterates over all entries of the Tar archive without validating them.
    pub fn entries(&mut self) -> Scanner<'_, S> {
        Scanner::new(&mut self.source)
    }

    /// Checks magic, version and checksum of every header and returns the
    /// number of headers. Zero blocks are not counted.
    ///
    /// # Errors
    /// The first corrupt header aborts the walk.
    pub fn validate(&mut self) -> Result<usize, ArchiveError<S::Error>> {
        let mut count = 0;
        for entry in Scanner::new(&mut self.source).verifying() {
            entry?;
            count += 1;
        }
        log::debug!("archive is valid, {count} headers");
        Ok(count)
    }

    /// The first entry whose full path equals `path` byte by byte.
    fn find(&mut self, path: &[u8]) -> Result<Option<Entry>, ArchiveError<S::Error>> {
        for entry in self.entries() {
            let entry = entry?;
            if entry.path().matches(path) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// The entry at `path`. Symlinks are not followed.
    ///
    /// # Errors
    /// If the archive can't be read.
    pub fn metadata(&mut self, path: &str) -> Result<Option<Entry>, ArchiveError<S::Error>> {
        self.find(path.as_bytes())
    }

    /// Whether any entry has the exact path `path`.
    ///
    /// # Errors
    /// If the archive can't be read.
    pub fn exists(&mut self, path: &str) -> Result<bool, ArchiveError<S::Error>> {
        Ok(self.find(path.as_bytes())?.is_some())
    }

    /// Kind of the entry at `path`. `None` if there is no such entry or its
    /// type is not supported. Symlinks are not followed.
    ///
    /// # Errors
    /// If the archive can't be read.
    pub fn entry_kind(&mut self, path: &str) -> Result<Option<EntryKind>, ArchiveError<S::Error>> {
        Ok(self.find(path.as_bytes())?.and_then(|entry| entry.kind()))
    }

    /// See [`Self::entry_kind`].
    ///
    /// # Errors
    /// If the archive can't be read.
    pub fn is_dir(&mut self, path: &str) -> Result<bool, ArchiveError<S::Error>> {
        Ok(self.entry_kind(path)? == Some(EntryKind::Directory))
    }

    /// See [`Self::entry_kind`].
    ///
    /// # Errors
    /// If the archive can't be read.
    pub fn is_file(&mut self, path: &str) -> Result<bool, ArchiveError<S::Error>> {
        Ok(self.entry_kind(path)? == Some(EntryKind::File))
    }

    /// See [`Self::entry_kind`].
    ///
    /// # Errors
    /// If the archive can't be read.
    pub fn is_symlink(&mut self, path: &str) -> Result<bool, ArchiveError<S::Error>> {
        Ok(self.entry_kind(path)? == Some(EntryKind::Symlink))
    }

    /// Target of the first symlink named `path`. One hop only; the target is
    /// returned as stored and may not exist.
    ///
    /// # Errors
    /// If the archive can't be read.
    pub fn resolve_symlink(
        &mut self,
        path: &str,
    ) -> Result<Option<TarFormatString<PATH_LEN>>, ArchiveError<S::Error>> {
        self.symlink_target(path.as_bytes())
    }

    fn symlink_target(
        &mut self,
        path: &[u8],
    ) -> Result<Option<TarFormatString<PATH_LEN>>, ArchiveError<S::Error>> {
        for entry in self.entries() {
            let entry = entry?;
            if !entry.path().matches(path) {
                continue;
            }
            if let Some(target) = entry.link_target() {
                let mut resolved = TarFormatString::new([0; PATH_LEN]);
                resolved.append(&target);
                return Ok(Some(resolved));
            }
        }
        Ok(None)
    }

    /// Looks up `path` and follows symlinks until an entry that is no symlink
    /// is found.
    fn follow(&mut self, path: &[u8]) -> Result<Lookup, ArchiveError<S::Error>> {
        let Some(mut entry) = self.find(path)? else {
            return Ok(Lookup::Missing);
        };
        let mut hops = 0;
        while let Some(target) = entry.link_target() {
            if hops == MAX_SYMLINK_HOPS {
                log::warn!(
                    "Giving up on {:?} after {MAX_SYMLINK_HOPS} symlinks",
                    core::str::from_utf8(path)
                );
                return Ok(Lookup::Loop);
            }
            hops += 1;
            entry = match self.find_target(&target)? {
                Some(next) => next,
                None => return Ok(Lookup::Missing),
            };
        }
        Ok(Lookup::Found(entry))
    }

    /// The entry a symlink points to. A target naming a directory usually
    /// lacks the trailing `/` of the directory entry.
    fn find_target(
        &mut self,
        target: &TarFormatString<NAME_LEN>,
    ) -> Result<Option<Entry>, ArchiveError<S::Error>> {
        if let Some(entry) = self.find(target.as_bytes())? {
            return Ok(Some(entry));
        }
        if target.is_empty() || target.as_bytes().ends_with(b"/") {
            return Ok(None);
        }
        let mut dir = TarFormatString::new([0; PATH_LEN]);
        dir.append(target);
        dir.append_bytes(b"/");
        Ok(self
            .find(dir.as_bytes())?
            .filter(|entry| entry.kind() == Some(EntryKind::Directory)))
    }

    /// Follows symlinks from `path` hop by hop, at most [`MAX_SYMLINK_HOPS`]
    /// times, and returns the path of the first entry that is no symlink.
    ///
    /// # Errors
    /// [`ReadError::NotFound`] if a path along the chain does not exist,
    /// [`ReadError::SymlinkLoop`] if the chain is too long.
    pub fn resolve(
        &mut self,
        path: &str,
    ) -> Result<TarFormatString<PATH_LEN>, ReadError<S::Error>> {
        match self.follow(path.as_bytes())? {
            Lookup::Found(entry) => Ok(entry.path()),
            Lookup::Missing => Err(ReadError::NotFound),
            Lookup::Loop => Err(ReadError::SymlinkLoop),
        }
    }

    /// The path prefix shared by the children of `dir`. Symlinks naming the
    /// directory are followed; `None` on a symlink loop.
    fn directory_prefix(
        &mut self,
        dir: &str,
    ) -> Result<Option<TarFormatString<PATH_LEN>>, ArchiveError<S::Error>> {
        let mut prefix = TarFormatString::new([0; PATH_LEN]);
        let dir = dir.strip_suffix('/').unwrap_or(dir);
        if dir.is_empty() {
            return Ok(Some(prefix));
        }
        // a child needs at least two more bytes
        if dir.len() + 2 > PATH_LEN {
            return Ok(None);
        }
        prefix.append_bytes(dir.as_bytes());

        for _ in 0..=MAX_SYMLINK_HOPS {
            match self.symlink_target(prefix.as_bytes())? {
                Some(target) => {
                    let target = target.as_bytes();
                    prefix = TarFormatString::new([0; PATH_LEN]);
                    prefix.append_bytes(target.strip_suffix(b"/").unwrap_or(target));
                }
                None => {
                    prefix.append_bytes(b"/");
                    return Ok(Some(prefix));
                }
            }
        }
        log::warn!("Giving up on listing {dir:?} after {MAX_SYMLINK_HOPS} symlinks");
        Ok(None)
    }

    /// Iterates over the immediate children of the directory `dir`: entries
    /// whose path starts with `dir/` and continues with a single path
    /// component, optionally followed by `/`. The directory entry itself
    /// and deeper descendants are not included. An empty `dir` lists the top
    /// level of the archive.
    ///
    /// If `dir` names a symlink, it is followed first.
    ///
    /// # Errors
    /// If the archive can't be read while resolving `dir`.
    pub fn children(&mut self, dir: &str) -> Result<Children<'_, S>, ArchiveError<S::Error>> {
        let prefix = self.directory_prefix(dir)?;
        Ok(Children {
            scanner: self.entries(),
            prefix,
        })
    }

    /// Collects the paths of at most `capacity` children of `dir`, see
    /// [`Self::children`]. The second value is the number of all children,
    /// which may be larger than `capacity`.
    ///
    /// # Errors
    /// If the archive can't be read.
    #[cfg(feature = "alloc")]
    pub fn list_children(
        &mut self,
        dir: &str,
        capacity: usize,
    ) -> Result<(Vec<String>, usize), ArchiveError<S::Error>> {
        let mut names = Vec::new();
        let mut total = 0;
        for child in self.children(dir)? {
            let child = child?;
            if names.len() < capacity {
                names.push(String::from_utf8_lossy(child.path().as_bytes()).into_owned());
            }
            total += 1;
        }
        Ok((names, total))
    }

    /// Copies the content of the regular file at `path`, starting at
    /// `offset`, into `dest`. Symlinks are followed. Call again with
    /// `offset + written` to continue while `remaining` is not zero.
    ///
    /// # Errors
    /// See [`ReadError`]. An empty file has no valid offset.
    pub fn read_file(
        &mut self,
        path: &str,
        offset: u64,
        dest: &mut [u8],
    ) -> Result<FileRead, ReadError<S::Error>> {
        let entry = match self.follow(path.as_bytes())? {
            Lookup::Found(entry) => entry,
            Lookup::Missing => return Err(ReadError::NotFound),
            Lookup::Loop => return Err(ReadError::SymlinkLoop),
        };
        if entry.kind() != Some(EntryKind::File) {
            return Err(ReadError::NotAFile);
        }

        let size = entry.size();
        if offset >= size {
            return Err(ReadError::OffsetOutOfRange { offset, size });
        }

        // bounded by dest.len(), so it fits
        let wanted = (size - offset).min(dest.len() as u64) as usize;
        let written = self
            .source
            .read_at(entry.data_offset() + offset, &mut dest[..wanted])
            .map_err(ArchiveError::Io)?;
        if written < wanted {
            log::warn!(
                "Data of {:?} ends after {} of {size} bytes",
                entry.path().as_str(),
                offset + written as u64
            );
        }

        Ok(FileRead {
            written,
            remaining: size - offset - written as u64,
        })
    }
}

/// Iterator over the immediate children of a directory, see
/// [`TarArchive::children`].
#[derive(Debug)]
pub struct Children<'a, S> {
    scanner: Scanner<'a, S>,
    prefix: Option<TarFormatString<PATH_LEN>>,
}

impl<S: ArchiveSource> Iterator for Children<'_, S> {
    type Item = Result<Entry, ArchiveError<S::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let prefix = self.prefix.as_ref()?;
        for entry in self.scanner.by_ref() {
            match entry {
                Ok(entry) if !is_immediate_child(entry.path().as_bytes(), prefix.as_bytes()) => {}
                other => return Some(other),
            }
        }
        None
    }
}

/// Whether `path` is `dir` followed by exactly one component and an
/// optional trailing `/`.
fn is_immediate_child(path: &[u8], dir: &[u8]) -> bool {
    let Some(rest) = path.strip_prefix(dir) else {
        return false;
    };
    match memchr::memchr(b'/', rest) {
        _ if rest.is_empty() => false,
        None => true,
        Some(index) => index == rest.len() - 1,
    }
}
