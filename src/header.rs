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
//! USTAR header definition taken from <https://www.gnu.org/software/tar/manual/html_node/Standard.html>.
//! A Tar-archive is a collection of 512-byte sized blocks. Unfortunately there are several
//! TAR-like archive specifications. An Overview can be found here:
//! <https://www.gnu.org/software/tar/manual/html_node/Formats.html#Formats>
//!
//! This library only accepts the POSIX "ustar" flavour: magic `"ustar\0"` and version `"00"`.

#![allow(non_upper_case_globals)]

use crate::{
    HeaderError, TarFormatOctal, TarFormatString, BLOCKSIZE, NAME_LEN, PATH_LEN, PREFIX_LEN,
};
use core::fmt::{Debug, Display, Formatter};
use core::num::ParseIntError;

/// Value of [`PosixHeader::magic`] in a USTAR header, including the NULL byte.
pub const USTAR_MAGIC: [u8; 6] = *b"ustar\0";

/// Value of [`PosixHeader::version`] in a USTAR header. Not NULL terminated.
pub const USTAR_VERSION: [u8; 2] = *b"00";

/// Byte range of [`PosixHeader::cksum`] inside the header block.
const CKSUM_RANGE: core::ops::Range<usize> = 148..156;

/// Errors that may happen when parsing the [`ModeFlags`].
#[derive(Debug)]
pub enum ModeError {
    ParseInt(ParseIntError),
    IllegalMode,
}

/// Wrapper around the UNIX file permissions given in octal ASCII.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Mode(TarFormatOctal<8>);

impl Mode {
    /// Parses the [`ModeFlags`] from the mode string.
    pub fn to_flags(self) -> Result<ModeFlags, ModeError> {
        let bits = self.0.as_number::<u64>().map_err(ModeError::ParseInt)?;
        ModeFlags::from_bits(bits).ok_or(ModeError::IllegalMode)
    }
}

impl Debug for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.to_flags(), f)
    }
}

/// Header of the TAR format as specified by POSIX (POSIX 1003.1-1988, "ustar").
///
/// Each entry is started by such a header, that describes the size and
/// the file name. After that, the file content stands in chunks of 512 bytes.
/// The number of bytes can be derived from the file size.
///
/// The struct has an alignment of one, so it can be viewed directly on top of
/// any block of [`BLOCKSIZE`] bytes, see [`PosixHeader::from_block`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C, packed)]
pub struct PosixHeader {
    /// Name. Not NULL terminated if all 100 bytes are used.
    pub name: TarFormatString<NAME_LEN>,
    pub mode: Mode,
    pub uid: TarFormatOctal<8>,
    pub gid: TarFormatOctal<8>,
    // confusing; size is stored as ASCII string
    pub size: TarFormatOctal<12>,
    pub mtime: TarFormatOctal<12>,
    /// Six octal digits, a NULL byte and a space.
    pub cksum: TarFormatOctal<8>,
    pub typeflag: TypeFlagRaw,
    /// Target of a symlink. Not NULL terminated if all 100 bytes are used.
    pub linkname: TarFormatString<NAME_LEN>,
    pub magic: TarFormatString<6>,
    pub version: TarFormatString<2>,
    /// Username. There is always a null byte, therefore
    /// the max len is N-1.
    pub uname: TarFormatString<32>,
    /// Groupname. There is always a null byte, therefore
    /// the max len is N-1.
    pub gname: TarFormatString<32>,
    pub dev_major: TarFormatOctal<8>,
    pub dev_minor: TarFormatOctal<8>,
    /// Directory part of long paths. See [`PosixHeader::path`].
    pub prefix: TarFormatString<PREFIX_LEN>,
    // padding => to BLOCKSIZE bytes
    pub _pad: [u8; 12],
}

impl PosixHeader {
    /// Views a raw block as header.
    #[must_use]
    pub fn from_block(block: &[u8; BLOCKSIZE]) -> &Self {
        // alignment is 1 and the size is BLOCKSIZE, see test_size
        unsafe { &*block.as_ptr().cast::<Self>() }
    }

    /// Raw bytes of the header.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; BLOCKSIZE] {
        unsafe { &*(self as *const Self).cast::<[u8; BLOCKSIZE]>() }
    }

    /// A Tar archive is terminated, if an end-of-archive entry, which consists
    /// of two 512 blocks of zero bytes, is found.
    #[must_use]
    pub fn is_zero_block(&self) -> bool {
        self.as_bytes().iter().all(|&byte| byte == 0)
    }

    /// The full path of the entry. USTAR splits long paths into `prefix` and
    /// `name`, joined by a `/`.
    #[must_use]
    pub fn path(&self) -> TarFormatString<PATH_LEN> {
        let mut path = TarFormatString::new([0; PATH_LEN]);
        // copy out of the packed struct before borrowing
        let prefix = self.prefix;
        let name = self.name;
        if !prefix.is_empty() {
            path.append(&prefix);
            path.append_bytes(b"/");
        }
        path.append(&name);
        path
    }

    /// Decoded size of the payload in bytes.
    ///
    /// # Errors
    /// Returns [`HeaderError::MalformedField`] if the field is not an octal number.
    pub fn payload_size(&self) -> Result<u64, HeaderError> {
        let size = self.size;
        size.as_number::<u64>().map_err(|_| HeaderError::MalformedField("size"))
    }

    /// Returns the number of blocks that are required to read the whole file
    /// content.
    ///
    /// # Errors
    /// Returns an error, if the file size can't be parsed from the header.
    pub fn payload_block_count(&self) -> Result<u64, HeaderError> {
        Ok(self.payload_size()?.div_ceil(BLOCKSIZE as u64))
    }

    /// Number of bytes between the end of this header and the next header.
    /// Symlinks never carry data.
    ///
    /// # Errors
    /// Returns an error, if the file size can't be parsed from the header.
    pub fn data_region_len(&self) -> Result<u64, HeaderError> {
        if self.typeflag.is(TypeFlag::SYMTYPE) {
            return Ok(0);
        }
        Ok(self.payload_block_count()? * BLOCKSIZE as u64)
    }

    /// Checksum of the header: the sum of all bytes as unsigned values, with
    /// the checksum field itself counted as eight ASCII spaces.
    #[must_use]
    pub fn compute_checksum(&self) -> u32 {
        let bytes = self.as_bytes();
        let sum = |range: &[u8]| range.iter().map(|&byte| u32::from(byte)).sum::<u32>();
        sum(&bytes[..CKSUM_RANGE.start])
            + CKSUM_RANGE.len() as u32 * u32::from(b' ')
            + sum(&bytes[CKSUM_RANGE.end..])
    }

    /// Checks magic, version and checksum, in that order.
    ///
    /// # Errors
    /// Returns the first check that failed.
    pub fn validate(&self) -> Result<(), HeaderError> {
        let (magic, version, cksum) = (self.magic, self.version, self.cksum);
        if *magic.raw() != USTAR_MAGIC {
            return Err(HeaderError::InvalidMagic);
        }
        if *version.raw() != USTAR_VERSION {
            return Err(HeaderError::InvalidVersion);
        }
        let computed = self.compute_checksum();
        let stored = cksum.as_number::<u32>().ok();
        if stored != Some(computed) {
            return Err(HeaderError::InvalidChecksum { stored, computed });
        }
        Ok(())
    }

    /// The kind of the entry, if it is one of the supported kinds.
    #[must_use]
    pub fn entry_kind(&self) -> Option<EntryKind> {
        let flag = self.typeflag.try_to_type_flag().ok()?;
        EntryKind::from_type_flag(flag)
    }
}

/// The kinds of entries that can be queried.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    /// Maps a [`TypeFlag`] to its kind. Hard links, devices, FIFOs,
    /// contiguous files and extension headers have no kind.
    #[must_use]
    pub const fn from_type_flag(flag: TypeFlag) -> Option<Self> {
        match flag {
            _ if flag.is_regular_file() => Some(Self::File),
            TypeFlag::DIRTYPE => Some(Self::Directory),
            TypeFlag::SYMTYPE => Some(Self::Symlink),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq)]
pub struct InvalidTypeFlagError(u8);

impl Display for InvalidTypeFlagError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:x} is not a valid TypeFlag", self.0))
    }
}

impl core::error::Error for InvalidTypeFlagError {}

#[derive(Copy, Clone, PartialOrd, PartialEq, Eq)]
pub struct TypeFlagRaw(u8);

impl TypeFlagRaw {
    /// Tries to parse the underlying value as [`TypeFlag`]. This fails if the
    /// Tar file is corrupt and the type is invalid.
    pub fn try_to_type_flag(self) -> Result<TypeFlag, InvalidTypeFlagError> {
        TypeFlag::try_from(self)
    }

    /// Compares against a known flag without decoding.
    #[must_use]
    pub const fn is(self, flag: TypeFlag) -> bool {
        self.0 == flag as u8
    }
}

impl Debug for TypeFlagRaw {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.try_to_type_flag(), f)
    }
}

/// Describes the kind of payload, that follows after a
/// [`PosixHeader`]. The properties of this payload are
/// described inside the header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
#[allow(unused)]
pub enum TypeFlag {
    /// Represents a regular file.
    REGTYPE = b'0',
    /// Represents a regular file. In order to be compatible with older versions of tar, a typeflag
    /// value of AREGTYPE should be silently recognized as a regular file.
    AREGTYPE = b'\0',
    /// This flag represents a file linked to another file, of any type, previously archived.
    LINK = b'1',
    /// This represents a symbolic link to another file. The linked-to name is specified in the
    /// linkname field with a trailing null.
    SYMTYPE = b'2',
    /// Character special file.
    CHRTYPE = b'3',
    /// Block special file.
    BLKTYPE = b'4',
    /// This flag specifies a directory or sub-directory. The directory name in the name field
    /// should end with a slash.
    DIRTYPE = b'5',
    /// This specifies a FIFO special file.
    FIFOTYPE = b'6',
    /// This specifies a contiguous file.
    CONTTYPE = b'7',
    /// Extended header referring to the next file in the archive
    XHDTYPE = b'x',
    /// Global extended header
    XGLTYPE = b'g',
}

impl TypeFlag {
    /// Whether we have a regular file.
    pub const fn is_regular_file(self) -> bool {
        matches!(self, Self::AREGTYPE | Self::REGTYPE)
    }
}

impl TryFrom<TypeFlagRaw> for TypeFlag {
    type Error = InvalidTypeFlagError;

    fn try_from(value: TypeFlagRaw) -> Result<Self, Self::Error> {
        match value.0 {
            b'0' => Ok(Self::REGTYPE),
            b'\0' => Ok(Self::AREGTYPE),
            b'1' => Ok(Self::LINK),
            b'2' => Ok(Self::SYMTYPE),
            b'3' => Ok(Self::CHRTYPE),
            b'4' => Ok(Self::BLKTYPE),
            b'5' => Ok(Self::DIRTYPE),
            b'6' => Ok(Self::FIFOTYPE),
            b'7' => Ok(Self::CONTTYPE),
            b'x' => Ok(Self::XHDTYPE),
            b'g' => Ok(Self::XGLTYPE),
            e => Err(InvalidTypeFlagError(e)),
        }
    }
}

bitflags::bitflags! {
    /// UNIX file permissions in octal format.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u64 {
        /// Set UID on execution.
        const SetUID = 0o4000;
        /// Set GID on execution.
        const SetGID = 0o2000;
        /// Reserved.
        const TSVTX = 0o1000;
        /// Owner read.
        const OwnerRead = 0o400;
        /// Owner write.
        const OwnerWrite = 0o200;
        /// Owner execute.
        const OwnerExec = 0o100;
        /// Group read.
        const GroupRead = 0o040;
        /// Group write.
        const GroupWrite = 0o020;
        /// Group execute.
        const GroupExec = 0o010;
        /// Others read.
        const OthersRead = 0o004;
        /// Others read.
        const OthersWrite = 0o002;
        /// Others execute.
        const OthersExec = 0o001;
    }
}

#[cfg(test)]
mod tests {
    use crate::header::{EntryKind, ModeFlags, PosixHeader, TypeFlag};
    use crate::test_utils::HeaderBuilder;
    use crate::{HeaderError, BLOCKSIZE};
    use std::mem::size_of;

    const FIXTURE: &[u8] = include_bytes!("../tests/ustar_tree.tar");

    /// Returns the PosixHeader at the given block of the Tar archive.
    fn header_at(tar_archive_data: &[u8], block_index: usize) -> &PosixHeader {
        let block = &tar_archive_data[block_index * BLOCKSIZE..(block_index + 1) * BLOCKSIZE];
        PosixHeader::from_block(block.try_into().unwrap())
    }

    #[test]
    fn test_size() {
        assert_eq!(BLOCKSIZE, size_of::<PosixHeader>());
    }

    #[test]
    fn test_parse_first_header() {
        let hdr = header_at(FIXTURE, 0);
        println!("{:#?}", hdr);
        assert_eq!(hdr.path().as_str(), Ok("hello.txt"));
        assert_eq!(hdr.typeflag.try_to_type_flag(), Ok(TypeFlag::REGTYPE));
        assert_eq!(hdr.entry_kind(), Some(EntryKind::File));
        assert_eq!(hdr.payload_size(), Ok(5));
        assert_eq!(hdr.payload_block_count(), Ok(1));
        assert_eq!(hdr.data_region_len(), Ok(512));
        assert_eq!(hdr.validate(), Ok(()));
        assert_eq!(
            hdr.mode.to_flags().unwrap(),
            ModeFlags::OwnerRead
                | ModeFlags::OwnerWrite
                | ModeFlags::GroupRead
                | ModeFlags::OthersRead
        );
    }

    #[test]
    fn test_payload_block_count() {
        // second file is "bye_world_513b.txt" => we expect two data blocks
        let hdr = header_at(FIXTURE, 2);
        assert_eq!(hdr.path().as_str(), Ok("bye_world_513b.txt"));
        assert_eq!(hdr.payload_block_count(), Ok(2));
        assert_eq!(hdr.data_region_len(), Ok(1024));
    }

    #[test]
    fn test_directory_and_symlink_kinds() {
        let dir = header_at(FIXTURE, 5);
        assert_eq!(dir.path().as_str(), Ok("dir/"));
        assert_eq!(dir.entry_kind(), Some(EntryKind::Directory));
        assert_eq!(dir.data_region_len(), Ok(0));

        let link = header_at(FIXTURE, 14);
        assert_eq!(link.path().as_str(), Ok("link_to_hello"));
        assert_eq!(link.entry_kind(), Some(EntryKind::Symlink));
        let linkname = link.linkname;
        assert_eq!(linkname.as_str(), Ok("hello.txt"));
    }

    #[test]
    fn test_symlink_never_carries_data() {
        let block = HeaderBuilder::symlink("a", "b").size(700).build();
        let hdr = PosixHeader::from_block(&block);
        assert_eq!(hdr.payload_size(), Ok(700));
        assert_eq!(hdr.data_region_len(), Ok(0));
    }

    #[test]
    fn test_checksum_counts_field_as_spaces() {
        let hdr = header_at(FIXTURE, 0);
        // GNU tar stored "011106\0 "
        assert_eq!(hdr.compute_checksum(), 0o11106);
    }

    #[test]
    fn test_validate_order() {
        let mut block = HeaderBuilder::file("f", 0).build();
        block[257] = b'x';
        block[263] = b'1';
        assert_eq!(PosixHeader::from_block(&block).validate(), Err(HeaderError::InvalidMagic));

        let mut block = HeaderBuilder::file("f", 0).build();
        block[263] = b'1';
        assert_eq!(PosixHeader::from_block(&block).validate(), Err(HeaderError::InvalidVersion));

        let mut block = HeaderBuilder::file("f", 0).build();
        block[0] = b'g';
        assert!(matches!(
            PosixHeader::from_block(&block).validate(),
            Err(HeaderError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn test_gnu_magic_is_rejected() {
        let mut block = HeaderBuilder::file("f", 0).build();
        block[257..265].copy_from_slice(b"ustar  \0");
        assert_eq!(PosixHeader::from_block(&block).validate(), Err(HeaderError::InvalidMagic));
    }

    #[test]
    fn test_path_with_prefix() {
        let block = HeaderBuilder::file("file.txt", 0).prefix("some/deep").build();
        let hdr = PosixHeader::from_block(&block);
        assert_eq!(hdr.path().as_str(), Ok("some/deep/file.txt"));
        assert_eq!(hdr.validate(), Ok(()));
    }

    #[test]
    fn test_name_filling_whole_field() {
        let name = "n".repeat(100);
        let block = HeaderBuilder::file(&name, 0).build();
        let hdr = PosixHeader::from_block(&block);
        assert_eq!(hdr.path().as_str(), Ok(name.as_str()));
    }

    #[test]
    fn test_zero_block() {
        let block = [0; BLOCKSIZE];
        assert!(PosixHeader::from_block(&block).is_zero_block());
        assert!(!header_at(FIXTURE, 0).is_zero_block());
    }
}
