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
//! Synthetic USTAR archives for tests.

use crate::BLOCKSIZE;
use std::format;
use std::string::String;
use std::vec::Vec;

/// Routes `log` output of the crate through the test harness.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn put(block: &mut [u8; BLOCKSIZE], at: usize, width: usize, value: &[u8]) {
    assert!(value.len() <= width, "field overflow at byte {at}");
    block[at..at + value.len()].copy_from_slice(value);
}

/// Builds a single header block with a correct checksum.
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    name: String,
    prefix: String,
    linkname: String,
    typeflag: u8,
    size: [u8; 12],
}

impl HeaderBuilder {
    fn new(name: &str, typeflag: u8) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
            linkname: String::new(),
            typeflag,
            size: [0; 12],
        }
        .size(0)
    }

    pub fn file(name: &str, size: u64) -> Self {
        Self::new(name, b'0').size(size)
    }

    pub fn dir(name: &str) -> Self {
        Self::new(name, b'5')
    }

    pub fn symlink(name: &str, target: &str) -> Self {
        let mut builder = Self::new(name, b'2');
        builder.linkname = target.into();
        builder
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size.copy_from_slice(format!("{size:011o}\0").as_bytes());
        self
    }

    /// Stores the size field verbatim.
    pub fn raw_size(mut self, size: [u8; 12]) -> Self {
        self.size = size;
        self
    }

    /// Overrides the type flag, e.g. `b'\0'` for an old-style regular file.
    pub fn typeflag(mut self, typeflag: u8) -> Self {
        self.typeflag = typeflag;
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn build(&self) -> [u8; BLOCKSIZE] {
        let mut block = [0; BLOCKSIZE];
        put(&mut block, 0, 100, self.name.as_bytes());
        put(&mut block, 100, 8, b"0000644\0");
        put(&mut block, 108, 8, b"0000000\0");
        put(&mut block, 116, 8, b"0000000\0");
        put(&mut block, 124, 12, &self.size);
        put(&mut block, 136, 12, b"14000000000\0");
        block[156] = self.typeflag;
        put(&mut block, 157, 100, self.linkname.as_bytes());
        put(&mut block, 257, 6, b"ustar\0");
        put(&mut block, 263, 2, b"00");
        put(&mut block, 345, 155, self.prefix.as_bytes());

        block[148..156].fill(b' ');
        let checksum: u32 = block.iter().map(|&byte| u32::from(byte)).sum();
        put(&mut block, 148, 8, format!("{checksum:06o}\0 ").as_bytes());
        block
    }
}

/// Concatenates headers and padded payloads.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    data: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, block: [u8; BLOCKSIZE]) -> Self {
        self.data.extend_from_slice(&block);
        self
    }

    /// Appends `block` followed by `content` padded to a full block.
    pub fn entry(self, block: [u8; BLOCKSIZE], content: &[u8]) -> Self {
        let mut builder = self.header(block);
        builder.data.extend_from_slice(content);
        let padded = builder.data.len().div_ceil(BLOCKSIZE) * BLOCKSIZE;
        builder.data.resize(padded, 0);
        builder
    }

    pub fn file(self, name: &str, content: &[u8]) -> Self {
        self.entry(HeaderBuilder::file(name, content.len() as u64).build(), content)
    }

    pub fn dir(self, name: &str) -> Self {
        self.header(HeaderBuilder::dir(name).build())
    }

    pub fn symlink(self, name: &str, target: &str) -> Self {
        self.header(HeaderBuilder::symlink(name, target).build())
    }

    pub fn zero_block(self) -> Self {
        self.header([0; BLOCKSIZE])
    }

    /// The archive without end-of-archive marker.
    pub fn unterminated(self) -> Vec<u8> {
        self.data
    }

    /// The archive with its two zero blocks.
    pub fn finish(self) -> Vec<u8> {
        self.zero_block().zero_block().data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PosixHeader;

    #[test]
    fn test_built_header_is_valid() {
        let block = HeaderBuilder::file("a/b", 513).build();
        let hdr = PosixHeader::from_block(&block);
        assert_eq!(hdr.validate(), Ok(()));
        assert_eq!(hdr.payload_size(), Ok(513));
    }

    #[test]
    fn test_typeflag_override() {
        let block = HeaderBuilder::file("a", 1).typeflag(b'\0').build();
        let hdr = PosixHeader::from_block(&block);
        assert_eq!(hdr.validate(), Ok(()));
        assert_eq!(block[156], 0);
    }

    #[test]
    fn test_payload_is_padded() {
        let data = ArchiveBuilder::new().file("a", &[1; 513]).finish();
        assert_eq!(data.len(), 5 * BLOCKSIZE);
    }
}
