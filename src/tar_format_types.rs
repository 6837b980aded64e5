use core::fmt::{Debug, Formatter};
use core::ptr::copy_nonoverlapping;
use core::str::{from_utf8, Utf8Error};
use num_traits::Num;

/// Base type for strings embedded in a Tar header. The length depends on the
/// context. The content is likely to be UTF-8/ASCII, which is verified
/// by getters, such as [`TarFormatString::as_str`].
///
/// An optionally null terminated string. The contents are either:
/// 1. A fully populated string with no null termination or
/// 2. A partially populated string where the unused bytes are zero.
///
/// Because of 1., every comparison must be bounded by the field width `N`.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct TarFormatString<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> TarFormatString<N> {
    /// Constructor.
    ///
    /// # Panics
    /// Panics of `N` is zero, i.e., the underlying array has no length.
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        assert!(N > 0, "array should have at least one element");
        Self { bytes }
    }

    /// True if the is string empty (ignoring NULL bytes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    /// Returns the length of the payload in bytes. This is either the full
    /// capacity `N` or the data until the first NULL byte.
    #[must_use]
    pub fn size(&self) -> usize {
        memchr::memchr(0, &self.bytes).unwrap_or(N)
    }

    /// The payload bytes, without the NULL terminator and the unused tail.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[0..self.size()]
    }

    /// The complete field including unused bytes.
    #[must_use]
    pub const fn raw(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Returns a str ref without terminating or intermediate NULL bytes. The
    /// string is truncated at the first NULL byte, in case not the full length
    /// was used.
    ///
    /// # Errors
    /// Returns a [`Utf8Error`] error for invalid strings.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        from_utf8(self.as_bytes())
    }

    /// Exact comparison of the payload against `other`. A field that fills
    /// its whole width only matches an `other` of exactly `N` bytes.
    #[must_use]
    pub fn matches(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }

    /// Append to end of string.
    ///
    /// # Panics
    /// Panics if there is not enough capacity.
    pub fn append<const S: usize>(&mut self, other: &TarFormatString<S>) {
        self.append_bytes(other.as_bytes());
    }

    /// Append raw bytes to the end of the string. The bytes must not contain
    /// NULL bytes.
    ///
    /// # Panics
    /// Panics if there is not enough capacity.
    pub fn append_bytes(&mut self, other: &[u8]) {
        let old_length = self.size();
        let resulting_length = old_length + other.len();

        assert!(resulting_length <= N, "Result to long for capacity {N}");

        unsafe {
            let dst = self.bytes.as_mut_ptr().add(old_length);
            copy_nonoverlapping(other.as_ptr(), dst, other.len());
        }

        if resulting_length < N {
            self.bytes[resulting_length] = 0;
        }
    }
}

impl<const N: usize> Debug for TarFormatString<N> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        write!(
            f,
            "str='{:?}',byte_usage={}/{}",
            from_utf8(self.as_bytes()),
            self.size(),
            N
        )
    }
}

/// A number with a specified base, stored as ASCII digits. Leading spaces
/// are skipped and the digits end at the first space or NULL byte.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct TarFormatNumber<const N: usize, const R: u32>(TarFormatString<N>);

/// An octal number. See [`TarFormatNumber`].
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct TarFormatOctal<const N: usize>(TarFormatNumber<N, 8>);

impl<const N: usize, const R: u32> TarFormatNumber<N, R> {
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        Self(TarFormatString::new(bytes))
    }

    /// The digit run of the field.
    fn digits(&self) -> &[u8] {
        let bytes = self.0.as_bytes();
        let begin = bytes
            .iter()
            .position(|&byte| byte != b' ')
            .unwrap_or(bytes.len());
        let bytes = &bytes[begin..];
        let end = memchr::memchr(b' ', bytes).unwrap_or(bytes.len());
        &bytes[..end]
    }

    /// Interprets the underlying value as a number of the specified type using
    /// its respective radix. An empty field is zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying value cannot be parsed as a number
    /// of the specified type and respective radix.
    pub fn as_number<T>(&self) -> core::result::Result<T, T::FromStrRadixErr>
    where
        T: Num,
    {
        match from_utf8(self.digits()) {
            Ok("") => Ok(T::zero()),
            Ok(digits) => T::from_str_radix(digits, R),
            // not ASCII, so not a number either
            Err(_) => T::from_str_radix("?", R),
        }
    }
}

impl<const N: usize, const R: u32> Debug for TarFormatNumber<N, R> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self.as_number::<u64>() {
            Err(msg) => write!(f, "{} [{:?}]", msg, from_utf8(self.0.as_bytes())),
            Ok(val) => write!(f, "{} [{:?}]", val, from_utf8(self.0.as_bytes())),
        }
    }
}

impl<const N: usize> TarFormatOctal<N> {
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        Self(TarFormatNumber::<N, 8>::new(bytes))
    }

    /// See [`TarFormatNumber::as_number`].
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not an octal number fitting `T`.
    pub fn as_number<T>(&self) -> core::result::Result<T, T::FromStrRadixErr>
    where
        T: Num,
    {
        self.0.as_number::<T>()
    }
}

impl<const N: usize> Debug for TarFormatOctal<N> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        self.0.fmt(f)
    }
}


#[cfg(test)]
mod tar_format_number_tests {
    use crate::{TarFormatNumber, TarFormatOctal};

    #[test]
    fn test_as_number_with_space_in_string() {
        let str = [b'0', b'1', b'0', b' ', 0];
        let str = TarFormatNumber::<5, 10>::new(str);
        assert_eq!(str.as_number::<u64>(), Ok(10));
    }

    #[test]
    fn test_octal_with_leading_spaces() {
        let num = TarFormatOctal::new(*b" 11106\0 ");
        assert_eq!(num.as_number::<u32>(), Ok(0o11106));
    }

    #[test]
    fn test_octal_size_field() {
        let num = TarFormatOctal::new(*b"00000001001\0");
        assert_eq!(num.as_number::<u64>(), Ok(513));
    }

    #[test]
    fn test_empty_field_is_zero() {
        let num = TarFormatOctal::new([0; 12]);
        assert_eq!(num.as_number::<u64>(), Ok(0));
        let num = TarFormatNumber::<4, 10>::new([b' '; 4]);
        assert_eq!(num.as_number::<u64>(), Ok(0));
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(TarFormatOctal::new(*b"0000009\0").as_number::<u64>().is_err());
        assert!(TarFormatOctal::new([0xff; 8]).as_number::<u64>().is_err());
    }
}
