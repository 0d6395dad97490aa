use std::fmt;

use super::window::CodecError;

const SEPARATOR: u8 = 0;

/// Flipping the sign bit makes the unsigned big-endian order match the
/// signed order of bases.
const SIGN: u64 = 1 << 63;
const FILE_SUFFIX: &str = ".bin";

/// Row key of one encoded window: chromosome and window base position.
///
/// The byte form is the chromosome, a zero byte, then the base as a
/// big-endian integer with its sign bit flipped, so keys sort by chromosome
/// and then by position, negative bases included.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowKey {
    /// Chromosome name; must not contain a zero byte.
    pub chromosome: String,
    /// First position of the window.
    pub base: i64,
}

impl WindowKey {
    /// Key for `chromosome` at `base`.
    pub fn new(chromosome: impl Into<String>, base: i64) -> Self {
        Self {
            chromosome: chromosome.into(),
            base,
        }
    }

    /// Sortable byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.chromosome.len() + 9);
        bytes.extend_from_slice(self.chromosome.as_bytes());
        bytes.push(SEPARATOR);
        bytes.extend_from_slice(&((self.base as u64) ^ SIGN).to_be_bytes());
        bytes
    }

    /// Parse the byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let malformed = || CodecError::MalformedKey(String::from_utf8_lossy(bytes).into_owned());
        let split = bytes
            .iter()
            .position(|&b| b == SEPARATOR)
            .ok_or_else(malformed)?;
        let chromosome = std::str::from_utf8(&bytes[..split]).map_err(|_| malformed())?;
        let base: [u8; 8] = bytes[split + 1..].try_into().map_err(|_| malformed())?;
        Ok(Self::new(chromosome, (u64::from_be_bytes(base) ^ SIGN) as i64))
    }

    /// File name used when windows are written to a directory.
    pub fn file_name(&self) -> String {
        format!("{}_{}{}", self.chromosome, self.base, FILE_SUFFIX)
    }

    /// Inverse of [`WindowKey::file_name`].
    pub fn from_file_name(name: &str) -> Result<Self, CodecError> {
        let malformed = || CodecError::MalformedKey(name.to_string());
        let stem = name.strip_suffix(FILE_SUFFIX).ok_or_else(malformed)?;
        let (chromosome, base) = stem.rsplit_once('_').ok_or_else(malformed)?;
        let base = base.parse().map_err(|_| malformed())?;
        Ok(Self::new(chromosome, base))
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chromosome, self.base)
    }
}
