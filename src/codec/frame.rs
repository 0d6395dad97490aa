use std::io::Write;

use bincode::Options;

use super::key::WindowKey;
use super::window::{options, CodecError, EncodedWindow};

impl EncodedWindow {
    /// Append this blob as one length-prefixed frame.
    ///
    /// A window file holds every frame appended under its key, so encoding
    /// neighbouring regions into one directory keeps all of them.
    pub fn append_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        options()
            .serialize_into(writer, self.bytes.as_slice())
            .map_err(|source| CodecError::Frame {
                key: self.key.clone(),
                source,
            })
    }

    /// Split the contents of a window file back into its frames, oldest
    /// first.
    pub fn read_frames(key: &WindowKey, mut contents: &[u8]) -> Result<Vec<Self>, CodecError> {
        let mut frames = Vec::new();
        while !contents.is_empty() {
            let bytes: Vec<u8> = options()
                .deserialize_from(&mut contents)
                .map_err(|source| CodecError::Frame {
                    key: key.clone(),
                    source,
                })?;
            frames.push(Self {
                key: key.clone(),
                bytes,
            });
        }
        Ok(frames)
    }
}
