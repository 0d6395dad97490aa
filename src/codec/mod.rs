//! Windowed binary encoding of region stores.
//!
//! A store is cut into fixed-size windows aligned on multiples of the window
//! size. Each window becomes one blob keyed by chromosome and window base;
//! an interval spanning several windows is written to each of them and
//! loaded once on decode. Window files hold one length-prefixed frame per
//! encoded region, so regions sharing a window accumulate.

mod frame;
mod key;
mod window;

pub use key::WindowKey;
pub use window::{
    decode_window, decode_window_into, encode_window, CodecError, EncodedWindow, WindowCodec,
};
