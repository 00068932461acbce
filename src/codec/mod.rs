//! Codec module - conversions between raw bytes and the hex text stream.
//!
//! BLE stacks disagree on how they hand notification data to the
//! application: some deliver byte arrays, some deliver hex strings, and the
//! hex strings come in either case depending on the platform. The decoder
//! works on upper-case hex text, so everything is funnelled through
//! [`HexCodec`] first.
//!
//! # Example
//!
//! ```
//! use blelink::codec::HexCodec;
//!
//! assert_eq!(HexCodec::encode(&[0xFE, 0xFD]), "FEFD");
//! assert_eq!(HexCodec::decode("fefd").unwrap(), vec![0xFE, 0xFD]);
//! ```

mod hex;

pub use self::hex::HexCodec;
