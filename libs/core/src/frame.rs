use thiserror::Error;

/// The byte that terminates every frame on the wire.
///
/// Byte-stuffing guarantees it never appears anywhere else in a frame.
pub const DELIMITER: u8 = 0x00;

/// Length of the little-endian CRC32 trailer appended to every payload.
pub const CHECKSUM_LEN: usize = 4;

/// Shortest stuffed frame (excluding the delimiter) that can possibly hold a checksum.
const MIN_STUFFED_LEN: usize = CHECKSUM_LEN + 1;

/// Errors related to decoding frames read from the display.
///
/// All of these are recoverable: the offending frame is discarded and the
/// next one is read as usual.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FrameError {
    /// The frame was too short to contain a checksum.
    #[error("Frame of {} bytes is too short to hold a checksum", length)]
    EmptyFrame {
        /// The length of the frame, excluding the delimiter.
        length: usize,
    },

    /// The frame was not validly byte-stuffed.
    #[error("Failed to unstuff frame [{}]", hex_for_error(data))]
    Unstuffing {
        /// The invalid frame data.
        data: Vec<u8>,
    },

    /// The computed checksum didn't match the one carried by the frame.
    #[error("Frame checksum didn't match: Expected 0x{:08X}, got 0x{:08X}", expected, actual)]
    ChecksumMismatch {
        /// The checksum carried by the frame.
        expected: u32,

        /// The checksum computed over the received payload.
        actual: u32,
    },

    /// The payload was intact but did not parse as a known message.
    #[error("Frame payload is not a valid message")]
    Parse {
        /// The underlying decode error.
        #[from]
        source: prost::DecodeError,
    },
}

/// Wraps a serialized message for transmission.
///
/// Appends the CRC32 (IEEE) of `payload` in little-endian order, byte-stuffs the
/// result with [COBS] so that [`DELIMITER`] does not occur, and terminates it
/// with a single [`DELIMITER`].
///
/// ```text
/// ┌──────────────────────────────────────────────┬──────┐
/// │ COBS( payload ++ crc32_le(payload) )         │ 0x00 │
/// └──────────────────────────────────────────────┴──────┘
/// ```
///
/// # Examples
///
/// ```
/// use flapper_core::frame;
///
/// let encoded = frame::encode(&[0x00]);
/// assert_eq!(vec![0x01, 0x05, 0x8D, 0xEF, 0x02, 0xD2, 0x00], encoded);
/// assert_eq!(vec![0x00], frame::decode(&encoded).unwrap());
/// ```
///
/// [COBS]: https://en.wikipedia.org/wiki/Consistent_Overhead_Byte_Stuffing
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    body.extend_from_slice(payload);
    body.extend_from_slice(&checksum(payload).to_le_bytes());

    let mut frame = cobs::encode_vec(&body);
    frame.push(DELIMITER);
    frame
}

/// Unwraps a frame read from the wire, returning the verified payload.
///
/// The trailing [`DELIMITER`] is optional. The payload is not interpreted; see
/// [`Message::from_device_frame`] for that.
///
/// # Errors
///
/// Returns:
/// * [`FrameError::EmptyFrame`] if the frame cannot hold a checksum.
/// * [`FrameError::Unstuffing`] if the byte-stuffing is malformed.
/// * [`FrameError::ChecksumMismatch`] if the payload does not match its checksum.
///
/// [`Message::from_device_frame`]: crate::Message::from_device_frame
pub fn decode(frame: &[u8]) -> Result<Vec<u8>, FrameError> {
    let stuffed = frame.strip_suffix(&[DELIMITER]).unwrap_or(frame);
    if stuffed.len() < MIN_STUFFED_LEN {
        return Err(FrameError::EmptyFrame { length: stuffed.len() });
    }

    // A delimiter inside the frame means two frames ran together or one was truncated.
    if stuffed.contains(&DELIMITER) {
        return Err(FrameError::Unstuffing { data: stuffed.into() });
    }

    let mut body = cobs::decode_vec(stuffed).map_err(|_| FrameError::Unstuffing { data: stuffed.into() })?;
    if body.len() < CHECKSUM_LEN {
        return Err(FrameError::EmptyFrame { length: body.len() });
    }

    let trailer = body.split_off(body.len() - CHECKSUM_LEN);
    let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let actual = checksum(&body);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    Ok(body)
}

/// Computes the CRC32 (IEEE polynomial) of the given bytes.
fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Formats raw frame bytes for display as part of an error message.
fn hex_for_error(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_empty_payload() {
        // CRC32 of nothing is zero, so every byte of the body needs stuffing.
        assert_eq!(vec![0x01, 0x01, 0x01, 0x01, 0x01, 0x00], encode(&[]));
    }

    #[test]
    fn encode_known_payload() {
        let encoded = encode(&[0x01, 0x02, 0x03]);
        assert_eq!(vec![0x08, 0x01, 0x02, 0x03, 0x1D, 0x80, 0xBC, 0x55, 0x00], encoded);
    }

    #[test]
    fn decode_empty_payload() {
        assert!(decode(&encode(&[])).unwrap().is_empty());
    }

    #[test]
    fn delimiter_optional() {
        let mut encoded = encode(b"abc");
        let _ = encoded.pop();
        assert_eq!(b"abc".to_vec(), decode(&encoded).unwrap());
    }

    #[test]
    fn short_frame_rejected() {
        let error = decode(&[0x01, 0x01, 0x00]).unwrap_err();
        assert!(matches!(error, FrameError::EmptyFrame { length: 2 }));
    }

    #[test]
    fn lone_delimiter_rejected() {
        let error = decode(&[0x00]).unwrap_err();
        assert!(matches!(error, FrameError::EmptyFrame { length: 0 }));
    }

    #[test]
    fn embedded_delimiter_rejected() {
        let error = decode(&[0x03, 0x11, 0x00, 0x22, 0x33, 0x44, 0x00]).unwrap_err();
        assert!(matches!(error, FrameError::Unstuffing { .. }));
    }

    #[test]
    fn bad_checksum_detected() {
        let mut body = b"hello".to_vec();
        body.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let mut frame = cobs::encode_vec(&body);
        frame.push(DELIMITER);

        let error = decode(&frame).unwrap_err();
        assert!(matches!(
            error,
            FrameError::ChecksumMismatch {
                expected: 0xDEAD_BEEF,
                ..
            }
        ));
    }

    proptest! {
        #[test]
        fn roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode(&payload);
            prop_assert_eq!(Some(&DELIMITER), encoded.last());
            prop_assert!(!encoded[..encoded.len() - 1].contains(&DELIMITER));
            prop_assert_eq!(payload, decode(&encoded).unwrap());
        }

        #[test]
        fn single_bit_flip_detected(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut body = payload.clone();
            let index = position.index(body.len());
            body[index] ^= 1 << bit;
            body.extend_from_slice(&checksum(&payload).to_le_bytes());
            let mut frame = cobs::encode_vec(&body);
            frame.push(DELIMITER);

            let result = decode(&frame);
            prop_assert!(matches!(result, Err(FrameError::ChecksumMismatch { .. })), "{:?}", result);
        }
    }
}
