//! Frame parsing, building, and escaping (spec §4.3).

use super::constants::{
    ADDR16_UNKNOWN, API_ID_ZB_RX, API_ID_ZB_TX_REQ, ESCAPED_BYTES, ESCAPE, ESCAPE_XOR,
    FRAME_ID_NO_RSP, OPTIONS_DEFAULT, RADIUS_MAX, START_DELIM,
};
use crate::error::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZbTxReq {
    pub frame_id: u8,
    pub addr64_dst: u64,
    pub addr16_dst: u16,
    pub radius: u8,
    pub options: u8,
    pub data: Vec<u8>,
}

impl ZbTxReq {
    /// Builds the request the spec mandates for `XBeeEndpoint::to` (§4.5):
    /// no response requested, unknown 16-bit destination, unicast radius.
    pub fn for_payload(addr64_dst: u64, data: Vec<u8>) -> Self {
        Self {
            frame_id: FRAME_ID_NO_RSP,
            addr64_dst,
            addr16_dst: ADDR16_UNKNOWN,
            radius: RADIUS_MAX,
            options: OPTIONS_DEFAULT,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZbRx {
    pub addr64_src: u64,
    pub addr16_src: u16,
    pub options: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    ZbTxReq(ZbTxReq),
    ZbRx(ZbRx),
    /// Any other api_id: header is not parsed, data is exposed raw.
    Unknown { data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub api_id: u8,
    pub payload: FramePayload,
}

/// Parses a de-escaped, reassembled frame buffer (as produced by
/// `FrameDecoder`). Validates the start delimiter, declared length, and
/// checksum (REDESIGN FLAG R3).
pub fn parse(buffer: &[u8]) -> Result<Frame, BridgeError> {
    if buffer.len() < 4 {
        return Err(BridgeError::MalformedFrame(format!(
            "frame too short: {} bytes",
            buffer.len()
        )));
    }
    if buffer[0] != START_DELIM {
        return Err(BridgeError::MalformedFrame(format!(
            "bad start delimiter: {:#04x}",
            buffer[0]
        )));
    }

    let declared_length = u16::from_be_bytes([buffer[1], buffer[2]]) as usize;
    if buffer.len() != 4 + declared_length {
        return Err(BridgeError::MalformedFrame(format!(
            "length mismatch: declared {}, got {} bytes",
            declared_length,
            buffer.len() - 4
        )));
    }

    let checksum = buffer[buffer.len() - 1];
    let sum: u32 = buffer[3..buffer.len() - 1].iter().map(|&b| b as u32).sum();
    let expected = 0xFFu32.wrapping_sub(sum % 256) & 0xFF;
    if expected != checksum as u32 {
        return Err(BridgeError::MalformedFrame(format!(
            "checksum mismatch: expected {:#04x}, got {:#04x}",
            expected, checksum
        )));
    }

    let api_id = buffer[3];
    let body = &buffer[4..buffer.len() - 1];

    let payload = match api_id {
        API_ID_ZB_TX_REQ => {
            if body.len() < 13 {
                return Err(BridgeError::MalformedFrame(
                    "ZB_TX_REQ body too short".into(),
                ));
            }
            FramePayload::ZbTxReq(ZbTxReq {
                frame_id: body[0],
                addr64_dst: u64::from_be_bytes(body[1..9].try_into().unwrap()),
                addr16_dst: u16::from_be_bytes([body[9], body[10]]),
                radius: body[11],
                options: body[12],
                data: body[13..].to_vec(),
            })
        }
        API_ID_ZB_RX => {
            if body.len() < 11 {
                return Err(BridgeError::MalformedFrame("ZB_RX body too short".into()));
            }
            FramePayload::ZbRx(ZbRx {
                addr64_src: u64::from_be_bytes(body[0..8].try_into().unwrap()),
                addr16_src: u16::from_be_bytes([body[8], body[9]]),
                options: body[10],
                data: body[11..].to_vec(),
            })
        }
        _ => FramePayload::Unknown { data: body.to_vec() },
    };

    Ok(Frame { api_id, payload })
}

/// Serializes a frame to its wire bytes (delimiter, length, api_id + fields
/// + data, checksum). Does not apply escapes.
pub fn build(frame: &Frame) -> Vec<u8> {
    let mut body = vec![frame.api_id];
    match &frame.payload {
        FramePayload::ZbTxReq(req) => {
            body.push(req.frame_id);
            body.extend_from_slice(&req.addr64_dst.to_be_bytes());
            body.extend_from_slice(&req.addr16_dst.to_be_bytes());
            body.push(req.radius);
            body.push(req.options);
            body.extend_from_slice(&req.data);
        }
        FramePayload::ZbRx(rx) => {
            body.extend_from_slice(&rx.addr64_src.to_be_bytes());
            body.extend_from_slice(&rx.addr16_src.to_be_bytes());
            body.push(rx.options);
            body.extend_from_slice(&rx.data);
        }
        FramePayload::Unknown { data } => body.extend_from_slice(data),
    }

    let length = body.len() as u16;
    let checksum = 0xFFu32.wrapping_sub(body.iter().map(|&b| b as u32).sum::<u32>() % 256) & 0xFF;

    let mut out = Vec::with_capacity(4 + body.len());
    out.push(START_DELIM);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&body);
    out.push(checksum as u8);
    out
}

/// Replaces every occurrence of a reserved byte past index 0 with the two
/// bytes `ESCAPE, byte ^ ESCAPE_XOR`. The start delimiter is never escaped.
pub fn escape(buffer: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buffer.len());
    for (i, &byte) in buffer.iter().enumerate() {
        if i > 0 && ESCAPED_BYTES.contains(&byte) {
            out.push(ESCAPE);
            out.push(byte ^ ESCAPE_XOR);
        } else {
            out.push(byte);
        }
    }
    out
}

/// Inverse of `escape`, used directly by property tests; `FrameDecoder`
/// performs the same transform incrementally while reassembling a stream.
/// Assumes `buffer`'s first byte (if any) is never itself an escape byte.
pub fn unescape(buffer: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buffer.len());
    let mut iter = buffer.iter().copied();
    while let Some(byte) = iter.next() {
        if byte == ESCAPE {
            if let Some(next) = iter.next() {
                out.push(next ^ ESCAPE_XOR);
            }
        } else {
            out.push(byte);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hex(s: &str) -> Vec<u8> {
        s.split_whitespace()
            .map(|b| u8::from_str_radix(b, 16).unwrap())
            .collect()
    }

    /// S1 continued — field-level parse of the minimal ZB_RX.
    #[test]
    fn s1_parses_zb_rx_fields() {
        let input = hex("7E 00 0F 90 00 13 A2 00 40 0A 01 27 FF FE 01 48 69 B4");
        let frame = parse(&input).unwrap();
        assert_eq!(frame.api_id, API_ID_ZB_RX);
        match frame.payload {
            FramePayload::ZbRx(rx) => {
                assert_eq!(rx.addr64_src, 0x0013A20040A00127);
                assert_eq!(rx.addr16_src, 0xFFFE);
                assert_eq!(rx.options, 0x01);
                assert_eq!(rx.data, b"Hi");
            }
            other => panic!("expected ZbRx, got {other:?}"),
        }
    }

    #[test]
    fn s2_parses_unknown_api_id_with_escaped_payload() {
        let frame = parse(&hex("7E 00 02 23 7E 7E")).unwrap();
        assert_eq!(frame.api_id, 0x23);
        assert_eq!(frame.payload, FramePayload::Unknown { data: vec![0x7E] });
    }

    #[test]
    fn s3_bad_checksum_is_malformed() {
        let mut input = hex("7E 00 0F 90 00 13 A2 00 40 0A 01 27 FF FE 01 48 69 B4");
        *input.last_mut().unwrap() ^= 0xFF;
        assert!(matches!(parse(&input), Err(BridgeError::MalformedFrame(_))));
    }

    #[test]
    fn bad_start_delimiter_is_malformed() {
        let input = hex("00 00 02 23 01 DB");
        assert!(matches!(parse(&input), Err(BridgeError::MalformedFrame(_))));
    }

    #[test]
    fn length_mismatch_is_malformed() {
        let input = hex("7E 00 05 23 01 DB"); // declares 5 bytes, has 2
        assert!(matches!(parse(&input), Err(BridgeError::MalformedFrame(_))));
    }

    /// S4 — encode ZB_TX_REQ with the exact fields XBeeEndpoint::to uses.
    #[test]
    fn s4_builds_zb_tx_req() {
        let req = ZbTxReq::for_payload(0x0013A20040A00127, b"Hi".to_vec());
        let frame = Frame { api_id: API_ID_ZB_TX_REQ, payload: FramePayload::ZbTxReq(req) };
        let built = build(&frame);

        let expected_without_checksum =
            hex("7E 00 14 10 00 00 13 A2 00 40 0A 01 27 FF FE 00 00 48 69");
        assert_eq!(&built[..built.len() - 1], &expected_without_checksum[..]);

        let sum: u32 = built[3..built.len() - 1].iter().map(|&b| b as u32).sum();
        let expected_checksum = (0xFFu32.wrapping_sub(sum % 256) & 0xFF) as u8;
        assert_eq!(*built.last().unwrap(), expected_checksum);
    }

    #[test]
    fn escape_skips_start_delimiter() {
        let raw = hex("7E 00 02 23 7E 11");
        let escaped = escape(&raw);
        assert_eq!(escaped, hex("7E 00 02 23 7D 5E 7D 31"));
    }

    /// S5 — round trip: encode, escape, then feed the result back through
    /// the decoder and re-parse.
    #[test]
    fn s5_round_trips_through_decoder() {
        use crate::xbee::decoder::FrameDecoder;

        let req = ZbTxReq::for_payload(0x0013A20040A00127, b"Hi".to_vec());
        let frame = Frame { api_id: API_ID_ZB_TX_REQ, payload: FramePayload::ZbTxReq(req.clone()) };
        let built = build(&frame);
        let escaped = escape(&built);

        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(&escaped);
        assert_eq!(frames.len(), 1);
        let reparsed = parse(&frames[0]).unwrap();
        assert_eq!(reparsed, frame);
    }

    #[test]
    fn unescape_inverts_escape() {
        let raw = hex("7E 00 02 23 7E 7D 11 13");
        assert_eq!(unescape(&escape(&raw)), raw);
    }

    proptest! {
        /// Invariant 4: for any encoded ZB_TX_REQ, the checksum satisfies
        /// (sum(body) + checksum) mod 256 == 0xFF.
        #[test]
        fn checksum_invariant_holds(addr64 in any::<u64>(), data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let req = ZbTxReq::for_payload(addr64, data);
            let frame = Frame { api_id: API_ID_ZB_TX_REQ, payload: FramePayload::ZbTxReq(req) };
            let built = build(&frame);
            let sum: u32 = built[3..built.len() - 1].iter().map(|&b| b as u32).sum();
            prop_assert_eq!((sum + *built.last().unwrap() as u32) % 256, 0xFF);
        }

        /// Invariant 2: decode(escape(encode(frame))) == frame for any
        /// well-formed ZB_TX_REQ.
        #[test]
        fn round_trip_invariant_holds(addr64 in any::<u64>(), addr16 in any::<u16>(), radius in any::<u8>(), options in any::<u8>(), data in proptest::collection::vec(any::<u8>(), 0..128)) {
            use crate::xbee::decoder::FrameDecoder;

            let req = ZbTxReq { frame_id: 0, addr64_dst: addr64, addr16_dst: addr16, radius, options, data };
            let frame = Frame { api_id: API_ID_ZB_TX_REQ, payload: FramePayload::ZbTxReq(req) };
            let escaped = escape(&build(&frame));

            let mut decoder = FrameDecoder::new();
            let frames = decoder.push(&escaped);
            prop_assert_eq!(frames.len(), 1);
            let reparsed = parse(&frames[0]).unwrap();
            prop_assert_eq!(reparsed, frame);
        }

        /// Invariant 3: unescape(escape(b)) == b for byte sequences whose
        /// first byte is the start delimiter (never itself escaped).
        #[test]
        fn unescape_is_idempotent_inverse(rest in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut b = vec![START_DELIM];
            b.extend(rest);
            prop_assert_eq!(unescape(&escape(&b)), b);
        }
    }
}
