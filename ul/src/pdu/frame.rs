//! Reassembly of PDU frames out of an arbitrarily chunked byte stream.
use super::reader::{InvalidMaxPduSnafu, PduTooLargeSnafu, Result};
use super::{read_pdu, Pdu, MAXIMUM_PDU_SIZE, MINIMUM_PDU_SIZE, PDU_HEADER_SIZE};
use bytes::{Buf, BytesMut};
use snafu::ensure;
use tracing::{trace, warn};

/// A complete PDU frame: the PDU type and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduFrame {
    pub pdu_type: u8,
    pub payload: Vec<u8>,
}

impl PduFrame {
    /// Decode the payload into a PDU.
    pub fn decode(&self) -> Result<Pdu> {
        read_pdu(self.pdu_type, &self.payload)
    }
}

/// Where the decoder stands in the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// waiting for the 6 header bytes
    Header,
    /// waiting for `length` bytes of payload
    Payload { pdu_type: u8, length: u32 },
}

/// Stateful accumulator turning inbound byte chunks into PDU frames.
///
/// Bytes can be fed in chunks of any size;
/// a frame is only ever emitted once its whole payload has arrived.
#[derive(Debug)]
pub struct PduFrameDecoder {
    buffer: BytesMut,
    stage: Stage,
    max_pdu_length: u32,
    strict: bool,
}

impl Default for PduFrameDecoder {
    fn default() -> Self {
        PduFrameDecoder {
            buffer: BytesMut::new(),
            stage: Stage::Header,
            max_pdu_length: MAXIMUM_PDU_SIZE,
            strict: false,
        }
    }
}

impl PduFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder checking incoming PDU lengths against `max_pdu_length`.
    ///
    /// In strict mode, a larger PDU is an error.
    /// Otherwise it is accepted with a warning,
    /// up to the largest size the standard admits.
    pub fn with_max_pdu_length(max_pdu_length: u32, strict: bool) -> Result<Self> {
        ensure!(
            (MINIMUM_PDU_SIZE..=MAXIMUM_PDU_SIZE).contains(&max_pdu_length),
            InvalidMaxPduSnafu { max_pdu_length }
        );
        Ok(PduFrameDecoder {
            max_pdu_length,
            strict,
            ..Self::default()
        })
    }

    /// Append inbound bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet emitted.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Take the next complete frame, if one is available.
    ///
    /// Returns `Ok(None)` when more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<PduFrame>> {
        loop {
            match self.stage {
                Stage::Header => {
                    if self.buffer.len() < PDU_HEADER_SIZE as usize {
                        return Ok(None);
                    }
                    let pdu_type = self.buffer.get_u8();
                    let _reserved = self.buffer.get_u8();
                    let length = self.buffer.get_u32();
                    self.check_length(length)?;
                    trace!("PDU header: type {:#04x}, length {}", pdu_type, length);
                    self.stage = Stage::Payload { pdu_type, length };
                }
                Stage::Payload { pdu_type, length } => {
                    if self.buffer.len() < length as usize {
                        return Ok(None);
                    }
                    let payload = self.buffer.split_to(length as usize).to_vec();
                    self.stage = Stage::Header;
                    return Ok(Some(PduFrame { pdu_type, payload }));
                }
            }
        }
    }

    fn check_length(&self, pdu_length: u32) -> Result<()> {
        if self.strict {
            ensure!(
                pdu_length <= self.max_pdu_length,
                PduTooLargeSnafu {
                    pdu_length,
                    max_pdu_length: self.max_pdu_length
                }
            );
        } else if pdu_length > self.max_pdu_length {
            ensure!(
                pdu_length <= MAXIMUM_PDU_SIZE,
                PduTooLargeSnafu {
                    pdu_length,
                    max_pdu_length: MAXIMUM_PDU_SIZE
                }
            );
            warn!(
                "Incoming pdu was too large: length {}, maximum is {}",
                pdu_length, self.max_pdu_length
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::reader::Error;
    use matches::assert_matches;

    #[rustfmt::skip]
    const TWO_FRAMES: &[u8] = &[
        // A-RELEASE-RQ
        0x05, 0x00, 0x00, 0x00, 0x00, 0x04,
        0x00, 0x00, 0x00, 0x00,
        // A-ABORT
        0x07, 0x00, 0x00, 0x00, 0x00, 0x04,
        0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn frames_from_one_chunk() {
        let mut decoder = PduFrameDecoder::new();
        decoder.feed(TWO_FRAMES);
        let first = decoder.next_frame().unwrap().unwrap();
        assert_eq!(first.pdu_type, 0x05);
        assert_eq!(first.payload, vec![0; 4]);
        assert_eq!(first.decode().unwrap(), Pdu::ReleaseRQ);
        let second = decoder.next_frame().unwrap().unwrap();
        assert_eq!(second.pdu_type, 0x07);
        assert_eq!(decoder.next_frame().unwrap(), None);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn frames_byte_by_byte() {
        let mut whole = PduFrameDecoder::new();
        whole.feed(&TWO_FRAMES[..10]);
        let expected = whole.next_frame().unwrap().unwrap();

        let mut decoder = PduFrameDecoder::new();
        let mut frames = vec![];
        for byte in TWO_FRAMES {
            decoder.feed(std::slice::from_ref(byte));
            while let Some(frame) = decoder.next_frame().unwrap() {
                frames.push(frame);
            }
        }
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], expected);
    }

    #[test]
    fn incomplete_frame_is_held_back() {
        let mut decoder = PduFrameDecoder::new();
        decoder.feed(&TWO_FRAMES[..9]);
        assert_eq!(decoder.next_frame().unwrap(), None);
        decoder.feed(&TWO_FRAMES[9..10]);
        assert!(decoder.next_frame().unwrap().is_some());
    }

    #[test]
    fn oversized_pdu() {
        let header = [0x04, 0x00, 0x00, 0x00, 0x20, 0x00];

        let mut strict = PduFrameDecoder::with_max_pdu_length(4096, true).unwrap();
        strict.feed(&header);
        assert_matches!(
            strict.next_frame(),
            Err(Error::PduTooLarge {
                pdu_length: 8192,
                max_pdu_length: 4096,
                ..
            })
        );

        let mut lenient = PduFrameDecoder::with_max_pdu_length(4096, false).unwrap();
        lenient.feed(&header);
        assert_eq!(lenient.next_frame().unwrap(), None);

        assert_matches!(
            PduFrameDecoder::with_max_pdu_length(100, false),
            Err(Error::InvalidMaxPdu { .. })
        );
    }
}
