//! Whole DIMSE messages and their transport in P-DATA-TF PDUs.
use super::{
    Command, DecodeDataSetSnafu, EncodeDataSetSnafu, NotPDataSnafu,
    PresentationContextMismatchSnafu, Result, ShortPDataSnafu, UnexpectedFragmentSnafu,
};
use crate::pdu::{pdu_type, PDataValue, PDataValueType, Pdu, PDU_HEADER_SIZE, PDV_HEADER_SIZE};
use dicomkit_object::{DataSet, ReadOptions, TransferSyntax};
use snafu::{ensure, ResultExt};
use tracing::trace;

/// A DIMSE message: a command set and the data set following it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub presentation_context_id: u8,
    pub command: Command,
    /// the encoded data set, in the transfer syntax of the presentation context
    pub data: Option<Vec<u8>>,
}

impl Message {
    pub fn new(presentation_context_id: u8, command: Command, data: Option<Vec<u8>>) -> Self {
        Message {
            presentation_context_id,
            command,
            data,
        }
    }

    /// Split the message into P-DATA-TF PDUs
    /// whose PDV lists fit in `max_pdu_length` bytes.
    ///
    /// Each PDU carries a single PDV.
    /// The command and the data set are fragmented separately,
    /// each with the last fragment flag on its final PDV.
    pub fn to_pdus(&self, max_pdu_length: u32) -> Result<Vec<Pdu>> {
        let chunk_size = (max_pdu_length.saturating_sub(PDV_HEADER_SIZE) as usize).max(1);
        let mut pdus = Vec::new();
        let command = self.command.encode()?;
        fragment(
            &mut pdus,
            self.presentation_context_id,
            PDataValueType::Command,
            &command,
            chunk_size,
        );
        if let Some(data) = &self.data {
            fragment(
                &mut pdus,
                self.presentation_context_id,
                PDataValueType::Data,
                data,
                chunk_size,
            );
        }
        Ok(pdus)
    }
}

fn fragment(
    pdus: &mut Vec<Pdu>,
    presentation_context_id: u8,
    value_type: PDataValueType,
    bytes: &[u8],
    chunk_size: usize,
) {
    if bytes.is_empty() {
        pdus.push(Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id,
                value_type,
                is_last: true,
                data: Vec::new(),
            }],
        });
        return;
    }
    let count = (bytes.len() + chunk_size - 1) / chunk_size;
    for (i, chunk) in bytes.chunks(chunk_size).enumerate() {
        pdus.push(Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id,
                value_type,
                is_last: i + 1 == count,
                data: chunk.to_vec(),
            }],
        });
    }
}

/// Reassembles DIMSE messages out of PDV fragments.
///
/// A message is complete once the last fragment of its command arrives,
/// or, if the command announces a data set,
/// once the last fragment of the data set arrives.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    presentation_context_id: Option<u8>,
    command_bytes: Vec<u8>,
    command: Option<Command>,
    data: Vec<u8>,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether fragments of an unfinished message are buffered.
    pub fn is_idle(&self) -> bool {
        self.presentation_context_id.is_none()
    }

    /// Take in one fragment,
    /// returning the message it completes, if any.
    pub fn push(&mut self, pdv: PDataValue) -> Result<Option<Message>> {
        match self.presentation_context_id {
            Some(expected) => ensure!(
                expected == pdv.presentation_context_id,
                PresentationContextMismatchSnafu {
                    expected,
                    got: pdv.presentation_context_id
                }
            ),
            None => self.presentation_context_id = Some(pdv.presentation_context_id),
        }

        match pdv.value_type {
            PDataValueType::Command => {
                ensure!(
                    self.command.is_none(),
                    UnexpectedFragmentSnafu { kind: "command" }
                );
                self.command_bytes.extend_from_slice(&pdv.data);
                if !pdv.is_last {
                    return Ok(None);
                }
                let command = Command::decode(&self.command_bytes)?;
                trace!("Received {}", command.field());
                if command.has_data_set() {
                    self.command = Some(command);
                    self.command_bytes.clear();
                    Ok(None)
                } else {
                    Ok(Some(self.finish(command, None)))
                }
            }
            PDataValueType::Data => {
                ensure!(
                    self.command.is_some(),
                    UnexpectedFragmentSnafu { kind: "data set" }
                );
                self.data.extend_from_slice(&pdv.data);
                if !pdv.is_last {
                    return Ok(None);
                }
                match self.command.take() {
                    Some(command) => {
                        let data = std::mem::take(&mut self.data);
                        Ok(Some(self.finish(command, Some(data))))
                    }
                    None => UnexpectedFragmentSnafu { kind: "data set" }.fail(),
                }
            }
        }
    }

    fn finish(&mut self, command: Command, data: Option<Vec<u8>>) -> Message {
        let presentation_context_id = self.presentation_context_id.take().unwrap_or_default();
        self.command_bytes.clear();
        self.data.clear();
        self.command = None;
        Message {
            presentation_context_id,
            command,
            data,
        }
    }
}

/// Encode the data set elements of `data_set`, without file header,
/// in the transfer syntax agreed for a presentation context.
///
/// File meta elements are left out.
pub fn encode_data_set(data_set: &DataSet, transfer_syntax: &str) -> Result<Vec<u8>> {
    let ts = TransferSyntax::from_uid(transfer_syntax);
    let mut body = DataSet::without_header(ts.clone());
    for element in data_set.dataset_elements() {
        let mut element = element.clone();
        element.set_byte_order(ts.endianness());
        body.put(element);
    }
    body.to_bytes().context(EncodeDataSetSnafu { transfer_syntax })
}

/// Decode a data set received over an association.
pub fn decode_data_set(bytes: &[u8], transfer_syntax: &str) -> Result<DataSet> {
    ReadOptions::new()
        .read_header(false)
        .transfer_syntax(TransferSyntax::from_uid(transfer_syntax))
        .load(bytes)
        .context(DecodeDataSetSnafu { transfer_syntax })
}

/// Decode the command set of a whole P-DATA-TF PDU, header included,
/// whose first PDV holds a complete command.
///
/// The PDU header (6 bytes) and the PDV header (6 bytes) are skipped.
pub fn dispatch_command(pdu: &[u8]) -> Result<Command> {
    let header_size = (PDU_HEADER_SIZE + PDV_HEADER_SIZE) as usize;
    ensure!(
        pdu.len() >= header_size,
        ShortPDataSnafu { length: pdu.len() }
    );
    ensure!(
        pdu[0] == pdu_type::P_DATA_TF,
        NotPDataSnafu { pdu_type: pdu[0] }
    );
    let pdv_length = u32::from_be_bytes([pdu[6], pdu[7], pdu[8], pdu[9]]) as usize;
    // the PDV length counts the context ID and control header
    let end = (PDU_HEADER_SIZE as usize + 4 + pdv_length).min(pdu.len());
    Command::decode(&pdu[header_size..end.max(header_size)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimse::{CommandField, Error, Status};
    use crate::pdu::write_pdu;
    use matches::assert_matches;

    fn pdvs(pdus: Vec<Pdu>) -> Vec<PDataValue> {
        pdus.into_iter()
            .flat_map(|pdu| match pdu {
                Pdu::PData { data } => data,
                other => panic!("unexpected PDU {:?}", other),
            })
            .collect()
    }

    #[test]
    fn message_without_data_set() {
        let message = Message::new(1, Command::echo_rq(3).unwrap(), None);
        let pdus = message.to_pdus(16_384).unwrap();
        assert_eq!(pdus.len(), 1);

        let mut assembler = MessageAssembler::new();
        let mut fragments = pdvs(pdus).into_iter();
        let received = assembler.push(fragments.next().unwrap()).unwrap().unwrap();
        assert_eq!(received.presentation_context_id, 1);
        assert_eq!(received.command.field(), CommandField::CEchoRq);
        assert_eq!(received.data, None);
        assert!(assembler.is_idle());
    }

    #[test]
    fn fragmented_data_set() {
        let data: Vec<u8> = (0..10_000_u32).map(|i| i as u8).collect();
        let command = Command::store_rq(5, "1.2.840.10008.5.1.4.1.1.4", "1.2.3.4", Default::default())
            .unwrap();
        let message = Message::new(3, command, Some(data.clone()));
        let pdus = message.to_pdus(4096).unwrap();
        // one command PDU and three data PDUs
        assert_eq!(pdus.len(), 4);

        let mut assembler = MessageAssembler::new();
        let mut out = None;
        for pdv in pdvs(pdus) {
            assert!(pdv.data.len() <= 4096 - 6);
            assert!(out.is_none());
            out = assembler.push(pdv).unwrap();
        }
        let received = out.unwrap();
        assert_eq!(received.command.field(), CommandField::CStoreRq);
        assert_eq!(received.command.affected_sop_instance_uid().as_deref(), Some("1.2.3.4"));
        assert_eq!(received.data, Some(data));
    }

    #[test]
    fn data_before_command() {
        let mut assembler = MessageAssembler::new();
        let pdv = PDataValue {
            presentation_context_id: 1,
            value_type: PDataValueType::Data,
            is_last: true,
            data: vec![0; 4],
        };
        assert_matches!(
            assembler.push(pdv),
            Err(Error::UnexpectedFragment { kind: "data set", .. })
        );
    }

    #[test]
    fn data_set_in_negotiated_syntax() {
        use dicomkit_dictionary_std::{tags, uids};

        let mut file = DataSet::new();
        file.set_tag(tags::TRANSFER_SYNTAX_UID, uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .unwrap();
        file.set_tag(tags::PATIENT_ID, "ID0001").unwrap();
        file.set_tag(tags::MODALITY, "MR").unwrap();

        let bytes = encode_data_set(&file, uids::IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let received = decode_data_set(&bytes, uids::IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert!(received.get(tags::TRANSFER_SYNTAX_UID).is_none());
        assert_eq!(received.string("PatientID").as_deref(), Some("ID0001"));
        assert_eq!(received.string("Modality").as_deref(), Some("MR"));
    }

    #[test]
    fn dispatch_whole_pdu() {
        let message = Message::new(1, Command::echo_rsp(3, Status::SUCCESS).unwrap(), None);
        let pdu = message.to_pdus(16_384).unwrap().remove(0);
        let mut bytes = Vec::new();
        write_pdu(&mut bytes, &pdu).unwrap();

        let command = dispatch_command(&bytes).unwrap();
        assert_eq!(command.field(), CommandField::CEchoRsp);
        assert_eq!(command.status(), Some(Status::SUCCESS));
        assert_eq!(command.message_id_being_responded_to(), Some(3));

        assert_matches!(
            dispatch_command(&bytes[..8]),
            Err(Error::ShortPData { length: 8, .. })
        );
        bytes[0] = 0x05;
        assert_matches!(
            dispatch_command(&bytes),
            Err(Error::NotPData { pdu_type: 0x05, .. })
        );
    }
}
