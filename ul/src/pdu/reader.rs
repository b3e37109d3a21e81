//! PDU decoding.
//!
//! [`read_pdu`] interprets the payload of one frame
//! produced by the [`PduFrameDecoder`](super::PduFrameDecoder).
use crate::pdu::*;
use byteordered::byteorder::{BigEndian, ReadBytesExt};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::{Cursor, Read};
use tracing::{debug, warn};

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Invalid max PDU length {}", max_pdu_length))]
    InvalidMaxPdu {
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not read PDU field `{}`", field))]
    ReadPduField {
        field: &'static str,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid item length {} (must be >=2)", length))]
    InvalidItemLength { length: u32, backtrace: Backtrace },

    #[snafu(display(
        "Incoming pdu was too large: length {}, maximum is {}",
        pdu_length,
        max_pdu_length
    ))]
    PduTooLarge {
        pdu_length: u32,
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("PDU contained an unexpected item {:?}", var_item))]
    InvalidPduVariable {
        var_item: PduVariableItem,
        backtrace: Backtrace,
    },

    #[snafu(display("Multiple transfer syntaxes were accepted"))]
    MultipleTransferSyntaxesAccepted { backtrace: Backtrace },

    #[snafu(display("Invalid reject result {}", result))]
    InvalidRejectResult { result: u8, backtrace: Backtrace },

    #[snafu(display("Invalid reject source {} or reason {}", source_code, reason))]
    InvalidRejectSourceOrReason {
        source_code: u8,
        reason: u8,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid abort source {} or reason {}", source_code, reason))]
    InvalidAbortSourceOrReason {
        source_code: u8,
        reason: u8,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid presentation context result reason {}", reason))]
    InvalidPresentationContextResultReason { reason: u8, backtrace: Backtrace },

    #[snafu(display("Unknown presentation context sub-item type {:#04x}", item_type))]
    UnknownPresentationContextSubItem { item_type: u8, backtrace: Backtrace },

    #[snafu(display("Text field `{}` is not ASCII", field))]
    NonAsciiText {
        field: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Missing application context name"))]
    MissingApplicationContextName { backtrace: Backtrace },

    #[snafu(display("Missing abstract syntax"))]
    MissingAbstractSyntax { backtrace: Backtrace },

    #[snafu(display("Missing transfer syntax"))]
    MissingTransferSyntax { backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Decode the payload of a PDU of the given type.
///
/// PDU types outside of the standard set
/// are returned as [`Pdu::Unknown`] with the payload untouched.
pub fn read_pdu(pdu_type: u8, payload: &[u8]) -> Result<Pdu> {
    let mut cursor = Cursor::new(payload);

    match pdu_type {
        pdu_type::ASSOCIATE_RQ => {
            let (protocol_version, called_ae_title, calling_ae_title) =
                read_association_header(&mut cursor)?;

            let mut application_context_name = None;
            let mut presentation_contexts = vec![];
            let mut user_variables = vec![];
            while has_remaining(&cursor) {
                match read_pdu_variable(&mut cursor)? {
                    PduVariableItem::ApplicationContext(val) => {
                        application_context_name = Some(val);
                    }
                    PduVariableItem::PresentationContextProposed(val) => {
                        presentation_contexts.push(val);
                    }
                    PduVariableItem::UserVariables(val) => user_variables = val,
                    PduVariableItem::Unknown(item_type) => {
                        debug!("Ignoring unknown association item {:#04x}", item_type);
                    }
                    var_item => return InvalidPduVariableSnafu { var_item }.fail(),
                }
            }

            Ok(Pdu::AssociationRQ(AssociationRQ {
                protocol_version,
                calling_ae_title,
                called_ae_title,
                application_context_name: application_context_name
                    .context(MissingApplicationContextNameSnafu)?,
                presentation_contexts,
                user_variables,
            }))
        }
        pdu_type::ASSOCIATE_AC => {
            let (protocol_version, called_ae_title, calling_ae_title) =
                read_association_header(&mut cursor)?;

            let mut application_context_name = None;
            let mut presentation_contexts = vec![];
            let mut user_variables = vec![];
            while has_remaining(&cursor) {
                match read_pdu_variable(&mut cursor)? {
                    PduVariableItem::ApplicationContext(val) => {
                        application_context_name = Some(val);
                    }
                    PduVariableItem::PresentationContextResult(val) => {
                        presentation_contexts.push(val);
                    }
                    PduVariableItem::UserVariables(val) => user_variables = val,
                    PduVariableItem::Unknown(item_type) => {
                        debug!("Ignoring unknown association item {:#04x}", item_type);
                    }
                    var_item => return InvalidPduVariableSnafu { var_item }.fail(),
                }
            }

            Ok(Pdu::AssociationAC(AssociationAC {
                protocol_version,
                calling_ae_title,
                called_ae_title,
                application_context_name: application_context_name
                    .context(MissingApplicationContextNameSnafu)?,
                presentation_contexts,
                user_variables,
            }))
        }
        pdu_type::ASSOCIATE_RJ => {
            // reserved, result, source, reason
            let mut fields = [0; 4];
            cursor
                .read_exact(&mut fields)
                .context(ReadPduFieldSnafu { field: "Result" })?;
            let [_, result, source_code, reason] = fields;

            let result = match result {
                1 => AssociationRJResult::Permanent,
                2 => AssociationRJResult::Transient,
                _ => return InvalidRejectResultSnafu { result }.fail(),
            };
            let source = AssociationRJSource::from_codes(source_code, reason)
                .context(InvalidRejectSourceOrReasonSnafu {
                    source_code,
                    reason,
                })?;

            Ok(Pdu::AssociationRJ(AssociationRJ { result, source }))
        }
        pdu_type::P_DATA_TF => {
            let mut values = vec![];
            while has_remaining(&cursor) {
                let item_length = cursor.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Item-Length",
                })?;
                ensure!(
                    item_length >= 2,
                    InvalidItemLengthSnafu {
                        length: item_length
                    }
                );

                let presentation_context_id = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Presentation-context-ID",
                })?;
                let header = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Message Control Header",
                })?;
                let data = read_n(
                    &mut cursor,
                    (item_length - 2) as usize,
                    "Presentation-data-value",
                )?;

                values.push(PDataValue {
                    presentation_context_id,
                    value_type: if header & 0x01 != 0 {
                        PDataValueType::Command
                    } else {
                        PDataValueType::Data
                    },
                    is_last: header & 0x02 != 0,
                    data,
                });
            }

            Ok(Pdu::PData { data: values })
        }
        pdu_type::RELEASE_RQ => Ok(Pdu::ReleaseRQ),
        pdu_type::RELEASE_RP => Ok(Pdu::ReleaseRP),
        pdu_type::ABORT_RQ => {
            // two reserved bytes, source, reason
            let mut fields = [0; 4];
            cursor
                .read_exact(&mut fields)
                .context(ReadPduFieldSnafu { field: "Source" })?;
            let [_, _, source_code, reason] = fields;
            let source = AbortRQSource::from_codes(source_code, reason).context(
                InvalidAbortSourceOrReasonSnafu {
                    source_code,
                    reason,
                },
            )?;

            Ok(Pdu::AbortRQ { source })
        }
        _ => {
            warn!("Unknown PDU type {:#04x}", pdu_type);
            Ok(Pdu::Unknown {
                pdu_type,
                data: payload.to_vec(),
            })
        }
    }
}

fn has_remaining(cursor: &Cursor<&[u8]>) -> bool {
    cursor.position() < cursor.get_ref().len() as u64
}

/// Protocol version and AE titles (called, calling),
/// followed by 32 reserved bytes.
fn read_association_header(cursor: &mut Cursor<&[u8]>) -> Result<(u16, String, String)> {
    let protocol_version = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Protocol-version",
    })?;
    read_n(cursor, 2, "Reserved")?;
    let called_ae_title = read_text(cursor, 16, "Called-AE-title")?;
    let calling_ae_title = read_text(cursor, 16, "Calling-AE-title")?;
    read_n(cursor, 32, "Reserved")?;
    Ok((protocol_version, called_ae_title, calling_ae_title))
}

fn read_n<R>(reader: &mut R, len: usize, field: &'static str) -> Result<Vec<u8>>
where
    R: Read,
{
    let mut out = vec![0; len];
    reader
        .read_exact(&mut out)
        .context(ReadPduFieldSnafu { field })?;
    Ok(out)
}

/// Read an ASCII text field, without leading and trailing padding.
fn read_text<R>(reader: &mut R, len: usize, field: &'static str) -> Result<String>
where
    R: Read,
{
    let bytes = read_n(reader, len, field)?;
    ensure!(bytes.is_ascii(), NonAsciiTextSnafu { field });
    let text: String = bytes.into_iter().map(char::from).collect();
    Ok(text.trim_matches(|c: char| c == ' ' || c == '\0').to_string())
}

/// Item type, reserved byte and 16-bit item length.
fn read_item_header<R>(reader: &mut R) -> Result<(u8, u16)>
where
    R: Read,
{
    let item_type = reader
        .read_u8()
        .context(ReadPduFieldSnafu { field: "Item-type" })?;
    reader
        .read_u8()
        .context(ReadPduFieldSnafu { field: "Reserved" })?;
    let item_length = reader.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Item-length",
    })?;
    Ok((item_type, item_length))
}

fn read_pdu_variable(reader: &mut Cursor<&[u8]>) -> Result<PduVariableItem> {
    let (item_type, item_length) = read_item_header(reader)?;
    let bytes = read_n(reader, item_length as usize, "Item")?;
    let mut cursor = Cursor::new(bytes.as_slice());

    match item_type {
        0x10 => Ok(PduVariableItem::ApplicationContext(read_text(
            &mut cursor,
            bytes.len(),
            "Application-context-name",
        )?)),
        0x20 => {
            let id = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Presentation-context-ID",
            })?;
            read_n(&mut cursor, 3, "Reserved")?;

            let mut abstract_syntax = None;
            let mut transfer_syntaxes = vec![];
            while has_remaining(&cursor) {
                let (item_type, item_length) = read_item_header(&mut cursor)?;
                match item_type {
                    0x30 => {
                        abstract_syntax = Some(read_text(
                            &mut cursor,
                            item_length as usize,
                            "Abstract-syntax-name",
                        )?);
                    }
                    0x40 => transfer_syntaxes.push(read_text(
                        &mut cursor,
                        item_length as usize,
                        "Transfer-syntax-name",
                    )?),
                    _ => return UnknownPresentationContextSubItemSnafu { item_type }.fail(),
                }
            }

            Ok(PduVariableItem::PresentationContextProposed(
                PresentationContextProposed {
                    id,
                    abstract_syntax: abstract_syntax.context(MissingAbstractSyntaxSnafu)?,
                    transfer_syntaxes,
                },
            ))
        }
        0x21 => {
            // ID, reserved, result/reason, reserved
            let mut fields = [0; 4];
            cursor.read_exact(&mut fields).context(ReadPduFieldSnafu {
                field: "Result/Reason",
            })?;
            let [id, _, reason, _] = fields;
            let reason = PresentationContextResultReason::from_code(reason)
                .context(InvalidPresentationContextResultReasonSnafu { reason })?;

            let mut transfer_syntax = None;
            while has_remaining(&cursor) {
                let (item_type, item_length) = read_item_header(&mut cursor)?;
                ensure!(
                    item_type == 0x40,
                    UnknownPresentationContextSubItemSnafu { item_type }
                );
                ensure!(
                    transfer_syntax.is_none(),
                    MultipleTransferSyntaxesAcceptedSnafu
                );
                transfer_syntax = Some(read_text(
                    &mut cursor,
                    item_length as usize,
                    "Transfer-syntax-name",
                )?);
            }

            // a rejected context may come without a transfer syntax
            let transfer_syntax = match (transfer_syntax, reason) {
                (Some(ts), _) => ts,
                (None, PresentationContextResultReason::Acceptance) => {
                    return MissingTransferSyntaxSnafu.fail()
                }
                (None, _) => String::new(),
            };

            Ok(PduVariableItem::PresentationContextResult(
                PresentationContextResult {
                    id,
                    reason,
                    transfer_syntax,
                },
            ))
        }
        0x50 => {
            let mut user_variables = vec![];
            while has_remaining(&cursor) {
                let (item_type, item_length) = read_item_header(&mut cursor)?;
                let item = match item_type {
                    0x51 => UserVariableItem::MaxLength(cursor.read_u32::<BigEndian>().context(
                        ReadPduFieldSnafu {
                            field: "Maximum-length-received",
                        },
                    )?),
                    0x52 => UserVariableItem::ImplementationClassUID(read_text(
                        &mut cursor,
                        item_length as usize,
                        "Implementation-class-uid",
                    )?),
                    0x55 => UserVariableItem::ImplementationVersionName(read_text(
                        &mut cursor,
                        item_length as usize,
                        "Implementation-version-name",
                    )?),
                    _ => UserVariableItem::Unknown(
                        item_type,
                        read_n(&mut cursor, item_length as usize, "Unknown")?,
                    ),
                };
                user_variables.push(item);
            }
            Ok(PduVariableItem::UserVariables(user_variables))
        }
        _ => Ok(PduVariableItem::Unknown(item_type)),
    }
}
