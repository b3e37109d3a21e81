//! PDU encoding.
use crate::pdu::*;
use byteordered::byteorder::{BigEndian, WriteBytesExt};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not write field `{}`", field))]
    WriteField {
        field: &'static str,
        backtrace: Backtrace,
        source: std::io::Error,
    },

    #[snafu(display("Could not write chunk of {} PDU structure", name))]
    WriteChunk {
        name: &'static str,
        backtrace: Backtrace,
        source: std::io::Error,
    },

    #[snafu(display("Field `{}` must be ASCII text", field))]
    EncodeField {
        field: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Item of {} bytes does not fit its length field", length))]
    ItemTooLong { length: usize, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Write the contents built by `func`, preceded by their length as a 32-bit integer.
fn write_chunk_u32<F>(writer: &mut dyn Write, name: &'static str, func: F) -> Result<()>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let mut data = vec![];
    func(&mut data)?;
    ensure!(
        data.len() <= u32::MAX as usize,
        ItemTooLongSnafu { length: data.len() }
    );
    writer
        .write_u32::<BigEndian>(data.len() as u32)
        .context(WriteChunkSnafu { name })?;
    writer.write_all(&data).context(WriteChunkSnafu { name })
}

/// Write the contents built by `func`, preceded by their length as a 16-bit integer.
fn write_chunk_u16<F>(writer: &mut dyn Write, name: &'static str, func: F) -> Result<()>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let mut data = vec![];
    func(&mut data)?;
    ensure!(
        data.len() <= u16::MAX as usize,
        ItemTooLongSnafu { length: data.len() }
    );
    writer
        .write_u16::<BigEndian>(data.len() as u16)
        .context(WriteChunkSnafu { name })?;
    writer.write_all(&data).context(WriteChunkSnafu { name })
}

/// Write the item type and reserved byte of a variable item,
/// then the item itself with a 16-bit length.
fn write_item<F>(writer: &mut dyn Write, item_type: u8, name: &'static str, func: F) -> Result<()>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    writer
        .write_all(&[item_type, 0])
        .context(WriteFieldSnafu { field: "Item-type" })?;
    write_chunk_u16(writer, name, func)
}

fn ascii<'a>(text: &'a str, field: &'static str) -> Result<&'a [u8]> {
    ensure!(text.is_ascii(), EncodeFieldSnafu { field });
    Ok(text.as_bytes())
}

fn write_ae_title(writer: &mut Vec<u8>, ae_title: &str, field: &'static str) -> Result<()> {
    let mut bytes = ascii(ae_title, field)?.to_vec();
    bytes.resize(16, b' ');
    writer.write_all(&bytes).context(WriteFieldSnafu { field })
}

fn write_text_item(
    writer: &mut dyn Write,
    item_type: u8,
    text: &str,
    field: &'static str,
) -> Result<()> {
    let bytes = ascii(text, field)?;
    write_item(writer, item_type, field, |writer| {
        writer.write_all(bytes).context(WriteFieldSnafu { field })
    })
}

/// Encode a PDU, header included.
pub fn write_pdu<W>(writer: &mut W, pdu: &Pdu) -> Result<()>
where
    W: Write,
{
    writer
        .write_all(&[pdu.pdu_type(), 0])
        .context(WriteFieldSnafu { field: "PDU-type" })?;

    match pdu {
        Pdu::AssociationRQ(AssociationRQ {
            protocol_version,
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            user_variables,
        }) => write_chunk_u32(writer, "A-ASSOCIATE-RQ", |writer| {
            write_association_header(writer, *protocol_version, called_ae_title, calling_ae_title)?;
            write_text_item(writer, 0x10, application_context_name, "Application-context-name")?;
            for pc in presentation_contexts {
                write_item(writer, 0x20, "Presentation-context", |writer| {
                    writer
                        .write_all(&[pc.id, 0, 0, 0])
                        .context(WriteFieldSnafu {
                            field: "Presentation-context-ID",
                        })?;
                    write_text_item(writer, 0x30, &pc.abstract_syntax, "Abstract-syntax-name")?;
                    for ts in &pc.transfer_syntaxes {
                        write_text_item(writer, 0x40, ts, "Transfer-syntax-name")?;
                    }
                    Ok(())
                })?;
            }
            write_user_variables(writer, user_variables)
        }),
        Pdu::AssociationAC(AssociationAC {
            protocol_version,
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            user_variables,
        }) => write_chunk_u32(writer, "A-ASSOCIATE-AC", |writer| {
            write_association_header(writer, *protocol_version, called_ae_title, calling_ae_title)?;
            write_text_item(writer, 0x10, application_context_name, "Application-context-name")?;
            for pc in presentation_contexts {
                write_item(writer, 0x21, "Presentation-context", |writer| {
                    writer
                        .write_all(&[pc.id, 0, pc.reason as u8, 0])
                        .context(WriteFieldSnafu {
                            field: "Presentation-context-ID",
                        })?;
                    write_text_item(writer, 0x40, &pc.transfer_syntax, "Transfer-syntax-name")
                })?;
            }
            write_user_variables(writer, user_variables)
        }),
        Pdu::AssociationRJ(AssociationRJ { result, source }) => {
            write_chunk_u32(writer, "A-ASSOCIATE-RJ", |writer| {
                let (source, reason) = source.codes();
                writer
                    .write_all(&[0, *result as u8, source, reason])
                    .context(WriteFieldSnafu { field: "Result" })
            })
        }
        Pdu::PData { data } => write_chunk_u32(writer, "P-DATA-TF", |writer| {
            for pdv in data {
                write_chunk_u32(writer, "Presentation-data-value", |writer| {
                    writer
                        .write_all(&[pdv.presentation_context_id, pdv.control_header()])
                        .context(WriteFieldSnafu {
                            field: "Message Control Header",
                        })?;
                    writer.write_all(&pdv.data).context(WriteFieldSnafu {
                        field: "Presentation-data-value",
                    })
                })?;
            }
            Ok(())
        }),
        Pdu::ReleaseRQ => write_chunk_u32(writer, "A-RELEASE-RQ", |writer| {
            writer
                .write_all(&[0; 4])
                .context(WriteFieldSnafu { field: "Reserved" })
        }),
        Pdu::ReleaseRP => write_chunk_u32(writer, "A-RELEASE-RP", |writer| {
            writer
                .write_all(&[0; 4])
                .context(WriteFieldSnafu { field: "Reserved" })
        }),
        Pdu::AbortRQ { source } => write_chunk_u32(writer, "A-ABORT", |writer| {
            let (source, reason) = source.codes();
            writer
                .write_all(&[0, 0, source, reason])
                .context(WriteFieldSnafu { field: "Source" })
        }),
        Pdu::Unknown { data, .. } => write_chunk_u32(writer, "Unknown", |writer| {
            writer
                .write_all(data)
                .context(WriteFieldSnafu { field: "Unknown" })
        }),
    }
}

fn write_association_header(
    writer: &mut Vec<u8>,
    protocol_version: u16,
    called_ae_title: &str,
    calling_ae_title: &str,
) -> Result<()> {
    writer
        .write_u16::<BigEndian>(protocol_version)
        .context(WriteFieldSnafu {
            field: "Protocol-version",
        })?;
    writer
        .write_u16::<BigEndian>(0)
        .context(WriteFieldSnafu { field: "Reserved" })?;
    write_ae_title(writer, called_ae_title, "Called-AE-title")?;
    write_ae_title(writer, calling_ae_title, "Calling-AE-title")?;
    writer
        .write_all(&[0; 32])
        .context(WriteFieldSnafu { field: "Reserved" })
}

fn write_user_variables(writer: &mut Vec<u8>, user_variables: &[UserVariableItem]) -> Result<()> {
    if user_variables.is_empty() {
        return Ok(());
    }
    write_item(writer, 0x50, "User-information", |writer| {
        for item in user_variables {
            match item {
                UserVariableItem::MaxLength(max_length) => {
                    write_item(writer, 0x51, "Maximum-length-received", |writer| {
                        writer
                            .write_u32::<BigEndian>(*max_length)
                            .context(WriteFieldSnafu {
                                field: "Maximum-length-received",
                            })
                    })?
                }
                UserVariableItem::ImplementationClassUID(uid) => {
                    write_text_item(writer, 0x52, uid, "Implementation-class-uid")?
                }
                UserVariableItem::ImplementationVersionName(name) => {
                    write_text_item(writer, 0x55, name, "Implementation-version-name")?
                }
                UserVariableItem::Unknown(item_type, data) => {
                    write_item(writer, *item_type, "Unknown", |writer| {
                        writer
                            .write_all(data)
                            .context(WriteFieldSnafu { field: "Unknown" })
                    })?
                }
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;

    #[test]
    fn write_release_rq() {
        let mut out = vec![];
        write_pdu(&mut out, &Pdu::ReleaseRQ).unwrap();
        assert_eq!(out, [0x05, 0x00, 0, 0, 0, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn write_reject() {
        let mut out = vec![];
        let pdu = Pdu::AssociationRJ(AssociationRJ {
            result: AssociationRJResult::Permanent,
            source: AssociationRJSource::ServiceUser(
                AssociationRJServiceUserReason::CalledAETitleNotRecognized,
            ),
        });
        write_pdu(&mut out, &pdu).unwrap();
        assert_eq!(out, [0x03, 0x00, 0, 0, 0, 4, 0, 1, 1, 7]);
    }

    #[rustfmt::skip]
    #[test]
    fn write_pdata() {
        let mut out = vec![];
        let pdu = Pdu::PData {
            data: vec![PDataValue {
                presentation_context_id: 1,
                value_type: PDataValueType::Command,
                is_last: true,
                data: vec![0xAA, 0xBB],
            }],
        };
        write_pdu(&mut out, &pdu).unwrap();
        assert_eq!(
            out,
            [
                // PDU header
                0x04, 0x00, 0, 0, 0, 8,
                // PDV item length, context ID, message control header
                0, 0, 0, 4, 1, 0x03,
                0xAA, 0xBB,
            ]
        );
    }

    #[test]
    fn non_ascii_ae_title() {
        let pdu = Pdu::AssociationRQ(AssociationRQ {
            protocol_version: 1,
            calling_ae_title: "ÉCHO".to_string(),
            called_ae_title: "ANY-SCP".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: vec![],
            user_variables: vec![],
        });
        assert_matches!(
            write_pdu(&mut Vec::<u8>::new(), &pdu),
            Err(Error::EncodeField {
                field: "Calling-AE-title",
                ..
            })
        );
    }
}
