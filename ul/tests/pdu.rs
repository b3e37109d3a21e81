use dicomkit_ul::pdu::{
    write_pdu, AbortRQServiceProviderReason, AbortRQSource, AssociationAC, AssociationRJ,
    AssociationRJResult, AssociationRJServiceProviderPresentationReason, AssociationRJSource,
    AssociationRQ, PDataValue, PDataValueType, Pdu, PduFrameDecoder, PresentationContextProposed,
    PresentationContextResult, PresentationContextResultReason, UserVariableItem,
};
use matches::assert_matches;

/// Encode a PDU and decode it back through the frame decoder,
/// feeding the bytes in chunks of the given size.
fn through_decoder(pdu: &Pdu, chunk_size: usize) -> Result<Pdu, Box<dyn std::error::Error>> {
    let mut bytes = Vec::new();
    write_pdu(&mut bytes, pdu)?;

    let mut decoder = PduFrameDecoder::new();
    let mut frames = Vec::new();
    for chunk in bytes.chunks(chunk_size) {
        decoder.feed(chunk);
        while let Some(frame) = decoder.next_frame()? {
            frames.push(frame);
        }
    }
    assert_eq!(frames.len(), 1);
    assert_eq!(decoder.buffered(), 0);
    Ok(frames.remove(0).decode()?)
}

#[test]
fn can_read_write_associate_rq() -> Result<(), Box<dyn std::error::Error>> {
    let association_rq = AssociationRQ {
        protocol_version: 1,
        calling_ae_title: "calling ae".to_string(),
        called_ae_title: "called ae".to_string(),
        application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
        presentation_contexts: vec![
            PresentationContextProposed {
                id: 1,
                abstract_syntax: "1.2.840.10008.1.1".to_string(),
                transfer_syntaxes: vec![
                    "1.2.840.10008.1.2.1".to_string(),
                    "1.2.840.10008.1.2".to_string(),
                ],
            },
            PresentationContextProposed {
                id: 3,
                abstract_syntax: "1.2.840.10008.5.1.4.1.1.4".to_string(),
                transfer_syntaxes: vec!["1.2.840.10008.1.2".to_string()],
            },
        ],
        user_variables: vec![
            UserVariableItem::MaxLength(16_384),
            UserVariableItem::ImplementationClassUID("1.2.3.4".to_string()),
            UserVariableItem::ImplementationVersionName("version name".to_string()),
        ],
    };

    let pdu = Pdu::from(association_rq.clone());
    assert_eq!(through_decoder(&pdu, 4096)?, pdu);
    assert_eq!(through_decoder(&pdu, 1)?, pdu);
    Ok(())
}

#[test]
fn can_read_write_associate_ac() -> Result<(), Box<dyn std::error::Error>> {
    let association_ac = AssociationAC {
        protocol_version: 1,
        calling_ae_title: "STORE-SCU".to_string(),
        called_ae_title: "STORE-SCP".to_string(),
        application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
        presentation_contexts: vec![
            PresentationContextResult {
                id: 1,
                reason: PresentationContextResultReason::Acceptance,
                transfer_syntax: "1.2.840.10008.1.2".to_string(),
            },
            PresentationContextResult {
                id: 3,
                reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
                transfer_syntax: "1.2.840.10008.1.2".to_string(),
            },
        ],
        user_variables: vec![UserVariableItem::MaxLength(32_768)],
    };

    let pdu = Pdu::from(association_ac);
    assert_eq!(through_decoder(&pdu, 7)?, pdu);
    Ok(())
}

#[test]
fn can_read_write_associate_rj() -> Result<(), Box<dyn std::error::Error>> {
    let pdu = Pdu::from(AssociationRJ {
        result: AssociationRJResult::Transient,
        source: AssociationRJSource::ServiceProviderPresentation(
            AssociationRJServiceProviderPresentationReason::TemporaryCongestion,
        ),
    });
    assert_eq!(through_decoder(&pdu, 3)?, pdu);
    Ok(())
}

#[test]
fn can_read_write_pdata() -> Result<(), Box<dyn std::error::Error>> {
    let pdu = Pdu::PData {
        data: vec![
            PDataValue {
                presentation_context_id: 3,
                value_type: PDataValueType::Command,
                is_last: true,
                data: vec![0x55; 30],
            },
            PDataValue {
                presentation_context_id: 3,
                value_type: PDataValueType::Data,
                is_last: false,
                data: vec![0xAA; 1000],
            },
        ],
    };
    assert_eq!(through_decoder(&pdu, 100)?, pdu);
    Ok(())
}

#[test]
fn can_read_write_release_and_abort() -> Result<(), Box<dyn std::error::Error>> {
    assert_eq!(through_decoder(&Pdu::ReleaseRQ, 1)?, Pdu::ReleaseRQ);
    assert_eq!(through_decoder(&Pdu::ReleaseRP, 2)?, Pdu::ReleaseRP);
    let abort = Pdu::AbortRQ {
        source: AbortRQSource::ServiceProvider(AbortRQServiceProviderReason::UnexpectedPdu),
    };
    assert_matches!(
        through_decoder(&abort, 5)?,
        Pdu::AbortRQ {
            source: AbortRQSource::ServiceProvider(AbortRQServiceProviderReason::UnexpectedPdu)
        }
    );
    Ok(())
}

#[test]
fn several_pdus_in_one_read() -> Result<(), Box<dyn std::error::Error>> {
    let mut bytes = Vec::new();
    write_pdu(&mut bytes, &Pdu::ReleaseRQ)?;
    write_pdu(
        &mut bytes,
        &Pdu::AbortRQ {
            source: AbortRQSource::ServiceUser,
        },
    )?;
    // first half of another release request
    bytes.extend_from_slice(&[0x05, 0x00, 0x00, 0x00, 0x00]);

    let mut decoder = PduFrameDecoder::new();
    decoder.feed(&bytes);
    assert_eq!(decoder.next_frame()?.map(|f| f.decode()).transpose()?, Some(Pdu::ReleaseRQ));
    assert_matches!(
        decoder.next_frame()?.map(|f| f.decode()).transpose()?,
        Some(Pdu::AbortRQ {
            source: AbortRQSource::ServiceUser
        })
    );
    assert!(decoder.next_frame()?.is_none());

    decoder.feed(&[0x04, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(decoder.next_frame()?.map(|f| f.decode()).transpose()?, Some(Pdu::ReleaseRQ));
    Ok(())
}
