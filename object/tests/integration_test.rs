use dicomkit_dictionary_std::{tags, uids};
use dicomkit_object::{open_file, DataSet, ReadError, ReadOptions, TransferSyntax};
use matches::assert_matches;

fn padded(value: &str) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    if bytes.len() % 2 == 1 {
        bytes.push(0);
    }
    bytes
}

/// Explicit VR little endian element with a short (16-bit) length.
fn explicit_le(tag: (u16, u16), vr: &[u8; 2], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&tag.0.to_le_bytes());
    out.extend_from_slice(&tag.1.to_le_bytes());
    out.extend_from_slice(vr);
    out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    out.extend_from_slice(value);
    out
}

fn implicit_le(tag: (u16, u16), value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&tag.0.to_le_bytes());
    out.extend_from_slice(&tag.1.to_le_bytes());
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value);
    out
}

/// Preamble, magic code and a meta group declaring `ts`, followed by `body`.
fn file_with_preamble(preamble: [u8; 128], ts: &str, body: &[u8]) -> Vec<u8> {
    let ts_element = explicit_le((0x0002, 0x0010), b"UI", &padded(ts));
    let mut out = preamble.to_vec();
    out.extend_from_slice(b"DICM");
    out.extend(explicit_le(
        (0x0002, 0x0000),
        b"UL",
        &(ts_element.len() as u32).to_le_bytes(),
    ));
    out.extend(ts_element);
    out.extend_from_slice(body);
    out
}

fn file(ts: &str, body: &[u8]) -> Vec<u8> {
    file_with_preamble([0; 128], ts, body)
}

fn mr_body_implicit() -> Vec<u8> {
    let mut body = implicit_le((0x0008, 0x0016), &padded(uids::MR_IMAGE_STORAGE));
    body.extend(implicit_le((0x0010, 0x0010), b"Doe^John"));
    body.extend(implicit_le((0x0028, 0x0010), &512_u16.to_le_bytes()));
    body
}

#[test]
fn unmodified_file_is_written_back_exactly() {
    let bytes = file(uids::IMPLICIT_VR_LITTLE_ENDIAN, &mr_body_implicit());
    let obj = DataSet::load(&bytes).unwrap();

    assert_eq!(obj.group_length(), 26);
    assert_eq!(obj.meta_elements().count(), 2);
    assert_eq!(obj.dataset_elements().count(), 3);
    assert_eq!(obj.string("PatientName").as_deref(), Some("Doe^John"));
    assert_eq!(obj.unsigned16("Rows"), Some(512));

    let written = obj.to_bytes().unwrap();
    assert_eq!(written, bytes);

    // loading the output again gives the same object
    let again = DataSet::load(&written).unwrap();
    assert_eq!(again, obj);
    assert_eq!(again.to_bytes().unwrap(), written);
}

#[rustfmt::skip]
const NESTED_BODY: &[u8] = &[
    // (0008,1140) ReferencedImageSequence, undefined length
    0x08, 0x00, 0x40, 0x11, 0xFF, 0xFF, 0xFF, 0xFF,
        // item, undefined length
        0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
            // (0008,1150) ReferencedSOPClassUID
            0x08, 0x00, 0x50, 0x11, 0x08, 0x00, 0x00, 0x00,
            b'1', b'.', b'2', b'.', b'3', b'.', b'4', 0x00,
        // item delimiter
        0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
        // item, defined length
        0xFE, 0xFF, 0x00, 0xE0, 0x0A, 0x00, 0x00, 0x00,
            // (0008,1155) ReferencedSOPInstanceUID
            0x08, 0x00, 0x55, 0x11, 0x02, 0x00, 0x00, 0x00,
            b'9', 0x00,
    // sequence delimiter
    0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
    // (0010,0020) PatientID
    0x10, 0x00, 0x20, 0x00, 0x02, 0x00, 0x00, 0x00,
    b'4', b'2',
];

#[test]
fn nested_sequences_are_written_back_exactly() {
    let bytes = file(uids::IMPLICIT_VR_LITTLE_ENDIAN, NESTED_BODY);
    let obj = DataSet::load(&bytes).unwrap();

    let items = obj
        .element(tags::REFERENCED_IMAGE_SEQUENCE)
        .unwrap()
        .items()
        .unwrap();
    assert_eq!(items.len(), 2);
    assert!(items[0].element(tags::REFERENCED_SOP_CLASS_UID).is_some());
    assert!(items[1].element(tags::REFERENCED_SOP_INSTANCE_UID).is_some());
    assert_eq!(obj.string("PatientID").as_deref(), Some("42"));

    assert_eq!(obj.to_bytes().unwrap(), bytes);
}

#[test]
fn non_zero_preamble_is_kept() {
    let mut preamble = [0; 128];
    preamble[..8].copy_from_slice(b"TIFFLIKE");
    let bytes = file_with_preamble(preamble, uids::IMPLICIT_VR_LITTLE_ENDIAN, &mr_body_implicit());
    let obj = DataSet::load(&bytes).unwrap();
    assert_eq!(&obj.preamble().unwrap()[..8], b"TIFFLIKE");
    assert_eq!(obj.to_bytes().unwrap(), bytes);
}

#[test]
fn big_endian_body() {
    let mut body = Vec::new();
    // (0028,0010) Rows, explicit VR big endian
    body.extend_from_slice(&[0x00, 0x28, 0x00, 0x10, b'U', b'S', 0x00, 0x02, 0x02, 0x00]);
    let bytes = file(uids::EXPLICIT_VR_BIG_ENDIAN, &body);

    let obj = DataSet::load(&bytes).unwrap();
    assert_eq!(obj.transfer_syntax().uid(), uids::EXPLICIT_VR_BIG_ENDIAN);
    assert_eq!(obj.unsigned16("Rows"), Some(512));
    assert_eq!(obj.to_bytes().unwrap(), bytes);
}

#[test]
fn missing_magic_code() {
    let mut bytes = file(uids::IMPLICIT_VR_LITTLE_ENDIAN, &mr_body_implicit());
    bytes[128..132].copy_from_slice(b"DICN");
    assert_matches!(DataSet::load(&bytes), Err(ReadError::MissingMagic { .. }));

    // too short to even hold the magic code
    assert_matches!(
        DataSet::load(&[0; 100]),
        Err(ReadError::MissingMagic { .. })
    );
}

#[test]
fn truncated_input() {
    let bytes = file(uids::IMPLICIT_VR_LITTLE_ENDIAN, &mr_body_implicit());
    let err = DataSet::load(&bytes[..bytes.len() - 1]).unwrap_err();
    assert!(err.is_truncated(), "unexpected error {:?}", err);

    // cut inside an element header
    let err = DataSet::load(&bytes[..bytes.len() - 7]).unwrap_err();
    assert!(err.is_truncated(), "unexpected error {:?}", err);
}

#[test]
fn validation_rejects_unsupported_uids() {
    let bytes = file(uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN, &[]);
    assert_matches!(
        ReadOptions::new().validate(true).load(&bytes),
        Err(ReadError::UnsupportedTransferSyntax { .. })
    );

    let body = implicit_le((0x0008, 0x0016), &padded("1.2.3.4"));
    let bytes = file(uids::IMPLICIT_VR_LITTLE_ENDIAN, &body);
    assert_matches!(
        ReadOptions::new().validate(true).load(&bytes),
        Err(ReadError::UnsupportedSOPClass { .. })
    );
    // no validation by default
    assert!(DataSet::load(&bytes).is_ok());

    let bytes = file(uids::IMPLICIT_VR_LITTLE_ENDIAN, &mr_body_implicit());
    assert!(ReadOptions::new().validate(true).load(&bytes).is_ok());
}

#[test]
fn data_set_without_header() {
    let body = mr_body_implicit();
    let obj = ReadOptions::new().read_header(false).load(&body).unwrap();
    assert!(!obj.has_header());
    assert_eq!(obj.meta_elements().count(), 0);
    assert_eq!(obj.unsigned16("Rows"), Some(512));
    assert_eq!(obj.to_bytes().unwrap(), body);
}

#[test]
fn write_and_open_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mr.dcm");

    let bytes = file(uids::IMPLICIT_VR_LITTLE_ENDIAN, &mr_body_implicit());
    let mut obj = DataSet::load(&bytes).unwrap();
    obj.set("PatientName", "Roe^Jane").unwrap();
    obj.write_file(&path).unwrap();

    let read = open_file(&path).unwrap();
    assert_eq!(read.string("PatientName").as_deref(), Some("Roe^Jane"));
    assert_eq!(read.unsigned16("Rows"), Some(512));
    assert_eq!(read.to_bytes().unwrap(), std::fs::read(&path).unwrap());
}

#[test]
fn write_file_with_other_transfer_syntax() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("converted.dcm");

    let mut body = explicit_le((0x0010, 0x0010), b"PN", b"Doe^John");
    body.extend(explicit_le((0x0028, 0x0010), b"US", &512_u16.to_le_bytes()));
    let bytes = file(uids::EXPLICIT_VR_LITTLE_ENDIAN, &body);
    let obj = DataSet::load(&bytes).unwrap();

    obj.write_file_with(&path, Some(TransferSyntax::implicit_vr_le()))
        .unwrap();
    // the source object is untouched
    assert_eq!(obj.to_bytes().unwrap(), bytes);

    let converted = open_file(&path).unwrap();
    assert_eq!(
        converted.transfer_syntax().uid(),
        uids::IMPLICIT_VR_LITTLE_ENDIAN
    );
    // 8 byte header + 18 bytes of padded UID
    assert_eq!(converted.group_length(), 26);
    assert_eq!(converted.string("PatientName").as_deref(), Some("Doe^John"));
    assert_eq!(converted.unsigned16("Rows"), Some(512));

    let written = std::fs::read(&path).unwrap();
    // (0010,0010) in implicit VR: tag and a 4-byte length
    let body_start = 128 + 4 + 12 + 26;
    assert_eq!(
        &written[body_start..body_start + 8],
        &[0x10, 0x00, 0x10, 0x00, 0x08, 0x00, 0x00, 0x00]
    );
}

#[test]
fn words_are_swapped_when_converting_to_big_endian() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.dcm");

    let mut body = explicit_le((0x0028, 0x0010), b"US", &512_u16.to_le_bytes());
    // (7FE0,0010) PixelData OW, long form header
    body.extend_from_slice(&[0xE0, 0x7F, 0x10, 0x00, b'O', b'W', 0x00, 0x00]);
    body.extend_from_slice(&4_u32.to_le_bytes());
    body.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
    let bytes = file(uids::EXPLICIT_VR_LITTLE_ENDIAN, &body);
    let obj = DataSet::load(&bytes).unwrap();

    obj.write_file_with(&path, Some(TransferSyntax::explicit_vr_be()))
        .unwrap();

    let converted = open_file(&path).unwrap();
    assert_eq!(converted.transfer_syntax().uid(), uids::EXPLICIT_VR_BIG_ENDIAN);
    assert_eq!(converted.unsigned16("Rows"), Some(512));
    let pixels = converted.element(tags::PIXEL_DATA).unwrap();
    assert_eq!(&*pixels.value().to_bytes().unwrap(), &[0x02, 0x01, 0x04, 0x03]);

    // and back again
    let path = dir.path().join("little.dcm");
    converted
        .write_file_with(&path, Some(TransferSyntax::explicit_vr_le()))
        .unwrap();
    let restored = open_file(&path).unwrap();
    assert_eq!(restored.to_bytes().unwrap(), bytes);
}
