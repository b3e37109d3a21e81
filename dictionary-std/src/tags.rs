//! Data element tag declarations.
//!
//! Each constant maps an attribute alias to its tag.
//! The same declarations feed the run-time dictionary in
//! [`data_element`](crate::data_element).

use dicomkit_core::dictionary::DictionaryEntryRef;
use dicomkit_core::header::{Tag, VR};

macro_rules! entries {
    ($( $(#[$doc:meta])* ($name:ident, $alias:literal, $group:literal, $elem:literal, $vr:ident) ),* $(,)?) => {
        $(
            $(#[$doc])*
            #[rustfmt::skip]
            pub const $name: Tag = Tag($group, $elem);
        )*

        /// All attributes known to the standard dictionary.
        pub(crate) static ENTRIES: &[DictionaryEntryRef<'static>] = &[
            $( DictionaryEntryRef { tag: $name, alias: $alias, vr: VR::$vr }, )*
        ];
    };
}

entries! {
    // command group
    /// CommandGroupLength (0000,0000) UL
    (COMMAND_GROUP_LENGTH, "CommandGroupLength", 0x0000, 0x0000, UL),
    /// AffectedSOPClassUID (0000,0002) UI
    (AFFECTED_SOP_CLASS_UID, "AffectedSOPClassUID", 0x0000, 0x0002, UI),
    /// RequestedSOPClassUID (0000,0003) UI
    (REQUESTED_SOP_CLASS_UID, "RequestedSOPClassUID", 0x0000, 0x0003, UI),
    /// CommandField (0000,0100) US
    (COMMAND_FIELD, "CommandField", 0x0000, 0x0100, US),
    /// MessageID (0000,0110) US
    (MESSAGE_ID, "MessageID", 0x0000, 0x0110, US),
    /// MessageIDBeingRespondedTo (0000,0120) US
    (MESSAGE_ID_BEING_RESPONDED_TO, "MessageIDBeingRespondedTo", 0x0000, 0x0120, US),
    /// MoveDestination (0000,0600) AE
    (MOVE_DESTINATION, "MoveDestination", 0x0000, 0x0600, AE),
    /// Priority (0000,0700) US
    (PRIORITY, "Priority", 0x0000, 0x0700, US),
    /// CommandDataSetType (0000,0800) US
    (COMMAND_DATA_SET_TYPE, "CommandDataSetType", 0x0000, 0x0800, US),
    /// Status (0000,0900) US
    (STATUS, "Status", 0x0000, 0x0900, US),
    /// OffendingElement (0000,0901) AT
    (OFFENDING_ELEMENT, "OffendingElement", 0x0000, 0x0901, AT),
    /// ErrorComment (0000,0902) LO
    (ERROR_COMMENT, "ErrorComment", 0x0000, 0x0902, LO),
    /// ErrorID (0000,0903) US
    (ERROR_ID, "ErrorID", 0x0000, 0x0903, US),
    /// AffectedSOPInstanceUID (0000,1000) UI
    (AFFECTED_SOP_INSTANCE_UID, "AffectedSOPInstanceUID", 0x0000, 0x1000, UI),
    /// RequestedSOPInstanceUID (0000,1001) UI
    (REQUESTED_SOP_INSTANCE_UID, "RequestedSOPInstanceUID", 0x0000, 0x1001, UI),
    /// NumberOfRemainingSuboperations (0000,1020) US
    (NUMBER_OF_REMAINING_SUBOPERATIONS, "NumberOfRemainingSuboperations", 0x0000, 0x1020, US),
    /// NumberOfCompletedSuboperations (0000,1021) US
    (NUMBER_OF_COMPLETED_SUBOPERATIONS, "NumberOfCompletedSuboperations", 0x0000, 0x1021, US),
    /// NumberOfFailedSuboperations (0000,1022) US
    (NUMBER_OF_FAILED_SUBOPERATIONS, "NumberOfFailedSuboperations", 0x0000, 0x1022, US),
    /// NumberOfWarningSuboperations (0000,1023) US
    (NUMBER_OF_WARNING_SUBOPERATIONS, "NumberOfWarningSuboperations", 0x0000, 0x1023, US),
    /// MoveOriginatorApplicationEntityTitle (0000,1030) AE
    (MOVE_ORIGINATOR_APPLICATION_ENTITY_TITLE, "MoveOriginatorApplicationEntityTitle", 0x0000, 0x1030, AE),
    /// MoveOriginatorMessageID (0000,1031) US
    (MOVE_ORIGINATOR_MESSAGE_ID, "MoveOriginatorMessageID", 0x0000, 0x1031, US),

    // file meta information group
    /// FileMetaInformationGroupLength (0002,0000) UL
    (FILE_META_INFORMATION_GROUP_LENGTH, "FileMetaInformationGroupLength", 0x0002, 0x0000, UL),
    /// FileMetaInformationVersion (0002,0001) OB
    (FILE_META_INFORMATION_VERSION, "FileMetaInformationVersion", 0x0002, 0x0001, OB),
    /// MediaStorageSOPClassUID (0002,0002) UI
    (MEDIA_STORAGE_SOP_CLASS_UID, "MediaStorageSOPClassUID", 0x0002, 0x0002, UI),
    /// MediaStorageSOPInstanceUID (0002,0003) UI
    (MEDIA_STORAGE_SOP_INSTANCE_UID, "MediaStorageSOPInstanceUID", 0x0002, 0x0003, UI),
    /// TransferSyntaxUID (0002,0010) UI
    (TRANSFER_SYNTAX_UID, "TransferSyntaxUID", 0x0002, 0x0010, UI),
    /// ImplementationClassUID (0002,0012) UI
    (IMPLEMENTATION_CLASS_UID, "ImplementationClassUID", 0x0002, 0x0012, UI),
    /// ImplementationVersionName (0002,0013) SH
    (IMPLEMENTATION_VERSION_NAME, "ImplementationVersionName", 0x0002, 0x0013, SH),
    /// SourceApplicationEntityTitle (0002,0016) AE
    (SOURCE_APPLICATION_ENTITY_TITLE, "SourceApplicationEntityTitle", 0x0002, 0x0016, AE),
    /// SendingApplicationEntityTitle (0002,0017) AE
    (SENDING_APPLICATION_ENTITY_TITLE, "SendingApplicationEntityTitle", 0x0002, 0x0017, AE),
    /// ReceivingApplicationEntityTitle (0002,0018) AE
    (RECEIVING_APPLICATION_ENTITY_TITLE, "ReceivingApplicationEntityTitle", 0x0002, 0x0018, AE),
    /// PrivateInformationCreatorUID (0002,0100) UI
    (PRIVATE_INFORMATION_CREATOR_UID, "PrivateInformationCreatorUID", 0x0002, 0x0100, UI),
    /// PrivateInformation (0002,0102) OB
    (PRIVATE_INFORMATION, "PrivateInformation", 0x0002, 0x0102, OB),

    // general study, series and instance attributes
    /// SpecificCharacterSet (0008,0005) CS
    (SPECIFIC_CHARACTER_SET, "SpecificCharacterSet", 0x0008, 0x0005, CS),
    /// ImageType (0008,0008) CS
    (IMAGE_TYPE, "ImageType", 0x0008, 0x0008, CS),
    /// InstanceCreationDate (0008,0012) DA
    (INSTANCE_CREATION_DATE, "InstanceCreationDate", 0x0008, 0x0012, DA),
    /// InstanceCreationTime (0008,0013) TM
    (INSTANCE_CREATION_TIME, "InstanceCreationTime", 0x0008, 0x0013, TM),
    /// SOPClassUID (0008,0016) UI
    (SOP_CLASS_UID, "SOPClassUID", 0x0008, 0x0016, UI),
    /// SOPInstanceUID (0008,0018) UI
    (SOP_INSTANCE_UID, "SOPInstanceUID", 0x0008, 0x0018, UI),
    /// StudyDate (0008,0020) DA
    (STUDY_DATE, "StudyDate", 0x0008, 0x0020, DA),
    /// SeriesDate (0008,0021) DA
    (SERIES_DATE, "SeriesDate", 0x0008, 0x0021, DA),
    /// AcquisitionDate (0008,0022) DA
    (ACQUISITION_DATE, "AcquisitionDate", 0x0008, 0x0022, DA),
    /// ContentDate (0008,0023) DA
    (CONTENT_DATE, "ContentDate", 0x0008, 0x0023, DA),
    /// AcquisitionDateTime (0008,002A) DT
    (ACQUISITION_DATE_TIME, "AcquisitionDateTime", 0x0008, 0x002A, DT),
    /// StudyTime (0008,0030) TM
    (STUDY_TIME, "StudyTime", 0x0008, 0x0030, TM),
    /// SeriesTime (0008,0031) TM
    (SERIES_TIME, "SeriesTime", 0x0008, 0x0031, TM),
    /// AcquisitionTime (0008,0032) TM
    (ACQUISITION_TIME, "AcquisitionTime", 0x0008, 0x0032, TM),
    /// ContentTime (0008,0033) TM
    (CONTENT_TIME, "ContentTime", 0x0008, 0x0033, TM),
    /// AccessionNumber (0008,0050) SH
    (ACCESSION_NUMBER, "AccessionNumber", 0x0008, 0x0050, SH),
    /// QueryRetrieveLevel (0008,0052) CS
    (QUERY_RETRIEVE_LEVEL, "QueryRetrieveLevel", 0x0008, 0x0052, CS),
    /// RetrieveAETitle (0008,0054) AE
    (RETRIEVE_AE_TITLE, "RetrieveAETitle", 0x0008, 0x0054, AE),
    /// InstanceAvailability (0008,0056) CS
    (INSTANCE_AVAILABILITY, "InstanceAvailability", 0x0008, 0x0056, CS),
    /// Modality (0008,0060) CS
    (MODALITY, "Modality", 0x0008, 0x0060, CS),
    /// ModalitiesInStudy (0008,0061) CS
    (MODALITIES_IN_STUDY, "ModalitiesInStudy", 0x0008, 0x0061, CS),
    /// SOPClassesInStudy (0008,0062) UI
    (SOP_CLASSES_IN_STUDY, "SOPClassesInStudy", 0x0008, 0x0062, UI),
    /// Manufacturer (0008,0070) LO
    (MANUFACTURER, "Manufacturer", 0x0008, 0x0070, LO),
    /// InstitutionName (0008,0080) LO
    (INSTITUTION_NAME, "InstitutionName", 0x0008, 0x0080, LO),
    /// ReferringPhysicianName (0008,0090) PN
    (REFERRING_PHYSICIAN_NAME, "ReferringPhysicianName", 0x0008, 0x0090, PN),
    /// CodeValue (0008,0100) SH
    (CODE_VALUE, "CodeValue", 0x0008, 0x0100, SH),
    /// CodingSchemeDesignator (0008,0102) SH
    (CODING_SCHEME_DESIGNATOR, "CodingSchemeDesignator", 0x0008, 0x0102, SH),
    /// CodeMeaning (0008,0104) LO
    (CODE_MEANING, "CodeMeaning", 0x0008, 0x0104, LO),
    /// StationName (0008,1010) SH
    (STATION_NAME, "StationName", 0x0008, 0x1010, SH),
    /// StudyDescription (0008,1030) LO
    (STUDY_DESCRIPTION, "StudyDescription", 0x0008, 0x1030, LO),
    /// ProcedureCodeSequence (0008,1032) SQ
    (PROCEDURE_CODE_SEQUENCE, "ProcedureCodeSequence", 0x0008, 0x1032, SQ),
    /// SeriesDescription (0008,103E) LO
    (SERIES_DESCRIPTION, "SeriesDescription", 0x0008, 0x103E, LO),
    /// PerformingPhysicianName (0008,1050) PN
    (PERFORMING_PHYSICIAN_NAME, "PerformingPhysicianName", 0x0008, 0x1050, PN),
    /// NameOfPhysiciansReadingStudy (0008,1060) PN
    (NAME_OF_PHYSICIANS_READING_STUDY, "NameOfPhysiciansReadingStudy", 0x0008, 0x1060, PN),
    /// OperatorsName (0008,1070) PN
    (OPERATORS_NAME, "OperatorsName", 0x0008, 0x1070, PN),
    /// ReferencedImageSequence (0008,1140) SQ
    (REFERENCED_IMAGE_SEQUENCE, "ReferencedImageSequence", 0x0008, 0x1140, SQ),
    /// ReferencedSOPClassUID (0008,1150) UI
    (REFERENCED_SOP_CLASS_UID, "ReferencedSOPClassUID", 0x0008, 0x1150, UI),
    /// ReferencedSOPInstanceUID (0008,1155) UI
    (REFERENCED_SOP_INSTANCE_UID, "ReferencedSOPInstanceUID", 0x0008, 0x1155, UI),
    /// DerivationDescription (0008,2111) ST
    (DERIVATION_DESCRIPTION, "DerivationDescription", 0x0008, 0x2111, ST),
    /// AnatomicRegionSequence (0008,2218) SQ
    (ANATOMIC_REGION_SEQUENCE, "AnatomicRegionSequence", 0x0008, 0x2218, SQ),

    // patient
    /// PatientName (0010,0010) PN
    (PATIENT_NAME, "PatientName", 0x0010, 0x0010, PN),
    /// PatientID (0010,0020) LO
    (PATIENT_ID, "PatientID", 0x0010, 0x0020, LO),
    /// IssuerOfPatientID (0010,0021) LO
    (ISSUER_OF_PATIENT_ID, "IssuerOfPatientID", 0x0010, 0x0021, LO),
    /// PatientBirthDate (0010,0030) DA
    (PATIENT_BIRTH_DATE, "PatientBirthDate", 0x0010, 0x0030, DA),
    /// PatientBirthTime (0010,0032) TM
    (PATIENT_BIRTH_TIME, "PatientBirthTime", 0x0010, 0x0032, TM),
    /// PatientSex (0010,0040) CS
    (PATIENT_SEX, "PatientSex", 0x0010, 0x0040, CS),
    /// PatientAge (0010,1010) AS
    (PATIENT_AGE, "PatientAge", 0x0010, 0x1010, AS),
    /// PatientSize (0010,1020) DS
    (PATIENT_SIZE, "PatientSize", 0x0010, 0x1020, DS),
    /// PatientWeight (0010,1030) DS
    (PATIENT_WEIGHT, "PatientWeight", 0x0010, 0x1030, DS),
    /// EthnicGroup (0010,2160) SH
    (ETHNIC_GROUP, "EthnicGroup", 0x0010, 0x2160, SH),
    /// PatientComments (0010,4000) LT
    (PATIENT_COMMENTS, "PatientComments", 0x0010, 0x4000, LT),

    // acquisition
    /// BodyPartExamined (0018,0015) CS
    (BODY_PART_EXAMINED, "BodyPartExamined", 0x0018, 0x0015, CS),
    /// SliceThickness (0018,0050) DS
    (SLICE_THICKNESS, "SliceThickness", 0x0018, 0x0050, DS),
    /// KVP (0018,0060) DS
    (KVP, "KVP", 0x0018, 0x0060, DS),
    /// DeviceSerialNumber (0018,1000) LO
    (DEVICE_SERIAL_NUMBER, "DeviceSerialNumber", 0x0018, 0x1000, LO),
    /// SoftwareVersions (0018,1020) LO
    (SOFTWARE_VERSIONS, "SoftwareVersions", 0x0018, 0x1020, LO),
    /// ProtocolName (0018,1030) LO
    (PROTOCOL_NAME, "ProtocolName", 0x0018, 0x1030, LO),
    /// PatientPosition (0018,5100) CS
    (PATIENT_POSITION, "PatientPosition", 0x0018, 0x5100, CS),

    // relationship
    /// StudyInstanceUID (0020,000D) UI
    (STUDY_INSTANCE_UID, "StudyInstanceUID", 0x0020, 0x000D, UI),
    /// SeriesInstanceUID (0020,000E) UI
    (SERIES_INSTANCE_UID, "SeriesInstanceUID", 0x0020, 0x000E, UI),
    /// StudyID (0020,0010) SH
    (STUDY_ID, "StudyID", 0x0020, 0x0010, SH),
    /// SeriesNumber (0020,0011) IS
    (SERIES_NUMBER, "SeriesNumber", 0x0020, 0x0011, IS),
    /// AcquisitionNumber (0020,0012) IS
    (ACQUISITION_NUMBER, "AcquisitionNumber", 0x0020, 0x0012, IS),
    /// InstanceNumber (0020,0013) IS
    (INSTANCE_NUMBER, "InstanceNumber", 0x0020, 0x0013, IS),
    /// PatientOrientation (0020,0020) CS
    (PATIENT_ORIENTATION, "PatientOrientation", 0x0020, 0x0020, CS),
    /// ImagePositionPatient (0020,0032) DS
    (IMAGE_POSITION_PATIENT, "ImagePositionPatient", 0x0020, 0x0032, DS),
    /// ImageOrientationPatient (0020,0037) DS
    (IMAGE_ORIENTATION_PATIENT, "ImageOrientationPatient", 0x0020, 0x0037, DS),
    /// FrameOfReferenceUID (0020,0052) UI
    (FRAME_OF_REFERENCE_UID, "FrameOfReferenceUID", 0x0020, 0x0052, UI),
    /// Laterality (0020,0060) CS
    (LATERALITY, "Laterality", 0x0020, 0x0060, CS),
    /// NumberOfPatientRelatedStudies (0020,1200) IS
    (NUMBER_OF_PATIENT_RELATED_STUDIES, "NumberOfPatientRelatedStudies", 0x0020, 0x1200, IS),
    /// NumberOfPatientRelatedSeries (0020,1202) IS
    (NUMBER_OF_PATIENT_RELATED_SERIES, "NumberOfPatientRelatedSeries", 0x0020, 0x1202, IS),
    /// NumberOfPatientRelatedInstances (0020,1204) IS
    (NUMBER_OF_PATIENT_RELATED_INSTANCES, "NumberOfPatientRelatedInstances", 0x0020, 0x1204, IS),
    /// NumberOfStudyRelatedSeries (0020,1206) IS
    (NUMBER_OF_STUDY_RELATED_SERIES, "NumberOfStudyRelatedSeries", 0x0020, 0x1206, IS),
    /// NumberOfStudyRelatedInstances (0020,1208) IS
    (NUMBER_OF_STUDY_RELATED_INSTANCES, "NumberOfStudyRelatedInstances", 0x0020, 0x1208, IS),
    /// NumberOfSeriesRelatedInstances (0020,1209) IS
    (NUMBER_OF_SERIES_RELATED_INSTANCES, "NumberOfSeriesRelatedInstances", 0x0020, 0x1209, IS),

    // image pixel
    /// SamplesPerPixel (0028,0002) US
    (SAMPLES_PER_PIXEL, "SamplesPerPixel", 0x0028, 0x0002, US),
    /// PhotometricInterpretation (0028,0004) CS
    (PHOTOMETRIC_INTERPRETATION, "PhotometricInterpretation", 0x0028, 0x0004, CS),
    /// PlanarConfiguration (0028,0006) US
    (PLANAR_CONFIGURATION, "PlanarConfiguration", 0x0028, 0x0006, US),
    /// NumberOfFrames (0028,0008) IS
    (NUMBER_OF_FRAMES, "NumberOfFrames", 0x0028, 0x0008, IS),
    /// Rows (0028,0010) US
    (ROWS, "Rows", 0x0028, 0x0010, US),
    /// Columns (0028,0011) US
    (COLUMNS, "Columns", 0x0028, 0x0011, US),
    /// PixelSpacing (0028,0030) DS
    (PIXEL_SPACING, "PixelSpacing", 0x0028, 0x0030, DS),
    /// BitsAllocated (0028,0100) US
    (BITS_ALLOCATED, "BitsAllocated", 0x0028, 0x0100, US),
    /// BitsStored (0028,0101) US
    (BITS_STORED, "BitsStored", 0x0028, 0x0101, US),
    /// HighBit (0028,0102) US
    (HIGH_BIT, "HighBit", 0x0028, 0x0102, US),
    /// PixelRepresentation (0028,0103) US
    (PIXEL_REPRESENTATION, "PixelRepresentation", 0x0028, 0x0103, US),
    /// SmallestImagePixelValue (0028,0106) US
    (SMALLEST_IMAGE_PIXEL_VALUE, "SmallestImagePixelValue", 0x0028, 0x0106, US),
    /// LargestImagePixelValue (0028,0107) US
    (LARGEST_IMAGE_PIXEL_VALUE, "LargestImagePixelValue", 0x0028, 0x0107, US),
    /// WindowCenter (0028,1050) DS
    (WINDOW_CENTER, "WindowCenter", 0x0028, 0x1050, DS),
    /// WindowWidth (0028,1051) DS
    (WINDOW_WIDTH, "WindowWidth", 0x0028, 0x1051, DS),
    /// RescaleIntercept (0028,1052) DS
    (RESCALE_INTERCEPT, "RescaleIntercept", 0x0028, 0x1052, DS),
    /// RescaleSlope (0028,1053) DS
    (RESCALE_SLOPE, "RescaleSlope", 0x0028, 0x1053, DS),
    /// LossyImageCompression (0028,2110) CS
    (LOSSY_IMAGE_COMPRESSION, "LossyImageCompression", 0x0028, 0x2110, CS),

    // directory records
    /// DirectoryRecordSequence (0004,1220) SQ
    (DIRECTORY_RECORD_SEQUENCE, "DirectoryRecordSequence", 0x0004, 0x1220, SQ),

    // misc
    /// RequestAttributesSequence (0040,0275) SQ
    (REQUEST_ATTRIBUTES_SEQUENCE, "RequestAttributesSequence", 0x0040, 0x0275, SQ),
    /// ContentSequence (0040,A730) SQ
    (CONTENT_SEQUENCE, "ContentSequence", 0x0040, 0xA730, SQ),
    /// IconImageSequence (0088,0200) SQ
    (ICON_IMAGE_SEQUENCE, "IconImageSequence", 0x0088, 0x0200, SQ),
    /// PixelData (7FE0,0010) OB
    (PIXEL_DATA, "PixelData", 0x7FE0, 0x0010, OB),

    // sequence delimitation
    /// Item (FFFE,E000)
    (ITEM, "Item", 0xFFFE, 0xE000, UN),
    /// ItemDelimitationItem (FFFE,E00D)
    (ITEM_DELIMITATION_ITEM, "ItemDelimitationItem", 0xFFFE, 0xE00D, UN),
    /// SequenceDelimitationItem (FFFE,E0DD)
    (SEQUENCE_DELIMITATION_ITEM, "SequenceDelimitationItem", 0xFFFE, 0xE0DD, UN),
}
