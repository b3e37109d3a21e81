//! DIMSE command sets.
//!
//! A command set is a data set of group 0000 elements,
//! always encoded in Implicit VR Little Endian
//! and led by its Command Group Length.
use super::{
    DecodeCommandSnafu, EncodeCommandSnafu, MissingCommandFieldSnafu, Result, SetAttributeSnafu,
    UnrecognizedDIMSECommandSnafu,
};
use dicomkit_core::{Tag, Value};
use dicomkit_dictionary_std::tags;
use dicomkit_object::{DataSet, ReadOptions, TransferSyntax};
use snafu::{OptionExt, ResultExt};
use std::fmt;

/// Command Data Set Type value meaning that no data set follows the command.
pub const NO_DATA_SET: u16 = 0x0101;

/// The DIMSE operation carried by a command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandField {
    CEchoRq,
    CEchoRsp,
    CFindRq,
    CFindRsp,
    CStoreRq,
    CStoreRsp,
    CMoveRq,
    CMoveRsp,
    CGetRq,
    CGetRsp,
    CCancelRq,
}

impl CommandField {
    pub fn from_code(code: u16) -> Option<Self> {
        use CommandField::*;
        Some(match code {
            0x0030 => CEchoRq,
            0x8030 => CEchoRsp,
            0x0020 => CFindRq,
            0x8020 => CFindRsp,
            0x0001 => CStoreRq,
            0x8001 => CStoreRsp,
            0x0021 => CMoveRq,
            0x8021 => CMoveRsp,
            0x0010 => CGetRq,
            0x8010 => CGetRsp,
            0x0FFF => CCancelRq,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        use CommandField::*;
        match self {
            CEchoRq => 0x0030,
            CEchoRsp => 0x8030,
            CFindRq => 0x0020,
            CFindRsp => 0x8020,
            CStoreRq => 0x0001,
            CStoreRsp => 0x8001,
            CMoveRq => 0x0021,
            CMoveRsp => 0x8021,
            CGetRq => 0x0010,
            CGetRsp => 0x8010,
            CCancelRq => 0x0FFF,
        }
    }

    /// Whether this is a response to a request.
    pub fn is_response(self) -> bool {
        self.code() & 0x8000 != 0
    }
}

impl fmt::Display for CommandField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CommandField::*;
        f.write_str(match self {
            CEchoRq => "C-ECHO-RQ",
            CEchoRsp => "C-ECHO-RSP",
            CFindRq => "C-FIND-RQ",
            CFindRsp => "C-FIND-RSP",
            CStoreRq => "C-STORE-RQ",
            CStoreRsp => "C-STORE-RSP",
            CMoveRq => "C-MOVE-RQ",
            CMoveRsp => "C-MOVE-RSP",
            CGetRq => "C-GET-RQ",
            CGetRsp => "C-GET-RSP",
            CCancelRq => "C-CANCEL-RQ",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low = 0x0002,
    Medium = 0x0000,
    High = 0x0001,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// A DIMSE status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Success,
    Pending,
    Cancel,
    Warning,
    Failure,
}

impl Status {
    pub const SUCCESS: Status = Status(0x0000);
    pub const PENDING: Status = Status(0xFF00);
    /// pending, with optional keys not supported
    pub const PENDING_WARNING: Status = Status(0xFF01);
    pub const CANCEL: Status = Status(0xFE00);
    /// generic failure: unable to process
    pub const UNABLE_TO_PROCESS: Status = Status(0xC000);
    pub const SOP_CLASS_NOT_SUPPORTED: Status = Status(0x0122);

    pub fn class(self) -> StatusClass {
        match self.0 {
            0x0000 => StatusClass::Success,
            0xFF00 | 0xFF01 => StatusClass::Pending,
            0xFE00 => StatusClass::Cancel,
            0x0001 | 0xB000..=0xBFFF => StatusClass::Warning,
            _ => StatusClass::Failure,
        }
    }

    pub fn is_pending(self) -> bool {
        self.class() == StatusClass::Pending
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}H ({:?})", self.0, self.class())
    }
}

/// The level of a query or retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryRetrieveLevel {
    Patient,
    Study,
    Series,
    Image,
}

impl QueryRetrieveLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryRetrieveLevel::Patient => "PATIENT",
            QueryRetrieveLevel::Study => "STUDY",
            QueryRetrieveLevel::Series => "SERIES",
            QueryRetrieveLevel::Image => "IMAGE",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "PATIENT" => Some(QueryRetrieveLevel::Patient),
            "STUDY" => Some(QueryRetrieveLevel::Study),
            "SERIES" => Some(QueryRetrieveLevel::Series),
            "IMAGE" => Some(QueryRetrieveLevel::Image),
            _ => None,
        }
    }
}

/// Sub-operation counters of C-MOVE and C-GET responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubOperations {
    pub remaining: u16,
    pub completed: u16,
    pub failed: u16,
    pub warning: u16,
}

/// A DIMSE command set.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    field: CommandField,
    set: DataSet,
}

impl Command {
    fn build(field: CommandField, has_data_set: bool, entries: Vec<(Tag, Value)>) -> Result<Self> {
        let mut set = DataSet::without_header(TransferSyntax::implicit_vr_le());
        set.set_tag(tags::COMMAND_FIELD, field.code())
            .context(SetAttributeSnafu)?;
        let data_set_type = if has_data_set { 0x0000_u16 } else { NO_DATA_SET };
        set.set_tag(tags::COMMAND_DATA_SET_TYPE, data_set_type)
            .context(SetAttributeSnafu)?;
        for (tag, value) in entries {
            set.set_tag(tag, value).context(SetAttributeSnafu)?;
        }
        Ok(Command { field, set })
    }

    pub fn echo_rq(message_id: u16) -> Result<Self> {
        Command::build(
            CommandField::CEchoRq,
            false,
            vec![
                (tags::AFFECTED_SOP_CLASS_UID, Value::from(dicomkit_dictionary_std::uids::VERIFICATION)),
                (tags::MESSAGE_ID, Value::from(message_id)),
            ],
        )
    }

    pub fn echo_rsp(message_id: u16, status: Status) -> Result<Self> {
        Command::build(
            CommandField::CEchoRsp,
            false,
            vec![
                (tags::AFFECTED_SOP_CLASS_UID, Value::from(dicomkit_dictionary_std::uids::VERIFICATION)),
                (tags::MESSAGE_ID_BEING_RESPONDED_TO, Value::from(message_id)),
                (tags::STATUS, Value::from(status.0)),
            ],
        )
    }

    /// C-FIND request, followed by the identifier data set.
    pub fn find_rq(message_id: u16, sop_class_uid: &str, priority: Priority) -> Result<Self> {
        Command::build(
            CommandField::CFindRq,
            true,
            vec![
                (tags::AFFECTED_SOP_CLASS_UID, Value::from(sop_class_uid)),
                (tags::MESSAGE_ID, Value::from(message_id)),
                (tags::PRIORITY, Value::from(priority as u16)),
            ],
        )
    }

    /// C-FIND response. Pending responses carry an identifier.
    pub fn find_rsp(message_id: u16, sop_class_uid: &str, status: Status) -> Result<Self> {
        Command::build(
            CommandField::CFindRsp,
            status.is_pending(),
            vec![
                (tags::AFFECTED_SOP_CLASS_UID, Value::from(sop_class_uid)),
                (tags::MESSAGE_ID_BEING_RESPONDED_TO, Value::from(message_id)),
                (tags::STATUS, Value::from(status.0)),
            ],
        )
    }

    /// C-STORE request, followed by the data set to store.
    pub fn store_rq(
        message_id: u16,
        sop_class_uid: &str,
        sop_instance_uid: &str,
        priority: Priority,
    ) -> Result<Self> {
        Command::build(
            CommandField::CStoreRq,
            true,
            vec![
                (tags::AFFECTED_SOP_CLASS_UID, Value::from(sop_class_uid)),
                (tags::MESSAGE_ID, Value::from(message_id)),
                (tags::PRIORITY, Value::from(priority as u16)),
                (tags::AFFECTED_SOP_INSTANCE_UID, Value::from(sop_instance_uid)),
            ],
        )
    }

    pub fn store_rsp(
        message_id: u16,
        sop_class_uid: &str,
        sop_instance_uid: &str,
        status: Status,
    ) -> Result<Self> {
        Command::build(
            CommandField::CStoreRsp,
            false,
            vec![
                (tags::AFFECTED_SOP_CLASS_UID, Value::from(sop_class_uid)),
                (tags::MESSAGE_ID_BEING_RESPONDED_TO, Value::from(message_id)),
                (tags::STATUS, Value::from(status.0)),
                (tags::AFFECTED_SOP_INSTANCE_UID, Value::from(sop_instance_uid)),
            ],
        )
    }

    /// C-MOVE request, followed by the identifier data set.
    pub fn move_rq(
        message_id: u16,
        sop_class_uid: &str,
        priority: Priority,
        move_destination: &str,
    ) -> Result<Self> {
        Command::build(
            CommandField::CMoveRq,
            true,
            vec![
                (tags::AFFECTED_SOP_CLASS_UID, Value::from(sop_class_uid)),
                (tags::MESSAGE_ID, Value::from(message_id)),
                (tags::PRIORITY, Value::from(priority as u16)),
                (tags::MOVE_DESTINATION, Value::from(move_destination)),
            ],
        )
    }

    pub fn move_rsp(
        message_id: u16,
        sop_class_uid: &str,
        status: Status,
        sub_operations: SubOperations,
    ) -> Result<Self> {
        Command::retrieve_rsp(CommandField::CMoveRsp, message_id, sop_class_uid, status, sub_operations)
    }

    /// C-GET request, followed by the identifier data set.
    pub fn get_rq(message_id: u16, sop_class_uid: &str, priority: Priority) -> Result<Self> {
        Command::build(
            CommandField::CGetRq,
            true,
            vec![
                (tags::AFFECTED_SOP_CLASS_UID, Value::from(sop_class_uid)),
                (tags::MESSAGE_ID, Value::from(message_id)),
                (tags::PRIORITY, Value::from(priority as u16)),
            ],
        )
    }

    pub fn get_rsp(
        message_id: u16,
        sop_class_uid: &str,
        status: Status,
        sub_operations: SubOperations,
    ) -> Result<Self> {
        Command::retrieve_rsp(CommandField::CGetRsp, message_id, sop_class_uid, status, sub_operations)
    }

    fn retrieve_rsp(
        field: CommandField,
        message_id: u16,
        sop_class_uid: &str,
        status: Status,
        sub_operations: SubOperations,
    ) -> Result<Self> {
        let mut entries = vec![
            (tags::AFFECTED_SOP_CLASS_UID, Value::from(sop_class_uid)),
            (tags::MESSAGE_ID_BEING_RESPONDED_TO, Value::from(message_id)),
            (tags::STATUS, Value::from(status.0)),
        ];
        // remaining sub-operations only make sense while pending
        if status.is_pending() {
            entries.push((tags::NUMBER_OF_REMAINING_SUBOPERATIONS, Value::from(sub_operations.remaining)));
        }
        entries.extend(vec![
            (tags::NUMBER_OF_COMPLETED_SUBOPERATIONS, Value::from(sub_operations.completed)),
            (tags::NUMBER_OF_FAILED_SUBOPERATIONS, Value::from(sub_operations.failed)),
            (tags::NUMBER_OF_WARNING_SUBOPERATIONS, Value::from(sub_operations.warning)),
        ]);
        Command::build(field, false, entries)
    }

    /// C-CANCEL request for the operation started with `message_id`.
    pub fn cancel_rq(message_id: u16) -> Result<Self> {
        Command::build(
            CommandField::CCancelRq,
            false,
            vec![(tags::MESSAGE_ID_BEING_RESPONDED_TO, Value::from(message_id))],
        )
    }

    /// Decode a command set from its Implicit VR Little Endian encoding.
    ///
    /// Fails with `UnrecognizedDIMSECommand`
    /// if the Command Field holds an unknown operation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let set = ReadOptions::new()
            .read_header(false)
            .transfer_syntax(TransferSyntax::implicit_vr_le())
            .load(bytes)
            .context(DecodeCommandSnafu)?;
        let code: u16 = set
            .get(tags::COMMAND_FIELD)
            .and_then(|e| e.value().to_int().ok())
            .context(MissingCommandFieldSnafu)?;
        let field = CommandField::from_code(code)
            .context(UnrecognizedDIMSECommandSnafu { command_field: code })?;
        Ok(Command { field, set })
    }

    /// Encode the command set, with the Command Group Length computed.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut set = self.set.clone();
        set.remove(tags::COMMAND_GROUP_LENGTH);
        let length = set.to_bytes().context(EncodeCommandSnafu)?.len() as u32;
        set.set_tag(tags::COMMAND_GROUP_LENGTH, length)
            .context(SetAttributeSnafu)?;
        set.to_bytes().context(EncodeCommandSnafu)
    }

    pub fn field(&self) -> CommandField {
        self.field
    }

    /// The underlying command set.
    pub fn data_set(&self) -> &DataSet {
        &self.set
    }

    fn u16_of(&self, tag: Tag) -> Option<u16> {
        self.set.get(tag)?.value().to_int().ok()
    }

    fn str_of(&self, tag: Tag) -> Option<String> {
        self.set
            .get(tag)?
            .value()
            .to_str()
            .ok()
            .map(|s| s.into_owned())
    }

    pub fn message_id(&self) -> Option<u16> {
        self.u16_of(tags::MESSAGE_ID)
    }

    pub fn message_id_being_responded_to(&self) -> Option<u16> {
        self.u16_of(tags::MESSAGE_ID_BEING_RESPONDED_TO)
    }

    pub fn status(&self) -> Option<Status> {
        self.u16_of(tags::STATUS).map(Status)
    }

    pub fn priority(&self) -> Option<u16> {
        self.u16_of(tags::PRIORITY)
    }

    pub fn affected_sop_class_uid(&self) -> Option<String> {
        self.str_of(tags::AFFECTED_SOP_CLASS_UID)
    }

    pub fn affected_sop_instance_uid(&self) -> Option<String> {
        self.str_of(tags::AFFECTED_SOP_INSTANCE_UID)
    }

    pub fn move_destination(&self) -> Option<String> {
        self.str_of(tags::MOVE_DESTINATION)
    }

    pub fn sub_operations(&self) -> SubOperations {
        SubOperations {
            remaining: self.u16_of(tags::NUMBER_OF_REMAINING_SUBOPERATIONS).unwrap_or(0),
            completed: self.u16_of(tags::NUMBER_OF_COMPLETED_SUBOPERATIONS).unwrap_or(0),
            failed: self.u16_of(tags::NUMBER_OF_FAILED_SUBOPERATIONS).unwrap_or(0),
            warning: self.u16_of(tags::NUMBER_OF_WARNING_SUBOPERATIONS).unwrap_or(0),
        }
    }

    /// Whether a data set follows this command.
    pub fn has_data_set(&self) -> bool {
        self.u16_of(tags::COMMAND_DATA_SET_TYPE)
            .map(|t| t != NO_DATA_SET)
            .unwrap_or(false)
    }
}
