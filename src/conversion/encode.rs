//! FIT course encoder.
//!
//! A FIT file is a 14-byte header, a stream of records and a trailing CRC:
//!
//! * Definition records (`0x40 | local`) declare, for a local message type
//!   0-15, the global message number and the `(number, size, base type)`
//!   triple of every field.
//! * Data records (`local`, high bits clear) carry the raw field bytes in the
//!   order of the most recent definition for that local type.
//!
//! Courses only need five global messages and a handful of base types, so
//! both live in closed enums here. Every record uses local type 0 and
//! little-endian architecture.

use crate::conversion::types::{ConversionError, Course, ResolvedLap, TrackPoint};

pub const HEADER_SIZE: u8 = 14;
pub const PROTOCOL_VERSION: u8 = 0x10;
pub const PROFILE_VERSION: u16 = 411;
pub const FILE_SIGNATURE: [u8; 4] = *b".FIT";

const DATA_SIZE_OFFSET: usize = 4;
const DEFINITION_HEADER_BIT: u8 = 0x40;
const LOCAL_MESSAGE_MASK: u8 = 0x0F;
const ARCHITECTURE_LITTLE_ENDIAN: u8 = 0;
const LOCAL_MESSAGE: u8 = 0;

/// `file_id.type` value for course files.
pub const FILE_TYPE_COURSE: u8 = 6;
/// `event.event` value for the timer.
pub const EVENT_TIMER: u8 = 0;
pub const EVENT_TYPE_START: u8 = 0;
pub const EVENT_TYPE_STOP_DISABLE_ALL: u8 = 9;

const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
    0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
];

/// Global message numbers written into course files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalMessage {
    FileId,
    Lap,
    Record,
    Event,
    Course,
}

impl GlobalMessage {
    pub const fn as_u16(self) -> u16 {
        match self {
            GlobalMessage::FileId => 0,
            GlobalMessage::Lap => 19,
            GlobalMessage::Record => 20,
            GlobalMessage::Event => 21,
            GlobalMessage::Course => 31,
        }
    }
}

/// FIT base types used by the course messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Enum,
    Uint8,
    Uint8z,
    Uint16,
    Uint32,
    Uint32z,
    Sint32,
    String,
}

impl BaseType {
    pub const fn code(self) -> u8 {
        match self {
            BaseType::Enum => 0x00,
            BaseType::Uint8 => 0x02,
            BaseType::Uint8z => 0x0a,
            BaseType::Uint16 => 0x84,
            BaseType::Uint32 => 0x86,
            BaseType::Uint32z => 0x8c,
            BaseType::Sint32 => 0x85,
            BaseType::String => 0x07,
        }
    }

    /// Fixed width in bytes; strings are sized per value.
    pub const fn size(self) -> Option<u8> {
        match self {
            BaseType::Enum | BaseType::Uint8 | BaseType::Uint8z => Some(1),
            BaseType::Uint16 => Some(2),
            BaseType::Uint32 | BaseType::Uint32z | BaseType::Sint32 => Some(4),
            BaseType::String => None,
        }
    }
}

/// A typed field value. Strings hold their encoded bytes, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Enum(u8),
    Uint8(u8),
    Uint8z(u8),
    Uint16(u16),
    Uint32(u32),
    Uint32z(u32),
    Sint32(i32),
    String(Vec<u8>),
}

impl FieldValue {
    pub fn base_type(&self) -> BaseType {
        match self {
            FieldValue::Enum(_) => BaseType::Enum,
            FieldValue::Uint8(_) => BaseType::Uint8,
            FieldValue::Uint8z(_) => BaseType::Uint8z,
            FieldValue::Uint16(_) => BaseType::Uint16,
            FieldValue::Uint32(_) => BaseType::Uint32,
            FieldValue::Uint32z(_) => BaseType::Uint32z,
            FieldValue::Sint32(_) => BaseType::Sint32,
            FieldValue::String(_) => BaseType::String,
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            FieldValue::String(bytes) => bytes.len(),
            other => other.base_type().size().map_or(0, usize::from),
        }
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        match self {
            FieldValue::Enum(v) | FieldValue::Uint8(v) | FieldValue::Uint8z(v) => out.push(*v),
            FieldValue::Uint16(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Uint32(v) | FieldValue::Uint32z(v) => {
                out.extend_from_slice(&v.to_le_bytes())
            }
            FieldValue::Sint32(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::String(bytes) => out.extend_from_slice(bytes),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDefinition {
    pub number: u8,
    pub size: u8,
    pub base_type: BaseType,
}

impl FieldDefinition {
    /// Definition for a fixed-width base type.
    pub const fn fixed(number: u8, base_type: BaseType) -> Self {
        let size = match base_type.size() {
            Some(size) => size,
            None => 0,
        };
        Self {
            number,
            size,
            base_type,
        }
    }
}

const LAP_FIELDS: [FieldDefinition; 2] = [
    FieldDefinition::fixed(253, BaseType::Uint32), // timestamp
    FieldDefinition::fixed(2, BaseType::Uint32),   // start_time
];

const RECORD_FIELDS: [FieldDefinition; 4] = [
    FieldDefinition::fixed(253, BaseType::Uint32), // timestamp
    FieldDefinition::fixed(0, BaseType::Sint32),   // position_lat
    FieldDefinition::fixed(1, BaseType::Sint32),   // position_long
    FieldDefinition::fixed(5, BaseType::Uint32),   // distance
];

/// Garmin's nibble-table CRC-16 continued over `data`.
pub fn crc16_update(crc: u16, data: &[u8]) -> u16 {
    data.iter().fold(crc, |crc, byte| {
        let mut tmp = CRC_TABLE[(crc & 0xF) as usize];
        let mut crc = (crc >> 4) & 0x0FFF;
        crc ^= tmp ^ CRC_TABLE[(byte & 0xF) as usize];
        tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize]
    })
}

pub fn crc16(data: &[u8]) -> u16 {
    crc16_update(0, data)
}

/// In-memory FIT stream. The header is written up front with a zero data
/// size; [`FitWriter::finish`] patches it and appends the CRC.
#[derive(Debug)]
pub struct FitWriter {
    buffer: Vec<u8>,
}

impl Default for FitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FitWriter {
    pub fn new() -> Self {
        let mut buffer = Vec::with_capacity(256);
        buffer.push(HEADER_SIZE);
        buffer.push(PROTOCOL_VERSION);
        buffer.extend_from_slice(&PROFILE_VERSION.to_le_bytes());
        buffer.extend_from_slice(&0u32.to_le_bytes());
        buffer.extend_from_slice(&FILE_SIGNATURE);
        // Header CRC is optional and left at zero.
        buffer.extend_from_slice(&0u16.to_le_bytes());
        Self { buffer }
    }

    pub fn write_definition(
        &mut self,
        local: u8,
        message: GlobalMessage,
        fields: &[FieldDefinition],
    ) -> Result<(), ConversionError> {
        let field_count = u8::try_from(fields.len())
            .map_err(|_| ConversionError::Encoding("too many fields in definition".into()))?;

        self.buffer
            .push(DEFINITION_HEADER_BIT | (local & LOCAL_MESSAGE_MASK));
        self.buffer.push(0); // reserved
        self.buffer.push(ARCHITECTURE_LITTLE_ENDIAN);
        self.buffer
            .extend_from_slice(&message.as_u16().to_le_bytes());
        self.buffer.push(field_count);

        for field in fields {
            self.buffer.push(field.number);
            self.buffer.push(field.size);
            self.buffer.push(field.base_type.code());
        }
        Ok(())
    }

    /// Append a data record; `values` must follow the active definition.
    pub fn write_data(&mut self, local: u8, values: &[FieldValue]) {
        self.buffer.push(local & LOCAL_MESSAGE_MASK);
        for value in values {
            value.write_le(&mut self.buffer);
        }
    }

    /// Definition immediately followed by its single data record.
    pub fn write_message(
        &mut self,
        local: u8,
        message: GlobalMessage,
        fields: &[(u8, FieldValue)],
    ) -> Result<(), ConversionError> {
        let definitions = fields
            .iter()
            .map(|(number, value)| -> Result<FieldDefinition, ConversionError> {
                let size = u8::try_from(value.encoded_len()).map_err(|_| {
                    ConversionError::Encoding(format!("field {number} exceeds 255 bytes"))
                })?;
                Ok(FieldDefinition {
                    number: *number,
                    size,
                    base_type: value.base_type(),
                })
            })
            .collect::<Result<Vec<_>, ConversionError>>()?;

        self.write_definition(local, message, &definitions)?;

        let values: Vec<FieldValue> = fields.iter().map(|(_, value)| value.clone()).collect();
        self.write_data(local, &values);
        Ok(())
    }

    /// Bytes of records written so far (header excluded).
    pub fn data_len(&self) -> usize {
        self.buffer.len() - HEADER_SIZE as usize
    }

    /// Patch the header's data size and append the CRC of the record bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, ConversionError> {
        let data_size = u32::try_from(self.data_len())
            .map_err(|_| ConversionError::Encoding("course too large for FIT".into()))?;
        let crc = crc16(&self.buffer[HEADER_SIZE as usize..]);

        self.buffer.extend_from_slice(&crc.to_le_bytes());
        self.buffer[DATA_SIZE_OFFSET..DATA_SIZE_OFFSET + 4]
            .copy_from_slice(&data_size.to_le_bytes());
        Ok(self.buffer)
    }
}

/// Validate a course name and return its NUL-terminated bytes.
pub fn encode_course_name(name: &str) -> Result<Vec<u8>, ConversionError> {
    if !name.is_ascii() {
        return Err(ConversionError::Encoding(format!(
            "course name {name:?} contains non-ASCII characters"
        )));
    }
    if name.bytes().any(|byte| byte == 0) {
        return Err(ConversionError::Encoding(
            "course name contains a NUL byte".into(),
        ));
    }
    if name.len() >= u8::MAX as usize {
        return Err(ConversionError::Encoding(format!(
            "course name is {} bytes, at most 254 fit",
            name.len()
        )));
    }

    let mut bytes = Vec::with_capacity(name.len() + 1);
    bytes.extend_from_slice(name.as_bytes());
    bytes.push(0);
    Ok(bytes)
}

/// Serialize a course into a complete FIT file.
///
/// `time_created` is `file_id.time_created` in FIT epoch seconds. Fails,
/// before anything is written, when the course has no trackpoints or its name
/// cannot be stored as an ASCII string field.
pub fn encode_course(course: &Course, time_created: u32) -> Result<Vec<u8>, ConversionError> {
    let (first, last) = match (course.points.first(), course.points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(ConversionError::Encoding(
                "course has no trackpoints".into(),
            ));
        }
    };
    let name = encode_course_name(&course.name)?;

    let mut writer = FitWriter::new();

    writer.write_message(
        LOCAL_MESSAGE,
        GlobalMessage::FileId,
        &[
            (0, FieldValue::Enum(FILE_TYPE_COURSE)),
            (1, FieldValue::Uint16(1)), // manufacturer
            (2, FieldValue::Uint16(1)), // product
            (3, FieldValue::Uint32z(1)), // serial_number
            (4, FieldValue::Uint32(time_created)),
        ],
    )?;

    writer.write_message(
        LOCAL_MESSAGE,
        GlobalMessage::Course,
        &[(5, FieldValue::String(name))],
    )?;

    writer.write_definition(LOCAL_MESSAGE, GlobalMessage::Lap, &LAP_FIELDS)?;
    for lap in &course.laps {
        writer.write_data(LOCAL_MESSAGE, &lap_values(lap));
    }

    write_timer_event(&mut writer, first.timestamp, EVENT_TYPE_START)?;

    writer.write_definition(LOCAL_MESSAGE, GlobalMessage::Record, &RECORD_FIELDS)?;
    for point in &course.points {
        writer.write_data(LOCAL_MESSAGE, &record_values(point));
    }

    write_timer_event(&mut writer, last.timestamp, EVENT_TYPE_STOP_DISABLE_ALL)?;

    tracing::debug!(
        points = course.points.len(),
        laps = course.laps.len(),
        data_bytes = writer.data_len(),
        "encoded course records"
    );

    writer.finish()
}

// Slot 253 carries the conventional zero; the matched time lands in start_time.
fn lap_values(lap: &ResolvedLap) -> [FieldValue; 2] {
    [
        FieldValue::Uint32(lap.start_timestamp),
        FieldValue::Uint32(lap.timestamp),
    ]
}

fn record_values(point: &TrackPoint) -> [FieldValue; 4] {
    [
        FieldValue::Uint32(point.timestamp),
        FieldValue::Sint32(point.latitude),
        FieldValue::Sint32(point.longitude),
        FieldValue::Uint32(point.cumulative_distance),
    ]
}

fn write_timer_event(
    writer: &mut FitWriter,
    timestamp: u32,
    event_type: u8,
) -> Result<(), ConversionError> {
    writer.write_message(
        LOCAL_MESSAGE,
        GlobalMessage::Event,
        &[
            (253, FieldValue::Uint32(timestamp)),
            (0, FieldValue::Enum(EVENT_TIMER)),
            (4, FieldValue::Uint8(0)), // event_group
            (1, FieldValue::Enum(event_type)),
        ],
    )
}
