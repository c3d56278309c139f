use crate::{SampleType, WsaError, WsaResult};

/// Тип VRT пакета (старшие 4 бита первого слова)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// IF-данные со stream id
    IfData = 1,
    /// Контекст приёмника или дигитайзера
    Context = 4,
    /// Расширенный контекст
    ExtensionContext = 5,
}

/// Известные идентификаторы потоков инструмента.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StreamId {
    /// Контекст приёмника (частота, усиление, температура)
    ReceiverContext = 0x9000_0001,
    /// Контекст дигитайзера (полоса, опорный уровень)
    DigitizerContext = 0x9000_0002,
    /// Данные: I16 + Q16 в одном слове
    IfDataI16Q16 = 0x9000_0003,
    /// Расширенный контекст (sweep/stream start id)
    ExtensionContext = 0x9000_0004,
    /// Данные: два I16 отсчёта в слове
    IfDataI16 = 0x9000_0005,
    /// Данные: один I32 отсчёт в слове
    IfDataI32 = 0x9000_0006,
}

impl PacketType {
    pub fn from_u8(v: u8) -> WsaResult<Self> {
        match v {
            1 => Ok(PacketType::IfData),
            4 => Ok(PacketType::Context),
            5 => Ok(PacketType::ExtensionContext),
            _ => Err(WsaError::UnknownFrame(format!("Unknown packet type: {v}"))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl StreamId {
    pub fn from_u32(v: u32) -> WsaResult<Self> {
        match v {
            0x9000_0001 => Ok(StreamId::ReceiverContext),
            0x9000_0002 => Ok(StreamId::DigitizerContext),
            0x9000_0003 => Ok(StreamId::IfDataI16Q16),
            0x9000_0004 => Ok(StreamId::ExtensionContext),
            0x9000_0005 => Ok(StreamId::IfDataI16),
            0x9000_0006 => Ok(StreamId::IfDataI32),
            _ => Err(WsaError::UnknownFrame(format!(
                "Unknown stream id: {v:#010x}"
            ))),
        }
    }

    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Кодировка отсчётов для потоков данных, `None` для контекстных.
    pub fn sample_type(&self) -> Option<SampleType> {
        match self {
            StreamId::IfDataI16Q16 => Some(SampleType::I16Q16),
            StreamId::IfDataI16 => Some(SampleType::I16),
            StreamId::IfDataI32 => Some(SampleType::I32),
            _ => None,
        }
    }

    /// Тип пакета, которым обязан приходить этот поток.
    pub fn packet_type(&self) -> PacketType {
        match self {
            StreamId::ReceiverContext | StreamId::DigitizerContext => PacketType::Context,
            StreamId::ExtensionContext => PacketType::ExtensionContext,
            _ => PacketType::IfData,
        }
    }

    /// Индекс потока для счётчиков порядка пакетов.
    pub fn index(&self) -> usize {
        (self.as_u32() & 0x0f) as usize - 1
    }

    pub const ALL: [StreamId; 6] = [
        StreamId::ReceiverContext,
        StreamId::DigitizerContext,
        StreamId::IfDataI16Q16,
        StreamId::ExtensionContext,
        StreamId::IfDataI16,
        StreamId::IfDataI32,
    ];
}

impl std::fmt::Display for StreamId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            StreamId::ReceiverContext => "receiver",
            StreamId::DigitizerContext => "digitizer",
            StreamId::IfDataI16Q16 => "i16q16",
            StreamId::ExtensionContext => "extension",
            StreamId::IfDataI16 => "i16",
            StreamId::IfDataI32 => "i32",
        };
        write!(f, "{name}")
    }
}
