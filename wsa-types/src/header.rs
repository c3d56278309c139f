use crate::{PacketType, StreamId};

/// Метка времени VRT: целые секунды UTC + доля в пикосекундах.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct VrtTimestamp {
    pub seconds: u32,
    /// Всегда меньше 10^12
    pub picoseconds: u64,
}

/// Заголовок VRT пакета (5 слов по 32 бита)
#[derive(Debug, Clone, PartialEq)]
pub struct VrtHeader {
    /// Тип пакета
    pub packet_type: PacketType,
    /// Счётчик порядка пакетов (4 бита, 0..=15)
    pub packet_count: u8,
    /// Полный размер пакета в 32-битных словах
    pub packet_size: u16,
    /// Идентификатор потока
    pub stream_id: StreamId,
    /// Бит наличия трейлера
    pub has_trailer: bool,
    /// Метка времени
    pub timestamp: VrtTimestamp,
}

impl VrtTimestamp {
    pub const PICOS_PER_SECOND: u64 = 1_000_000_000_000;

    pub fn new(
        seconds: u32,
        picoseconds: u64,
    ) -> Self {
        Self {
            seconds,
            picoseconds,
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + self.picoseconds as f64 / Self::PICOS_PER_SECOND as f64
    }
}

impl VrtHeader {
    /// Размер заголовка в словах.
    pub const WORDS: usize = 5;

    /// Количество слов полезной нагрузки (без заголовка и трейлера).
    pub fn payload_words(&self) -> usize {
        (self.packet_size as usize)
            .saturating_sub(Self::WORDS)
            .saturating_sub(self.has_trailer as usize)
    }

    /// Количество отсчётов, которые несёт пакет данных.
    pub fn samples_per_packet(&self) -> usize {
        match self.stream_id.sample_type() {
            Some(t) => self.payload_words() * t.samples_per_word(),
            None => 0,
        }
    }
}
