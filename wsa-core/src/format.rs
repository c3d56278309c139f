//! Формат пакетов VITA Radio Transport (VRT) инструментов WSA.
//!
//! Каждый пакет начинается с фиксированного заголовка из 5 слов по 32 бита,
//! за которым следует тело (контекст или отсчёты) и, для IF-данных,
//! необязательный трейлер из одного слова. Все числа big-endian.
//!
//! ```text
//! слово 0: тип[31:28] | трейлер[26] | TSI[23:22] | TSF[21:20] | счётчик[19:16] | размер[15:0]
//! слово 1: stream id
//! слово 2: секунды
//! слова 3-4: пикосекунды
//! ```

use wsa_types::{
    DigitizerContext, ExtensionContext, IfData, PacketType, ReceiverContext, SampleData,
    SampleType, StreamId, VrtBody, VrtHeader, VrtPacket, VrtTimestamp, VrtTrailer, WsaError,
    WsaResult,
};

use crate::binary::*;

/// Размер заголовка в байтах
pub const VRT_HEADER_SIZE: usize = VrtHeader::WORDS * 4;

/// Максимальный размер пакета в словах (16-битное поле)
pub const VRT_MAX_PACKET_WORDS: usize = 0xffff;

pub const TRAILER_PRESENT_BIT: u32 = 1 << 26;
pub const TSI_MASK: u32 = 0x00c0_0000;
/// TSI = 1: целые секунды UTC
pub const TSI_UTC: u32 = 0x0040_0000;
/// TSF = 2: дробная часть в пикосекундах реального времени
pub const TSF_PICOSECONDS: u32 = 0x0020_0000;

// Маски индикаторного слова контекста приёмника
pub const RECEIVER_REF_POINT_MASK: u32 = 0x4000_0000;
pub const RECEIVER_FREQ_MASK: u32 = 0x0800_0000;
pub const RECEIVER_GAIN_MASK: u32 = 0x0080_0000;
pub const RECEIVER_TEMPERATURE_MASK: u32 = 0x0004_0000;

// Маски контекста дигитайзера
pub const DIGITIZER_BW_MASK: u32 = 0xa000_0000;
pub const DIGITIZER_RF_FREQ_OFFSET_MASK: u32 = 0x0400_0000;
pub const DIGITIZER_REF_LEVEL_MASK: u32 = 0x0100_0000;

// Маски расширенного контекста
pub const EXTENSION_SWEEP_START_ID_MASK: u32 = 0x0000_0001;
pub const EXTENSION_STREAM_START_ID_MASK: u32 = 0x0000_0002;

// Биты трейлера: (разрешение, индикатор)
pub const TRAILER_VALID_DATA: (u32, u32) = (1 << 30, 1 << 18);
pub const TRAILER_REF_LOCK: (u32, u32) = (1 << 29, 1 << 17);
pub const TRAILER_SPECTRAL_INVERSION: (u32, u32) = (1 << 26, 1 << 14);
pub const TRAILER_OVER_RANGE: (u32, u32) = (1 << 25, 1 << 13);
pub const TRAILER_SAMPLE_LOSS: (u32, u32) = (1 << 24, 1 << 12);

/// Частоты и полосы: 64-битное число с 20-битной дробной частью
const FREQ_RADIX: f64 = (1u64 << 20) as f64;
/// Усиление и опорный уровень: 16-битное число с 7-битной дробной частью
const GAIN_RADIX: f64 = 128.0;
/// Температура: 16-битное число с 6-битной дробной частью
const TEMPERATURE_RADIX: f64 = 64.0;

/// Кодирование/декодирование заголовка VRT.
pub trait VrtHeaderExt: Sized {
    fn encode(
        &self,
        buf: &mut Vec<u8>,
    ) -> WsaResult<()>;
    fn decode(buf: &[u8]) -> WsaResult<Self>;
}

/// Кодирование/декодирование тела контекстного пакета.
pub trait ContextBodyExt: Sized {
    fn encode_body(
        &self,
        buf: &mut Vec<u8>,
    ) -> WsaResult<()>;
    fn decode_body(body: &[u8]) -> WsaResult<Self>;
}

pub trait VrtTrailerExt: Sized {
    fn to_word(&self) -> u32;
    fn from_word(word: u32) -> Self;
}

/// Кодирование/декодирование пакета целиком.
pub trait VrtPacketExt: Sized {
    fn encode(&self) -> WsaResult<Vec<u8>>;
    /// Возвращает пакет и количество прочитанных байт.
    fn decode(buf: &[u8]) -> WsaResult<(Self, usize)>;
}

////////////////////////////////////////////////////////////////////////////////
// Заголовок
////////////////////////////////////////////////////////////////////////////////

impl VrtHeaderExt for VrtHeader {
    fn encode(
        &self,
        buf: &mut Vec<u8>,
    ) -> WsaResult<()> {
        if self.timestamp.picoseconds >= VrtTimestamp::PICOS_PER_SECOND {
            return Err(WsaError::invalid_timestamp(format!(
                "picoseconds {} out of range",
                self.timestamp.picoseconds
            )));
        }

        let mut word0 = (self.packet_type.as_u8() as u32) << 28
            | TSI_UTC
            | TSF_PICOSECONDS
            | ((self.packet_count & 0x0f) as u32) << 16
            | self.packet_size as u32;

        if self.has_trailer {
            word0 |= TRAILER_PRESENT_BIT;
        }

        write_u32_be(buf, word0);
        write_u32_be(buf, self.stream_id.as_u32());
        write_u32_be(buf, self.timestamp.seconds);
        write_u64_be(buf, self.timestamp.picoseconds);

        Ok(())
    }

    fn decode(buf: &[u8]) -> WsaResult<Self> {
        let mut off = 0;

        let word0 = read_u32_be(buf, &mut off)?;
        let raw_stream = read_u32_be(buf, &mut off)?;

        let packet_type = PacketType::from_u8((word0 >> 28) as u8)?;
        let stream_id = StreamId::from_u32(raw_stream)?;

        if stream_id.packet_type() != packet_type {
            return Err(WsaError::unknown_frame(format!(
                "stream {stream_id} cannot be carried by packet type {}",
                packet_type.as_u8()
            )));
        }

        if word0 & TSI_MASK == 0 {
            return Err(WsaError::invalid_timestamp(
                "integer timestamp field not present",
            ));
        }

        let seconds = read_u32_be(buf, &mut off)?;
        let raw_picos = read_u64_be(buf, &mut off)?;
        let picoseconds = if word0 & TSF_PICOSECONDS != 0 {
            raw_picos
        } else {
            0
        };

        if picoseconds >= VrtTimestamp::PICOS_PER_SECOND {
            return Err(WsaError::invalid_timestamp(format!(
                "picoseconds {picoseconds} out of range"
            )));
        }

        // трейлер бывает только у IF-данных
        let has_trailer = packet_type == PacketType::IfData && word0 & TRAILER_PRESENT_BIT != 0;
        let packet_size = (word0 & 0xffff) as u16;

        let min_words = VrtHeader::WORDS
            + has_trailer as usize
            + (packet_type != PacketType::IfData) as usize;
        if (packet_size as usize) < min_words {
            return Err(WsaError::format_violation(format!(
                "packet size {packet_size} words is smaller than minimum {min_words}"
            )));
        }

        Ok(VrtHeader {
            packet_type,
            packet_count: ((word0 >> 16) & 0x0f) as u8,
            packet_size,
            stream_id,
            has_trailer,
            timestamp: VrtTimestamp::new(seconds, picoseconds),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Контексты
////////////////////////////////////////////////////////////////////////////////

fn has(
    indicator: u32,
    mask: u32,
) -> bool {
    indicator & mask == mask
}

fn indicator_bits(
    indicator: u32,
    bit: u32,
    present: bool,
) -> u32 {
    if present {
        indicator | bit
    } else {
        indicator & !bit
    }
}

fn read_fixed_point(
    body: &[u8],
    off: &mut usize,
) -> WsaResult<f64> {
    Ok(read_i64_be(body, off)? as f64 / FREQ_RADIX)
}

fn write_fixed_point(
    buf: &mut Vec<u8>,
    val: f64,
) {
    write_i64_be(buf, (val * FREQ_RADIX).round() as i64);
}

/// Нижние 16 бит слова как знаковое число с заданной дробной частью.
fn read_low_half(
    body: &[u8],
    off: &mut usize,
    radix: f64,
) -> WsaResult<f64> {
    let word = read_u32_be(body, off)?;
    Ok((word & 0xffff) as u16 as i16 as f64 / radix)
}

fn to_radix(
    val: f64,
    radix: f64,
) -> u16 {
    (val * radix).round() as i16 as u16
}

impl ContextBodyExt for ReceiverContext {
    fn encode_body(
        &self,
        buf: &mut Vec<u8>,
    ) -> WsaResult<()> {
        // оба усиления лежат в одном слове и не кодируются по отдельности
        let gains = match (self.if_gain, self.rf_gain) {
            (Some(if_gain), Some(rf_gain)) => Some((if_gain, rf_gain)),
            (None, None) => None,
            _ => {
                return Err(WsaError::format_violation(
                    "receiver context needs both IF and RF gain or neither",
                ))
            }
        };

        let mut indicator = self.indicator;
        indicator = indicator_bits(
            indicator,
            RECEIVER_REF_POINT_MASK,
            self.reference_point.is_some(),
        );
        indicator = indicator_bits(indicator, RECEIVER_FREQ_MASK, self.frequency.is_some());
        indicator = indicator_bits(indicator, RECEIVER_GAIN_MASK, gains.is_some());
        indicator = indicator_bits(
            indicator,
            RECEIVER_TEMPERATURE_MASK,
            self.temperature.is_some(),
        );

        write_u32_be(buf, indicator);

        if let Some(point) = self.reference_point {
            write_i32_be(buf, point);
        }
        if let Some(freq) = self.frequency {
            write_fixed_point(buf, freq);
        }
        if let Some((if_gain, rf_gain)) = gains {
            let if_gain = to_radix(if_gain, GAIN_RADIX) as u32;
            let rf_gain = to_radix(rf_gain, GAIN_RADIX) as u32;
            write_u32_be(buf, if_gain << 16 | rf_gain);
        }
        if let Some(temp) = self.temperature {
            write_u32_be(buf, to_radix(temp, TEMPERATURE_RADIX) as u32);
        }

        Ok(())
    }

    fn decode_body(body: &[u8]) -> WsaResult<Self> {
        let mut off = 0;
        let indicator = read_u32_be(body, &mut off)?;
        let mut ctx = ReceiverContext {
            indicator,
            ..Default::default()
        };

        if has(indicator, RECEIVER_REF_POINT_MASK) {
            ctx.reference_point = Some(read_i32_be(body, &mut off)?);
        }
        if has(indicator, RECEIVER_FREQ_MASK) {
            ctx.frequency = Some(read_fixed_point(body, &mut off)?);
        }
        if has(indicator, RECEIVER_GAIN_MASK) {
            ctx.if_gain = Some(read_i16_be(body, &mut off)? as f64 / GAIN_RADIX);
            ctx.rf_gain = Some(read_i16_be(body, &mut off)? as f64 / GAIN_RADIX);
        }
        if has(indicator, RECEIVER_TEMPERATURE_MASK) {
            ctx.temperature = Some(read_low_half(body, &mut off, TEMPERATURE_RADIX)?);
        }

        Ok(ctx)
    }
}

impl ContextBodyExt for DigitizerContext {
    fn encode_body(
        &self,
        buf: &mut Vec<u8>,
    ) -> WsaResult<()> {
        let mut indicator = self.indicator;
        // бит 31 общий с признаком изменения контекста, снимаем только бит 29
        indicator = match self.bandwidth {
            Some(_) => indicator | DIGITIZER_BW_MASK,
            None => indicator & !(DIGITIZER_BW_MASK & !(1 << 31)),
        };
        indicator = indicator_bits(
            indicator,
            DIGITIZER_RF_FREQ_OFFSET_MASK,
            self.rf_frequency_offset.is_some(),
        );
        indicator = indicator_bits(
            indicator,
            DIGITIZER_REF_LEVEL_MASK,
            self.reference_level.is_some(),
        );

        write_u32_be(buf, indicator);

        if let Some(bw) = self.bandwidth {
            write_fixed_point(buf, bw);
        }
        if let Some(offset) = self.rf_frequency_offset {
            write_fixed_point(buf, offset);
        }
        if let Some(level) = self.reference_level {
            write_u32_be(buf, to_radix(level, GAIN_RADIX) as u32);
        }

        Ok(())
    }

    fn decode_body(body: &[u8]) -> WsaResult<Self> {
        let mut off = 0;
        let indicator = read_u32_be(body, &mut off)?;
        let mut ctx = DigitizerContext {
            indicator,
            ..Default::default()
        };

        if has(indicator, DIGITIZER_BW_MASK) {
            ctx.bandwidth = Some(read_fixed_point(body, &mut off)?);
        }
        if has(indicator, DIGITIZER_RF_FREQ_OFFSET_MASK) {
            ctx.rf_frequency_offset = Some(read_fixed_point(body, &mut off)?);
        }
        if has(indicator, DIGITIZER_REF_LEVEL_MASK) {
            ctx.reference_level = Some(read_low_half(body, &mut off, GAIN_RADIX)?);
        }

        Ok(ctx)
    }
}

impl ContextBodyExt for ExtensionContext {
    fn encode_body(
        &self,
        buf: &mut Vec<u8>,
    ) -> WsaResult<()> {
        let mut indicator = self.indicator;
        indicator = indicator_bits(
            indicator,
            EXTENSION_SWEEP_START_ID_MASK,
            self.sweep_start_id.is_some(),
        );
        indicator = indicator_bits(
            indicator,
            EXTENSION_STREAM_START_ID_MASK,
            self.stream_start_id.is_some(),
        );

        write_u32_be(buf, indicator);

        if let Some(id) = self.sweep_start_id {
            write_u32_be(buf, id);
        }
        if let Some(id) = self.stream_start_id {
            write_u32_be(buf, id);
        }

        Ok(())
    }

    fn decode_body(body: &[u8]) -> WsaResult<Self> {
        let mut off = 0;
        let indicator = read_u32_be(body, &mut off)?;
        let mut ctx = ExtensionContext {
            indicator,
            ..Default::default()
        };

        if has(indicator, EXTENSION_SWEEP_START_ID_MASK) {
            ctx.sweep_start_id = Some(read_u32_be(body, &mut off)?);
        }
        if has(indicator, EXTENSION_STREAM_START_ID_MASK) {
            ctx.stream_start_id = Some(read_u32_be(body, &mut off)?);
        }

        Ok(ctx)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Трейлер и отсчёты
////////////////////////////////////////////////////////////////////////////////

const TRAILER_BITS: [(u32, u32); 5] = [
    TRAILER_VALID_DATA,
    TRAILER_REF_LOCK,
    TRAILER_SPECTRAL_INVERSION,
    TRAILER_OVER_RANGE,
    TRAILER_SAMPLE_LOSS,
];

impl VrtTrailerExt for VrtTrailer {
    fn to_word(&self) -> u32 {
        let flags = [
            self.valid_data,
            self.reference_lock,
            self.spectral_inversion,
            self.over_range,
            self.sample_loss,
        ];

        TRAILER_BITS
            .iter()
            .zip(flags)
            .fold(0, |word, (&(enable, indicator), set)| {
                word | enable | if set { indicator } else { 0 }
            })
    }

    fn from_word(word: u32) -> Self {
        let flag = |(enable, indicator): (u32, u32)| has(word, enable) && has(word, indicator);

        VrtTrailer {
            valid_data: flag(TRAILER_VALID_DATA),
            reference_lock: flag(TRAILER_REF_LOCK),
            spectral_inversion: flag(TRAILER_SPECTRAL_INVERSION),
            over_range: flag(TRAILER_OVER_RANGE),
            sample_loss: flag(TRAILER_SAMPLE_LOSS),
        }
    }
}

/// Декодирует `words` слов отсчётов заданной кодировки.
pub fn decode_samples(
    payload: &[u8],
    sample_type: SampleType,
) -> WsaResult<SampleData> {
    if payload.len() % 4 != 0 {
        return Err(WsaError::format_violation(format!(
            "sample payload of {} bytes is not word aligned",
            payload.len()
        )));
    }

    let words = payload.len() / 4;
    let mut off = 0;

    let data = match sample_type {
        SampleType::I16Q16 => {
            let mut i = Vec::with_capacity(words);
            let mut q = Vec::with_capacity(words);
            for _ in 0..words {
                i.push(read_i16_be(payload, &mut off)?);
                q.push(read_i16_be(payload, &mut off)?);
            }
            SampleData::I16Q16 { i, q }
        }
        SampleType::I16 => {
            let mut v = Vec::with_capacity(words * 2);
            for _ in 0..words * 2 {
                v.push(read_i16_be(payload, &mut off)?);
            }
            SampleData::I16(v)
        }
        SampleType::I32 => {
            let mut v = Vec::with_capacity(words);
            for _ in 0..words {
                v.push(read_i32_be(payload, &mut off)?);
            }
            SampleData::I32(v)
        }
    };

    Ok(data)
}

/// Кодирует отсчёты; для I16 требуется чётное количество.
pub fn encode_samples(
    samples: &SampleData,
    buf: &mut Vec<u8>,
) -> WsaResult<()> {
    match samples {
        SampleData::I16Q16 { i, q } => {
            if i.len() != q.len() {
                return Err(WsaError::format_violation(format!(
                    "I/Q length mismatch: {} vs {}",
                    i.len(),
                    q.len()
                )));
            }
            for (&si, &sq) in i.iter().zip(q) {
                write_i16_be(buf, si);
                write_i16_be(buf, sq);
            }
        }
        SampleData::I16(v) => {
            if v.len() % 2 != 0 {
                return Err(WsaError::format_violation(format!(
                    "I16 stream needs an even sample count, got {}",
                    v.len()
                )));
            }
            for &s in v {
                write_i16_be(buf, s);
            }
        }
        SampleData::I32(v) => {
            for &s in v {
                write_i32_be(buf, s);
            }
        }
    }

    Ok(())
}

/// Декодирует тело пакета по уже разобранному заголовку.
///
/// `payload` содержит все слова после заголовка, включая трейлер.
pub fn decode_body(
    header: &VrtHeader,
    payload: &[u8],
) -> WsaResult<VrtBody> {
    let body = match header.stream_id {
        StreamId::ReceiverContext => VrtBody::Receiver(ReceiverContext::decode_body(payload)?),
        StreamId::DigitizerContext => VrtBody::Digitizer(DigitizerContext::decode_body(payload)?),
        StreamId::ExtensionContext => VrtBody::Extension(ExtensionContext::decode_body(payload)?),
        id => {
            let sample_type = id
                .sample_type()
                .ok_or_else(|| WsaError::unknown_frame(format!("stream {id} carries no samples")))?;

            let data_len = header.payload_words() * 4;
            if payload.len() < data_len + header.has_trailer as usize * 4 {
                return Err(WsaError::FrameIncomplete {
                    expected: data_len + header.has_trailer as usize * 4,
                    received: payload.len(),
                });
            }

            let samples = decode_samples(&payload[..data_len], sample_type)?;
            let trailer = if header.has_trailer {
                let mut off = data_len;
                Some(VrtTrailer::from_word(read_u32_be(payload, &mut off)?))
            } else {
                None
            };

            VrtBody::IfData(IfData { samples, trailer })
        }
    };

    Ok(body)
}

impl VrtPacketExt for VrtPacket {
    /// Размер пакета и бит трейлера в заголовке вычисляются заново по телу.
    fn encode(&self) -> WsaResult<Vec<u8>> {
        let mut body = Vec::new();
        let mut has_trailer = false;

        match &self.body {
            VrtBody::Receiver(ctx) => ctx.encode_body(&mut body)?,
            VrtBody::Digitizer(ctx) => ctx.encode_body(&mut body)?,
            VrtBody::Extension(ctx) => ctx.encode_body(&mut body)?,
            VrtBody::IfData(data) => {
                if self.header.stream_id.sample_type() != Some(data.samples.sample_type()) {
                    return Err(WsaError::format_violation(format!(
                        "stream {} cannot carry {:?} samples",
                        self.header.stream_id,
                        data.samples.sample_type()
                    )));
                }
                encode_samples(&data.samples, &mut body)?;
                if let Some(trailer) = data.trailer {
                    write_u32_be(&mut body, trailer.to_word());
                    has_trailer = true;
                }
            }
        }

        let words = VrtHeader::WORDS + body.len() / 4;
        if words > VRT_MAX_PACKET_WORDS {
            return Err(WsaError::format_violation(format!(
                "packet of {words} words exceeds VRT maximum"
            )));
        }

        let header = VrtHeader {
            packet_type: self.header.stream_id.packet_type(),
            packet_size: words as u16,
            has_trailer,
            ..self.header.clone()
        };

        let mut buf = Vec::with_capacity(words * 4);
        header.encode(&mut buf)?;
        buf.extend_from_slice(&body);

        Ok(buf)
    }

    fn decode(buf: &[u8]) -> WsaResult<(Self, usize)> {
        if buf.len() < VRT_HEADER_SIZE {
            return Err(WsaError::FrameIncomplete {
                expected: VRT_HEADER_SIZE,
                received: buf.len(),
            });
        }

        let header = VrtHeader::decode(&buf[..VRT_HEADER_SIZE])?;
        let total = header.packet_size as usize * 4;

        if buf.len() < total {
            return Err(WsaError::FrameIncomplete {
                expected: total,
                received: buf.len(),
            });
        }

        let body = decode_body(&header, &buf[VRT_HEADER_SIZE..total])?;

        Ok((VrtPacket { header, body }, total))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn header(stream_id: StreamId) -> VrtHeader {
        VrtHeader {
            packet_type: stream_id.packet_type(),
            packet_count: 7,
            packet_size: 0,
            stream_id,
            has_trailer: false,
            timestamp: VrtTimestamp::new(1_700_000_000, 123_456_789_012),
        }
    }

    #[test]
    fn test_header_fields() {
        let packet = VrtPacket {
            header: header(StreamId::IfDataI16Q16),
            body: VrtBody::IfData(IfData {
                samples: SampleData::I16Q16 {
                    i: vec![1, -1],
                    q: vec![2, -2],
                },
                trailer: Some(VrtTrailer::new()),
            }),
        };

        let buf = packet.encode().unwrap();
        assert_eq!(buf.len(), (5 + 2 + 1) * 4);

        // тип 1, трейлер, TSI=UTC, TSF=пикосекунды, счётчик 7, размер 8
        assert_eq!(&buf[0..4], &[0x14, 0x67, 0x00, 0x08]);
        assert_eq!(&buf[4..8], &[0x90, 0x00, 0x00, 0x03]);

        let (decoded, used) = VrtPacket::decode(&buf).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(decoded.header.packet_count, 7);
        assert_eq!(decoded.header.packet_size, 8);
        assert!(decoded.header.has_trailer);
        assert_eq!(decoded.body, packet.body);
    }

    #[test]
    fn test_unknown_stream_id() {
        let mut buf = Vec::new();
        write_u32_be(&mut buf, 0x1040_0006);
        write_u32_be(&mut buf, 0x9000_00ff);
        write_u32_be(&mut buf, 0);
        write_u64_be(&mut buf, 0);

        assert!(matches!(
            VrtHeader::decode(&buf),
            Err(WsaError::UnknownFrame(_))
        ));
    }

    #[test]
    fn test_unknown_packet_type() {
        let mut buf = Vec::new();
        write_u32_be(&mut buf, 0x3040_0006);
        write_u32_be(&mut buf, StreamId::ReceiverContext.as_u32());
        write_u32_be(&mut buf, 0);
        write_u64_be(&mut buf, 0);

        assert!(matches!(
            VrtHeader::decode(&buf),
            Err(WsaError::UnknownFrame(_))
        ));
    }

    #[test]
    fn test_stream_type_mismatch() {
        let mut buf = Vec::new();
        // тип 1 (IF-данные) со stream id контекста приёмника
        write_u32_be(&mut buf, 0x1060_0006);
        write_u32_be(&mut buf, StreamId::ReceiverContext.as_u32());
        write_u32_be(&mut buf, 0);
        write_u64_be(&mut buf, 0);

        assert!(matches!(
            VrtHeader::decode(&buf),
            Err(WsaError::UnknownFrame(_))
        ));
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut buf = Vec::new();
        write_u32_be(&mut buf, 0x4060_0006);
        write_u32_be(&mut buf, StreamId::ReceiverContext.as_u32());
        write_u32_be(&mut buf, 0);
        write_u64_be(&mut buf, VrtTimestamp::PICOS_PER_SECOND);

        assert!(matches!(
            VrtHeader::decode(&buf),
            Err(WsaError::InvalidTimestamp(_))
        ));

        // TSI = 0: нет целой части метки времени
        let mut buf = Vec::new();
        write_u32_be(&mut buf, 0x4020_0006);
        write_u32_be(&mut buf, StreamId::ReceiverContext.as_u32());
        write_u32_be(&mut buf, 0);
        write_u64_be(&mut buf, 0);

        assert!(matches!(
            VrtHeader::decode(&buf),
            Err(WsaError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_picoseconds_ignored_without_tsf() {
        let mut buf = Vec::new();
        write_u32_be(&mut buf, 0x4040_0006);
        write_u32_be(&mut buf, StreamId::ReceiverContext.as_u32());
        write_u32_be(&mut buf, 42);
        write_u64_be(&mut buf, u64::MAX);

        let h = VrtHeader::decode(&buf).unwrap();
        assert_eq!(h.timestamp, VrtTimestamp::new(42, 0));
    }

    #[test]
    fn test_receiver_context_fields() {
        let ctx = ReceiverContext {
            indicator: 0,
            reference_point: Some(-3),
            frequency: Some(2_412_000_000.5),
            if_gain: Some(-2.5),
            rf_gain: Some(10.0),
            temperature: Some(41.25),
        };

        let mut body = Vec::new();
        ctx.encode_body(&mut body).unwrap();
        assert_eq!(body.len(), 4 * (1 + 1 + 2 + 1 + 1));

        let decoded = ReceiverContext::decode_body(&body).unwrap();
        assert_eq!(
            decoded.indicator,
            RECEIVER_REF_POINT_MASK
                | RECEIVER_FREQ_MASK
                | RECEIVER_GAIN_MASK
                | RECEIVER_TEMPERATURE_MASK
        );
        assert_eq!(decoded.reference_point, Some(-3));
        assert_eq!(decoded.frequency, Some(2_412_000_000.5));
        assert_eq!(decoded.if_gain, Some(-2.5));
        assert_eq!(decoded.rf_gain, Some(10.0));
        assert_eq!(decoded.temperature, Some(41.25));
    }

    #[test]
    fn test_frequency_only_receiver() {
        let mut body = Vec::new();
        write_u32_be(&mut body, RECEIVER_FREQ_MASK);
        // 100 МГц + 0.25 Гц в формате 44.20
        write_i64_be(&mut body, (100_000_000i64 << 20) + (1 << 18));

        let ctx = ReceiverContext::decode_body(&body).unwrap();
        assert_eq!(ctx.frequency, Some(100_000_000.25));
        assert_eq!(ctx.reference_point, None);
        assert_eq!(ctx.if_gain, None);
        assert_eq!(ctx.temperature, None);
    }

    #[test]
    fn test_half_set_gains_rejected() {
        let ctx = ReceiverContext {
            frequency: Some(2_400_000_000.0),
            if_gain: Some(-4.0),
            ..Default::default()
        };
        let mut body = Vec::new();
        assert!(matches!(
            ctx.encode_body(&mut body),
            Err(WsaError::FormatViolation(_))
        ));

        let packet = VrtPacket {
            header: header(StreamId::ReceiverContext),
            body: VrtBody::Receiver(ReceiverContext {
                rf_gain: Some(10.0),
                ..Default::default()
            }),
        };
        assert!(packet.encode().is_err());
    }

    #[test]
    fn test_reference_level_absent_is_none() {
        let ctx = DigitizerContext {
            indicator: 0,
            bandwidth: Some(62_500_000.0),
            reference_level: None,
            rf_frequency_offset: None,
        };
        let mut body = Vec::new();
        ctx.encode_body(&mut body).unwrap();

        let decoded = DigitizerContext::decode_body(&body).unwrap();
        assert_eq!(decoded.bandwidth, Some(62_500_000.0));
        assert_eq!(decoded.reference_level, None, "отсутствует, а не ноль");
    }

    #[test]
    fn test_digitizer_bandwidth_needs_both_bits() {
        let mut body = Vec::new();
        // только бит 31 (изменение контекста) + опорный уровень
        write_u32_be(&mut body, 0x8000_0000 | DIGITIZER_REF_LEVEL_MASK);
        write_u32_be(&mut body, (-10i16 * 128) as u16 as u32);

        let ctx = DigitizerContext::decode_body(&body).unwrap();
        assert_eq!(ctx.bandwidth, None);
        assert_eq!(ctx.reference_level, Some(-10.0));

        let mut again = Vec::new();
        ctx.encode_body(&mut again).unwrap();
        assert_eq!(again, body);
    }

    #[test]
    fn test_extension_context_order() {
        let mut body = Vec::new();
        write_u32_be(&mut body, EXTENSION_SWEEP_START_ID_MASK | EXTENSION_STREAM_START_ID_MASK);
        write_u32_be(&mut body, 11);
        write_u32_be(&mut body, 22);

        let ctx = ExtensionContext::decode_body(&body).unwrap();
        assert_eq!(ctx.sweep_start_id, Some(11));
        assert_eq!(ctx.stream_start_id, Some(22));
    }

    #[test]
    fn test_truncated_context_body() {
        let mut body = Vec::new();
        write_u32_be(&mut body, RECEIVER_FREQ_MASK);
        write_u32_be(&mut body, 0);

        assert!(matches!(
            ReceiverContext::decode_body(&body),
            Err(WsaError::FrameIncomplete { .. })
        ));
    }

    #[test]
    fn test_trailer_requires_enable_bit() {
        // индикатор спектральной инверсии без бита разрешения
        let word = TRAILER_SPECTRAL_INVERSION.1 | TRAILER_VALID_DATA.0 | TRAILER_VALID_DATA.1;
        let t = VrtTrailer::from_word(word);
        assert!(t.valid_data);
        assert!(!t.spectral_inversion);

        let all = VrtTrailer {
            valid_data: true,
            reference_lock: true,
            spectral_inversion: true,
            over_range: true,
            sample_loss: true,
        };
        assert_eq!(VrtTrailer::from_word(all.to_word()), all);
        assert_eq!(VrtTrailer::from_word(VrtTrailer::default().to_word()), VrtTrailer::default());
    }

    #[test]
    fn test_i16_samples_two_per_word() {
        let payload = [0x00, 0x01, 0xff, 0xff, 0x7f, 0xff, 0x80, 0x00];
        let data = decode_samples(&payload, SampleType::I16).unwrap();
        assert_eq!(data, SampleData::I16(vec![1, -1, i16::MAX, i16::MIN]));

        let data = decode_samples(&payload, SampleType::I32).unwrap();
        assert_eq!(data, SampleData::I32(vec![0x0001_ffff, 0x7fff_8000]));
    }

    #[test]
    fn test_odd_i16_count_rejected() {
        let mut buf = Vec::new();
        assert!(encode_samples(&SampleData::I16(vec![1, 2, 3]), &mut buf).is_err());
    }

    #[test]
    fn test_truncated_data_packet() {
        let packet = VrtPacket {
            header: header(StreamId::IfDataI16),
            body: VrtBody::IfData(IfData {
                samples: SampleData::I16(vec![5; 256]),
                trailer: Some(VrtTrailer::new()),
            }),
        };
        let buf = packet.encode().unwrap();

        match VrtPacket::decode(&buf[..buf.len() - 10]) {
            Err(WsaError::FrameIncomplete { expected, received }) => {
                assert_eq!(expected, buf.len());
                assert_eq!(received, buf.len() - 10);
            }
            other => panic!("ожидалась FrameIncomplete, получено {other:?}"),
        }
    }
}
