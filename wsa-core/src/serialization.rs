use std::{io::Write, time::Duration};

use log::{trace, warn};
use wsa_types::{StreamId, VrtBody, VrtHeader, VrtPacket, VrtTimestamp, WsaError, WsaResult};

use crate::{
    format::{decode_body, VrtHeaderExt, VrtPacketExt, VRT_HEADER_SIZE},
    transport::DataChannel,
};

const STREAM_COUNT: usize = StreamId::ALL.len();

/// Потоковый читатель VRT пакетов из канала данных.
///
/// Хранит последний счётчик пакетов каждого потока и считает пропуски.
pub struct VrtReader<C: DataChannel> {
    channel: C,
    timeout: Duration,
    header_buf: [u8; VRT_HEADER_SIZE],
    payload_buf: Vec<u8>,
    last_count: [Option<u8>; STREAM_COUNT],
    stats: ReadStats,
}

/// Потоковый писатель VRT пакетов: назначает счётчики по потокам.
pub struct VrtWriter<W: Write> {
    writer: W,
    next_count: [u8; STREAM_COUNT],
    packets_written: u64,
    bytes_written: u64,
}

/// Статистика, накопленная [`VrtReader`] в процессе чтения.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadStats {
    /// Успешно декодированных пакетов.
    pub packets_ok: u64,
    /// Из них контекстных.
    pub context_packets: u64,
    /// Из них с IF-данными.
    pub data_packets: u64,
    /// Пакетов, пропущенных по счётчику порядка.
    pub packets_lost: u64,
    /// Всего обработано байт.
    pub bytes_processed: u64,
}

impl<C: DataChannel> VrtReader<C> {
    pub fn new(
        channel: C,
        timeout: Duration,
    ) -> Self {
        Self {
            channel,
            timeout,
            header_buf: [0u8; VRT_HEADER_SIZE],
            payload_buf: Vec::new(),
            last_count: [None; STREAM_COUNT],
            stats: ReadStats::default(),
        }
    }

    /// Читает и декодирует один пакет.
    ///
    /// Таймаут до первого байта заголовка возвращается как есть
    /// ([`WsaError::NoResponse`]); любая нехватка байт внутри кадра даёт
    /// [`WsaError::FrameIncomplete`].
    pub fn read_packet(&mut self) -> WsaResult<VrtPacket> {
        let n = self.channel.recv_exact(&mut self.header_buf, self.timeout)?;
        if n < VRT_HEADER_SIZE {
            return Err(WsaError::FrameIncomplete {
                expected: VRT_HEADER_SIZE,
                received: n,
            });
        }

        let header = VrtHeader::decode(&self.header_buf)?;
        let payload_len = (header.packet_size as usize - VrtHeader::WORDS) * 4;

        self.payload_buf.resize(payload_len, 0);
        let received = match self.channel.recv_exact(&mut self.payload_buf, self.timeout) {
            Ok(n) => n,
            Err(WsaError::NoResponse(_) | WsaError::ConnectionDropped) => 0,
            Err(e) => return Err(e),
        };

        if received < payload_len {
            return Err(WsaError::FrameIncomplete {
                expected: VRT_HEADER_SIZE + payload_len,
                received: VRT_HEADER_SIZE + received,
            });
        }

        let body = decode_body(&header, &self.payload_buf)?;

        self.track_sequence(&header);
        self.stats.packets_ok += 1;
        self.stats.bytes_processed += (VRT_HEADER_SIZE + payload_len) as u64;
        match body {
            VrtBody::IfData(_) => self.stats.data_packets += 1,
            _ => self.stats.context_packets += 1,
        }

        trace!(
            "VRT {} #{} ({} words)",
            header.stream_id,
            header.packet_count,
            header.packet_size
        );

        Ok(VrtPacket { header, body })
    }

    fn track_sequence(
        &mut self,
        header: &VrtHeader,
    ) {
        let slot = &mut self.last_count[header.stream_id.index()];

        if let Some(last) = *slot {
            let expected = (last + 1) & 0x0f;
            if header.packet_count != expected {
                let lost = (header.packet_count.wrapping_sub(expected) & 0x0f) as u64;
                self.stats.packets_lost += lost;
                warn!(
                    "Stream {}: packet count {} (expected {expected}), {lost} packet(s) lost",
                    header.stream_id, header.packet_count
                );
            }
        }

        *slot = Some(header.packet_count);
    }

    /// Сбрасывает отслеживание порядка (например, перед новым свипом).
    pub fn reset_sequence(&mut self) {
        self.last_count = [None; STREAM_COUNT];
    }

    /// Накопленная статистика чтения.
    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }
}

/// Итерация до закрытия канала; прочие ошибки отдаются вызывающему.
impl<C: DataChannel> Iterator for VrtReader<C> {
    type Item = WsaResult<VrtPacket>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_packet() {
            Err(WsaError::ConnectionDropped) => None,
            other => Some(other),
        }
    }
}

impl<W: Write> VrtWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_count: [0; STREAM_COUNT],
            packets_written: 0,
            bytes_written: 0,
        }
    }

    /// Кодирует и записывает пакет одним вызовом `write_all`.
    ///
    /// Возвращает размер пакета в байтах.
    pub fn write_packet(
        &mut self,
        stream_id: StreamId,
        timestamp: VrtTimestamp,
        body: VrtBody,
    ) -> WsaResult<usize> {
        let slot = &mut self.next_count[stream_id.index()];
        let packet = VrtPacket {
            header: VrtHeader {
                packet_type: stream_id.packet_type(),
                packet_count: *slot,
                packet_size: 0,
                stream_id,
                has_trailer: false,
                timestamp,
            },
            body,
        };

        let bytes = packet.encode()?;
        self.writer.write_all(&bytes)?;

        *slot = (*slot + 1) & 0x0f;
        self.packets_written += 1;
        self.bytes_written += bytes.len() as u64;

        Ok(bytes.len())
    }

    /// Пропускает `n` значений счётчика потока (имитация потерь).
    pub fn skip_count(
        &mut self,
        stream_id: StreamId,
        n: u8,
    ) {
        let slot = &mut self.next_count[stream_id.index()];
        *slot = slot.wrapping_add(n) & 0x0f;
    }

    pub fn flush(&mut self) -> WsaResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Convenience: читает все пакеты до конца потока.
pub fn read_all_packets<C: DataChannel>(reader: &mut VrtReader<C>) -> WsaResult<Vec<VrtPacket>> {
    let mut packets = Vec::new();
    for result in reader.by_ref() {
        packets.push(result?);
    }
    Ok(packets)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use wsa_types::{IfData, ReceiverContext, SampleData, VrtTrailer};

    use super::*;
    use crate::transport::ReadChannel;

    fn receiver(freq: f64) -> VrtBody {
        VrtBody::Receiver(ReceiverContext {
            frequency: Some(freq),
            ..Default::default()
        })
    }

    fn data(n: usize) -> VrtBody {
        VrtBody::IfData(IfData {
            samples: SampleData::I16((0..n as i16).collect()),
            trailer: Some(VrtTrailer::new()),
        })
    }

    fn reader_over(raw: Vec<u8>) -> VrtReader<ReadChannel<Cursor<Vec<u8>>>> {
        VrtReader::new(ReadChannel::new(Cursor::new(raw)), Duration::from_millis(10))
    }

    #[test]
    fn test_writer_reader_stream() {
        let mut writer = VrtWriter::new(Vec::new());
        let ts = VrtTimestamp::new(100, 0);

        writer.write_packet(StreamId::ReceiverContext, ts, receiver(2.4e9)).unwrap();
        writer.write_packet(StreamId::IfDataI16, ts, data(256)).unwrap();
        writer.write_packet(StreamId::ReceiverContext, ts, receiver(2.41e9)).unwrap();
        writer.write_packet(StreamId::IfDataI16, ts, data(256)).unwrap();
        assert_eq!(writer.packets_written(), 4);

        let raw = writer.into_inner();
        let total = raw.len() as u64;
        let mut reader = reader_over(raw);
        let packets = read_all_packets(&mut reader).unwrap();

        assert_eq!(packets.len(), 4);
        assert_eq!(packets[1].header.packet_count, 0);
        assert_eq!(packets[3].header.packet_count, 1);
        assert_eq!(packets[3].header.samples_per_packet(), 256);

        let stats = reader.stats();
        assert_eq!(stats.packets_ok, 4);
        assert_eq!(stats.context_packets, 2);
        assert_eq!(stats.data_packets, 2);
        assert_eq!(stats.packets_lost, 0);
        assert_eq!(stats.bytes_processed, total);
    }

    #[test]
    fn test_counter_wraps_without_loss() {
        let mut writer = VrtWriter::new(Vec::new());
        for _ in 0..40 {
            writer
                .write_packet(StreamId::ReceiverContext, VrtTimestamp::default(), receiver(1e9))
                .unwrap();
        }

        let mut reader = reader_over(writer.into_inner());
        let packets = read_all_packets(&mut reader).unwrap();
        assert_eq!(packets.len(), 40);
        assert_eq!(packets[16].header.packet_count, 0);
        assert_eq!(reader.stats().packets_lost, 0);
    }

    #[test]
    fn test_gap_counted_as_lost() {
        let mut writer = VrtWriter::new(Vec::new());
        let ts = VrtTimestamp::default();

        writer.write_packet(StreamId::IfDataI16, ts, data(2)).unwrap();
        writer.skip_count(StreamId::IfDataI16, 3);
        writer.write_packet(StreamId::IfDataI16, ts, data(2)).unwrap();
        // другой поток на счётчики данных не влияет
        writer.write_packet(StreamId::ReceiverContext, ts, receiver(1e9)).unwrap();

        let mut reader = reader_over(writer.into_inner());
        let packets = read_all_packets(&mut reader).unwrap();
        assert_eq!(packets.len(), 3);
        assert_eq!(reader.stats().packets_lost, 3);
    }

    #[test]
    fn test_sequence_state_is_per_reader() {
        let mut writer = VrtWriter::new(Vec::new());
        writer.skip_count(StreamId::IfDataI16, 9);
        writer.write_packet(StreamId::IfDataI16, VrtTimestamp::default(), data(2)).unwrap();
        let raw = writer.into_inner();

        // первый пакет потока никогда не считается пропуском
        let mut a = reader_over(raw.clone());
        let mut b = reader_over(raw);
        a.read_packet().unwrap();
        b.read_packet().unwrap();
        assert_eq!(a.stats().packets_lost, 0);
        assert_eq!(b.stats().packets_lost, 0);
    }

    #[test]
    fn test_short_header_is_incomplete() {
        let mut reader = reader_over(vec![0x10, 0x60, 0x00]);
        assert!(matches!(
            reader.read_packet(),
            Err(WsaError::FrameIncomplete {
                expected: 20,
                received: 3
            })
        ));
    }

    #[test]
    fn test_missing_samples_is_incomplete() {
        let mut writer = VrtWriter::new(Vec::new());
        writer.write_packet(StreamId::IfDataI16, VrtTimestamp::default(), data(512)).unwrap();
        let mut raw = writer.into_inner();
        raw.truncate(raw.len() - 100);

        let mut reader = reader_over(raw);
        assert!(matches!(
            reader.read_packet(),
            Err(WsaError::FrameIncomplete { .. })
        ));
        assert_eq!(reader.stats().packets_ok, 0);
    }

    #[test]
    fn test_empty_stream_ends_iteration() {
        let mut reader = reader_over(Vec::new());
        assert!(reader.next().is_none());
    }
}
