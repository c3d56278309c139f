//! Сборка спектра мощности из потока пакетов свипа.
//!
//! Контекстные пакеты задают частоту настройки и опорный уровень для
//! следующих за ними пакетов данных. Каждый пакет данных проходит окно, БПФ
//! и перевод в дБ; годные бины записываются в буфер по смещению, которое
//! соответствует частоте настройки шага.

use log::{info, trace};
use wsa_core::{DataChannel, SpectrumAnalyzer, VrtReader};
use wsa_types::{IfData, VrtBody, VrtPacket};

use crate::{PowerSpectrumConfig, SweepDeviceProperties, SweepError, SweepResult};

/// Состояние одного захвата.
#[derive(Debug)]
pub struct CaptureEngine {
    props: &'static SweepDeviceProperties,
    analyzer: SpectrumAnalyzer,
    /// Частота настройки из последнего контекста приёмника, Гц
    fcenter: Option<f64>,
    /// Опорный уровень из последнего контекста дигитайзера, дБ
    reflevel: f64,
    received: u32,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl CaptureEngine {
    pub fn new(config: &PowerSpectrumConfig) -> SweepResult<Self> {
        Ok(Self {
            props: config.properties()?,
            analyzer: SpectrumAnalyzer::new(config.samples_per_packet)?,
            fcenter: None,
            reflevel: 0.0,
            received: 0,
        })
    }

    /// Сколько пакетов данных уже обработано.
    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn is_complete(
        &self,
        config: &PowerSpectrumConfig,
    ) -> bool {
        self.received >= config.packet_total
    }

    /// Обрабатывает один декодированный пакет.
    pub fn handle_packet(
        &mut self,
        packet: &VrtPacket,
        config: &mut PowerSpectrumConfig,
    ) -> SweepResult<()> {
        match &packet.body {
            VrtBody::Receiver(ctx) => {
                if let Some(freq) = ctx.frequency {
                    self.fcenter = Some(freq);
                }
            }
            VrtBody::Digitizer(ctx) => {
                if let Some(level) = ctx.reference_level {
                    self.reflevel = level;
                }
            }
            VrtBody::Extension(_) => {}
            VrtBody::IfData(data) => {
                self.stitch(data, config)?;
                self.received += 1;
            }
        }

        Ok(())
    }

    fn stitch(
        &mut self,
        data: &IfData,
        config: &mut PowerSpectrumConfig,
    ) -> SweepResult<()> {
        let fcenter = self
            .fcenter
            .ok_or(SweepError::MissingContext("receiver frequency"))?;

        if data.samples.len() != config.samples_per_packet {
            return Err(SweepError::SampleCountMismatch {
                expected: config.samples_per_packet,
                found: data.samples.len(),
            });
        }

        self.analyzer.process(&data.samples)?;

        let inverted = data.spectral_inversion();
        if inverted {
            self.analyzer.reverse();
        }

        let rbw = config.rbw;
        let (istart, istop) = self.props.usable_bins(rbw, inverted);

        let left_edge = fcenter - self.props.usable_bw as f64 / 2.0;
        let offset = ((left_edge - config.fstart as f64) / rbw).floor() as i64;
        let len = config.buflen();

        if offset < 0 || offset as usize >= len {
            return Err(SweepError::SpectrumOutOfBounds { offset, len });
        }

        let offset = offset as usize;
        // хвост последнего шага за fstop отбрасывается
        let count = (istop - istart).min(len - offset);
        let reflevel = self.reflevel as f32;

        for (i, slot) in config.buf[offset..offset + count].iter_mut().enumerate() {
            *slot = self.analyzer.bin_power(istart + i) + reflevel;
        }

        trace!(
            "Step fc={fcenter:.0} Hz -> bins {offset}..{} (inverted: {inverted})",
            offset + count
        );

        Ok(())
    }

    /// Читает пакеты, пока не будут получены все пакеты данных плана.
    ///
    /// Любая ошибка чтения прерывает захват; буфер при этом считается
    /// недействительным.
    pub fn run<C: DataChannel>(
        &mut self,
        reader: &mut VrtReader<C>,
        config: &mut PowerSpectrumConfig,
    ) -> SweepResult<()> {
        while !self.is_complete(config) {
            let packet = reader.read_packet()?;
            self.handle_packet(&packet, config)?;
        }

        Ok(())
    }
}

/// Заполняет буфер `config` из уже запущенного свипа.
///
/// Буфер помечается как незаписанный перед началом; сам свип не
/// останавливается.
pub fn capture_power_spectrum<C: DataChannel>(
    reader: &mut VrtReader<C>,
    config: &mut PowerSpectrumConfig,
) -> SweepResult<()> {
    config.poison();

    let mut engine = CaptureEngine::new(config)?;
    engine.run(reader, config)?;

    let unfilled = config.unfilled_bins();
    if unfilled > 0 {
        info!(
            "Capture finished: {} packets, {unfilled} of {} bins not written",
            engine.received(),
            config.buflen()
        );
    } else {
        info!(
            "Capture finished: {} packets, {} bins",
            engine.received(),
            config.buflen()
        );
    }

    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
