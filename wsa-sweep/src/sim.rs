// Симулятор инструмента для тестов и `--target sim`.
// Понимает подмножество команд списка свипа и по SWEEP:LIST:START выдаёт
// поток VRT пакетов в канал данных, как это делал бы настоящий WSA.
// Пакеты передаются через crossbeam_channel, таймауты чтения те же, что у TCP.

use std::{
    f32::consts::PI,
    io::{self, Write},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};
use wsa_core::{CommandChannel, DataChannel, VrtWriter};
use wsa_types::{
    DigitizerContext, ExtensionContext, IfData, ReceiverContext, RfeMode, SampleData,
    SampleType, StreamId, VrtBody, VrtTimestamp, VrtTrailer, WsaError, WsaResult,
};

use crate::SweepDeviceProperties;

/// Начало отсчёта времени симулятора (UTC секунды)
const SIM_EPOCH_SECS: u32 = 1_700_000_000;
/// Период отсчёта при 125 Мвыб/с, пс
const SAMPLE_PERIOD_PICOS: u64 = 8_000;

/// Синусоида на входе симулятора.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimTone {
    pub frequency_hz: f64,
    /// Амплитуда в отсчётах АЦП
    pub amplitude: f32,
}

/// Параметры симулятора.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Модель в ответе на `*IDN?`
    pub model: String,
    pub serial: String,
    pub firmware: String,
    /// Тон добавляется только на шагах, в годную полосу которых он попадает
    pub tone: Option<SimTone>,
    /// Амплитуда равномерного шума, отсчёты
    pub noise_amplitude: f32,
    /// Опорный уровень в контексте дигитайзера, дБ
    pub reference_level: f64,
    /// Выставлять бит спектральной инверсии в трейлере
    pub spectral_inversion: bool,
    pub seed: u64,
}

#[derive(Debug, Clone, Default)]
struct SimEntry {
    fcstart: u64,
    fcstop: u64,
    fstep: u64,
    spp: usize,
    ppb: u32,
}

/// Отправляет каждую запись отдельным сообщением канала.
struct ChannelSink {
    tx: Sender<Vec<u8>>,
}

/// Командная сторона симулятора.
pub struct SimulatedInstrument {
    config: SimConfig,
    writer: VrtWriter<ChannelSink>,
    backlog: Receiver<Vec<u8>>,
    rng: StdRng,
    entries: Vec<SimEntry>,
    editing: SimEntry,
    iterations: u32,
    mode: Option<RfeMode>,
    attenuation: Option<u32>,
    running: bool,
    sweep_id: u32,
    clock_picos: u64,
    history: Vec<String>,
}

/// Сторона данных симулятора.
pub struct SimDataChannel {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SimulatedInstrument {
    /// Создаёт симулятор и связанный с ним канал данных.
    pub fn new(config: SimConfig) -> (Self, SimDataChannel) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let rng = StdRng::seed_from_u64(config.seed);

        let instrument = Self {
            config,
            writer: VrtWriter::new(ChannelSink { tx }),
            backlog: rx.clone(),
            rng,
            entries: Vec::new(),
            editing: SimEntry::default(),
            iterations: 1,
            mode: None,
            attenuation: None,
            running: false,
            sweep_id: 0,
            clock_picos: 0,
            history: Vec::new(),
        };

        let data = SimDataChannel {
            rx,
            pending: Vec::new(),
            pos: 0,
        };

        (instrument, data)
    }

    /// Все принятые команды и запросы по порядку.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Сохранённые записи списка свипа.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn attenuation(&self) -> Option<u32> {
        self.attenuation
    }

    pub fn packets_sent(&self) -> u64 {
        self.writer.packets_written()
    }

    fn execute(
        &mut self,
        cmd: &str,
    ) -> WsaResult<()> {
        let (head, arg) = match cmd.split_once(' ') {
            Some((h, a)) => (h, a.trim()),
            None => (cmd, ""),
        };

        match head.to_uppercase().as_str() {
            "*RST" => {
                self.entries.clear();
                self.editing = SimEntry::default();
                self.iterations = 1;
                self.mode = None;
                self.running = false;
            }
            "SYSTEM:FLUSH" => {
                let dropped = self.backlog.try_iter().count();
                if dropped > 0 {
                    debug!("Flushed {dropped} queued packets");
                }
            }
            "SYSTEM:ABORT" | "SWEEP:LIST:STOP" => self.running = false,
            "SWEEP:ENTRY:DELETE" if arg.eq_ignore_ascii_case("ALL") => self.entries.clear(),
            "SWEEP:ENTRY:NEW" => self.editing = SimEntry::default(),
            "SWEEP:ENTRY:SAVE" => self.entries.push(self.editing.clone()),
            "SWEEP:LIST:ITER" => self.iterations = parse_arg(cmd, arg)?,
            "SWEEP:ENTRY:ATT" | "SWEEP:ENTRY:ATT:VAR" => {
                self.attenuation = Some(parse_arg(cmd, arg)?)
            }
            "SWEEP:ENTRY:MODE" => {
                let mode = arg
                    .parse::<RfeMode>()
                    .map_err(|e| WsaError::malformed_response(cmd, e))?;
                self.mode = Some(mode);
            }
            "SWEEP:ENTRY:FREQ:CENT" => {
                let (start, stop) = arg
                    .split_once(',')
                    .ok_or_else(|| WsaError::malformed_response(cmd, "expected two frequencies"))?;
                self.editing.fcstart = parse_hz(cmd, start)?;
                self.editing.fcstop = parse_hz(cmd, stop)?;
            }
            "SWEEP:ENTRY:FREQ:STEP" => self.editing.fstep = parse_hz(cmd, arg)?,
            "SWEEP:ENTRY:SPPACKET" => self.editing.spp = parse_arg(cmd, arg)?,
            "SWEEP:ENTRY:PPBLOCK" => self.editing.ppb = parse_arg(cmd, arg)?,
            "SWEEP:LIST:START" => self.start_sweep()?,
            _ => return Err(WsaError::malformed_response(cmd, "-113,\"Undefined header\"")),
        }

        Ok(())
    }

    fn start_sweep(&mut self) -> WsaResult<()> {
        let mode = self
            .mode
            .ok_or_else(|| WsaError::malformed_response("SWEEP:LIST:START", "no mode set"))?;
        let props = SweepDeviceProperties::for_mode(mode).map_err(|e| {
            WsaError::malformed_response("SWEEP:LIST:START", e.to_string())
        })?;

        self.running = true;
        self.sweep_id = self.sweep_id.wrapping_add(1);

        let ts = self.timestamp();
        self.writer.write_packet(
            StreamId::ExtensionContext,
            ts,
            VrtBody::Extension(ExtensionContext {
                sweep_start_id: Some(self.sweep_id),
                ..Default::default()
            }),
        )?;

        let entries = self.entries.clone();
        for _ in 0..self.iterations.max(1) {
            for entry in &entries {
                self.emit_entry(props, entry)?;
            }
        }

        debug!(
            "Sweep {} emitted {} packets",
            self.sweep_id,
            self.writer.packets_written()
        );
        Ok(())
    }

    fn emit_entry(
        &mut self,
        props: &SweepDeviceProperties,
        entry: &SimEntry,
    ) -> WsaResult<()> {
        let tunings = if entry.fstep == 0 || entry.fcstop <= entry.fcstart {
            1
        } else {
            (entry.fcstop - entry.fcstart) / entry.fstep + 1
        };

        let stream = match props.sample_type {
            SampleType::I16Q16 => StreamId::IfDataI16Q16,
            SampleType::I16 => StreamId::IfDataI16,
            SampleType::I32 => StreamId::IfDataI32,
        };

        for step in 0..tunings {
            let fc = entry.fcstart + step * entry.fstep;
            trace!("Sim tuning {fc} Hz");

            let ts = self.timestamp();
            self.writer.write_packet(
                StreamId::ReceiverContext,
                ts,
                VrtBody::Receiver(ReceiverContext {
                    frequency: Some(fc as f64),
                    ..Default::default()
                }),
            )?;
            self.writer.write_packet(
                StreamId::DigitizerContext,
                ts,
                VrtBody::Digitizer(DigitizerContext {
                    bandwidth: Some(props.full_bw as f64),
                    reference_level: Some(self.config.reference_level),
                    ..Default::default()
                }),
            )?;

            for _ in 0..entry.ppb.max(1) {
                let samples = self.samples(props, fc, entry.spp);
                let body = VrtBody::IfData(IfData {
                    samples: match stream {
                        StreamId::IfDataI16Q16 => SampleData::I16Q16 {
                            q: vec![0; samples.len()],
                            i: samples,
                        },
                        StreamId::IfDataI32 => {
                            SampleData::I32(samples.into_iter().map(i32::from).collect())
                        }
                        _ => SampleData::I16(samples),
                    },
                    trailer: Some(
                        VrtTrailer::new().with_spectral_inversion(self.config.spectral_inversion),
                    ),
                });
                let ts = self.timestamp();
                self.writer.write_packet(stream, ts, body)?;
                self.clock_picos += entry.spp as u64 * SAMPLE_PERIOD_PICOS;
            }
        }

        Ok(())
    }

    /// Отсчёты одного пакета: тон (если попал в годную полосу) плюс шум.
    fn samples(
        &mut self,
        props: &SweepDeviceProperties,
        fc: u64,
        n: usize,
    ) -> Vec<i16> {
        let mut out = vec![0f32; n];
        let rbw = props.full_bw as f64 / n as f64;
        let half = props.usable_bw as f64 / 2.0;

        if let Some(tone) = self.config.tone {
            let off = tone.frequency_hz - fc as f64;
            if (-half..half).contains(&off) && n > 0 {
                // положение тона на оси ПЧ с учётом инверсии тракта
                let bin = if self.config.spectral_inversion {
                    let m = ((props.full_bw - props.passband_center) as f64 + off) / rbw;
                    (n - 1).saturating_sub(m.round() as usize)
                } else {
                    ((props.passband_center as f64 + off) / rbw).round() as usize
                };

                for (i, v) in out.iter_mut().enumerate() {
                    let phase = 2.0 * PI * bin as f32 * i as f32 / n as f32;
                    *v += tone.amplitude * phase.cos();
                }
            }
        }

        let noise = self.config.noise_amplitude;
        if noise > 0.0 {
            for v in out.iter_mut() {
                *v += self.rng.gen_range(-noise..=noise);
            }
        }

        out.into_iter()
            .map(|v| v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect()
    }

    fn timestamp(&self) -> VrtTimestamp {
        let secs = self.clock_picos / VrtTimestamp::PICOS_PER_SECOND;
        VrtTimestamp::new(
            SIM_EPOCH_SECS.wrapping_add(secs as u32),
            self.clock_picos % VrtTimestamp::PICOS_PER_SECOND,
        )
    }
}

fn parse_arg<T: std::str::FromStr>(
    cmd: &str,
    arg: &str,
) -> WsaResult<T> {
    arg.trim()
        .parse()
        .map_err(|_| WsaError::malformed_response(cmd, format!("bad argument '{arg}'")))
}

fn parse_hz(
    cmd: &str,
    arg: &str,
) -> WsaResult<u64> {
    let arg = arg.trim();
    let value = arg
        .strip_suffix("Hz")
        .or_else(|| arg.strip_suffix("HZ"))
        .unwrap_or(arg);
    parse_arg(cmd, value)
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для SimConfig, SimulatedInstrument, SimDataChannel
////////////////////////////////////////////////////////////////////////////////

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            model: "WSA5000-427".to_string(),
            serial: "SIM-0001".to_string(),
            firmware: "4.5.5".to_string(),
            tone: Some(SimTone {
                frequency_hz: 2_447_500_000.0,
                amplitude: 4_000.0,
            }),
            noise_amplitude: 8.0,
            reference_level: -10.0,
            spectral_inversion: false,
            seed: 0x5eed,
        }
    }
}

impl Write for ChannelSink {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "data channel closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommandChannel for SimulatedInstrument {
    fn send(
        &mut self,
        cmd: &str,
    ) -> WsaResult<()> {
        let cmd = cmd.trim();
        self.history.push(cmd.to_string());
        self.execute(cmd)
    }

    fn query(
        &mut self,
        cmd: &str,
    ) -> WsaResult<String> {
        let cmd = cmd.trim();
        self.history.push(cmd.to_string());

        match cmd.to_uppercase().as_str() {
            "*IDN?" => Ok(format!(
                "ThinkRF,{},{},{}",
                self.config.model, self.config.serial, self.config.firmware
            )),
            "SWEEP:LIST:STATUS?" => {
                let status = if self.running { "RUNNING" } else { "STOPPED" };
                Ok(status.to_string())
            }
            "SWEEP:ENTRY:COUNT?" => Ok(self.entries.len().to_string()),
            _ => Err(WsaError::malformed_response(cmd, "-113,\"Undefined header\"")),
        }
    }
}

impl DataChannel for SimDataChannel {
    fn recv_exact(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> WsaResult<usize> {
        let deadline = Instant::now() + timeout;
        let mut filled = 0;

        while filled < buf.len() {
            if self.pos < self.pending.len() {
                let n = (self.pending.len() - self.pos).min(buf.len() - filled);
                buf[filled..filled + n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
                self.pos += n;
                filled += n;
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(RecvTimeoutError::Timeout) if filled == 0 => {
                    return Err(WsaError::NoResponse(timeout))
                }
                Err(RecvTimeoutError::Disconnected) if filled == 0 => {
                    return Err(WsaError::ConnectionDropped)
                }
                Err(_) => break,
            }
        }

        Ok(filled)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
