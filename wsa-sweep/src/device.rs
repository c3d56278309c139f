use std::time::Duration;

use log::{debug, info, warn};
use wsa_core::{
    CommandChannel, DataChannel, ReadStats, TcpCommandChannel, TcpDataChannel, VrtReader,
};
use wsa_types::{RfeMode, WsaError, WsaResult};

use crate::{
    capture_power_spectrum, load_plan, plan, DeviceTarget, PowerSpectrumConfig, SessionConfig,
    SimConfig, SimulatedInstrument, SweepError, SweepListExt, SweepResult, SweepStatus,
};

const GHZ: u64 = 1_000_000_000;

/// Частота, принимаемая для неизвестных моделей
pub const DEFAULT_MAX_TUNE_FREQ: u64 = 8 * GHZ;

/// Описание инструмента из ответа на `*IDN?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub firmware: String,
    /// Верхняя частота перестройки модели, Гц
    pub max_tune_freq: u64,
}

/// Сессия с одним инструментом: командный канал и читатель канала данных.
pub struct SweepDevice {
    commands: Box<dyn CommandChannel>,
    reader: VrtReader<Box<dyn DataChannel>>,
    descriptor: DeviceDescriptor,
    attenuator: u32,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

/// Верхняя частота по номеру модели (`WSA5000-427`, `R5500-418`, ...).
fn model_max_freq(model: &str) -> Option<u64> {
    let model = model.to_uppercase();
    let suffix = model.rsplit('-').next().unwrap_or_default();

    match suffix.trim_end_matches('P') {
        "308" | "408" | "8" => Some(8 * GHZ),
        "418" | "18" => Some(18 * GHZ),
        "427" | "27" => Some(27 * GHZ),
        "220" => Some(20 * GHZ),
        _ => None,
    }
}

impl DeviceDescriptor {
    /// Разбирает ответ вида `ThinkRF,WSA5000-427,SN,firmware`.
    pub fn parse(reply: &str) -> WsaResult<Self> {
        let fields: Vec<&str> = reply.trim().split(',').map(str::trim).collect();
        if fields.len() < 4 || fields[1].is_empty() {
            return Err(WsaError::malformed_response("*IDN?", reply));
        }

        let model = fields[1].to_string();
        let max_tune_freq = match model_max_freq(&model) {
            Some(f) => f,
            None => {
                warn!("Unknown model '{model}', assuming {DEFAULT_MAX_TUNE_FREQ} Hz limit");
                DEFAULT_MAX_TUNE_FREQ
            }
        };

        Ok(Self {
            manufacturer: fields[0].to_string(),
            model,
            serial: fields[2].to_string(),
            firmware: fields[3..].join(","),
            max_tune_freq,
        })
    }

    /// Модели -408 используют ступенчатый аттенюатор записи свипа.
    pub fn has_step_attenuator(&self) -> bool {
        let model = self.model.to_uppercase();
        model.contains("-408") || model.contains("-308")
    }
}

impl SweepDevice {
    /// Оборачивает готовые каналы и опрашивает `*IDN?`.
    pub fn new(
        mut commands: Box<dyn CommandChannel>,
        data: Box<dyn DataChannel>,
        timeout: Duration,
    ) -> SweepResult<Self> {
        let descriptor = DeviceDescriptor::parse(&commands.identify()?)?;
        info!(
            "Connected to {} {} (serial {}, firmware {})",
            descriptor.manufacturer, descriptor.model, descriptor.serial, descriptor.firmware
        );

        Ok(Self {
            commands,
            reader: VrtReader::new(data, timeout),
            descriptor,
            attenuator: 0,
        })
    }

    /// Подключается к цели из конфигурации.
    pub fn connect(config: &SessionConfig) -> SweepResult<Self> {
        let mut device = match &config.target {
            DeviceTarget::Simulated => {
                let (sim, data) = SimulatedInstrument::new(SimConfig::default());
                Self::new(Box::new(sim), Box::new(data), config.timeout)?
            }
            DeviceTarget::Host(host) => {
                let commands =
                    TcpCommandChannel::connect(host, config.command_port, config.timeout)?;
                let data = TcpDataChannel::connect(host, config.data_port, config.timeout)?;
                Self::new(Box::new(commands), Box::new(data), config.timeout)?
            }
        };

        device.set_attenuator(config.attenuator);
        Ok(device)
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn attenuator(&self) -> u32 {
        self.attenuator
    }

    /// Значение аттенюатора для следующих загрузок плана.
    pub fn set_attenuator(
        &mut self,
        value: u32,
    ) {
        self.attenuator = value;
    }

    pub fn read_stats(&self) -> &ReadStats {
        self.reader.stats()
    }

    /// Строит план свипа с учётом ограничений подключённой модели.
    pub fn power_spectrum_alloc(
        &self,
        fstart: u64,
        fstop: u64,
        rbw: f64,
        mode: RfeMode,
    ) -> SweepResult<PowerSpectrumConfig> {
        if fstop > self.descriptor.max_tune_freq {
            return Err(SweepError::out_of_range(format!(
                "fstop {fstop} Hz above {} limit {} Hz",
                self.descriptor.model, self.descriptor.max_tune_freq
            )));
        }

        plan(fstart, fstop, rbw, mode)
    }

    /// Загружает план в инструмент без запуска.
    pub fn configure_sweep(
        &mut self,
        config: &PowerSpectrumConfig,
    ) -> SweepResult<()> {
        load_plan(
            &mut *self.commands,
            config,
            self.attenuator,
            &self.descriptor,
        )
    }

    /// Загружает план, запускает свип и заполняет `config.buf`.
    ///
    /// Свип не останавливается; для этого есть [`SweepDevice::stop`].
    pub fn capture_power_spectrum(
        &mut self,
        config: &mut PowerSpectrumConfig,
    ) -> SweepResult<()> {
        self.configure_sweep(config)?;

        self.reader.reset_sequence();
        self.commands.start()?;
        debug!("Sweep started, expecting {} data packets", config.packet_total);

        capture_power_spectrum(&mut self.reader, config)
    }

    pub fn stop(&mut self) -> SweepResult<()> {
        self.commands.stop()?;
        Ok(())
    }

    pub fn status(&mut self) -> SweepResult<SweepStatus> {
        Ok(self.commands.status()?)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
