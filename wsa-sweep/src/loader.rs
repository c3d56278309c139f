//! Загрузка плана свипа в инструмент через командный канал.

use log::debug;
use wsa_core::CommandChannel;
use wsa_types::{RfeMode, WsaError, WsaResult};

use crate::{DeviceDescriptor, PowerSpectrumConfig, SweepPlanEntry, SweepResult};

/// Состояние списка свипа на стороне инструмента.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    Running,
    Stopped,
}

/// Команды списка свипа поверх любого [`CommandChannel`].
pub trait SweepListExt: CommandChannel {
    /// Сброс инструмента в состояние по умолчанию.
    fn reset(&mut self) -> WsaResult<()> {
        self.send("*RST")
    }

    /// Сброс буферов канала данных.
    fn flush(&mut self) -> WsaResult<()> {
        self.send("SYSTEM:FLUSH")
    }

    /// Прерывание текущего захвата.
    fn abort(&mut self) -> WsaResult<()> {
        self.send("SYSTEM:ABORT")
    }

    fn identify(&mut self) -> WsaResult<String> {
        self.query("*IDN?")
    }

    fn clear_all_entries(&mut self) -> WsaResult<()> {
        self.send("SWEEP:ENTRY:DELETE ALL")
    }

    /// Сколько раз пройти список (0 = бесконечно).
    fn set_iteration(
        &mut self,
        count: u32,
    ) -> WsaResult<()> {
        self.send(&format!("SWEEP:LIST:ITER {count}"))
    }

    /// Начинает редактирование новой записи.
    fn new_entry(&mut self) -> WsaResult<()> {
        self.send("SWEEP:ENTRY:NEW")
    }

    fn set_center_range(
        &mut self,
        start_hz: u64,
        stop_hz: u64,
    ) -> WsaResult<()> {
        self.send(&format!(
            "SWEEP:ENTRY:FREQ:CENT {start_hz} Hz, {stop_hz} Hz"
        ))
    }

    fn set_step(
        &mut self,
        step_hz: u64,
    ) -> WsaResult<()> {
        self.send(&format!("SWEEP:ENTRY:FREQ:STEP {step_hz} Hz"))
    }

    fn set_samples_per_packet(
        &mut self,
        spp: usize,
    ) -> WsaResult<()> {
        self.send(&format!("SWEEP:ENTRY:SPPACKET {spp}"))
    }

    fn set_packets_per_block(
        &mut self,
        ppb: u32,
    ) -> WsaResult<()> {
        self.send(&format!("SWEEP:ENTRY:PPBLOCK {ppb}"))
    }

    /// Сохраняет редактируемую запись в конец списка.
    fn save_entry(&mut self) -> WsaResult<()> {
        self.send("SWEEP:ENTRY:SAVE")
    }

    fn set_mode(
        &mut self,
        mode: RfeMode,
    ) -> WsaResult<()> {
        self.send(&format!("SWEEP:ENTRY:MODE {mode}"))
    }

    /// Аттенюатор записи; у моделей -408 ступенчатый, у остальных плавный.
    fn set_attenuation(
        &mut self,
        descriptor: &DeviceDescriptor,
        value: u32,
    ) -> WsaResult<()> {
        if descriptor.has_step_attenuator() {
            self.send(&format!("SWEEP:ENTRY:ATT {value}"))
        } else {
            self.send(&format!("SWEEP:ENTRY:ATT:VAR {value}"))
        }
    }

    fn start(&mut self) -> WsaResult<()> {
        self.send("SWEEP:LIST:START")
    }

    fn stop(&mut self) -> WsaResult<()> {
        self.send("SWEEP:LIST:STOP")
    }

    fn status(&mut self) -> WsaResult<SweepStatus> {
        const CMD: &str = "SWEEP:LIST:STATUS?";

        let reply = self.query(CMD)?;
        match reply.trim().to_uppercase().as_str() {
            "RUNNING" => Ok(SweepStatus::Running),
            "STOPPED" => Ok(SweepStatus::Stopped),
            _ => Err(WsaError::malformed_response(CMD, reply)),
        }
    }
}

impl<T: CommandChannel + ?Sized> SweepListExt for T {}

fn push_entry<C: SweepListExt + ?Sized>(
    channel: &mut C,
    entry: &SweepPlanEntry,
) -> WsaResult<()> {
    channel.set_center_range(entry.fcstart, entry.fcstop)?;
    channel.set_step(entry.fstep)?;
    channel.set_samples_per_packet(entry.samples_per_packet)?;
    channel.set_packets_per_block(entry.packets_per_block)?;
    channel.save_entry()
}

/// Загружает план в инструмент, не запуская свип.
///
/// Существующие записи удаляются; список проходится один раз.
pub fn load_plan<C: SweepListExt + ?Sized>(
    channel: &mut C,
    config: &PowerSpectrumConfig,
    attenuator: u32,
    descriptor: &DeviceDescriptor,
) -> SweepResult<()> {
    channel.reset()?;
    channel.flush()?;
    channel.abort()?;

    channel.clear_all_entries()?;
    channel.new_entry()?;
    channel.set_iteration(1)?;
    channel.set_attenuation(descriptor, attenuator)?;
    channel.set_mode(config.mode)?;

    for entry in &config.entries {
        debug!(
            "Loading entry {}..{} Hz step {} Hz ({} tunings)",
            entry.fcstart,
            entry.fcstop,
            entry.fstep,
            entry.tunings()
        );
        push_entry(channel, entry)?;
    }

    debug!("Loaded {} sweep entries", config.entries.len());
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
