//! Планирование свипа: перевод запрошенной полосы и разрешения в набор
//! перестроек инструмента.
//!
//! Инструмент отдаёт полосу `full_bw` вокруг частоты настройки, но доверять
//! можно только её середине шириной `usable_bw`. План выбирает центры так,
//! чтобы годные участки соседних шагов шли встык и покрывали
//! `[fstart, fstop)`.

use log::{debug, warn};
use wsa_types::RfeMode;

use crate::{
    SweepDeviceProperties, SweepError, SweepResult, POISONED_BUFFER_VALUE, WSA_MAX_SPP,
    WSA_MIN_SPP,
};

/// Один шаг плана: диапазон центров с постоянным шагом.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlanEntry {
    /// Первая частота настройки, Гц
    pub fcstart: u64,
    /// Последняя частота настройки, Гц (кратна шагу от `fcstart`)
    pub fcstop: u64,
    /// Шаг перестройки, Гц
    pub fstep: u64,
    /// Размер БПФ (степень двойки)
    pub samples_per_packet: usize,
    pub packets_per_block: u32,
}

/// Конфигурация сессии захвата спектра мощности.
#[derive(Debug, Clone)]
pub struct PowerSpectrumConfig {
    pub mode: RfeMode,
    /// Нижний край запрошенной полосы, Гц
    pub fstart: u64,
    /// Верхний край запрошенной полосы, Гц
    pub fstop: u64,
    /// Достигнутое разрешение `full_bw / samples_per_packet`
    pub rbw: f64,
    /// Разрешение, которое просил вызывающий
    pub requested_rbw: f64,
    pub samples_per_packet: usize,
    pub packets_per_block: u32,
    pub entries: Vec<SweepPlanEntry>,
    /// Сколько пакетов данных вернёт инструмент за свип
    pub packet_total: u32,
    /// Буфер спектра, дБ; длина фиксирована при планировании
    pub buf: Vec<f32>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SweepPlanEntry {
    /// Количество перестроек (включая первую).
    pub fn tunings(&self) -> u32 {
        if self.fcstop <= self.fcstart || self.fstep == 0 {
            1
        } else {
            ((self.fcstop - self.fcstart) / self.fstep) as u32 + 1
        }
    }

    /// Частоты настройки по порядку.
    pub fn centers(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.tunings() as u64).map(move |i| self.fcstart + i * self.fstep)
    }

    pub fn packet_count(&self) -> u32 {
        self.tunings() * self.packets_per_block
    }
}

impl PowerSpectrumConfig {
    pub fn buflen(&self) -> usize {
        self.buf.len()
    }

    pub fn spectrum(&self) -> &[f32] {
        &self.buf
    }

    /// Частота левого края бина `bin`, Гц.
    pub fn bin_frequency(
        &self,
        bin: usize,
    ) -> f64 {
        self.fstart as f64 + bin as f64 * self.rbw
    }

    pub fn properties(&self) -> SweepResult<&'static SweepDeviceProperties> {
        SweepDeviceProperties::for_mode(self.mode)
    }

    /// Заполняет буфер маркером «не записано».
    pub fn poison(&mut self) {
        self.buf.fill(POISONED_BUFFER_VALUE);
    }

    /// Количество бинов, не записанных последним захватом.
    pub fn unfilled_bins(&self) -> usize {
        self.buf
            .iter()
            .filter(|&&v| v == POISONED_BUFFER_VALUE)
            .count()
    }
}

/// Наименьшая степень двойки `size`, при которой `full_bw / size <= rbw`.
fn fft_size_for(
    full_bw: u64,
    rbw: f64,
) -> usize {
    let ratio = full_bw as f64 / rbw;
    let exp = ratio.log2().ceil().max(0.0);

    // вне диапазона usize ограничиваемся заведомо слишком большим размером
    if exp >= (usize::BITS - 1) as f64 {
        1 << (usize::BITS - 2)
    } else {
        1usize << exp as u32
    }
}

/// Округление вверх до кратного `step`; `None` при переполнении.
fn round_up(
    value: u64,
    step: u64,
) -> Option<u64> {
    value.div_ceil(step).checked_mul(step)
}

fn alloc_spectrum(len: usize) -> SweepResult<Vec<f32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| SweepError::OutOfMemory(len))?;
    buf.resize(len, POISONED_BUFFER_VALUE);
    Ok(buf)
}

/// Строит план свипа для полосы `[fstart, fstop)` с разрешением не хуже
/// ближайшего достижимого к `rbw`.
///
/// Ошибки: режим без профиля, полоса вне диапазона перестройки, слишком
/// грубое разрешение, нехватка памяти под буфер.
pub fn plan(
    fstart: u64,
    fstop: u64,
    rbw: f64,
    mode: RfeMode,
) -> SweepResult<PowerSpectrumConfig> {
    let prop = SweepDeviceProperties::for_mode(mode)?;

    if !rbw.is_finite() || rbw <= 0.0 {
        return Err(SweepError::InvalidRbw(rbw));
    }

    if fstart > fstop {
        return Err(SweepError::out_of_range(format!(
            "fstart {fstart} Hz is above fstop {fstop} Hz"
        )));
    }

    // центры крайних шагов; узкая полоса укладывается в один шаг
    let half_usable = prop.usable_bw / 2;
    let fcstart = fstart
        .checked_add(half_usable)
        .and_then(|f| round_up(f, prop.tuning_resolution))
        .ok_or_else(|| {
            SweepError::out_of_range(format!("fstart {fstart} Hz overflows the tuning range"))
        })?;
    let fcstop = fstop.saturating_sub(half_usable).max(fcstart);

    if fcstart < prop.min_tunable {
        return Err(SweepError::out_of_range(format!(
            "first center {fcstart} Hz below minimum tunable {} Hz",
            prop.min_tunable
        )));
    }
    if fcstop > prop.max_tunable {
        return Err(SweepError::out_of_range(format!(
            "last center {fcstop} Hz above maximum tunable {} Hz",
            prop.max_tunable
        )));
    }

    let mut size = fft_size_for(prop.full_bw, rbw);
    if size < WSA_MIN_SPP {
        return Err(SweepError::BandTooSmall {
            size,
            min: WSA_MIN_SPP,
        });
    }
    if size > WSA_MAX_SPP {
        warn!("FFT size {size} exceeds instrument maximum, clamped to {WSA_MAX_SPP}");
        size = WSA_MAX_SPP;
    }

    let achieved_rbw = prop.full_bw as f64 / size as f64;
    let fstep = prop.usable_bw;
    let ppb = 1;

    // шагов столько, чтобы годные участки дошли до fstop
    let steps = (fcstop - fcstart).div_ceil(fstep);
    let last_center = fcstart + steps * fstep;

    let mut entries = Vec::with_capacity(2);
    if last_center <= prop.max_tunable {
        entries.push(SweepPlanEntry {
            fcstart,
            fcstop: last_center,
            fstep,
            samples_per_packet: size,
            packets_per_block: ppb,
        });
    } else {
        // дорезаем край отдельной записью с центром ровно на fcstop
        let in_range = (prop.max_tunable - fcstart) / fstep;
        entries.push(SweepPlanEntry {
            fcstart,
            fcstop: fcstart + in_range * fstep,
            fstep,
            samples_per_packet: size,
            packets_per_block: ppb,
        });
        entries.push(SweepPlanEntry {
            fcstart: fcstop,
            fcstop,
            fstep,
            samples_per_packet: size,
            packets_per_block: ppb,
        });
        debug!("Added compensation entry at {fcstop} Hz");
    }

    let packet_total = entries.iter().map(SweepPlanEntry::packet_count).sum();

    let buflen = ((fstop - fstart) as f64 / achieved_rbw) as usize;
    if buflen == 0 {
        return Err(SweepError::out_of_range(format!(
            "band {fstart}..{fstop} Hz is narrower than one {achieved_rbw:.3} Hz bin"
        )));
    }
    let buf = alloc_spectrum(buflen)?;

    debug!(
        "Planned {mode} sweep {fstart}..{fstop} Hz: fft {size}, rbw {achieved_rbw:.3} Hz, \
         {} entries, {packet_total} packets, {buflen} bins",
        entries.len()
    );

    Ok(PowerSpectrumConfig {
        mode,
        fstart,
        fstop,
        rbw: achieved_rbw,
        requested_rbw: rbw,
        samples_per_packet: size,
        packets_per_block: ppb,
        entries,
        packet_total,
        buf,
    })
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    const MHZ: u64 = 1_000_000;

    #[test]
    fn test_plan_reference_example() {
        let cfg = plan(2_400 * MHZ, 2_500 * MHZ, 100_000.0, RfeMode::Shn).unwrap();

        assert_eq!(cfg.samples_per_packet, 1024);
        assert!((cfg.rbw - 61_035.156_25).abs() < 1e-9);
        assert_eq!(cfg.buflen(), 1638);
        assert_eq!(cfg.entries.len(), 1);

        let entry = &cfg.entries[0];
        assert_eq!(entry.fcstart, 2_405 * MHZ);
        assert_eq!(entry.fcstop, 2_495 * MHZ);
        assert_eq!(entry.fstep, 10 * MHZ);
        assert_eq!(entry.packets_per_block, 1);
        assert_eq!(entry.tunings(), 10);
        assert_eq!(cfg.packet_total, 10);
        assert_eq!(cfg.unfilled_bins(), cfg.buflen());
    }

    #[test]
    fn test_rbw_is_power_of_two_fraction() {
        for rbw in [2_000.0, 10_000.0, 61_035.0, 100_000.0, 200_000.0, 244_140.625] {
            let cfg = plan(1_000 * MHZ, 1_100 * MHZ, rbw, RfeMode::Sh).unwrap();
            let ratio = 62_500_000.0 / cfg.rbw;
            assert_eq!(ratio, ratio.round());
            assert!((ratio as usize).is_power_of_two());
            assert!(cfg.rbw <= rbw + 1e-9, "rbw {rbw} -> {}", cfg.rbw);
        }
    }

    #[test]
    fn test_usable_intervals_tile() {
        let cfg = plan(900 * MHZ, 1_337 * MHZ, 50_000.0, RfeMode::Sh).unwrap();
        let prop = cfg.properties().unwrap();
        let half = prop.usable_bw / 2;

        let centers: Vec<u64> = cfg.entries.iter().flat_map(|e| e.centers()).collect();
        assert_eq!(centers.len() as u32, cfg.packet_total);

        // левый край первого годного участка не ниже fstart
        assert!(centers[0] - half >= cfg.fstart);
        assert!(centers[0] - half - cfg.fstart < prop.tuning_resolution);

        for pair in centers.windows(2) {
            // правый край одного равен левому краю следующего
            assert_eq!(pair[0] + half, pair[1] - half);
        }

        // последний годный участок доходит до fstop
        assert!(centers.last().unwrap() + half >= cfg.fstop);
    }

    #[test]
    fn test_narrow_band_single_tuning() {
        let cfg = plan(2_400 * MHZ, 2_403 * MHZ, 100_000.0, RfeMode::Shn).unwrap();
        assert_eq!(cfg.entries.len(), 1);
        assert_eq!(cfg.entries[0].fcstart, cfg.entries[0].fcstop);
        assert_eq!(cfg.packet_total, 1);
        assert_eq!(cfg.buflen(), (3e6 / cfg.rbw) as usize);
    }

    #[test]
    fn test_fcstart_rounded_to_tuning_resolution() {
        let cfg = plan(2_400_000_003, 2_500_000_000, 100_000.0, RfeMode::Shn).unwrap();
        assert_eq!(cfg.entries[0].fcstart, 2_405_000_010);
    }

    #[test]
    fn test_compensation_entry_near_max() {
        // 26925, 26965, 27005 > 27000: последний центр выносится в отдельную запись
        let cfg = plan(26_905 * MHZ, 27_015 * MHZ, 100_000.0, RfeMode::Sh).unwrap();
        assert_eq!(cfg.entries.len(), 2);

        let main = &cfg.entries[0];
        assert_eq!(main.fcstart, 26_925 * MHZ);
        assert_eq!(main.fcstop, 26_965 * MHZ);
        assert_eq!(main.tunings(), 2);

        let comp = &cfg.entries[1];
        assert_eq!(comp.fcstart, 26_995 * MHZ);
        assert_eq!(comp.fcstop, comp.fcstart);
        assert_eq!(cfg.packet_total, 3);
    }

    #[test]
    fn test_band_near_u64_max_is_out_of_range() {
        assert!(matches!(
            plan(u64::MAX - 1, u64::MAX, 100_000.0, RfeMode::Shn),
            Err(SweepError::FrequencyOutOfRange(_))
        ));
        // сложение проходит, переполняется округление до шага перестройки
        assert!(matches!(
            plan(u64::MAX - 5_000_003, u64::MAX, 100_000.0, RfeMode::Shn),
            Err(SweepError::FrequencyOutOfRange(_))
        ));
    }

    #[test]
    fn test_frequency_out_of_range() {
        // центр первого шага ниже минимума перестройки
        assert!(matches!(
            plan(10 * MHZ, 200 * MHZ, 100_000.0, RfeMode::Shn),
            Err(SweepError::FrequencyOutOfRange(_))
        ));
        // центр последнего шага выше максимума
        assert!(matches!(
            plan(26_900 * MHZ, 27_100 * MHZ, 100_000.0, RfeMode::Shn),
            Err(SweepError::FrequencyOutOfRange(_))
        ));
        // перевёрнутая полоса
        assert!(matches!(
            plan(2_500 * MHZ, 2_400 * MHZ, 100_000.0, RfeMode::Shn),
            Err(SweepError::FrequencyOutOfRange(_))
        ));
    }

    #[test]
    fn test_band_too_small() {
        // 62.5 МГц / 1 МГц -> 64 точки < 256
        let err = plan(2_400 * MHZ, 2_500 * MHZ, 1_000_000.0, RfeMode::Shn).unwrap_err();
        assert!(matches!(err, SweepError::BandTooSmall { size: 64, min: 256 }));
        assert!(err.is_planning_error());
    }

    #[test]
    fn test_fft_size_clamped() {
        let cfg = plan(2_400 * MHZ, 2_410 * MHZ, 100.0, RfeMode::Shn).unwrap();
        assert_eq!(cfg.samples_per_packet, WSA_MAX_SPP);
        assert!(cfg.rbw > 100.0);
    }

    #[test]
    fn test_unsupported_mode_and_bad_rbw() {
        assert!(matches!(
            plan(2_400 * MHZ, 2_500 * MHZ, 100_000.0, RfeMode::Zif),
            Err(SweepError::UnsupportedMode(_))
        ));
        assert!(matches!(
            plan(2_400 * MHZ, 2_500 * MHZ, 0.0, RfeMode::Shn),
            Err(SweepError::InvalidRbw(_))
        ));
    }

    #[test]
    fn test_poison_and_unfilled() {
        let mut cfg = plan(2_400 * MHZ, 2_450 * MHZ, 100_000.0, RfeMode::Shn).unwrap();
        cfg.buf[0] = -50.0;
        assert_eq!(cfg.unfilled_bins(), cfg.buflen() - 1);
        cfg.poison();
        assert_eq!(cfg.unfilled_bins(), cfg.buflen());
    }
}
