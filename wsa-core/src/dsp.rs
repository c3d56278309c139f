//! Численная обработка пакетов IF-данных: окно Ханна, нормализация к полной
//! шкале, БПФ и перевод в логарифмическую мощность.

use std::{fmt, sync::Arc};

use rustfft::{num_complex::Complex32, Fft, FftPlanner};
use wsa_types::{SampleData, WsaError, WsaResult};

/// Нижняя граница модуля бина перед логарифмом (-240 дБ)
pub const MAGNITUDE_FLOOR: f32 = 1e-12;

/// Симметричное окно Ханна длины `n`.
pub fn hann_window(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }

    let denom = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos()))
        .collect()
}

/// Логарифмическая мощность бина: `2 * 10 * log10(|x| / n)`.
pub fn log_power(
    value: Complex32,
    n: usize,
) -> f32 {
    let magnitude = (value.norm() / n as f32).max(MAGNITUDE_FLOOR);
    2.0 * 10.0 * magnitude.log10()
}

/// БПФ фиксированного размера с предвычисленным окном и scratch буфером.
pub struct SpectrumAnalyzer {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("size", &self.size)
            .finish()
    }
}

impl SpectrumAnalyzer {
    pub fn new(size: usize) -> WsaResult<Self> {
        if size < 2 {
            return Err(WsaError::format_violation(format!(
                "FFT size {size} is too small"
            )));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex32::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            size,
            fft,
            window: hann_window(size),
            buffer: vec![Complex32::new(0.0, 0.0); size],
            scratch,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Копирует отсчёты в рабочий буфер, применяет окно и нормализует.
    ///
    /// Для кодировок без Q мнимая часть равна нулю.
    pub fn load(
        &mut self,
        samples: &SampleData,
    ) -> WsaResult<()> {
        if samples.len() != self.size {
            return Err(WsaError::format_violation(format!(
                "expected {} samples, got {}",
                self.size,
                samples.len()
            )));
        }

        let scale = 1.0 / samples.sample_type().full_scale();
        let gain = |idx: usize| self.window[idx] * scale;

        match samples {
            SampleData::I16Q16 { i, q } => {
                let pairs = i.iter().zip(q);
                for (idx, (slot, (&si, &sq))) in self.buffer.iter_mut().zip(pairs).enumerate() {
                    *slot = Complex32::new(si as f32, sq as f32) * gain(idx);
                }
            }
            SampleData::I16(v) => {
                for (idx, (slot, &s)) in self.buffer.iter_mut().zip(v).enumerate() {
                    *slot = Complex32::new(s as f32 * gain(idx), 0.0);
                }
            }
            SampleData::I32(v) => {
                for (idx, (slot, &s)) in self.buffer.iter_mut().zip(v).enumerate() {
                    *slot = Complex32::new(s as f32 * gain(idx), 0.0);
                }
            }
        }

        Ok(())
    }

    /// БПФ рабочего буфера на месте.
    pub fn transform(&mut self) {
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);
    }

    /// Разворачивает спектр (при спектральной инверсии тракта).
    pub fn reverse(&mut self) {
        self.buffer.reverse();
    }

    /// Окно, нормализация и БПФ за один вызов.
    pub fn process(
        &mut self,
        samples: &SampleData,
    ) -> WsaResult<&[Complex32]> {
        self.load(samples)?;
        self.transform();
        Ok(&self.buffer)
    }

    pub fn spectrum(&self) -> &[Complex32] {
        &self.buffer
    }

    /// Логарифмическая мощность бина `bin` текущего спектра.
    pub fn bin_power(
        &self,
        bin: usize,
    ) -> f32 {
        log_power(self.buffer[bin], self.size)
    }
}

/// Ищет максимум спектра; возвращает (частоту бина, мощность).
pub fn peak_find(
    spectrum: &[f32],
    fstart: f64,
    fstop: f64,
) -> WsaResult<(f64, f32)> {
    if spectrum.is_empty() {
        return Err(WsaError::format_violation("empty spectrum"));
    }

    let rbw = (fstop - fstart) / spectrum.len() as f64;
    let (bin, &power) = spectrum
        .iter()
        .enumerate()
        .fold((0, &spectrum[0]), |best, cur| {
            if cur.1 > best.1 {
                cur
            } else {
                best
            }
        });

    Ok((fstart + bin as f64 * rbw, power))
}

fn check_range(
    spectrum: &[f32],
    start_bin: usize,
    stop_bin: usize,
) -> WsaResult<()> {
    if start_bin >= stop_bin || stop_bin > spectrum.len() {
        return Err(WsaError::format_violation(format!(
            "invalid channel range {start_bin}..{stop_bin} for {} bins",
            spectrum.len()
        )));
    }
    Ok(())
}

/// Суммарная линейная мощность бинов `[start_bin, stop_bin)`.
pub fn absolute_power(
    spectrum: &[f32],
    start_bin: usize,
    stop_bin: usize,
) -> WsaResult<f32> {
    check_range(spectrum, start_bin, stop_bin)?;

    Ok(spectrum[start_bin..stop_bin]
        .iter()
        .map(|&db| 10f32.powf(db / 10.0))
        .sum())
}

/// Мощность в канале `[start_bin, stop_bin)`, дБ.
pub fn channel_power(
    spectrum: &[f32],
    start_bin: usize,
    stop_bin: usize,
) -> WsaResult<f32> {
    Ok(10.0 * absolute_power(spectrum, start_bin, stop_bin)?.log10())
}

/// Занимаемая полоса, Гц.
///
/// Окно растёт симметрично от центрального бина, пока в нём не окажется
/// `percentage` процентов суммарной мощности спектра. Ширина бина `rbw`.
pub fn occupied_bandwidth(
    spectrum: &[f32],
    rbw: f64,
    percentage: f32,
) -> WsaResult<f64> {
    if !(percentage > 0.0 && percentage <= 100.0) {
        return Err(WsaError::format_violation(format!(
            "occupied percentage {percentage} is outside (0, 100]"
        )));
    }
    check_range(spectrum, 0, spectrum.len())?;

    let linear = |db: f32| 10f64.powf(db as f64 / 10.0);
    let total: f64 = spectrum.iter().map(|&db| linear(db)).sum();
    let target = total * percentage as f64 / 100.0;

    let len = spectrum.len();
    let center = len / 2;
    let mut half = 0;
    let mut power = 0.0;

    // окно [center - half, center + half)
    while power < target && half < len - center {
        half += 1;
        if half <= center {
            power += linear(spectrum[center - half]);
        }
        power += linear(spectrum[center + half - 1]);
    }

    Ok((2 * half).min(len) as f64 * rbw)
}
