use std::{
    fmt,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use wsa_core::{channel_power, occupied_bandwidth, peak_find};

use crate::{PowerSpectrumConfig, SweepResult};

/// Доля мощности для занимаемой полосы, %.
pub const OCCUPIED_POWER_PERCENT: f32 = 99.0;

/// Итог захвата в виде, пригодном для JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumReport {
    pub mode: String,
    pub fstart_hz: u64,
    pub fstop_hz: u64,
    pub rbw_hz: f64,
    pub requested_rbw_hz: f64,
    pub fft_size: usize,
    pub sweep_entries: usize,
    pub bins: usize,
    pub peak_freq_hz: f64,
    pub peak_power_db: f32,
    /// Мощность во всей полосе, дБ
    pub total_power_db: f32,
    pub occupied_bw_hz: f64,
    /// Мощность по бинам, дБ
    pub power_db: Vec<f32>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SpectrumReport {
    /// Собирает отчёт из заполненной конфигурации.
    pub fn from_config(config: &PowerSpectrumConfig) -> SweepResult<Self> {
        let spectrum = config.spectrum();
        // правый край последнего целого бина, а не fstop
        let span_end = config.bin_frequency(spectrum.len());
        let (peak_freq_hz, peak_power_db) = peak_find(spectrum, config.fstart as f64, span_end)?;
        let total_power_db = channel_power(spectrum, 0, spectrum.len())?;
        let occupied_bw_hz = occupied_bandwidth(spectrum, config.rbw, OCCUPIED_POWER_PERCENT)?;

        Ok(Self {
            mode: config.mode.to_string(),
            fstart_hz: config.fstart,
            fstop_hz: config.fstop,
            rbw_hz: config.rbw,
            requested_rbw_hz: config.requested_rbw,
            fft_size: config.samples_per_packet,
            sweep_entries: config.entries.len(),
            bins: spectrum.len(),
            peak_freq_hz,
            peak_power_db,
            total_power_db,
            occupied_bw_hz,
            power_db: spectrum.to_vec(),
        })
    }

    /// Записывает отчёт в JSON файл.
    pub fn write_json<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> SweepResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> SweepResult<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для SpectrumReport
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for SpectrumReport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Mode          : {}", self.mode)?;
        writeln!(
            f,
            "  Span          : {:.3} .. {:.3} MHz",
            self.fstart_hz as f64 / 1e6,
            self.fstop_hz as f64 / 1e6
        )?;
        writeln!(
            f,
            "  RBW           : {:.3} kHz (requested {:.3} kHz)",
            self.rbw_hz / 1e3,
            self.requested_rbw_hz / 1e3
        )?;
        writeln!(f, "  FFT size      : {}", self.fft_size)?;
        writeln!(f, "  Sweep entries : {}", self.sweep_entries)?;
        writeln!(f, "  Bins          : {}", self.bins)?;
        writeln!(
            f,
            "  Peak          : {:.2} dB @ {:.4} MHz",
            self.peak_power_db,
            self.peak_freq_hz / 1e6
        )?;
        writeln!(f, "  Total power   : {:.2} dB", self.total_power_db)?;
        writeln!(
            f,
            "  Occupied BW   : {:.3} kHz ({OCCUPIED_POWER_PERCENT}%)",
            self.occupied_bw_hz / 1e3
        )?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;
    use wsa_types::RfeMode;

    use super::*;
    use crate::plan;

    fn filled_config() -> PowerSpectrumConfig {
        let mut cfg = plan(2_400_000_000, 2_450_000_000, 100_000.0, RfeMode::Shn).unwrap();
        for (i, v) in cfg.buf.iter_mut().enumerate() {
            *v = -100.0 + (i % 7) as f32;
        }
        cfg.buf[400] = -20.0;
        cfg
    }

    #[test]
    fn test_report_peak() {
        let cfg = filled_config();
        let report = SpectrumReport::from_config(&cfg).unwrap();

        assert_eq!(report.bins, cfg.buflen());
        assert_eq!(report.mode, "SHN");
        assert_eq!(report.peak_power_db, -20.0);
        assert!((report.peak_freq_hz - cfg.bin_frequency(400)).abs() < 1.0);
        assert!(report.total_power_db > -20.0);

        assert!(report.occupied_bw_hz > 0.0);
        assert!(report.occupied_bw_hz <= report.bins as f64 * report.rbw_hz);

        let text = report.to_string();
        assert!(text.contains("Peak"));
        assert!(text.contains("Occupied BW"));
        assert!(text.contains("SHN"));
    }

    #[test]
    fn test_report_occupied_bandwidth_of_carrier() {
        let mut cfg = plan(2_400_000_000, 2_450_000_000, 100_000.0, RfeMode::Shn).unwrap();
        cfg.buf.fill(-120.0);
        let center = cfg.buflen() / 2;
        cfg.buf[center - 10..center + 10].fill(-30.0);

        let report = SpectrumReport::from_config(&cfg).unwrap();
        assert!((report.occupied_bw_hz - 20.0 * cfg.rbw).abs() < 1e-6);
    }

    #[test]
    fn test_report_json_file() {
        let report = SpectrumReport::from_config(&filled_config()).unwrap();
        let tmp = NamedTempFile::new().unwrap();

        report.write_json(tmp.path()).unwrap();
        let back = SpectrumReport::read_json(tmp.path()).unwrap();
        assert_eq!(back, report);
    }
}
