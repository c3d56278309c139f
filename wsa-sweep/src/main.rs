use std::{path::PathBuf, time::Duration};

use clap::Parser;
use log::{error, info, warn};
use wsa_sweep::{parse_freq_hz, DeviceTarget, SessionConfig, SpectrumReport, SweepDevice};
use wsa_types::RfeMode;

#[derive(Parser, Debug)]
#[command(
    name = "wsa-sweep",
    version = env!("CARGO_PKG_VERSION"),
    about = "Capture a swept power spectrum from a WSA spectrum analyzer",
    long_about = None,
)]
struct Cli {
    /// Инструмент: sim или имя хоста / IP
    #[arg(short, long, default_value = "sim")]
    target: String,
    /// Начало полосы (2400MHz, 2.4GHz, 2400000000)
    #[arg(short, long, default_value = "2400MHz")]
    start: String,
    /// Конец полосы
    #[arg(short = 'e', long, default_value = "2500MHz")]
    stop: String,
    /// Желаемое разрешение по частоте
    #[arg(short, long, default_value = "100kHz")]
    rbw: String,
    /// Режим RFE: SH, SHN
    #[arg(short, long, default_value = "SHN")]
    mode: String,
    /// Аттенюатор записей свипа, дБ
    #[arg(short, long, default_value = "0")]
    attenuator: u32,
    /// Таймаут сокетов и чтения пакетов, мс
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,
    /// JSON отчёт со спектром
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet { "error" } else { "info" };

    env_logger::Builder::new()
        .filter_level(level.parse().unwrap())
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let target: DeviceTarget = match cli.target.parse() {
        Ok(t) => t,
        Err(e) => {
            error!("--target: {e}");
            std::process::exit(1);
        }
    };

    let fstart = match parse_freq_hz(&cli.start) {
        Ok(f) => f,
        Err(e) => {
            error!("--start: {e}");
            std::process::exit(1);
        }
    };

    let fstop = match parse_freq_hz(&cli.stop) {
        Ok(f) => f,
        Err(e) => {
            error!("--stop: {e}");
            std::process::exit(1);
        }
    };

    let rbw = match parse_freq_hz(&cli.rbw) {
        Ok(r) if r > 0 => r as f64,
        Ok(_) => {
            error!("--rbw must be positive");
            std::process::exit(1);
        }
        Err(e) => {
            error!("--rbw: {e}");
            std::process::exit(1);
        }
    };

    let mode: RfeMode = match cli.mode.parse() {
        Ok(m) => m,
        Err(e) => {
            error!("--mode: {e}");
            std::process::exit(1);
        }
    };

    let session = SessionConfig {
        target,
        timeout: Duration::from_millis(cli.timeout_ms),
        attenuator: cli.attenuator,
        ..Default::default()
    };

    let mut device = match SweepDevice::connect(&session) {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to connect to {}: {e}", session.target);
            std::process::exit(1);
        }
    };

    let mut config = match device.power_spectrum_alloc(fstart, fstop, rbw, mode) {
        Ok(c) => c,
        Err(e) => {
            error!("Planning failed: {e}");
            std::process::exit(1);
        }
    };

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Target        : {}", session.target);
    info!("  Model         : {}", device.descriptor().model);
    info!("  Span          : {:.3} .. {:.3} MHz", fstart as f64 / 1e6, fstop as f64 / 1e6);
    info!("  RBW           : {:.3} kHz", config.rbw / 1e3);
    info!("  FFT size      : {}", config.samples_per_packet);
    info!("  Packets       : {}", config.packet_total);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let captured = device.capture_power_spectrum(&mut config);

    if let Err(e) = device.stop() {
        warn!("Failed to stop sweep: {e}");
    }

    if let Err(e) = captured {
        error!("Capture failed: {e}");
        std::process::exit(1);
    }

    let stats = device.read_stats();
    if stats.packets_lost > 0 {
        warn!("{} packets lost in the data stream", stats.packets_lost);
    }

    let report = match SpectrumReport::from_config(&config) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to build report: {e}");
            std::process::exit(1);
        }
    };

    info!("\n{report}");

    if let Some(path) = &cli.output {
        match report.write_json(path) {
            Ok(()) => info!("Report written to {path:?}"),
            Err(e) => {
                error!("Failed to write {path:?}: {e}");
                std::process::exit(1);
            }
        }
    }
}
