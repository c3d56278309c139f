//! Свип-захват спектра мощности для анализаторов WSA.
//!
//! Планировщик переводит полосу и разрешение в записи списка свипа,
//! загрузчик отправляет их в инструмент, движок захвата собирает из потока
//! VRT пакетов непрерывный спектр.
//!
//! ```no_run
//! use wsa_sweep::{SessionConfig, SweepDevice};
//! use wsa_types::RfeMode;
//!
//! let mut device = SweepDevice::connect(&SessionConfig::default())?;
//! let mut cfg = device.power_spectrum_alloc(2_400_000_000, 2_500_000_000, 100e3, RfeMode::Shn)?;
//! device.capture_power_spectrum(&mut cfg)?;
//! device.stop()?;
//! println!("{} bins", cfg.buflen());
//! # Ok::<(), wsa_sweep::SweepError>(())
//! ```

pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod loader;
pub mod plan;
pub mod properties;
pub mod report;
pub mod sim;

pub use capture::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use loader::*;
pub use plan::*;
pub use properties::*;
pub use report::*;
pub use sim::*;
