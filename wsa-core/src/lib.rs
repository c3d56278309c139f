//! Протокольное ядро клиента WSA.
//!
//! Кодек пакетов VITA Radio Transport, потоковый читатель с учётом порядка
//! пакетов, каналы связи с инструментом и численные помощники для перевода
//! IF-данных в спектр мощности.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use std::{fs::File, time::Duration};
//!
//! use wsa_core::{ReadChannel, VrtReader};
//!
//! let file = File::open("capture.vrt")?;
//! let mut reader = VrtReader::new(ReadChannel::new(file), Duration::from_secs(1));
//! for packet in reader.by_ref() {
//!     println!("{:?}", packet?.header);
//! }
//! println!("{:?}", reader.stats());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod dsp;
pub mod format;
pub mod serialization;
pub mod transport;

pub use binary::*;
pub use dsp::*;
pub use format::*;
pub use serialization::*;
pub use transport::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
