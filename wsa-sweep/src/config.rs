use std::time::Duration;

use wsa_core::{WSA_COMMAND_PORT, WSA_DATA_PORT};

/// Куда подключаться.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    /// Встроенный симулятор (не требует железа).
    Simulated,
    /// Инструмент по имени хоста или IP адресу.
    Host(String),
}

/// Полная конфигурация сессии.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub target: DeviceTarget,
    /// Порт командного канала (SCPI)
    pub command_port: u16,
    /// Порт канала данных (VRT)
    pub data_port: u16,
    /// Таймаут сокетов и чтения пакетов
    pub timeout: Duration,
    /// Значение аттенюатора для записей свипа
    pub attenuator: u32,
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для DeviceTarget, SessionConfig
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for DeviceTarget {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            DeviceTarget::Simulated => write!(f, "sim"),
            DeviceTarget::Host(host) => write!(f, "{host}"),
        }
    }
}

impl std::str::FromStr for DeviceTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "" => Err("Empty target. Use: sim or a host name/IP".to_string()),
            "sim" | "simulated" => Ok(DeviceTarget::Simulated),
            _ if s.contains(char::is_whitespace) => Err(format!("Invalid host: '{s}'")),
            _ => Ok(DeviceTarget::Host(s.to_string())),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target: DeviceTarget::Simulated,
            command_port: WSA_COMMAND_PORT,
            data_port: WSA_DATA_PORT,
            timeout: Duration::from_millis(5_000),
            attenuator: 0,
        }
    }
}

/// Множители единиц частоты; `hz` последним, иначе он съест `mhz`.
const FREQ_UNITS: [(&str, f64); 4] = [("ghz", 1e9), ("mhz", 1e6), ("khz", 1e3), ("hz", 1.0)];

/// Парсит строку частоты в герцы.
///
/// Поддерживает суффиксы: `GHz`, `MHz`, `kHz`, `Hz` (регистронезависимо).
/// Целое без суффикса читается как герцы.
///
/// # Примеры
/// ```
/// use wsa_sweep::config::parse_freq_hz;
/// assert_eq!(parse_freq_hz("2400MHz").unwrap(), 2_400_000_000);
/// assert_eq!(parse_freq_hz("2.4GHz").unwrap(), 2_400_000_000);
/// assert_eq!(parse_freq_hz("100000").unwrap(), 100_000);
/// ```
pub fn parse_freq_hz(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let lower = s.to_lowercase();

    let Some((value, scale)) = FREQ_UNITS
        .iter()
        .find_map(|&(unit, scale)| lower.strip_suffix(unit).map(|v| (v.trim(), scale)))
    else {
        return s
            .parse::<u64>()
            .map_err(|e| format!("Invalid frequency '{s}': {e}"));
    };

    let hz = value
        .parse::<f64>()
        .map_err(|e| format!("Invalid frequency value '{value}': {e}"))?
        * scale;

    // u64::MAX as f64 округляется до 2^64
    if !hz.is_finite() || hz < 0.0 || hz >= u64::MAX as f64 {
        return Err(format!("Frequency '{s}' is out of range"));
    }

    Ok(hz.round() as u64)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
