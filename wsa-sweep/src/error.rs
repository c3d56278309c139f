use thiserror::Error;
use wsa_types::WsaError;

pub type SweepResult<T> = std::result::Result<T, SweepError>;

#[derive(Debug, Error)]
pub enum SweepError {
    /// Для режима нет профиля возможностей
    #[error("Unsupported RFE mode: {0}")]
    UnsupportedMode(String),

    /// Запрошенная полоса вне диапазона перестройки
    #[error("Frequency out of range: {0}")]
    FrequencyOutOfRange(String),

    /// Разрешение не даёт минимального размера БПФ
    #[error("Band too small: FFT size {size} below minimum {min}")]
    BandTooSmall { size: usize, min: usize },

    /// Недопустимое разрешение по частоте
    #[error("Invalid resolution bandwidth: {0} Hz")]
    InvalidRbw(f64),

    /// Не удалось выделить буфер спектра
    #[error("Out of memory: cannot allocate {0} spectrum bins")]
    OutOfMemory(usize),

    /// Пакет данных пришёл раньше нужного контекста
    #[error("Missing context: {0}")]
    MissingContext(&'static str),

    /// Число отсчётов в пакете не совпадает с планом
    #[error("Sample count mismatch: expected {expected}, found {found}")]
    SampleCountMismatch { expected: usize, found: usize },

    /// Смещение шага свипа вышло за пределы буфера спектра
    #[error("Spectrum offset {offset} out of bounds for {len} bins")]
    SpectrumOutOfBounds { offset: i64, len: usize },

    /// Некорректная конфигурация сессии
    #[error("Config error: {0}")]
    Config(String),

    /// Ошибка протокола или транспорта
    #[error("Device error: {0}")]
    Device(#[from] WsaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SweepError {
    pub fn out_of_range<S: Into<String>>(s: S) -> Self {
        Self::FrequencyOutOfRange(s.into())
    }

    /// Ошибка построения плана (план не возвращается частично).
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMode(_)
                | Self::FrequencyOutOfRange(_)
                | Self::BandTooSmall { .. }
                | Self::InvalidRbw(_)
                | Self::OutOfMemory(_)
        )
    }

    /// Ошибка разбора потока VRT.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Device(e) if e.is_decode_error())
    }
}
