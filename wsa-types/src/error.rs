use std::time::Duration;

use thiserror::Error;

/// Результат для операций протокола и транспорта.
pub type WsaResult<T> = std::result::Result<T, WsaError>;

/// Ошибки декодирования VRT и транспортного уровня.
#[derive(Debug, Error)]
pub enum WsaError {
    /// Источник вернул меньше байт, чем требует кадр
    #[error("Frame incomplete: expected {expected} bytes, received {received}")]
    FrameIncomplete { expected: usize, received: usize },

    /// Неизвестный тип пакета или идентификатор потока
    #[error("Unknown frame: {0}")]
    UnknownFrame(String),

    /// Метка времени вне допустимого диапазона
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Нарушение формата (несогласованные поля, неверные аргументы)
    #[error("Format violation: {0}")]
    FormatViolation(String),

    /// За отведённое время не пришло ни одного байта
    #[error("No response within {0:?}")]
    NoResponse(Duration),

    /// Удалённая сторона закрыла соединение
    #[error("Connection dropped")]
    ConnectionDropped,

    /// Ответ на команду не удалось разобрать
    #[error("Malformed response to '{command}': '{response}'")]
    MalformedResponse { command: String, response: String },

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WsaError {
    /// Удобные конструкторы
    pub fn unknown_frame<S: Into<String>>(s: S) -> Self {
        Self::UnknownFrame(s.into())
    }

    pub fn invalid_timestamp<S: Into<String>>(s: S) -> Self {
        Self::InvalidTimestamp(s.into())
    }

    pub fn format_violation<S: Into<String>>(s: S) -> Self {
        Self::FormatViolation(s.into())
    }

    pub fn malformed_response<C: Into<String>, R: Into<String>>(
        command: C,
        response: R,
    ) -> Self {
        Self::MalformedResponse {
            command: command.into(),
            response: response.into(),
        }
    }

    /// Ошибка разбора потока VRT (в отличие от транспортной).
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::FrameIncomplete { .. } | Self::UnknownFrame(_) | Self::InvalidTimestamp(_)
        )
    }
}
