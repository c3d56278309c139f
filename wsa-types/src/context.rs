/// Контекст приёмника.
///
/// Поле заполнено только если соответствующий бит установлен в `indicator`,
/// иначе `None` (а не ноль).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverContext {
    /// Маска присутствующих полей
    pub indicator: u32,
    /// Опорная точка
    pub reference_point: Option<i32>,
    /// Частота настройки, Гц (дробная часть сохраняется)
    pub frequency: Option<f64>,
    /// Усиление ПЧ, дБ
    pub if_gain: Option<f64>,
    /// Усиление РЧ, дБ
    pub rf_gain: Option<f64>,
    /// Температура, °C
    pub temperature: Option<f64>,
}

/// Контекст дигитайзера.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigitizerContext {
    pub indicator: u32,
    /// Полоса, Гц
    pub bandwidth: Option<f64>,
    /// Опорный уровень, дБм
    pub reference_level: Option<f64>,
    /// Смещение РЧ частоты, Гц
    pub rf_frequency_offset: Option<f64>,
}

/// Расширенный контекст: связывает данные с шагом свипа.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionContext {
    pub indicator: u32,
    pub sweep_start_id: Option<u32>,
    pub stream_start_id: Option<u32>,
}
