/// Кодировка отсчётов в потоке данных
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    /// 16-битные I и Q в одном слове
    I16Q16,
    /// 16-битные I, два отсчёта в слове
    I16,
    /// 32-битные I, один отсчёт в слове
    I32,
}

/// Отсчёты одного пакета IF-данных.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    I16Q16 { i: Vec<i16>, q: Vec<i16> },
    I16(Vec<i16>),
    I32(Vec<i32>),
}

impl SampleType {
    pub fn samples_per_word(&self) -> usize {
        match self {
            SampleType::I16 => 2,
            SampleType::I16Q16 | SampleType::I32 => 1,
        }
    }

    /// Модуль полной шкалы для нормализации перед БПФ.
    pub fn full_scale(&self) -> f32 {
        match self {
            SampleType::I16Q16 | SampleType::I16 => 8192.0,
            SampleType::I32 => 8_388_608.0,
        }
    }
}

impl SampleData {
    pub fn sample_type(&self) -> SampleType {
        match self {
            SampleData::I16Q16 { .. } => SampleType::I16Q16,
            SampleData::I16(_) => SampleType::I16,
            SampleData::I32(_) => SampleType::I32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampleData::I16Q16 { i, .. } => i.len(),
            SampleData::I16(v) => v.len(),
            SampleData::I32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
