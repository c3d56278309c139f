/// Трейлер пакета IF-данных (одно слово).
///
/// Каждый флаг считается установленным, только если в слове взведены и бит
/// разрешения, и бит индикатора.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VrtTrailer {
    pub valid_data: bool,
    pub reference_lock: bool,
    pub spectral_inversion: bool,
    pub over_range: bool,
    pub sample_loss: bool,
}

impl VrtTrailer {
    pub fn new() -> Self {
        Self {
            valid_data: true,
            reference_lock: true,
            ..Self::default()
        }
    }

    pub fn with_spectral_inversion(
        mut self,
        inverted: bool,
    ) -> Self {
        self.spectral_inversion = inverted;
        self
    }
}
