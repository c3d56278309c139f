use wsa_types::{RfeMode, SampleType};

use crate::{SweepError, SweepResult};

/// Минимальное число отсчётов в пакете
pub const WSA_MIN_SPP: usize = 256;
/// Максимальный размер блока захвата
pub const WSA_MAX_SPP: usize = 32_768;
/// Значение, которым заполняется буфер спектра до захвата
pub const POISONED_BUFFER_VALUE: f32 = 99_999.0;

const MHZ: u64 = 1_000_000;
const GHZ: u64 = 1_000_000_000;

/// Профиль возможностей инструмента для одного режима RFE.
///
/// Все частоты в герцах. `usable_left`/`usable_right` отсчитываются от
/// нижнего края полной полосы.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepDeviceProperties {
    pub mode: RfeMode,
    pub sample_type: SampleType,
    pub fshift_available: bool,
    pub min_tunable: u64,
    pub max_tunable: u64,
    pub tuning_resolution: u64,
    pub full_bw: u64,
    pub usable_bw: u64,
    pub passband_center: u64,
    pub usable_left: u64,
    pub usable_right: u64,
    pub min_decimation: u32,
    pub max_decimation: u32,
}

static SWEEP_DEVICE_PROPERTIES: [SweepDeviceProperties; 2] = [
    SweepDeviceProperties {
        mode: RfeMode::Shn,
        sample_type: SampleType::I16,
        fshift_available: true,
        min_tunable: 50 * MHZ,
        max_tunable: 27 * GHZ,
        tuning_resolution: 10,
        full_bw: 62_500_000,
        usable_bw: 10 * MHZ,
        passband_center: 35 * MHZ,
        usable_left: 30 * MHZ,
        usable_right: 40 * MHZ,
        min_decimation: 4,
        max_decimation: 512,
    },
    SweepDeviceProperties {
        mode: RfeMode::Sh,
        sample_type: SampleType::I16,
        fshift_available: true,
        min_tunable: 50 * MHZ,
        max_tunable: 27 * GHZ,
        tuning_resolution: 10,
        full_bw: 62_500_000,
        usable_bw: 40 * MHZ,
        passband_center: 35 * MHZ,
        usable_left: 15 * MHZ,
        usable_right: 55 * MHZ,
        min_decimation: 4,
        max_decimation: 512,
    },
];

impl SweepDeviceProperties {
    /// Профиль для режима; для режимов без профиля `UnsupportedMode`.
    pub fn for_mode(mode: RfeMode) -> SweepResult<&'static Self> {
        SWEEP_DEVICE_PROPERTIES
            .iter()
            .find(|p| p.mode == mode)
            .ok_or_else(|| SweepError::UnsupportedMode(mode.to_string()))
    }

    pub fn supported_modes() -> impl Iterator<Item = RfeMode> {
        SWEEP_DEVICE_PROPERTIES.iter().map(|p| p.mode)
    }

    /// Диапазон годных бинов `[istart, istop)` для БПФ с шагом `rbw`.
    ///
    /// Границы округляются наружу, чтобы соседние шаги свипа шли без щелей.
    pub fn usable_bins(
        &self,
        rbw: f64,
        spectral_inversion: bool,
    ) -> (usize, usize) {
        let (left, right) = if spectral_inversion {
            (self.full_bw - self.usable_right, self.full_bw - self.usable_left)
        } else {
            (self.usable_left, self.usable_right)
        };

        (
            (left as f64 / rbw).floor() as usize,
            (right as f64 / rbw).ceil() as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let shn = SweepDeviceProperties::for_mode(RfeMode::Shn).unwrap();
        assert_eq!(shn.usable_bw, 10_000_000);
        assert_eq!(shn.usable_right - shn.usable_left, shn.usable_bw);

        let sh = SweepDeviceProperties::for_mode(RfeMode::Sh).unwrap();
        assert_eq!(sh.usable_right - sh.usable_left, sh.usable_bw);
    }

    #[test]
    fn test_unsupported_modes() {
        for mode in [RfeMode::Zif, RfeMode::Dd, RfeMode::Hdr, RfeMode::Auto] {
            assert!(matches!(
                SweepDeviceProperties::for_mode(mode),
                Err(SweepError::UnsupportedMode(_))
            ));
        }
        assert_eq!(SweepDeviceProperties::supported_modes().count(), 2);
    }

    #[test]
    fn test_usable_bins() {
        let shn = SweepDeviceProperties::for_mode(RfeMode::Shn).unwrap();
        let rbw = 62_500_000.0 / 1024.0;
        assert_eq!(shn.usable_bins(rbw, false), (491, 656));
        assert_eq!(shn.usable_bins(rbw, true), (368, 533));
    }
}
