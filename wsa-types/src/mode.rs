/// Режим радиочастотного тракта (RFE) инструмента.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RfeMode {
    /// Нулевая ПЧ
    Zif,
    /// Высокий динамический диапазон
    Hdr,
    /// Супергетеродин
    Sh,
    /// Супергетеродин, узкая полоса
    Shn,
    /// Супергетеродин с децимацией
    DecSh,
    /// Узкополосный супергетеродин с децимацией
    DecShn,
    /// Внешний IQ вход
    IqIn,
    /// Прямая оцифровка
    Dd,
    /// Автовыбор
    Auto,
}

impl RfeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RfeMode::Zif => "ZIF",
            RfeMode::Hdr => "HDR",
            RfeMode::Sh => "SH",
            RfeMode::Shn => "SHN",
            RfeMode::DecSh => "DECSH",
            RfeMode::DecShn => "DECSHN",
            RfeMode::IqIn => "IQIN",
            RfeMode::Dd => "DD",
            RfeMode::Auto => "AUTO",
        }
    }
}

impl std::fmt::Display for RfeMode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RfeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ZIF" => Ok(RfeMode::Zif),
            "HDR" => Ok(RfeMode::Hdr),
            "SH" => Ok(RfeMode::Sh),
            "SHN" => Ok(RfeMode::Shn),
            "DECSH" => Ok(RfeMode::DecSh),
            "DECSHN" => Ok(RfeMode::DecShn),
            "IQIN" => Ok(RfeMode::IqIn),
            "DD" => Ok(RfeMode::Dd),
            "AUTO" => Ok(RfeMode::Auto),
            _ => Err(format!(
                "Unknown RFE mode: '{s}'. Use: ZIF, HDR, SH, SHN, DECSH, DECSHN, IQIN, DD, AUTO"
            )),
        }
    }
}
