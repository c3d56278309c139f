use crate::{DigitizerContext, ExtensionContext, ReceiverContext, SampleData, VrtHeader, VrtTrailer};

/// Декодированный VRT пакет.
#[derive(Debug, Clone, PartialEq)]
pub struct VrtPacket {
    pub header: VrtHeader,
    pub body: VrtBody,
}

/// Тело пакета, зависит от stream id.
#[derive(Debug, Clone, PartialEq)]
pub enum VrtBody {
    Receiver(ReceiverContext),
    Digitizer(DigitizerContext),
    Extension(ExtensionContext),
    IfData(IfData),
}

/// Полезная нагрузка пакета IF-данных.
#[derive(Debug, Clone, PartialEq)]
pub struct IfData {
    pub samples: SampleData,
    /// `None`, если в заголовке не выставлен бит трейлера
    pub trailer: Option<VrtTrailer>,
}

impl VrtPacket {
    pub fn if_data(&self) -> Option<&IfData> {
        match &self.body {
            VrtBody::IfData(d) => Some(d),
            _ => None,
        }
    }
}

impl IfData {
    pub fn spectral_inversion(&self) -> bool {
        self.trailer.is_some_and(|t| t.spectral_inversion)
    }
}
