use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoraError {
    IncorrectSettings,
    UnsupportedDataRate(u8),
    PayloadTooLarge(usize),
    Timeout,
    NotSupported,
}

impl fmt::Display for LoraError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoraError::IncorrectSettings => write!(f, "incorrect modulation settings"),
            LoraError::UnsupportedDataRate(dr) => write!(f, "unsupported data rate DR{}", dr),
            LoraError::PayloadTooLarge(len) => write!(f, "payload of {} bytes is too large", len),
            LoraError::Timeout => write!(f, "radio timeout"),
            LoraError::NotSupported => write!(f, "operation not supported"),
        }
    }
}

impl std::error::Error for LoraError {}
