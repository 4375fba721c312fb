pub mod channel;
pub mod error;
pub mod modulation;
pub mod platform;
pub mod radio;

pub use error::LoraError;
pub use modulation::LoraModulation;
