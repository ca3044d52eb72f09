//! Attachment error taxonomy.

use core::fmt;

use axerrno::AxError;

use crate::lifecycle::LifecyclePhase;

/// Hardware or platform configuration that makes attachment impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No memory resource large enough for the register file.
    NoRegisterRegion,
    /// No interrupt resource was provided.
    NoInterrupt,
    /// The platform refused to map the register region.
    MapFailed(AxError),
    /// The platform refused to connect the interrupt line.
    InterruptConnectFailed(AxError),
    /// MAC_Version outside the supported range.
    UnsupportedVersion { snps: u8, user: u8 },
    /// MAC_HW_Feature1.ADDR64 holds a reserved code.
    UnknownAddressWidth(u32),
}

/// Errors reported by the lifecycle entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqosError {
    /// Fatal to attachment, never retried.
    Configuration(ConfigError),
    /// The software reset did not complete within the retry budget.
    Timeout,
    /// The entry point is not valid in the current lifecycle phase.
    InvalidPhase {
        expected: LifecyclePhase,
        actual: LifecyclePhase,
    },
}

pub type EqosResult<T = ()> = Result<T, EqosError>;

impl From<ConfigError> for EqosError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRegisterRegion => write!(f, "no usable register region"),
            Self::NoInterrupt => write!(f, "no interrupt resource"),
            Self::MapFailed(e) => write!(f, "mapping register region failed: {e:?}"),
            Self::InterruptConnectFailed(e) => write!(f, "connecting interrupt failed: {e:?}"),
            Self::UnsupportedVersion { snps, user } => {
                write!(f, "unsupported MAC version snps={snps:#x} user={user:#x}")
            }
            Self::UnknownAddressWidth(code) => write!(f, "unknown DMA address width code {code}"),
        }
    }
}

impl fmt::Display for EqosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "device configuration error: {e}"),
            Self::Timeout => write!(f, "software reset timed out"),
            Self::InvalidPhase { expected, actual } => {
                write!(f, "expected lifecycle phase {expected:?}, device is {actual:?}")
            }
        }
    }
}

impl From<EqosError> for AxError {
    fn from(err: EqosError) -> Self {
        match err {
            EqosError::Configuration(ConfigError::MapFailed(e))
            | EqosError::Configuration(ConfigError::InterruptConnectFailed(e)) => e,
            EqosError::Configuration(ConfigError::NoRegisterRegion)
            | EqosError::Configuration(ConfigError::NoInterrupt) => AxError::NotFound,
            EqosError::Configuration(_) => AxError::Unsupported,
            EqosError::Timeout => AxError::ResourceBusy,
            EqosError::InvalidPhase { .. } => AxError::BadState,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_ax_error() {
        assert_eq!(AxError::from(EqosError::Timeout), AxError::ResourceBusy);
        assert_eq!(
            AxError::from(EqosError::from(ConfigError::NoInterrupt)),
            AxError::NotFound
        );
        assert_eq!(
            AxError::from(EqosError::from(ConfigError::UnknownAddressWidth(3))),
            AxError::Unsupported
        );
        assert_eq!(
            AxError::from(EqosError::from(ConfigError::MapFailed(AxError::NoMemory))),
            AxError::NoMemory
        );
    }
}
