//! Controller software reset with a bounded completion poll.

use crate::config::DeviceConfig;
use crate::error::{EqosError, EqosResult};
use crate::mac::MacAddress;
use crate::platform::Platform;
use crate::regs::RegisterFile;

/// Repeatedly stalls then polls until `poll` reports completion.
///
/// # Arguments
///
/// * `poll` - returns `true` once the operation has completed.
/// * `stall` - busy-waits for the given number of microseconds.
/// * `stall_us` - delay before each poll.
/// * `attempts` - maximum number of polls.
///
/// # Returns
///
/// The number of polls used, or [`EqosError::Timeout`] when the budget runs
/// out.
pub fn poll_with_retry<P, S>(
    mut poll: P,
    mut stall: S,
    stall_us: u32,
    attempts: u32,
) -> EqosResult<u32>
where
    P: FnMut() -> bool,
    S: FnMut(u32),
{
    for attempt in 1..=attempts {
        stall(stall_us);
        if poll() {
            return Ok(attempt);
        }
    }
    Err(EqosError::Timeout)
}

/// Resets the whole controller and reprograms MAC address slot 0 with `mac`,
/// since the reset reloads it from the hardware default.
pub fn software_reset(
    regs: &RegisterFile,
    platform: &dyn Platform,
    config: &DeviceConfig,
    mac: &MacAddress,
) -> EqosResult {
    regs.start_software_reset();
    match poll_with_retry(
        || !regs.reset_in_progress(),
        |us| platform.stall_us(us),
        config.reset_stall_us,
        config.reset_attempts,
    ) {
        Ok(polls) => {
            debug!("software reset completed after {polls} polls");
            regs.set_mac_address(0, mac, true);
            Ok(())
        }
        Err(e) => {
            error!(
                "software reset did not complete within {} polls",
                config.reset_attempts
            );
            Err(e)
        }
    }
}
