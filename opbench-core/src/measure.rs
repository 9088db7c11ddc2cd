//! Monotonic Timing
//!
//! Wall-clock time around a single oracle call, read from
//! `std::time::Instant` so system clock adjustments cannot make it go
//! backwards.

use std::time::Instant;

/// Timer wrapping exactly one measured call
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed nanoseconds since [`Timer::start`], saturating at `u64::MAX`
    #[inline(always)]
    pub fn stop(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Pin the current thread to a specific core
///
/// Keeps the sampling loop off core migrations for the duration of a run.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("CPU index {cpu} is out of range"),
        ));
    }

    // SAFETY: cpu_set_t is plain data; zeroed is a valid empty set and the
    // pointer passed to sched_setaffinity lives for the whole call.
    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// Pin the current thread to a specific core (unsupported on this platform)
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "CPU pinning is only supported on Linux",
    ))
}
