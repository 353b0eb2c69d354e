//! Command execution helpers.

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Check if a program is available on PATH.
#[must_use]
pub fn is_available(program: &str) -> bool {
    which::which(program).is_ok()
}

/// How often the probe polls a running child for completion.
const PROBE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run a capability probe with a bounded timeout.
///
/// Returns `true` only when the probe binary exists, starts, and exits
/// successfully within `timeout`. Every failure mode (binary missing, spawn
/// error, non-zero exit, timeout) reads as "capability absent" rather than
/// an error, since probes gate optional behavior.
#[must_use]
pub fn probe(program: &str, args: &[&str], timeout: Duration) -> bool {
    if !is_available(program) {
        tracing::debug!("probe: {program} not found on PATH");
        return false;
    }

    let spawned = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    let Ok(mut child) = spawned else {
        tracing::debug!("probe: failed to spawn {program}");
        return false;
    };

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.success(),
            Ok(None) => {
                if Instant::now() >= deadline {
                    tracing::debug!("probe: {program} timed out after {timeout:?}");
                    let _ = child.kill();
                    let _ = child.wait();
                    return false;
                }
                std::thread::sleep(PROBE_POLL_INTERVAL);
            }
            Err(_) => return false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn probe_missing_binary_is_absent() {
        assert!(!probe(
            "definitely-not-a-real-binary-name",
            &[],
            Duration::from_secs(1)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn probe_true_succeeds() {
        assert!(probe("true", &[], Duration::from_secs(5)));
    }

    #[cfg(unix)]
    #[test]
    fn probe_false_is_absent() {
        assert!(!probe("false", &[], Duration::from_secs(5)));
    }
}
