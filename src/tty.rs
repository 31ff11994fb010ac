//! Terminal detection for the MIDX merge progress line: stderr is treated
//! as a TTY either because it really is one, or because `BUP_FORCE_TTY` asks
//! for progress output regardless (bit 2 of its integer value).

use std::io::IsTerminal;
use std::sync::OnceLock;

const FORCE_TTY_BIT: i64 = 1 << 2;

static STDERR_IS_TTY: OnceLock<bool> = OnceLock::new();

/// Whether progress output should be written to stderr.
///
/// Computed once, at first use, and cached for the remainder of the
/// process's lifetime: read-only after its first evaluation.
pub fn stderr_is_tty() -> bool {
    *STDERR_IS_TTY.get_or_init(compute_stderr_is_tty)
}

fn compute_stderr_is_tty() -> bool {
    if force_tty(std::env::var("BUP_FORCE_TTY").ok().as_deref()) {
        return true;
    }
    std::io::stderr().is_terminal()
}

/// Whether a raw `BUP_FORCE_TTY` value forces progress output. Split out of
/// [`stderr_is_tty`] so the bit-parsing logic can be tested without mutating
/// the process environment.
fn force_tty(raw: Option<&str>) -> bool {
    raw.and_then(|v| v.parse::<i64>().ok())
        .map(|v| v & FORCE_TTY_BIT != 0)
        .unwrap_or(false)
}
