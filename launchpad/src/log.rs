//! Quiet-mode aware progress output. With LAUNCHPAD_QUIET=1 the step narration
//! is dropped from the terminal; every line still reaches `tracing::info!`.

use std::io::Write;

#[macro_export]
macro_rules! info_log {
    ($quiet:expr, $($arg:tt)*) => {{
        $crate::log::write_progress(&mut std::io::stderr(), $quiet, &format!($($arg)*));
    }};
}

pub fn write_progress<W: Write>(out: &mut W, quiet: bool, line: &str) {
    let trimmed = line.trim();
    if !trimmed.is_empty() {
        tracing::info!(target: "launchpad::progress", "{}", trimmed);
    }
    if !quiet {
        let _ = writeln!(out, "{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_printed_unless_quiet() {
        let mut out = Vec::new();
        write_progress(&mut out, false, "🔍 Step 1/5: Resolving project directory...");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "🔍 Step 1/5: Resolving project directory...\n"
        );

        let mut quiet = Vec::new();
        write_progress(&mut quiet, true, "🔍 Step 1/5: Resolving project directory...");
        assert!(quiet.is_empty());
    }
}
