//! Process-global stdout/stderr capture around a single component's
//! `update` call, using the `gag` crate to redirect the real file
//! descriptors into in-memory buffers (a `print!`-macro-level capture would
//! miss output written through FFI or `dbg!`).

use std::{
    io::Read,
    panic::{catch_unwind, AssertUnwindSafe},
};

use gag::BufferRedirect;

/// The outcome of running `f` under stdout/stderr capture: its result (or
/// panic payload), plus the captured output split into lines.
pub(crate) struct Captured<R> {
    pub(crate) result: std::thread::Result<R>,
    pub(crate) stdout_lines: Vec<String>,
    pub(crate) stderr_lines: Vec<String>,
}

pub(crate) fn capture<F, R>(f: F) -> Captured<R>
where
    F: FnOnce() -> R,
{
    let stdout_redirect = BufferRedirect::stdout().ok();
    let stderr_redirect = BufferRedirect::stderr().ok();

    let result = catch_unwind(AssertUnwindSafe(f));

    let stdout_lines = stdout_redirect.map(drain).unwrap_or_default();
    let stderr_lines = stderr_redirect.map(drain).unwrap_or_default();

    Captured {
        result,
        stdout_lines,
        stderr_lines,
    }
}

fn drain(mut redirect: BufferRedirect) -> Vec<String> {
    let mut text = String::new();
    let _ = redirect.read_to_string(&mut text);
    split_lines(&text)
}

/// Splits captured output on `\n`, discarding a single trailing empty line
/// produced by a final newline.
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(String::is_empty) {
        let _ = lines.pop();
    }
    lines
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn drops_trailing_empty_line_from_final_newline() {
        assert_eq!(split_lines("a\nb\n"), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(split_lines("a\nb"), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(split_lines(""), Vec::<String>::new());
    }

    #[test]
    fn captures_stdout_and_survives_a_panic() {
        let captured = capture(|| -> i32 { panic!("boom") });
        assert!(captured.result.is_err());
    }
}
