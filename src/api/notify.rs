//! Purpose: User-visible notification capability for catalogue responses.
//! Exports: `Notifier`, `StdoutNotifier`.
//! Invariants: Response text is delivered unchanged; notifiers never parse it.
//! Invariants: A notifier that cannot deliver the text reports it; the loss is never silent.
#![allow(clippy::result_large_err)]

use super::ApiResult;
use crate::core::error::{Error, ErrorKind};
use std::io::{self, Write};

pub trait Notifier: Send + Sync {
    fn notify(&self, response_text: &str) -> ApiResult<()>;
}

/// Plain closures are infallible notifiers.
impl<F> Notifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, response_text: &str) -> ApiResult<()> {
        self(response_text);
        Ok(())
    }
}

/// Writes the response to stdout, terminating the last line if the body did not.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, response_text: &str) -> ApiResult<()> {
        write_response(&mut io::stdout().lock(), response_text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write response to stdout")
                .with_source(err)
        })
    }
}

fn write_response(out: &mut dyn Write, response_text: &str) -> io::Result<()> {
    out.write_all(response_text.as_bytes())?;
    if !response_text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::write_response;
    use std::io::{self, Write};

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn response_is_written_unchanged_with_final_newline() {
        let mut out = Vec::new();
        write_response(&mut out, "OK").expect("write");
        assert_eq!(out, b"OK\n");

        let mut out = Vec::new();
        write_response(&mut out, "<a/>\n").expect("write");
        assert_eq!(out, b"<a/>\n");
    }

    #[test]
    fn closed_output_is_reported() {
        let err = write_response(&mut ClosedPipe, "OK").expect_err("err");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
