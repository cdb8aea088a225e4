//! Root-only diagnostic output.
//!
//! An [`OutputRouter`] is the single writer of diagnostic text for one run.
//! On the root it is bound to a named log file or to one of the standard
//! streams; on every other process it discards everything and never opens a
//! file. Standard streams are reached through a [`Console`] so tests can
//! capture them.

use super::logging;
use super::settings::{LogTarget, Settings};
use parking_lot::Mutex;
use static_assertions::assert_impl_all;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Named log file, shared with the `log` backend while the router is alive.
pub(crate) type SharedFile = Arc<Mutex<BufWriter<File>>>;

/// Handles to the process's stdout and stderr.
#[derive(Clone)]
pub struct Console {
    stdout: SharedWriter,
    stderr: SharedWriter,
}

impl Console {
    /// The real standard streams.
    pub fn std() -> Self {
        Self {
            stdout: Arc::new(Mutex::new(Box::new(io::stdout()))),
            stderr: Arc::new(Mutex::new(Box::new(io::stderr()))),
        }
    }

    /// In-memory streams, plus the handle to read them back.
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        let console = Self {
            stdout: Arc::new(Mutex::new(Box::new(SharedBuf(captured.stdout.clone())))),
            stderr: Arc::new(Mutex::new(Box::new(SharedBuf(captured.stderr.clone())))),
        };
        (console, captured)
    }

    fn write_to(stream: &SharedWriter, buf: &[u8]) -> io::Result<()> {
        let mut w = stream.lock();
        w.write_all(buf)?;
        w.flush()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// Bytes written to a captured [`Console`].
#[derive(Clone, Default, Debug)]
pub struct Captured {
    stdout: Arc<Mutex<Vec<u8>>>,
    stderr: Arc<Mutex<Vec<u8>>>,
}

impl Captured {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout.lock()).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr.lock()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.lock().is_empty() && self.stderr.lock().is_empty()
    }
}

struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum Sink {
    Null,
    Stdout,
    Stderr,
    File(SharedFile),
}

/// Root-only diagnostic writer of one run.
pub struct OutputRouter {
    is_root: bool,
    console: Console,
    sink: Sink,
}

assert_impl_all!(OutputRouter: Send);
assert_impl_all!(Console: Send, Sync, Clone);

impl OutputRouter {
    /// Router that has not been bound yet: diagnostics are discarded, but the
    /// root can still report parse failures on stderr.
    pub fn unbound(is_root: bool, console: Console) -> Self {
        Self {
            is_root,
            console,
            sink: Sink::Null,
        }
    }

    /// Bind the diagnostic stream as `settings` asks. Only the root opens
    /// (and truncates) the log file, and `log` records follow it there.
    pub fn bind(&mut self, settings: &Settings) -> io::Result<()> {
        if !self.is_root {
            self.sink = Sink::Null;
            return Ok(());
        }
        self.sink = match settings.log_target() {
            LogTarget::Stdout => Sink::Stdout,
            LogTarget::Stderr => Sink::Stderr,
            LogTarget::File(path) => {
                let file = Arc::new(Mutex::new(BufWriter::new(File::create(path)?)));
                logging::route_to(&file);
                Sink::File(file)
            }
        };
        Ok(())
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// True when the root writes diagnostics to a named file.
    pub fn is_file_bound(&self) -> bool {
        matches!(self.sink, Sink::File(_))
    }

    /// One line on the bound diagnostic stream.
    pub fn line(&mut self, msg: impl Display) {
        let text = format!("{msg}\n");
        if let Err(e) = self.write_all(text.as_bytes()).and_then(|()| self.flush()) {
            log::warn!("diagnostic write failed: {e}");
        }
    }

    /// One line on the root's stderr, whatever the binding.
    pub fn stderr_line(&mut self, msg: impl Display) {
        if self.is_root {
            let text = format!("{msg}\n");
            if let Err(e) = Console::write_to(&self.console.stderr, text.as_bytes()) {
                log::warn!("stderr write failed: {e}");
            }
        }
    }

    /// One line on the root's stdout, whatever the binding.
    pub fn stdout_text(&mut self, text: &str) {
        if self.is_root {
            if let Err(e) = Console::write_to(&self.console.stdout, text.as_bytes()) {
                log::warn!("stdout write failed: {e}");
            }
        }
    }

    /// A failure line: on the bound stream and, when that is a file, also on
    /// stderr so an interactive user sees it.
    pub fn error_line(&mut self, msg: impl Display) {
        self.line(&msg);
        if self.is_file_bound() {
            self.stderr_line(&msg);
        }
    }

    /// Short-lived stream that writes to the bound target and, in named-file
    /// mode, to stdout as well. Flushed when dropped.
    pub fn tee(&mut self) -> DiagStream<'_> {
        let echo_stdout = self.is_file_bound();
        DiagStream {
            router: self,
            echo_stdout,
        }
    }
}

impl Write for OutputRouter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::Null => Ok(buf.len()),
            Sink::Stdout => Console::write_to(&self.console.stdout, buf).map(|()| buf.len()),
            Sink::Stderr => Console::write_to(&self.console.stderr, buf).map(|()| buf.len()),
            Sink::File(f) => f.lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::File(f) => f.lock().flush(),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for OutputRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = match self.sink {
            Sink::Null => "null",
            Sink::Stdout => "stdout",
            Sink::Stderr => "stderr",
            Sink::File(_) => "file",
        };
        f.debug_struct("OutputRouter")
            .field("is_root", &self.is_root)
            .field("sink", &sink)
            .finish()
    }
}

/// Tee returned by [`OutputRouter::tee`].
pub struct DiagStream<'r> {
    router: &'r mut OutputRouter,
    echo_stdout: bool,
}

impl Write for DiagStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.router.write_all(buf)?;
        // the bound stream has the bytes; a lost echo must not cut the text short
        if self.echo_stdout {
            if let Err(e) = Console::write_to(&self.router.console.stdout, buf) {
                log::warn!("stdout echo failed: {e}");
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.router.flush()
    }
}

impl Drop for DiagStream<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.router.flush() {
            log::warn!("diagnostic flush failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn non_root_discards_and_opens_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("run.log");
        let settings = Settings::new("in.msh", ".").with_log_filename(log.to_string_lossy());
        let (console, cap) = Console::capture();
        let mut out = OutputRouter::unbound(false, console);
        out.bind(&settings).unwrap();
        out.line("hello");
        out.error_line("boom");
        out.stderr_line("parse");
        writeln!(out.tee(), "banner").unwrap();
        assert!(cap.is_empty());
        assert!(!log.exists());
    }

    #[test]
    fn sentinels_route_to_standard_streams() {
        let (console, cap) = Console::capture();
        let mut out = OutputRouter::unbound(true, console);
        out.bind(&Settings::new("in.msh", ".").with_log_filename("cerr")).unwrap();
        out.line("to stderr");
        writeln!(out.tee(), "banner").unwrap();
        assert_eq!(cap.stderr(), "to stderr\nbanner\n");
        assert_eq!(cap.stdout(), "");

        out.bind(&Settings::new("in.msh", ".").with_log_filename("cout")).unwrap();
        out.error_line("failed");
        assert_eq!(cap.stdout(), "failed\n");
    }

    #[test]
    #[serial]
    fn named_file_is_truncated_and_teed() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("run.log");
        std::fs::write(&log, "stale contents\n").unwrap();
        let settings = Settings::new("in.msh", ".").with_log_filename(log.to_string_lossy());
        let (console, cap) = Console::capture();
        let mut out = OutputRouter::unbound(true, console);
        out.bind(&settings).unwrap();
        assert!(out.is_file_bound());
        {
            let mut tee = out.tee();
            writeln!(tee, "banner").unwrap();
        }
        out.line("only in file");
        out.error_line("failed");
        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "banner\nonly in file\nfailed\n"
        );
        assert_eq!(cap.stdout(), "banner\n");
        assert_eq!(cap.stderr(), "failed\n");
    }

    #[test]
    #[serial]
    fn failed_echo_keeps_the_file_copy_whole() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("run.log");
        let settings = Settings::new("in.msh", ".").with_log_filename(log.to_string_lossy());
        let (mut console, _cap) = Console::capture();
        console.stdout = Arc::new(Mutex::new(Box::new(Broken)));
        let mut out = OutputRouter::unbound(true, console);
        out.bind(&settings).unwrap();
        {
            let mut tee = out.tee();
            writeln!(tee, "first").unwrap();
            writeln!(tee, "second").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "first\nsecond\n");
    }

    #[test]
    #[serial]
    fn log_records_follow_the_bound_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("run.log");
        let settings = Settings::new("in.msh", ".").with_log_filename(log.to_string_lossy());
        let (console, _cap) = Console::capture();
        let mut out = OutputRouter::unbound(true, console);
        out.bind(&settings).unwrap();
        out.line("banner");
        logging::RoutedPipe.write_all(b"WARN imbalance\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "banner\nWARN imbalance\n"
        );
        drop(out);
        assert!(!logging::is_routed());
    }

    #[test]
    fn unopenable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("missing/dir/run.log");
        let settings = Settings::new("in.msh", ".").with_log_filename(log.to_string_lossy());
        let (console, _cap) = Console::capture();
        let mut out = OutputRouter::unbound(true, console);
        assert!(out.bind(&settings).is_err());
    }
}
