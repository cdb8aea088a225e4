//! Process-wide `log` backend.
//!
//! Records go to stderr until the root binds a named log file; from then on
//! they land in that file next to the rest of the run's diagnostics.

use super::output::SharedFile;
use log::LevelFilter;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Weak};

static ROUTE: Mutex<Option<Weak<Mutex<BufWriter<File>>>>> = parking_lot::const_mutex(None);

/// Install `env_logger` on the root (filter from `RUST_LOG`, default `warn`);
/// silence every other process.
pub fn init(is_root: bool) {
    if is_root {
        let env = env_logger::Env::default().default_filter_or("warn");
        // a second init (tests, embedding) keeps the first logger
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .target(env_logger::Target::Pipe(Box::new(RoutedPipe)))
            .try_init();
    } else {
        log::set_max_level(LevelFilter::Off);
    }
}

/// Send `log` records to `file` for as long as it is alive.
pub(crate) fn route_to(file: &SharedFile) {
    *ROUTE.lock() = Some(Arc::downgrade(file));
}

#[cfg(test)]
pub(crate) fn is_routed() -> bool {
    routed_file().is_some()
}

fn routed_file() -> Option<SharedFile> {
    ROUTE.lock().as_ref().and_then(Weak::upgrade)
}

/// Writer behind the logger: the routed file, else stderr.
pub(crate) struct RoutedPipe;

impl Write for RoutedPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match routed_file() {
            Some(file) => {
                let mut f = file.lock();
                f.write_all(buf)?;
                f.flush()?;
                Ok(buf.len())
            }
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match routed_file() {
            Some(file) => file.lock().flush(),
            None => io::stderr().flush(),
        }
    }
}
