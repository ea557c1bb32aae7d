//! Background progress indicator.
//!
//! The decompiler can run for minutes without output. [`Spinner`] redraws a
//! small animation on a separate thread while the caller blocks on the
//! subprocess. The thread shares nothing with the caller except a stop
//! channel owned by the returned [`SpinnerHandle`], and the handle joins the
//! thread before returning control.

use log::trace;
use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Factory for background spinners.
pub struct Spinner;

impl Spinner {
    /// Starts drawing `label` followed by a rotating frame on `sink`.
    ///
    /// The spinner runs until [`SpinnerHandle::finish`] is called or the
    /// handle is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use apk_deep_extractor::progress::Spinner;
    ///
    /// let handle = Spinner::start("Decompiling", Box::new(std::io::sink()));
    /// handle.finish();
    /// ```
    #[must_use = "dropping the handle stops the spinner immediately"]
    pub fn start(label: &str, sink: Box<dyn Write + Send>) -> SpinnerHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let label = label.to_owned();

        let thread = thread::spawn(move || {
            let mut sink = sink;
            let mut frame = 0_usize;
            loop {
                let glyph = FRAMES.get(frame % FRAMES.len()).copied().unwrap_or('|');
                if write!(sink, "\r{label} {glyph}").and_then(|()| sink.flush()).is_err() {
                    trace!("spinner frame not written");
                }
                frame = frame.wrapping_add(1);

                match stop_rx.recv_timeout(FRAME_INTERVAL) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            if writeln!(sink, "\r{label} done").is_err() {
                trace!("spinner sink closed");
            }
        });

        SpinnerHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

/// Owner of a running spinner thread.
pub struct SpinnerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SpinnerHandle {
    /// Stops the spinner and waits for its thread to exit.
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            // A send error means the thread already exited.
            if stop.send(()).is_err() {
                trace!("spinner thread already stopped");
            }
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                trace!("spinner thread panicked");
            }
        }
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
