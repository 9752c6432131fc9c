//! Playback loop draining the audio ring into a sink

use crate::audio::{AudioRingBuffer, AudioSink, AudioSpec};
use crate::error::{Result, ViewerError};
use crossbeam_channel::bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle to the playback thread
pub struct PlaybackLoop {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackLoop {
    /// Spawn the playback thread and open the sink on it
    ///
    /// The sink is constructed on the playback thread because audio backends
    /// are not necessarily `Send`. Returns once the sink is open, or with the
    /// open error.
    pub fn start<S, F>(ring: Arc<AudioRingBuffer>, spec: AudioSpec, open: F) -> Result<Self>
    where
        S: AudioSink + 'static,
        F: FnOnce(&AudioSpec) -> Result<S> + Send + 'static,
    {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        let thread_stop = stop_flag.clone();
        let handle = thread::Builder::new()
            .name("playback".into())
            .spawn(move || {
                let sink = match open(&spec) {
                    Ok(sink) => {
                        let _ = ready_tx.send(Ok(()));
                        sink
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                playback_thread(sink, ring, thread_stop);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop_flag,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(e) => {
                let _ = handle.join();
                Err(ViewerError::ChannelError(e.to_string()))
            }
        }
    }

    /// Whether the thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Playback thread panicked");
            }
        }
    }
}

impl Drop for PlaybackLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Playback thread function
fn playback_thread<S: AudioSink>(mut sink: S, ring: Arc<AudioRingBuffer>, stop_flag: Arc<AtomicBool>) {
    info!("Playback thread started");

    let mut scratch = Vec::new();

    while !stop_flag.load(Ordering::Relaxed) {
        match ring.pop_into(&mut scratch) {
            Some(_) => {
                if let Err(e) = sink.write(&scratch) {
                    warn!("Audio write error: {}", e);
                    thread::sleep(Duration::from_millis(10));
                }
            }
            None => thread::yield_now(),
        }
    }

    if let Err(e) = sink.close() {
        warn!("Failed to close audio output: {}", e);
    }
    info!("Playback thread stopped");
}
