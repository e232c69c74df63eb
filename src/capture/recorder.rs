//! Background PCM capture worker.
//!
//! The recorder pulls raw PCM frames from a [`FrameSource`] on a dedicated
//! worker thread and accumulates them until stopped. Stopping finalizes the
//! capture into a WAV container exactly once; a second stop yields nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::capture::wav::{self, WavFormat};
use crate::error::EngineError;

/// A blocking source of raw PCM frames.
///
/// `read_frame` fills `buf` and returns the byte count, `Ok(0)` at end of
/// stream. Implementations wrap whatever actually produces audio: a device
/// handle, a file, or a synthetic generator in tests.
pub trait FrameSource: Send + 'static {
    fn read_frame(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

impl<F> FrameSource for F
where
    F: FnMut(&mut [u8]) -> std::io::Result<usize> + Send + 'static,
{
    fn read_frame(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self(buf)
    }
}

const FRAME_BUF_LEN: usize = 4096;

/// Accumulating PCM recorder backed by a worker thread.
pub struct PcmRecorder {
    format: WavFormat,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    captured: Option<Receiver<Vec<u8>>>,
}

impl PcmRecorder {
    pub fn new(format: WavFormat) -> Self {
        Self {
            format,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            captured: None,
        }
    }

    /// Start capturing from `source` on a worker thread.
    pub fn start(&mut self, mut source: impl FrameSource) -> Result<(), EngineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::CaptureAlreadyRunning);
        }

        let running = Arc::clone(&self.running);
        let (tx, rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = bounded(1);
        self.captured = Some(rx);

        self.worker = Some(std::thread::spawn(move || {
            let mut pcm = Vec::new();
            let mut buf = [0u8; FRAME_BUF_LEN];

            while running.load(Ordering::SeqCst) {
                match source.read_frame(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => pcm.extend_from_slice(&buf[..n]),
                    Err(e) => {
                        warn!("frame read failed: {e}");
                        break;
                    }
                }
            }
            // End of stream or read failure also ends the capture, so the
            // recorder reports not-running without waiting for stop().
            running.store(false, Ordering::SeqCst);
            debug!(bytes = pcm.len(), "capture worker finished");
            let _ = tx.send(pcm);
        }));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop capturing and finalize the WAV container.
    ///
    /// Returns the container on the first stop after a capture; `None` on
    /// repeated stops or when nothing was ever started. Stopping is
    /// idempotent and safe to call from a shutdown path.
    pub fn stop(&mut self) -> Result<Option<Vec<u8>>, EngineError> {
        self.running.store(false, Ordering::SeqCst);

        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };
        worker
            .join()
            .map_err(|_| EngineError::CaptureWorker("capture worker panicked".into()))?;

        let captured = self
            .captured
            .take()
            .and_then(|rx| rx.try_recv().ok())
            .ok_or_else(|| EngineError::CaptureWorker("capture worker sent no data".into()))?;

        Ok(Some(wav::encode(&captured, self.format)))
    }
}

impl Drop for PcmRecorder {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::wav::HEADER_LEN;

    /// Block until the worker has drained a finite source.
    fn wait_for_drain(recorder: &PcmRecorder) {
        while recorder.is_running() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    /// Emits `frames` fixed-size frames of `value` bytes, then end-of-stream.
    struct CountedSource {
        frames: usize,
        frame_len: usize,
        value: u8,
    }

    impl FrameSource for CountedSource {
        fn read_frame(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.frames == 0 {
                return Ok(0);
            }
            self.frames -= 1;
            buf[..self.frame_len].fill(self.value);
            Ok(self.frame_len)
        }
    }

    #[test]
    fn test_capture_accumulates_frames() {
        let mut recorder = PcmRecorder::new(WavFormat::mono_16khz());
        recorder
            .start(CountedSource {
                frames: 3,
                frame_len: 100,
                value: 0x42,
            })
            .unwrap();
        wait_for_drain(&recorder);

        let wav = recorder.stop().unwrap().unwrap();
        assert_eq!(wav.len(), HEADER_LEN + 300);
        assert!(wav[HEADER_LEN..].iter().all(|&b| b == 0x42));
    }

    #[test]
    fn test_stop_finalizes_exactly_once() {
        let mut recorder = PcmRecorder::new(WavFormat::mono_16khz());
        recorder
            .start(CountedSource {
                frames: 1,
                frame_len: 10,
                value: 1,
            })
            .unwrap();
        wait_for_drain(&recorder);

        assert!(recorder.stop().unwrap().is_some());
        assert!(recorder.stop().unwrap().is_none());
        assert!(recorder.stop().unwrap().is_none());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut recorder = PcmRecorder::new(WavFormat::mono_16khz());
        let endless = |buf: &mut [u8]| -> std::io::Result<usize> {
            std::thread::sleep(std::time::Duration::from_millis(5));
            buf[..2].fill(0);
            Ok(2)
        };
        recorder.start(endless).unwrap();
        assert!(matches!(
            recorder.start(endless),
            Err(EngineError::CaptureAlreadyRunning)
        ));
        let _ = recorder.stop();
    }

    #[test]
    fn test_stop_without_start() {
        let mut recorder = PcmRecorder::new(WavFormat::mono_16khz());
        assert!(recorder.stop().unwrap().is_none());
    }

    #[test]
    fn test_read_error_ends_capture_with_partial_data() {
        let mut recorder = PcmRecorder::new(WavFormat::mono_16khz());
        let mut calls = 0;
        recorder
            .start(move |buf: &mut [u8]| {
                calls += 1;
                if calls == 1 {
                    buf[..4].copy_from_slice(&[1, 2, 3, 4]);
                    Ok(4)
                } else {
                    Err(std::io::Error::other("device gone"))
                }
            })
            .unwrap();
        wait_for_drain(&recorder);

        let wav = recorder.stop().unwrap().unwrap();
        assert_eq!(&wav[HEADER_LEN..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_end_of_stream_clears_running_without_stop() {
        let mut recorder = PcmRecorder::new(WavFormat::mono_16khz());
        recorder
            .start(CountedSource {
                frames: 1,
                frame_len: 8,
                value: 7,
            })
            .unwrap();

        wait_for_drain(&recorder);
        assert!(!recorder.is_running());

        let wav = recorder.stop().unwrap().unwrap();
        assert_eq!(wav.len(), HEADER_LEN + 8);
    }
}
