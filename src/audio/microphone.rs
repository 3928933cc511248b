// Microphone backend using cpal
//
// cpal::Stream is not Send, so the stream is opened, played and dropped on a
// dedicated capture thread. Frames cross back to async code over an mpsc
// channel. stop() signals the thread, which drops the stream and releases the
// input device.

use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::convert::FormatConverter;
use crate::error::CaptureError;

/// Default-input-device backend
pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    worker: Option<CaptureWorker>,
    capturing: bool,
}

struct CaptureWorker {
    stop_tx: std_mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        info!(
            "Microphone backend initialized ({}Hz, {} channels)",
            config.target_sample_rate, config.target_channels
        );

        Self {
            config,
            worker: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::AlreadyCapturing);
        }

        info!("Starting microphone capture");

        let (frame_tx, frame_rx) = mpsc::channel(256);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || run_capture_thread(config, frame_tx, ready_tx, stop_rx))
            .map_err(|e| CaptureError::Stream(format!("failed to spawn capture thread: {}", e)))?;

        let device_name = match ready_rx.await {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(CaptureError::Stream(
                    "capture thread exited before the stream started".to_string(),
                ));
            }
        };

        info!("Microphone capture started on '{}'", device_name);

        self.worker = Some(CaptureWorker { stop_tx, handle });
        self.capturing = true;

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.capturing {
            return Ok(());
        }

        info!("Stopping microphone capture");

        if let Some(worker) = self.worker.take() {
            // A closed channel also wakes the thread, so the send result is irrelevant
            let _ = worker.stop_tx.send(());
            tokio::task::spawn_blocking(move || worker.handle.join())
                .await
                .map_err(|e| CaptureError::Stream(format!("capture thread join failed: {}", e)))?
                .map_err(|_| CaptureError::Stream("capture thread panicked".to_string()))?;
        }

        self.capturing = false;

        info!("Microphone released");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            warn!("Microphone backend dropped while capturing; releasing device");
            let _ = worker.stop_tx.send(());
        }
    }
}

fn run_capture_thread(
    config: AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<String, CaptureError>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let (stream, device_name) = match open_input_stream(&config, frame_tx) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(e.to_string())));
        return;
    }

    if ready_tx.send(Ok(device_name)).is_err() {
        return;
    }

    // Block until stop() is called or the backend is dropped
    let _ = stop_rx.recv();

    if let Err(e) = stream.pause() {
        debug!("Failed to pause input stream: {}", e);
    }
    drop(stream);
}

fn open_input_stream(
    config: &AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<(cpal::Stream, String), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device found".to_string()))?;

    let device_name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());

    let supported = choose_input_config(&device, config.target_sample_rate)?;

    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();

    debug!(
        "Device '{}' native format: {:?}, {}Hz, {} channels",
        device_name, sample_format, stream_config.sample_rate.0, stream_config.channels
    );

    let converter = FormatConverter::new(
        stream_config.sample_rate.0,
        stream_config.channels,
        config.target_sample_rate,
        config.target_channels,
    )?;
    let chunker = FrameChunker::new(config.clone(), converter, frame_tx);

    let stream = match sample_format {
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, chunker),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, chunker),
        cpal::SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, chunker),
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, chunker),
        other => {
            return Err(CaptureError::DeviceUnavailable(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

    Ok((stream, device_name))
}

/// Prefer a native config at the target rate so no conversion is needed
///
/// Falls back to the device default, which the converter then resamples.
fn choose_input_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<cpal::SupportedStreamConfig, CaptureError> {
    let target = cpal::SampleRate(target_rate);

    if let Ok(ranges) = device.supported_input_configs() {
        let mut matching: Vec<_> = ranges
            .filter(|range| {
                range.min_sample_rate() <= target
                    && target <= range.max_sample_rate()
                    && is_supported_format(range.sample_format())
            })
            .collect();
        matching.sort_by_key(|range| range.channels());

        if let Some(range) = matching.into_iter().next() {
            return Ok(range.with_sample_rate(target));
        }
    }

    debug!("No native {}Hz input config, resampling from the default", target_rate);
    device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
}

fn is_supported_format(format: cpal::SampleFormat) -> bool {
    matches!(
        format,
        cpal::SampleFormat::I16
            | cpal::SampleFormat::U16
            | cpal::SampleFormat::I32
            | cpal::SampleFormat::F32
    )
}

fn build_stream<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut chunker: FrameChunker,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    i16: cpal::FromSample<T>,
{
    device.build_input_stream(
        stream_config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<i16> = data.iter().map(|&s| cpal::Sample::from_sample(s)).collect();
            chunker.push(&samples);
        },
        |err| error!("Input stream error: {}", err),
        None,
    )
}

/// Converts raw device callbacks into fixed-size frames at the target format
struct FrameChunker {
    config: AudioBackendConfig,
    converter: FormatConverter,
    pending: Vec<i16>,
    emitted_ms: u64,
    dropped: u64,
    failed: bool,
    tx: mpsc::Sender<AudioFrame>,
}

impl FrameChunker {
    fn new(config: AudioBackendConfig, converter: FormatConverter, tx: mpsc::Sender<AudioFrame>) -> Self {
        Self {
            config,
            converter,
            pending: Vec::new(),
            emitted_ms: 0,
            dropped: 0,
            failed: false,
            tx,
        }
    }

    fn push(&mut self, raw: &[i16]) {
        if self.failed {
            return;
        }

        match self.converter.push(raw) {
            Ok(converted) => self.pending.extend_from_slice(&converted),
            Err(e) => {
                error!("Dropping microphone input: {}", e);
                self.failed = true;
                return;
            }
        }

        let frame_len = self.config.samples_per_buffer();

        while self.pending.len() >= frame_len {
            let samples: Vec<i16> = self.pending.drain(..frame_len).collect();
            let frame = AudioFrame {
                samples,
                sample_rate: self.converter.target_rate(),
                channels: self.converter.target_channels(),
                timestamp_ms: self.emitted_ms,
            };
            self.emitted_ms += self.config.buffer_duration_ms;

            // Never block the audio callback; a full channel drops the frame
            match self.tx.try_send(frame) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped += 1;
                    if self.dropped == 1 || self.dropped % 50 == 0 {
                        warn!("Dropped {} audio frames (receiver not keeping up)", self.dropped);
                    }
                }
                // Recording finished; stop() is on its way
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.pending.clear();
                    return;
                }
            }
        }
    }
}
