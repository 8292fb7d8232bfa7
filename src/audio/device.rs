//! cpal output for preview clips

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::AudioError;
use super::{AudioEvent, AudioHandle, AudioOutput, PlayerMessage};

const OUTPUT_POLL: Duration = Duration::from_millis(20);

/// Decoded audio, interleaved stereo
struct DecodedClip {
    samples: Vec<f32>,
    sample_rate: u32,
}

/// State shared between a handle, its loader and the audio callback
struct PlaybackShared {
    /// Position in frames at the device rate
    position: AtomicUsize,
    frames: AtomicUsize,
    device_rate: AtomicU32,
    ready: AtomicBool,
    paused: AtomicBool,
    /// f32 bits
    volume: AtomicU32,
    ended: AtomicBool,
    stopped: AtomicBool,
}

impl PlaybackShared {
    fn new() -> Self {
        Self {
            position: AtomicUsize::new(0),
            frames: AtomicUsize::new(0),
            device_rate: AtomicU32::new(0),
            ready: AtomicBool::new(false),
            paused: AtomicBool::new(true),
            volume: AtomicU32::new(1.0f32.to_bits()),
            ended: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }
}

/// Streams preview URLs to the default output device.
///
/// Each handle downloads its clip, decodes it on the blocking pool and plays
/// it on a dedicated thread that owns the cpal stream.
#[derive(Clone, Default)]
pub struct CpalOutput {
    http: reqwest::Client,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioOutput for CpalOutput {
    fn load(&self, url: &str, handle: u64, events: UnboundedSender<PlayerMessage>) -> Box<dyn AudioHandle> {
        let shared = Arc::new(PlaybackShared::new());
        let loader = tokio::spawn(load_clip(
            self.http.clone(),
            url.to_string(),
            handle,
            shared.clone(),
            events,
        ));
        tracing::debug!(url, handle, "Loading preview");
        Box::new(CpalHandle { shared, loader })
    }
}

pub struct CpalHandle {
    shared: Arc<PlaybackShared>,
    loader: JoinHandle<()>,
}

impl AudioHandle for CpalHandle {
    fn play(&mut self) -> Result<(), AudioError> {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return Err(AudioError::Stream("handle released".into()));
        }
        self.shared.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    fn current_time(&self) -> f64 {
        let rate = self.shared.device_rate.load(Ordering::Relaxed);
        if rate == 0 {
            return 0.0;
        }
        self.shared.position.load(Ordering::Relaxed) as f64 / rate as f64
    }

    fn set_current_time(&mut self, seconds: f64) {
        let rate = self.shared.device_rate.load(Ordering::Relaxed);
        if rate == 0 || !seconds.is_finite() {
            return;
        }
        let frames = self.shared.frames.load(Ordering::Relaxed);
        let target = ((seconds.max(0.0) * rate as f64) as usize).min(frames);
        self.shared.position.store(target, Ordering::Relaxed);
    }

    fn duration(&self) -> Option<f64> {
        if !self.shared.ready.load(Ordering::SeqCst) {
            return None;
        }
        let rate = self.shared.device_rate.load(Ordering::Relaxed);
        (rate > 0).then(|| self.shared.frames.load(Ordering::Relaxed) as f64 / rate as f64)
    }

    fn set_volume(&mut self, volume: f32) {
        self.shared
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

impl Drop for CpalHandle {
    fn drop(&mut self) {
        self.shared.paused.store(true, Ordering::SeqCst);
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.loader.abort();
    }
}

async fn load_clip(
    http: reqwest::Client,
    url: String,
    handle: u64,
    shared: Arc<PlaybackShared>,
    events: UnboundedSender<PlayerMessage>,
) {
    let event = match prepare_clip(&http, &url, handle, shared, events.clone()).await {
        Ok(duration) => {
            tracing::info!(url, handle, duration, "Preview ready");
            AudioEvent::MetadataReady { duration }
        }
        Err(e) => {
            tracing::warn!(url, handle, error = %e, "Preview failed to load");
            AudioEvent::Error(e.to_string())
        }
    };
    let _ = events.send(PlayerMessage::Audio { handle, event });
}

async fn prepare_clip(
    http: &reqwest::Client,
    url: &str,
    handle: u64,
    shared: Arc<PlaybackShared>,
    events: UnboundedSender<PlayerMessage>,
) -> Result<f64, AudioError> {
    let bytes = http
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AudioError::Fetch(e.to_string()))?
        .bytes()
        .await
        .map_err(|e| AudioError::Fetch(e.to_string()))?;

    let clip = tokio::task::spawn_blocking(move || decode_clip(bytes.to_vec()))
        .await
        .map_err(|e| AudioError::Decode(e.to_string()))??;

    let (ready_tx, ready_rx) = oneshot::channel();
    thread::Builder::new()
        .name(format!("preview-{}", handle))
        .spawn(move || run_output(clip, handle, shared, events, ready_tx))
        .map_err(|e| AudioError::Stream(e.to_string()))?;

    ready_rx
        .await
        .map_err(|_| AudioError::Stream("output thread exited".into()))?
}

fn decode_clip(bytes: Vec<u8>) -> Result<DecodedClip, AudioError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::Decode(format!("Failed to probe preview: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Decode("No audio tracks found".into()))?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(format!("Error reading packet: {}", e))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt frames are skipped
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        append_stereo(&mut samples, buffer.samples(), channels);
    }

    if samples.is_empty() {
        return Err(AudioError::Decode("Preview contained no audio".into()));
    }
    Ok(DecodedClip { samples, sample_rate })
}

/// Append interleaved frames as stereo, duplicating mono and keeping the front pair otherwise
fn append_stereo(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    for frame in interleaved.chunks_exact(channels) {
        let left = frame[0];
        let right = if channels > 1 { frame[1] } else { frame[0] };
        out.push(left);
        out.push(right);
    }
}

/// Linear interpolation between stereo frames
pub(crate) fn resample_linear(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    let frames = samples.len() / 2;
    if from == to || from == 0 || to == 0 || frames == 0 {
        return samples.to_vec();
    }
    let out_frames = (frames as u64 * to as u64 / from as u64) as usize;
    let step = from as f64 / to as f64;

    let mut out = Vec::with_capacity(out_frames * 2);
    for i in 0..out_frames {
        let src = i as f64 * step;
        let index = (src.floor() as usize).min(frames - 1);
        let next = (index + 1).min(frames - 1);
        let frac = (src - index as f64) as f32;
        for channel in 0..2 {
            let a = samples[index * 2 + channel];
            let b = samples[next * 2 + channel];
            out.push(a + (b - a) * frac);
        }
    }
    out
}

/// Owns the cpal stream until the handle is released
fn run_output(
    clip: DecodedClip,
    handle: u64,
    shared: Arc<PlaybackShared>,
    events: UnboundedSender<PlayerMessage>,
    ready: oneshot::Sender<Result<f64, AudioError>>,
) {
    let stream = match build_stream(clip, handle, &shared, &events) {
        Ok((stream, duration)) => {
            let _ = ready.send(Ok(duration));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    while !shared.stopped.load(Ordering::SeqCst) {
        thread::sleep(OUTPUT_POLL);
        if shared.ended.swap(false, Ordering::SeqCst) {
            tracing::debug!(handle, "Preview ended");
            let _ = events.send(PlayerMessage::Audio {
                handle,
                event: AudioEvent::Ended,
            });
        }
    }
    drop(stream);
    tracing::debug!(handle, "Preview output released");
}

fn build_stream(
    clip: DecodedClip,
    handle: u64,
    shared: &Arc<PlaybackShared>,
    events: &UnboundedSender<PlayerMessage>,
) -> Result<(cpal::Stream, f64), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::DeviceNotFound)?;
    let supported = device
        .default_output_config()
        .map_err(|e| AudioError::Stream(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config = supported.config();

    let device_rate = config.sample_rate.0;
    let channels = config.channels as usize;
    let samples = Arc::new(resample_linear(&clip.samples, clip.sample_rate, device_rate));
    let frames = samples.len() / 2;

    shared.device_rate.store(device_rate, Ordering::SeqCst);
    shared.frames.store(frames, Ordering::SeqCst);

    let output = StreamOutput {
        config: &config,
        channels,
        samples,
        shared: shared.clone(),
        handle,
        events: events.clone(),
    };
    tracing::debug!(handle, ?sample_format, device_rate, channels, "Opening output stream");
    let stream = match sample_format {
        SampleFormat::I16 => output.open::<i16>(&device),
        SampleFormat::U16 => output.open::<u16>(&device),
        SampleFormat::I32 => output.open::<i32>(&device),
        SampleFormat::F32 => output.open::<f32>(&device),
        SampleFormat::F64 => output.open::<f64>(&device),
        other => return Err(AudioError::Stream(format!("unsupported sample format {:?}", other))),
    }
    .map_err(|e| AudioError::Stream(e.to_string()))?;
    stream.play().map_err(|e| AudioError::Stream(e.to_string()))?;

    shared.ready.store(true, Ordering::SeqCst);
    Ok((stream, frames as f64 / device_rate as f64))
}

/// Everything one output stream's callbacks need
struct StreamOutput<'a> {
    config: &'a cpal::StreamConfig,
    channels: usize,
    samples: Arc<Vec<f32>>,
    shared: Arc<PlaybackShared>,
    handle: u64,
    events: UnboundedSender<PlayerMessage>,
}

impl StreamOutput<'_> {
    fn open<T>(self, device: &cpal::Device) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let Self { config, channels, samples, shared, handle, events } = self;
        device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                fill_output(data, channels, &samples, &shared);
            },
            move |err| {
                tracing::error!(handle, error = %err, "Audio stream error");
                let _ = events.send(PlayerMessage::Audio {
                    handle,
                    event: AudioEvent::Error(err.to_string()),
                });
            },
            None,
        )
    }
}

/// Audio callback: copy frames at the current position, scaled by volume and
/// converted to the device's sample type
fn fill_output<T>(data: &mut [T], channels: usize, samples: &[f32], state: &PlaybackShared)
where
    T: Sample + FromSample<f32>,
{
    if state.paused.load(Ordering::Relaxed) || state.stopped.load(Ordering::Relaxed) {
        data.fill(T::EQUILIBRIUM);
        return;
    }

    let frames = samples.len() / 2;
    let volume = state.volume();
    let start = state.position.load(Ordering::Relaxed);
    let mut position = start;

    for frame in data.chunks_mut(channels.max(1)) {
        if position >= frames {
            frame.fill(T::EQUILIBRIUM);
            continue;
        }
        let left = (samples[position * 2] * volume).clamp(-1.0, 1.0);
        let right = (samples[position * 2 + 1] * volume).clamp(-1.0, 1.0);
        match frame.len() {
            1 => frame[0] = T::from_sample((left + right) * 0.5),
            _ => {
                frame[0] = T::from_sample(left);
                frame[1] = T::from_sample(right);
                frame[2..].fill(T::EQUILIBRIUM);
            }
        }
        position += 1;
    }

    state.position.store(position, Ordering::Relaxed);
    if start < frames && position >= frames {
        state.ended.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_doubles_frame_count() {
        let input = vec![0.0, 0.0, 1.0, 1.0];
        let out = resample_linear(&input, 22050, 44100);
        assert_eq!(out.len(), 8);
        assert_eq!(out[2], 0.5);
        assert_eq!(out[3], 0.5);
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_linear(&input, 48000, 48000), input);
    }

    #[test]
    fn mono_is_duplicated_to_stereo() {
        let mut out = Vec::new();
        append_stereo(&mut out, &[0.25, -0.5], 1);
        assert_eq!(out, vec![0.25, 0.25, -0.5, -0.5]);

        let mut out = Vec::new();
        append_stereo(&mut out, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3);
        assert_eq!(out, vec![0.1, 0.2, 0.4, 0.5]);
    }

    #[test]
    fn fill_output_marks_end_once() {
        let state = PlaybackShared::new();
        state.paused.store(false, Ordering::SeqCst);
        let samples = vec![0.5; 4];
        let mut data = vec![0.0f32; 6];

        fill_output(&mut data, 2, &samples, &state);
        assert_eq!(&data[..4], &[0.5, 0.5, 0.5, 0.5]);
        assert_eq!(&data[4..], &[0.0, 0.0]);
        assert!(state.ended.swap(false, Ordering::SeqCst));

        fill_output(&mut data, 2, &samples, &state);
        assert!(!state.ended.load(Ordering::SeqCst));
    }

    #[test]
    fn fill_output_converts_to_integer_samples() {
        let state = PlaybackShared::new();
        state.paused.store(false, Ordering::SeqCst);
        let samples = vec![1.0, -1.0, 0.0, 0.0];
        let mut data = vec![7i16; 4];

        fill_output(&mut data, 2, &samples, &state);
        assert!(data[0] >= i16::MAX - 1);
        assert_eq!(&data[1..], &[i16::MIN, 0, 0]);

        state.paused.store(true, Ordering::SeqCst);
        let mut data = vec![7u16; 2];
        fill_output(&mut data, 2, &samples, &state);
        assert_eq!(data, vec![u16::EQUILIBRIUM; 2]);
    }
}
