// Sample format conversion for captured audio
//
// Devices and files deliver whatever rate and channel layout they run at.
// `FormatConverter` brings interleaved i16 samples to the backend's target
// format; the resampler keeps its state between pushes, so a stream fed in
// arbitrary pieces converts exactly like the same samples fed at once.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::CaptureError;

/// Input frames per resampler call
const CHUNK_FRAMES: usize = 1024;

/// Streaming converter from one rate/channel layout to another
pub struct FormatConverter {
    source_rate: u32,
    source_channels: u16,
    target_rate: u32,
    target_channels: u16,
    resampler: Option<SincFixedIn<f32>>,
    /// Deinterleaved input waiting for a full resampler chunk
    pending: Vec<Vec<f32>>,
    /// Leading output frames that are filter delay, not signal
    skip_frames: usize,
    frames_in: u64,
    frames_out: u64,
}

impl FormatConverter {
    pub fn new(
        source_rate: u32,
        source_channels: u16,
        target_rate: u32,
        target_channels: u16,
    ) -> Result<Self, CaptureError> {
        if source_rate == 0 || target_rate == 0 || source_channels == 0 || target_channels == 0 {
            return Err(CaptureError::Resample(format!(
                "cannot convert {}Hz/{}ch to {}Hz/{}ch",
                source_rate, source_channels, target_rate, target_channels
            )));
        }

        let resampler = if source_rate == target_rate {
            None
        } else {
            let params = SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            };
            let resampler = SincFixedIn::<f32>::new(
                target_rate as f64 / source_rate as f64,
                1.0,
                params,
                CHUNK_FRAMES,
                target_channels as usize,
            )
            .map_err(|e| CaptureError::Resample(e.to_string()))?;
            Some(resampler)
        };

        let skip_frames = resampler.as_ref().map(|r| r.output_delay()).unwrap_or(0);

        Ok(Self {
            source_rate,
            source_channels,
            target_rate,
            target_channels,
            resampler,
            pending: vec![Vec::new(); target_channels as usize],
            skip_frames,
            frames_in: 0,
            frames_out: 0,
        })
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    pub fn target_channels(&self) -> u16 {
        self.target_channels
    }

    /// Convert the next piece of a stream
    ///
    /// Output lags the input by the resampler's chunk size; `flush` returns
    /// the remainder.
    pub fn push(&mut self, samples: &[i16]) -> Result<Vec<i16>, CaptureError> {
        let remixed = remix(samples, self.source_channels, self.target_channels);
        let channels = self.target_channels as usize;

        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(remixed);
        };

        for frame in remixed.chunks_exact(channels) {
            for (pending, &sample) in self.pending.iter_mut().zip(frame) {
                pending.push(sample as f32 / 32768.0);
            }
        }
        self.frames_in += (remixed.len() / channels) as u64;

        let mut out = Vec::new();
        while self.pending[0].len() >= resampler.input_frames_next() {
            let needed = resampler.input_frames_next();
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|pending| pending.drain(..needed).collect())
                .collect();

            let processed = resampler
                .process(&chunk, None)
                .map_err(|e| CaptureError::Resample(e.to_string()))?;
            interleave_into(&processed, &mut self.skip_frames, &mut out);
        }

        self.frames_out += (out.len() / channels) as u64;
        Ok(out)
    }

    /// End the stream and return everything still buffered
    ///
    /// Output is trimmed to the length the input implies. The converter can
    /// be reused for a new stream afterwards.
    pub fn flush(&mut self) -> Result<Vec<i16>, CaptureError> {
        let channels = self.target_channels as usize;
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        let rest: Vec<Vec<f32>> = self.pending.iter_mut().map(std::mem::take).collect();
        if !rest[0].is_empty() {
            let processed = resampler
                .process_partial(Some(rest.as_slice()), None)
                .map_err(|e| CaptureError::Resample(e.to_string()))?;
            interleave_into(&processed, &mut self.skip_frames, &mut out);
        }

        // Drain the filter delay
        let tail = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| CaptureError::Resample(e.to_string()))?;
        interleave_into(&tail, &mut self.skip_frames, &mut out);

        let expected = (self.frames_in as u128 * self.target_rate as u128
            / self.source_rate as u128) as u64;
        let remaining = expected.saturating_sub(self.frames_out) as usize;
        out.truncate(remaining.saturating_mul(channels));

        resampler.reset();
        self.skip_frames = resampler.output_delay();
        self.frames_in = 0;
        self.frames_out = 0;

        Ok(out)
    }

    /// Convert a complete recording in one go
    pub fn convert(&mut self, samples: &[i16]) -> Result<Vec<i16>, CaptureError> {
        let mut out = self.push(samples)?;
        out.extend(self.flush()?);
        Ok(out)
    }
}

fn interleave_into(channels: &[Vec<f32>], skip_frames: &mut usize, out: &mut Vec<i16>) {
    let frames = channels.first().map(Vec::len).unwrap_or(0);
    let start = (*skip_frames).min(frames);
    *skip_frames -= start;

    for i in start..frames {
        for channel in channels {
            let scaled = (channel[i] * 32768.0).round();
            out.push(scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16);
        }
    }
}

/// Change the channel count of interleaved samples
///
/// Mono output averages all channels. Otherwise output channel `c` copies
/// input channel `c`, repeating the last input channel when there are fewer.
pub fn remix(samples: &[i16], from: u16, to: u16) -> Vec<i16> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }
    if to == 1 {
        return downmix_to_mono(samples, from);
    }

    samples
        .chunks_exact(from as usize)
        .flat_map(|frame| (0..to as usize).map(move |c| frame[c.min(frame.len() - 1)]))
        .collect()
}

/// Average all channels of each interleaved frame into one sample
pub fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Scale samples so the loudest one reaches full scale
///
/// Silence is left untouched.
pub fn normalize_peak(samples: &mut [i16]) {
    let peak = samples
        .iter()
        .map(|&s| (s as i32).unsigned_abs())
        .max()
        .unwrap_or(0);

    if peak == 0 || peak >= i16::MAX as u32 {
        return;
    }

    let gain = i16::MAX as f32 / peak as f32;
    for sample in samples.iter_mut() {
        let scaled = (*sample as f32 * gain).round();
        *sample = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}
