use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::domain::TranscriptionError;

/// Sample rate the whisper backend decodes.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Audio duration in seconds, computed from the decoded file's sample count
/// and sample rate.
pub fn file_duration_secs(path: &Path) -> Result<f64, TranscriptionError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    Ok(f64::from(reader.duration()) / f64::from(spec.sample_rate))
}

/// Decode a WAV file to 16 kHz mono f32 samples in `[-1, 1]`.
///
/// Stereo input is downmixed by averaging channels; input at any other
/// sample rate is rejected (resampling is the recorder's job).
pub fn read_mono_f32(path: &Path) -> Result<Vec<f32>, TranscriptionError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    if spec.sample_rate != WHISPER_SAMPLE_RATE {
        return Err(TranscriptionError::InvalidAudio(format!(
            "expected {}Hz audio, got {}Hz",
            WHISPER_SAMPLE_RATE, spec.sample_rate
        )));
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect::<Result<_, _>>()?,
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
    };

    Ok(match spec.channels {
        0 | 1 => samples,
        channels => samples
            .chunks(channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect(),
    })
}
