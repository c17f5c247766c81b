//! Audio fixture I/O.
//!
//! The detector only accepts mono 32-bit float PCM at the configured sample
//! rate, so these helpers read exactly that: raw little-endian `f32` dumps
//! (`.pcm`) and mono IEEE-float WAV files. Anything else is rejected rather
//! than converted.

use std::fs;
use std::path::Path;

use crate::error::{Result, SegmenterError};

/// Decode raw little-endian `f32` samples.
pub fn decode_pcm_f32le(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(SegmenterError::AudioFormat(format!(
            "raw f32 PCM length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Read a raw little-endian `f32` PCM file.
pub fn read_pcm_f32le(path: impl AsRef<Path>) -> Result<Vec<f32>> {
    let bytes = fs::read(path.as_ref())?;
    decode_pcm_f32le(&bytes)
}

/// Read a mono 32-bit float WAV file recorded at `sample_rate`.
pub fn read_wav_f32(path: impl AsRef<Path>, sample_rate: u32) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path.as_ref())
        .map_err(|e| SegmenterError::AudioFormat(e.to_string()))?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(SegmenterError::AudioFormat(format!(
            "expected mono audio, got {} channels",
            spec.channels
        )));
    }
    if spec.sample_format != hound::SampleFormat::Float || spec.bits_per_sample != 32 {
        return Err(SegmenterError::AudioFormat(format!(
            "expected 32-bit float samples, got {:?} {}-bit",
            spec.sample_format, spec.bits_per_sample
        )));
    }
    if spec.sample_rate != sample_rate {
        return Err(SegmenterError::AudioFormat(format!(
            "expected {sample_rate} Hz, got {} Hz",
            spec.sample_rate
        )));
    }

    reader
        .samples::<f32>()
        .map(|s| s.map_err(|e| SegmenterError::AudioFormat(e.to_string())))
        .collect()
}

/// Write mono 32-bit float samples as a WAV file, e.g. a cleaned buffer.
pub fn write_wav_f32(path: impl AsRef<Path>, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let wav_err = |e: hound::Error| SegmenterError::AudioFormat(e.to_string());

    let mut writer = hound::WavWriter::create(path.as_ref(), spec).map_err(wav_err)?;
    for &sample in samples {
        writer.write_sample(sample).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("speechseg-{}-{name}", std::process::id()))
    }

    #[test]
    fn decodes_little_endian_floats() {
        let bytes: Vec<u8> = [0.5f32, -1.0, 0.25]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        assert_eq!(decode_pcm_f32le(&bytes).unwrap(), vec![0.5, -1.0, 0.25]);
    }

    #[test]
    fn rejects_truncated_pcm() {
        let err = decode_pcm_f32le(&[0, 0, 0]).expect_err("3 bytes is not a sample");
        assert!(matches!(err, SegmenterError::AudioFormat(_)));
    }

    #[test]
    fn float_wav_is_read_back() {
        let path = temp_path("roundtrip.wav");
        let samples = vec![0.0f32, 0.5, -0.5, 0.0];
        write_wav_f32(&path, &samples, 16_000).unwrap();

        assert_eq!(read_wav_f32(&path, 16_000).unwrap(), samples);
        let err = read_wav_f32(&path, 8_000).expect_err("rate mismatch");
        assert!(matches!(err, SegmenterError::AudioFormat(_)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn integer_wav_is_rejected() {
        let path = temp_path("int16.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        let err = read_wav_f32(&path, 16_000).expect_err("int16 is not accepted");
        assert!(matches!(err, SegmenterError::AudioFormat(_)));

        let _ = std::fs::remove_file(&path);
    }
}
