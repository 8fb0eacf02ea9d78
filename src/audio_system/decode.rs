//! Asset decoding
//!
//! Buffered playback decodes the whole asset up front with symphonia.
//! Streaming playback keeps the encoded bytes and opens a rodio decoder per
//! play; [`probe_stream`] only checks that such a decoder can be opened.
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use rodio::{Decoder, Source};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::output::BoxedSource;
use super::pcm::PcmBuffer;
use crate::error::SoundError;

/// Decode an encoded asset into interleaved f32 PCM
pub fn decode_buffered(locator: &str, bytes: Vec<u8>) -> Result<PcmBuffer, SoundError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    // Create a probe hint using the locator's extension
    let mut hint = Hint::new();
    if let Some(ext) = Path::new(locator).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| SoundError::decode(locator, e))?;
    let mut format = probed.format;

    // First audio track with a known (decodable) codec
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SoundError::decode(locator, "no supported audio tracks"))?;

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .map_err(|e| SoundError::decode(locator, e))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                // End of stream
                break;
            }
            // Track list changed mid-stream; keep what was decoded so far
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(SoundError::decode(locator, err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count() as u16);

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            // Skip packets that fail on IO or invalid data
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
            Err(err) => return Err(SoundError::decode(locator, err)),
        }
    }

    let (Some(sample_rate), Some(channels)) = (sample_rate, channels) else {
        return Err(SoundError::decode(locator, "unknown sample format"));
    };
    if samples.is_empty() {
        return Err(SoundError::decode(locator, "asset contains no audio"));
    }

    tracing::debug!(
        "Decoded {}: {} Hz, {} channel(s), {} samples",
        locator,
        sample_rate,
        channels,
        samples.len()
    );
    Ok(PcmBuffer::new(channels, sample_rate, samples))
}

/// Check that a streaming decoder can be opened over `bytes`
pub fn probe_stream(locator: &str, bytes: &Arc<[u8]>) -> Result<(), SoundError> {
    Decoder::new(Cursor::new(Arc::clone(bytes)))
        .map(|_| ())
        .map_err(|e| SoundError::decode(locator, e))
}

/// Open a streaming decoder for one playback
pub fn open_stream(
    locator: &str,
    bytes: &Arc<[u8]>,
    looped: bool,
) -> Result<BoxedSource, SoundError> {
    let decoder = Decoder::new(Cursor::new(Arc::clone(bytes)))
        .map_err(|e| SoundError::decode(locator, e))?;

    let source: BoxedSource = if looped {
        Box::new(decoder.convert_samples::<f32>().repeat_infinite())
    } else {
        Box::new(decoder.convert_samples::<f32>())
    };
    Ok(source)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 16-bit mono WAV of `frames` samples of a square-ish pattern
    pub(crate) fn wav_bytes(sample_rate: u32, frames: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for i in 0..frames {
                let sample = if (i / 10) % 2 == 0 { 8_000i16 } else { -8_000 };
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    #[test]
    fn test_decode_wav() {
        let buffer = decode_buffered("sounds/test.wav", wav_bytes(8_000, 800)).unwrap();
        assert_eq!(buffer.sample_rate(), 8_000);
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.frames(), 800);
        assert!((buffer.samples()[0] - 8_000.0 / 32_768.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_buffered("sounds/cursed.mp3", b"definitely not audio".to_vec());
        assert!(matches!(result, Err(SoundError::AssetDecodeFailed { .. })));
    }

    #[test]
    fn test_stream_probe() {
        let good: Arc<[u8]> = wav_bytes(8_000, 400).into();
        assert!(probe_stream("a.wav", &good).is_ok());

        let bad: Arc<[u8]> = b"nope".to_vec().into();
        assert!(probe_stream("a.wav", &bad).is_err());
    }

    #[test]
    fn test_open_stream_once() {
        let bytes: Arc<[u8]> = wav_bytes(8_000, 400).into();
        let source = open_stream("a.wav", &bytes, false).unwrap();
        assert_eq!(source.sample_rate(), 8_000);
        assert_eq!(source.count(), 400);
    }

    #[test]
    fn test_open_stream_looped() {
        let bytes: Arc<[u8]> = wav_bytes(8_000, 400).into();
        let source = open_stream("a.wav", &bytes, true).unwrap();
        assert_eq!(source.take(1_000).count(), 1_000);
    }
}
