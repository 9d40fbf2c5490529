use crate::types::AudioData;
use anyhow::{bail, Context, Result};
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::debug;

/// Decode an in-memory audio file (any container symphonia can probe) to mono f32.
///
/// `extension` is an optional hint such as `"wav"` or `"mp3"`, usually taken
/// from the uploaded file name.
pub fn decode_bytes(bytes: &[u8], extension: Option<&str>) -> Result<AudioData> {
    if bytes.is_empty() {
        bail!("uploaded file is empty");
    }
    let source = Cursor::new(bytes.to_vec());
    decode_source(Box::new(source), extension)
}

/// Decode an audio file to raw PCM samples (mono, f32)
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    let path = path.as_ref();

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let extension = path.extension().and_then(|e| e.to_str());

    decode_source(Box::new(file), extension)
        .with_context(|| format!("Failed to decode {}", path.display()))
}

fn decode_source(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<AudioData> {
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probe_result = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unrecognized audio format")?;

    let mut format = probe_result.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio tracks found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate not specified in audio file")?;
    if sample_rate == 0 {
        bail!("Audio file reports a sample rate of 0 Hz");
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut samples = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(err).context("Failed to read packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => append_mono(&decoded, &mut samples),
            // A corrupt packet is recoverable; the decoder resynchronizes on the next one.
            Err(SymphoniaError::DecodeError(reason)) => {
                skipped_packets += 1;
                debug!(reason, "skipping undecodable packet");
            }
            Err(err) => return Err(err).context("Failed to decode audio packet"),
        }
    }

    if samples.is_empty() {
        bail!(
            "Audio stream contained no decodable samples ({} packets skipped)",
            skipped_packets
        );
    }

    debug!(
        samples = samples.len(),
        sample_rate, skipped_packets, "decoded audio stream"
    );

    Ok(AudioData {
        samples,
        sample_rate,
    })
}

/// Mix any decoded buffer down to mono f32 samples in [-1.0, 1.0]
fn append_mono(buffer: &AudioBufferRef, out: &mut Vec<f32>) {
    match buffer {
        AudioBufferRef::U8(buf) => mix_down(&**buf, out),
        AudioBufferRef::U16(buf) => mix_down(&**buf, out),
        AudioBufferRef::U24(buf) => mix_down(&**buf, out),
        AudioBufferRef::U32(buf) => mix_down(&**buf, out),
        AudioBufferRef::S8(buf) => mix_down(&**buf, out),
        AudioBufferRef::S16(buf) => mix_down(&**buf, out),
        AudioBufferRef::S24(buf) => mix_down(&**buf, out),
        AudioBufferRef::S32(buf) => mix_down(&**buf, out),
        AudioBufferRef::F32(buf) => mix_down(&**buf, out),
        AudioBufferRef::F64(buf) => mix_down(&**buf, out),
    }
}

fn mix_down<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample + IntoSample<f32>,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    out.reserve(frames);

    if channels == 1 {
        out.extend(buf.chan(0).iter().map(|&s| s.into_sample()));
        return;
    }

    for i in 0..frames {
        let sum: f32 = (0..channels)
            .map(|ch| -> f32 { buf.chan(ch)[i].into_sample() })
            .sum();
        out.push(sum / channels as f32);
    }
}
