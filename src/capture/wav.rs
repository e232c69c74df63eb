//! WAV container synthesis and parsing for raw PCM captures.
//!
//! The container is the canonical 44-byte header followed by the payload:
//! `RIFF` chunk (length = payload + 36), `WAVE` type, a 16-byte `fmt `
//! chunk describing linear PCM, and the `data` chunk. All multi-byte
//! fields are little-endian.

use crate::error::EngineError;

/// Fixed header length of the containers this module writes.
pub const HEADER_LEN: usize = 44;
/// Bits per sample. Captures are always 16-bit linear PCM.
pub const BITS_PER_SAMPLE: u16 = 16;
/// Format tag for uncompressed linear PCM.
const FORMAT_PCM: u16 = 1;

/// Audio format parameters carried in the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

impl WavFormat {
    /// Mono 16 kHz, the capture pipeline's native format.
    pub fn mono_16khz() -> Self {
        Self {
            channels: 1,
            sample_rate: 16_000,
        }
    }

    fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.channels) * u32::from(BITS_PER_SAMPLE) / 8
    }

    fn block_align(&self) -> u16 {
        self.channels * BITS_PER_SAMPLE / 8
    }
}

/// Wrap a raw PCM payload in a WAV container.
///
/// An empty payload yields a well-formed 44-byte container whose data
/// chunk declares zero length.
pub fn encode(pcm: &[u8], format: WavFormat) -> Vec<u8> {
    let data_len = pcm.len() as u32;
    let mut out = Vec::with_capacity(HEADER_LEN + pcm.len());

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(data_len + 36).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&format.byte_rate().to_le_bytes());
    out.extend_from_slice(&format.block_align().to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);

    out
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Parse a container written by [`encode`], returning its format and the
/// PCM payload.
pub fn decode(wav: &[u8]) -> Result<(WavFormat, &[u8]), EngineError> {
    if wav.len() < HEADER_LEN {
        return Err(EngineError::MalformedContainer(format!(
            "container is {} bytes, need at least {HEADER_LEN}",
            wav.len()
        )));
    }
    if &wav[0..4] != b"RIFF" || &wav[8..12] != b"WAVE" {
        return Err(EngineError::MalformedContainer(
            "missing RIFF/WAVE markers".into(),
        ));
    }
    if &wav[12..16] != b"fmt " || &wav[36..40] != b"data" {
        return Err(EngineError::MalformedContainer(
            "missing fmt/data chunks".into(),
        ));
    }
    if read_u16(wav, 20) != FORMAT_PCM {
        return Err(EngineError::MalformedContainer(format!(
            "format tag {} is not linear PCM",
            read_u16(wav, 20)
        )));
    }

    let format = WavFormat {
        channels: read_u16(wav, 22),
        sample_rate: read_u32(wav, 24),
    };
    let declared = read_u32(wav, 40) as usize;
    let payload = &wav[HEADER_LEN..];
    if declared != payload.len() {
        return Err(EngineError::MalformedContainer(format!(
            "data chunk declares {declared} bytes, container holds {}",
            payload.len()
        )));
    }
    Ok((format, payload))
}

/// Sample count the audio emotion model expects.
pub const MODEL_INPUT_LEN: usize = 16_000;

/// Convert raw 16-bit little-endian PCM into the model's input vector:
/// normalized to [-1, 1] and padded with silence or truncated to exactly
/// [`MODEL_INPUT_LEN`] samples.
pub fn pcm_to_model_input(pcm: &[u8]) -> Vec<f32> {
    let mut samples: Vec<f32> = pcm
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();
    samples.resize(MODEL_INPUT_LEN, 0.0);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_layout() {
        let pcm = vec![0u8; 100];
        let wav = encode(&pcm, WavFormat::mono_16khz());

        assert_eq!(wav.len(), 144);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(read_u32(&wav, 4), 136); // payload + 36
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(read_u32(&wav, 16), 16); // fmt chunk size
        assert_eq!(read_u16(&wav, 20), 1); // linear PCM
        assert_eq!(read_u16(&wav, 22), 1); // mono
        assert_eq!(read_u32(&wav, 24), 16_000);
        assert_eq!(read_u32(&wav, 28), 32_000); // byte rate
        assert_eq!(read_u16(&wav, 32), 2); // block align
        assert_eq!(read_u16(&wav, 34), 16); // bits per sample
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(read_u32(&wav, 40), 100);
    }

    #[test]
    fn test_empty_payload_is_well_formed() {
        let wav = encode(&[], WavFormat::mono_16khz());
        assert_eq!(wav.len(), HEADER_LEN);
        assert_eq!(read_u32(&wav, 4), 36);
        assert_eq!(read_u32(&wav, 40), 0);

        let (format, payload) = decode(&wav).unwrap();
        assert_eq!(format, WavFormat::mono_16khz());
        assert!(payload.is_empty());
    }

    #[test]
    fn test_roundtrip() {
        let pcm: Vec<u8> = (0..=255).collect();
        let format = WavFormat {
            channels: 2,
            sample_rate: 44_100,
        };
        let wav = encode(&pcm, format);
        let (parsed, payload) = decode(&wav).unwrap();
        assert_eq!(parsed, format);
        assert_eq!(payload, &pcm[..]);
    }

    #[test]
    fn test_rejects_truncated_container() {
        let wav = encode(&[1, 2, 3, 4], WavFormat::mono_16khz());
        assert!(decode(&wav[..20]).is_err());
        assert!(decode(&wav[..wav.len() - 1]).is_err());
    }

    #[test]
    fn test_rejects_wrong_markers() {
        let mut wav = encode(&[], WavFormat::mono_16khz());
        wav[0] = b'X';
        assert!(decode(&wav).is_err());
    }

    #[test]
    fn test_model_input_normalization() {
        // i16::MIN maps to -1.0, i16::MAX just under 1.0.
        let pcm = [0x00, 0x80, 0xFF, 0x7F, 0x00, 0x00];
        let input = pcm_to_model_input(&pcm);
        assert_eq!(input.len(), MODEL_INPUT_LEN);
        assert_eq!(input[0], -1.0);
        assert!((input[1] - 32767.0 / 32768.0).abs() < 1e-6);
        assert_eq!(input[2], 0.0);
        // Padding is silence.
        assert_eq!(input[MODEL_INPUT_LEN - 1], 0.0);
    }

    #[test]
    fn test_model_input_truncates_long_capture() {
        let pcm = vec![0x01u8; MODEL_INPUT_LEN * 4];
        let input = pcm_to_model_input(&pcm);
        assert_eq!(input.len(), MODEL_INPUT_LEN);
    }
}
