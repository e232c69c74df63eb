//! Audio capture pipeline: raw PCM in, WAV containers and model input out.

pub mod recorder;
pub mod wav;

pub use recorder::{FrameSource, PcmRecorder};
pub use wav::{decode, encode, pcm_to_model_input, WavFormat, HEADER_LEN, MODEL_INPUT_LEN};
