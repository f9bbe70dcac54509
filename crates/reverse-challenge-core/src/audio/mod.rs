pub(crate) mod capture;
mod device;
mod microphone;
pub(crate) mod player;
pub(crate) mod playback;
pub(crate) mod resampler;
mod reverse;
pub(crate) mod wav;

pub use {
    capture::{AudioCapture, MAX_PAYLOAD_BYTES, MIN_PAYLOAD_BYTES, WARNING_FRACTION},
    device::{FrameReceiver, FrameSender, InputFormat, MicrophoneSource, PlayerBackend},
    microphone::{CpalMicrophone, MemoryMicrophone, MicrophoneProbe},
    playback::{AudioPlayback, CompletionCallback},
    player::{CpalPlayer, MemoryPlayer, PlayerProbe},
    reverse::reverse_wav,
    wav::{
        BITS_PER_SAMPLE, CHANNELS, HEADER_LEN, SAMPLE_RATE, payload_duration_ms, wav_header,
        write_pcm16_wav,
    },
};
