pub mod audio;
pub mod connection;
pub mod ice;
pub mod types;

pub use audio::{attach_audio, AudioSink, CountingSink, OggSink, Playback};
pub use connection::{apply_remote_description, create_local_offer, new_peer};
pub use types::{CandidateSummary, ConnectRequest, PlaybackSummary, ServerConfig};
