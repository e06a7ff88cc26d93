//! Live duplex voice sessions.
//!
//! ```text
//! Recorder ─frames─> LiveSession ─ClientMessage─> transport pump ─> WebSocket
//!                        ^                                             │
//!                        └──────────── TransportEvent ─────────────────┘
//!                        │
//!                        ├─> PlaybackScheduler ─> AudioOutput
//!                        ├─> tools::execute
//!                        └─> SharedTranscript
//! ```

pub mod capture;
#[cfg(feature = "device-audio")]
pub mod device;
pub mod pcm;
pub mod playback;
pub mod protocol;
pub mod session;
pub mod transport;

pub use capture::{CaptureDevice, CaptureHandle, FrameChunker, FrameSender, Recorder};
#[cfg(feature = "device-audio")]
pub use device::{CpalCapture, CpalOutput};
pub use playback::{AudioOutput, PlaybackScheduler, SourceId};
pub use protocol::{ClientMessage, ServerMessage, Setup};
pub use session::{LiveSession, LiveState};
pub use transport::{LiveConnection, LiveConnector, TransportEvent, WsLiveConnector};
