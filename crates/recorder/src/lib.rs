mod capture;
mod session;

pub use capture::{
    ArtifactCapture, CaptureArtifact, CaptureBuffer, CaptureDump, CaptureError, CapturedShader,
    CapturedVariant, DEFAULT_ARTIFACT,
};
pub use session::{
    CaptureTarget, CycleState, CycleStatus, RecordMode, Recorder, RecorderError, SETTLE_TICKS,
};
