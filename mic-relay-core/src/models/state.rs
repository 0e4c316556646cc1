use super::audio_models::SessionInfo;

/// Recorder lifecycle state.
///
/// ```text
/// idle ──start──▶ recording ──stop──▶ idle
///                  │    ▲
///                  └────┘ reconfigure (stop + start)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording(SessionInfo),
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording(_))
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        match self {
            Self::Recording(info) => Some(info),
            Self::Idle => None,
        }
    }
}
