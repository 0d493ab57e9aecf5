use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("sound #{from} links to missing sound #{to}")]
    DanglingLink { from: u32, to: u32 },

    #[error("track #{track} channel {channel} starts at missing sound #{head}")]
    DanglingTrackHead { track: u32, channel: usize, head: u32 },

    #[error("track #{0} has no channels")]
    EmptyTrack(u32),

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse engine config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to read engine config: {0}")]
    ConfigIo(#[from] std::io::Error),
}
