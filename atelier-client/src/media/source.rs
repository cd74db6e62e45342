use crate::config::MediaConstraints;
use crate::error::MediaError;
use crate::media::MediaTrack;
use async_trait::async_trait;
use atelier_core::MediaKind;

/// A bundle of tracks captured together.
#[derive(Debug, Clone)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == MediaKind::Video)
    }

    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == MediaKind::Audio)
    }

    /// Stop every track in the stream.
    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Where local media comes from. Capture may take arbitrarily long
/// (permission prompts), so callers must not block event handling on it.
#[async_trait]
pub trait MediaSource: Send + Sync + 'static {
    async fn capture(&self, constraints: MediaConstraints) -> Result<MediaStream, MediaError>;
}

/// Loopback source producing silent/black tracks. Good enough for
/// headless runs and demos without a capture device.
#[derive(Debug, Default)]
pub struct SyntheticMediaSource;

#[async_trait]
impl MediaSource for SyntheticMediaSource {
    async fn capture(&self, constraints: MediaConstraints) -> Result<MediaStream, MediaError> {
        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(MediaTrack::local(MediaKind::Video));
        }
        if constraints.audio {
            tracks.push(MediaTrack::local(MediaKind::Audio));
        }
        if tracks.is_empty() {
            return Err(MediaError::DeviceUnavailable(
                "no media kinds requested".into(),
            ));
        }
        Ok(MediaStream::new(tracks))
    }
}
