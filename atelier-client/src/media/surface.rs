use crate::error::PlaybackError;
use crate::media::MediaTrack;
use async_trait::async_trait;

/// Rendering sink for one track. The video tile drives it: attach the
/// track, try to play, clear on teardown. `play` may be rejected by an
/// autoplay policy and retried later from a user gesture.
#[async_trait]
pub trait PlaybackSurface: Send + Sync + 'static {
    fn attach(&self, track: &MediaTrack);

    async fn play(&self) -> Result<(), PlaybackError>;

    fn clear(&self);
}
