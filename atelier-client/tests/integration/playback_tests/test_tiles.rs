use crate::utils::{FakeSurface, MockWorkshopServer};
use crate::{init_tracing, settle, start_default_session};
use atelier_client::{PeerEntry, SessionHandle, TileState, VideoTile};
use atelier_core::ProducerId;
use std::sync::Arc;

async fn one_peer_session() -> (MockWorkshopServer, SessionHandle, PeerEntry) {
    let producer_id = ProducerId::new();
    let server = MockWorkshopServer::with_producers(vec![producer_id]);
    let handle = start_default_session(&server).await;
    settle().await;
    let entry = handle
        .peers()
        .get(&producer_id)
        .expect("peer entry missing");
    (server, handle, entry)
}

#[tokio::test]
async fn tile_plays_as_soon_as_it_attaches() {
    init_tracing();
    let (_server, handle, entry) = one_peer_session().await;
    let surface = Arc::new(FakeSurface::new());

    let tile = VideoTile::attach(&entry, surface.clone(), handle.clone()).await;

    assert_eq!(tile.state(), TileState::Playing);
    assert_eq!(surface.play_calls(), 1);
    assert_eq!(surface.attached_track(), Some(entry.track.id()));
    handle.shutdown().await;
}

#[tokio::test]
async fn blocked_autoplay_recovers_through_a_user_gesture() {
    init_tracing();
    let (_server, handle, entry) = one_peer_session().await;
    let surface = Arc::new(FakeSurface::new());
    surface.set_block_autoplay(true);

    let tile = VideoTile::attach(&entry, surface.clone(), handle.clone()).await;
    assert_eq!(tile.state(), TileState::NeedsInteraction);
    assert_eq!(surface.play_calls(), 1);
    // The peer stays in the room while we wait for the gesture.
    assert!(handle.peers().contains(&entry.producer_id));

    surface.set_block_autoplay(false);
    tile.retry_play().await.expect("retry failed");

    assert_eq!(tile.state(), TileState::Playing);
    assert_eq!(surface.play_calls(), 2);
    assert!(entry.track.enabled());
    assert!(!entry.consumer.is_paused());
    handle.shutdown().await;
}

#[tokio::test]
async fn ended_track_tears_the_tile_down_and_removes_the_peer() {
    init_tracing();
    let (_server, handle, entry) = one_peer_session().await;
    let surface = Arc::new(FakeSurface::new());

    let tile = VideoTile::attach(&entry, surface.clone(), handle.clone()).await;
    assert_eq!(tile.state(), TileState::Playing);

    entry.track.stop();
    settle().await;

    assert_eq!(tile.state(), TileState::Ended);
    assert!(surface.is_cleared());
    assert!(handle.peers().is_empty());
    handle.shutdown().await;
}

#[tokio::test]
async fn re_announcement_under_a_live_tile_keeps_the_fresh_peer() {
    init_tracing();
    let (server, handle, entry) = one_peer_session().await;
    let surface = Arc::new(FakeSurface::new());

    let tile = VideoTile::attach(&entry, surface.clone(), handle.clone()).await;
    assert_eq!(tile.state(), TileState::Playing);

    // Replacing the entry closes the old consumer, which ends the old
    // tile's track; the tile's removal must not evict the replacement.
    server.push_new_producer(entry.producer_id);
    settle().await;

    let peers = handle.peers();
    assert_eq!(peers.len(), 1);
    let fresh = peers
        .get(&entry.producer_id)
        .expect("fresh peer entry missing");
    assert_ne!(fresh.consumer.id(), entry.consumer.id());
    assert!(!fresh.consumer.is_closed());
    assert!(entry.consumer.is_closed());
    assert_eq!(tile.state(), TileState::Ended);
    handle.shutdown().await;
}

#[tokio::test]
async fn remote_mute_is_forced_back_on() {
    init_tracing();
    let (_server, handle, entry) = one_peer_session().await;
    let surface = Arc::new(FakeSurface::new());

    let tile = VideoTile::attach(&entry, surface.clone(), handle.clone()).await;

    entry.track.set_enabled(false);
    entry.track.set_muted(true);
    settle().await;

    assert!(entry.track.enabled());
    assert_eq!(tile.state(), TileState::Playing);
    handle.shutdown().await;
}

#[tokio::test]
async fn detaching_releases_the_surface_and_the_listener() {
    init_tracing();
    let (_server, handle, entry) = one_peer_session().await;
    let surface = Arc::new(FakeSurface::new());

    let tile = VideoTile::attach(&entry, surface.clone(), handle.clone()).await;
    assert_eq!(entry.track.listener_count(), 1);

    drop(tile);

    assert_eq!(entry.track.listener_count(), 0);
    assert!(surface.is_cleared());
    handle.shutdown().await;
}
