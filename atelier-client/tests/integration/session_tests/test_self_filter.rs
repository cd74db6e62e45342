use crate::utils::MockWorkshopServer;
use crate::{init_tracing, settle, start_default_session};
use atelier_client::RoomState;

#[tokio::test]
async fn own_producer_announcement_is_never_consumed() {
    init_tracing();
    let server = MockWorkshopServer::new();
    let mut handle = start_default_session(&server).await;

    let producer_id = handle.publish().await.expect("publish failed");
    handle
        .wait_for_state(RoomState::Joined)
        .await
        .expect("never joined");

    // The server echoes our own producer back, as it does to everyone.
    server.push_new_producer(producer_id);
    settle().await;

    assert!(handle.peers().is_empty());
    assert_eq!(server.consume_calls(), 0);
    handle.shutdown().await;
}
