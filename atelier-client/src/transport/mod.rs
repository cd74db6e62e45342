mod webrtc_transport;

pub use webrtc_transport::*;
