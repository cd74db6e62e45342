mod ids;
mod rtp;
mod signaling;
mod transport;

pub use ids::{ConsumerId, ProducerId, RequestId, TrackId, TransportId};
pub use rtp::{MediaKind, RtpCapabilities, RtpCodecCapability, RtpCodecParameters, RtpParameters};
pub use signaling::{ClientFrame, ClientRequest, ConsumerParams, ResponseBody, ServerEvent, ServerFrame};
pub use transport::{
    DtlsFingerprint, DtlsParameters, DtlsRole, IceCandidate, IceParameters, TransportParams,
};
