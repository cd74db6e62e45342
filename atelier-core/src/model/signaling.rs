use crate::model::{
    ConsumerId, DtlsParameters, MediaKind, ProducerId, RequestId, RtpCapabilities, RtpParameters,
    TransportId, TransportParams,
};
use serde::{Deserialize, Serialize};

/// Ack payload of `transport-consume`: everything needed to build the
/// local consumer. `paused` is dictated by the server and may be either
/// value at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumerParams {
    pub id: ConsumerId,
    pub producer_id: ProducerId,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
    pub paused: bool,
}

/// Client-to-server requests. Every request is acknowledged; the wire
/// names match the media server's event vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d")]
pub enum ClientRequest {
    #[serde(rename = "getRouterRtpCapabilities")]
    GetRouterRtpCapabilities,
    #[serde(rename = "createWebRtcTransport")]
    CreateWebRtcTransport { sender: bool },
    #[serde(rename = "transport-connect")]
    TransportConnect {
        transport_id: TransportId,
        dtls_parameters: DtlsParameters,
    },
    #[serde(rename = "transport-produce")]
    TransportProduce {
        transport_id: TransportId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    },
    #[serde(rename = "getProducers")]
    GetProducers,
    #[serde(rename = "transport-consume")]
    TransportConsume {
        producer_id: ProducerId,
        rtp_capabilities: RtpCapabilities,
    },
    #[serde(rename = "consumer-resume")]
    ConsumerResume { consumer_id: ConsumerId },
}

/// Ack bodies, one per request shape plus a generic error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d")]
pub enum ResponseBody {
    RouterRtpCapabilities(RtpCapabilities),
    TransportCreated(TransportParams),
    Connected,
    Produced { id: ProducerId },
    Producers(Vec<ProducerId>),
    ConsumerCreated(ConsumerParams),
    Resumed,
    Error { message: String },
}

/// Unsolicited server pushes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d")]
pub enum ServerEvent {
    #[serde(rename = "new-producer")]
    NewProducer { producer_id: ProducerId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientFrame {
    pub request_id: RequestId,
    pub request: ClientRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", content = "m")]
pub enum ServerFrame {
    Ack {
        request_id: RequestId,
        body: ResponseBody,
    },
    Event(ServerEvent),
}
