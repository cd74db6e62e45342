use crate::error::DeviceError;
use crate::transport::{TransportDirection, WebRtcTransport};
use atelier_core::{
    DtlsFingerprint, DtlsParameters, DtlsRole, MediaKind, RtpCapabilities, RtpCodecParameters,
    RtpParameters, TransportParams,
};
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Local media engine. Must be loaded with the router's capabilities
/// exactly once before any transport is created.
pub struct Device {
    capabilities: Mutex<Option<RtpCapabilities>>,
    dtls: DtlsParameters,
}

impl Device {
    pub fn new() -> Self {
        Self {
            capabilities: Mutex::new(None),
            dtls: mint_dtls_parameters(),
        }
    }

    /// Load the router capabilities. Loading twice is an error, not a
    /// no-op: it means the caller lost track of session lifecycle.
    pub fn load(&self, capabilities: RtpCapabilities) -> Result<(), DeviceError> {
        let mut slot = self
            .capabilities
            .lock()
            .expect("device capability lock poisoned");
        if slot.is_some() {
            return Err(DeviceError::AlreadyLoaded);
        }
        if capabilities.codecs.is_empty() {
            return Err(DeviceError::EmptyRouterCapabilities);
        }
        info!(codecs = capabilities.codecs.len(), "device loaded");
        *slot = Some(capabilities);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.capabilities
            .lock()
            .expect("device capability lock poisoned")
            .is_some()
    }

    pub fn rtp_capabilities(&self) -> Result<RtpCapabilities, DeviceError> {
        self.capabilities
            .lock()
            .expect("device capability lock poisoned")
            .clone()
            .ok_or(DeviceError::NotLoaded)
    }

    /// The DTLS identity forwarded to the server during the transport
    /// connect handshake.
    pub fn dtls_parameters(&self) -> DtlsParameters {
        self.dtls.clone()
    }

    pub fn create_send_transport(
        &self,
        params: TransportParams,
    ) -> Result<WebRtcTransport, DeviceError> {
        self.create_transport(TransportDirection::Send, params)
    }

    pub fn create_recv_transport(
        &self,
        params: TransportParams,
    ) -> Result<WebRtcTransport, DeviceError> {
        self.create_transport(TransportDirection::Recv, params)
    }

    fn create_transport(
        &self,
        direction: TransportDirection,
        params: TransportParams,
    ) -> Result<WebRtcTransport, DeviceError> {
        if !self.is_loaded() {
            return Err(DeviceError::NotLoaded);
        }
        Ok(WebRtcTransport::new(direction, params))
    }

    /// Send parameters for a local track of the given kind, derived
    /// from the loaded router capabilities.
    pub fn send_rtp_parameters(&self, kind: MediaKind) -> Result<RtpParameters, DeviceError> {
        let capabilities = self.rtp_capabilities()?;
        let codecs: Vec<RtpCodecParameters> = capabilities
            .codecs
            .iter()
            .filter(|c| c.kind == kind)
            .enumerate()
            .map(|(i, c)| RtpCodecParameters {
                mime_type: c.mime_type.clone(),
                payload_type: 96 + i as u8,
                clock_rate: c.clock_rate,
            })
            .collect();
        if codecs.is_empty() {
            return Err(DeviceError::UnsupportedKind(kind));
        }
        Ok(RtpParameters {
            mid: Some("0".into()),
            codecs,
        })
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

/// The router only echoes the client fingerprint back during the
/// handshake, so a fresh random identity per device is sufficient.
fn mint_dtls_parameters() -> DtlsParameters {
    let value = Uuid::new_v4()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":");
    DtlsParameters {
        role: DtlsRole::Client,
        fingerprints: vec![DtlsFingerprint {
            algorithm: "sha-256".into(),
            value,
        }],
    }
}
