use crate::error::ConfigError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;

/// One ICE server entry as supplied by the embedder.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IceServerConfig {
    pub id: String,
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

static DEFAULT_ICE_SERVERS: Lazy<Vec<IceServerConfig>> = Lazy::new(|| {
    vec![
        IceServerConfig {
            id: "default-stun-0".into(),
            r#type: "stun".into(),
            url: "stun:stun.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
        IceServerConfig {
            id: "default-stun-1".into(),
            r#type: "stun".into(),
            url: "stun:stun1.l.google.com:19302".into(),
            username: None,
            credential: None,
        },
    ]
});

pub fn default_ice_servers() -> Vec<IceServerConfig> {
    DEFAULT_ICE_SERVERS.clone()
}

/// Prefixes the URL with its protocol scheme when the embedder left it off.
pub fn normalize_ice_url(config: &IceServerConfig) -> String {
    if config.url.starts_with("turn:") || config.url.starts_with("stun:") {
        config.url.clone()
    } else {
        let scheme = if config.r#type == "turn" {
            "turn:"
        } else {
            "stun:"
        };
        format!("{}{}", scheme, config.url)
    }
}

pub fn validate_ice_servers(servers: &[IceServerConfig]) -> Result<(), ConfigError> {
    for server in servers {
        if server.url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if server.r#type == "turn" && (server.username.is_none() || server.credential.is_none()) {
            return Err(ConfigError::MissingTurnCredentials(server.id.clone()));
        }
    }
    Ok(())
}

pub fn to_rtc_ice_servers(servers: &[IceServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![normalize_ice_url(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

/// Peer connection configuration for one pairing.
pub fn rtc_config(servers: &[IceServerConfig]) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: to_rtc_ice_servers(servers),
        ice_candidate_pool_size: 10,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

/// Per-client session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whether this client opens the SDP exchange once paired. The relay
    /// designates one side of each pairing as the initiator.
    pub initiator: bool,
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initiator: true,
            ice_servers: default_ice_servers(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ice_servers(&self.ice_servers)
    }

    /// Replaces the ICE server list; an empty list falls back to the
    /// built-in defaults. Rejected wholesale when any entry is invalid.
    pub fn set_ice_servers(&mut self, servers: Vec<IceServerConfig>) -> Result<(), ConfigError> {
        validate_ice_servers(&servers)?;
        self.ice_servers = if servers.is_empty() {
            default_ice_servers()
        } else {
            servers
        };
        Ok(())
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(r#type: &str, url: &str) -> IceServerConfig {
        IceServerConfig {
            id: "s1".into(),
            r#type: r#type.into(),
            url: url.into(),
            username: None,
            credential: None,
        }
    }

    #[test]
    fn scheme_added_when_missing() {
        assert_eq!(
            normalize_ice_url(&server("stun", "stun.example.org:3478")),
            "stun:stun.example.org:3478"
        );
        assert_eq!(
            normalize_ice_url(&server("turn", "turn.example.org:3478")),
            "turn:turn.example.org:3478"
        );
    }

    #[test]
    fn scheme_kept_when_present() {
        assert_eq!(
            normalize_ice_url(&server("stun", "stun:stun.example.org")),
            "stun:stun.example.org"
        );
        assert_eq!(
            normalize_ice_url(&server("turn", "turn:relay.example.org")),
            "turn:relay.example.org"
        );
    }

    #[test]
    fn turn_without_credentials_rejected() {
        let turn = server("turn", "turn:relay.example.org");
        assert!(matches!(
            validate_ice_servers(&[turn]),
            Err(ConfigError::MissingTurnCredentials(_))
        ));
    }

    #[test]
    fn empty_url_rejected() {
        let bad = server("stun", "");
        assert!(matches!(
            validate_ice_servers(&[bad]),
            Err(ConfigError::EmptyUrl)
        ));
    }

    #[test]
    fn default_config_is_valid() {
        SessionConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_server_list_falls_back_to_defaults() {
        let mut config = SessionConfig::default();
        config.set_ice_servers(Vec::new()).unwrap();
        assert!(!config.ice_servers().is_empty());

        let custom = server("stun", "stun:stun.example.org");
        config.set_ice_servers(vec![custom]).unwrap();
        assert_eq!(config.ice_servers().len(), 1);

        let bad = server("turn", "turn:relay.example.org");
        assert!(config.set_ice_servers(vec![bad]).is_err());
        // Rejected updates leave the previous list in place.
        assert_eq!(config.ice_servers().len(), 1);
    }
}
