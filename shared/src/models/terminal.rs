//! Terminal Model

use serde::{Deserialize, Serialize};

use super::PairingCode;

/// Terminal lifecycle status
///
/// `pairing` until a device redeems a code, `offline` once paired,
/// `online` while the device heartbeats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum TerminalStatus {
    #[default]
    Pairing,
    Offline,
    Online,
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalStatus::Pairing => write!(f, "pairing"),
            TerminalStatus::Offline => write!(f, "offline"),
            TerminalStatus::Online => write!(f, "online"),
        }
    }
}

/// Terminal entity (一台实体 POS 收款终端)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Terminal {
    pub id: i64,
    pub store_id: String,
    pub name: String,
    /// `tkey_` + 64 hex; only ever returned by the pairing response
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub device_model: Option<String>,
    pub firmware_version: Option<String>,
    pub mac_address: Option<String>,
    pub status: TerminalStatus,
    pub last_seen_at: Option<i64>,
    pub last_ip_address: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Hardware details a device reports when it redeems a pairing code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, alias = "deviceModel")]
    pub model: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
}

/// Create terminal payload (admin)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalCreate {
    pub name: String,
}

/// Result of creating a terminal: the record plus its first pairing code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTerminal {
    pub terminal: Terminal,
    pub pairing_code: PairingCode,
}

/// Terminal row enriched with live connection state (admin listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalOverview {
    #[serde(flatten)]
    pub terminal: Terminal,
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Terminal {
        Terminal {
            id: 7,
            store_id: "store-a".into(),
            name: "Front counter".into(),
            api_key: "tkey_secret".into(),
            device_model: Some("PX-5".into()),
            firmware_version: None,
            mac_address: None,
            status: TerminalStatus::Offline,
            last_seen_at: None,
            last_ip_address: None,
            created_at: 1,
            updated_at: 2,
        }
    }

    #[test]
    fn test_api_key_never_serialized() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("apiKey").is_none());
        assert_eq!(json["storeId"], "store-a");
        assert_eq!(json["status"], "offline");
    }

    #[test]
    fn test_overview_flattens_terminal() {
        let json = serde_json::to_value(TerminalOverview {
            terminal: sample(),
            connected: true,
        })
        .unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["connected"], true);
    }

    #[test]
    fn test_device_info_accepts_device_model_alias() {
        let info: DeviceInfo =
            serde_json::from_str(r#"{"deviceModel":"PX-5","firmwareVersion":"1.2.0"}"#).unwrap();
        assert_eq!(info.model.as_deref(), Some("PX-5"));
        assert_eq!(info.firmware_version.as_deref(), Some("1.2.0"));
        assert!(info.mac_address.is_none());
    }
}
