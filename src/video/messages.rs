//! Client message protocol
//!
//! JSON objects tagged by `name`:
//!
//! ```json
//! {"name": "video/get"}
//! {"name": "video/set", "value": "/clips/load/g1/c1"}
//! {"name": "namespace/get"}
//! {"name": "namespace/set", "value": "/client"}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum ClientMessage {
    /// Ask for the current selection
    #[serde(rename = "video/get")]
    VideoGet,

    /// Announce (or request) a new selection
    #[serde(rename = "video/set")]
    VideoSet {
        #[serde(default)]
        value: Option<String>,
    },

    #[serde(rename = "namespace/get")]
    NamespaceGet,

    #[serde(rename = "namespace/set")]
    NamespaceSet { value: String },
}

impl ClientMessage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::VideoGet => "video/get",
            Self::VideoSet { .. } => "video/set",
            Self::NamespaceGet => "namespace/get",
            Self::NamespaceSet { .. } => "namespace/set",
        }
    }

    pub fn video_set(value: Option<String>) -> Self {
        Self::VideoSet { value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let msg: ClientMessage = serde_json::from_value(json!({"name": "video/get"})).unwrap();
        assert_eq!(msg, ClientMessage::VideoGet);

        let msg: ClientMessage =
            serde_json::from_value(json!({"name": "video/set", "value": "/clips/load/g1/c1"})).unwrap();
        assert_eq!(msg, ClientMessage::video_set(Some("/clips/load/g1/c1".into())));

        let out = serde_json::to_value(ClientMessage::video_set(None)).unwrap();
        assert_eq!(out, json!({"name": "video/set", "value": null}));

        let out = serde_json::to_value(ClientMessage::NamespaceSet { value: "/client".into() }).unwrap();
        assert_eq!(out, json!({"name": "namespace/set", "value": "/client"}));
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(serde_json::from_value::<ClientMessage>(json!({"name": "video/play"})).is_err());
    }
}
