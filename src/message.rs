use crate::NETCONF_URN;
use core::fmt;
use core::fmt::Display;
use quick_xml::se::Serializer;
use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

/// The message sent/received during session negotiation.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename(serialize = "hello"))]
pub struct Hello {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    capabilities: Capabilities,
    #[serde(rename = "session-id", skip_serializing_if = "Option::is_none")]
    session_id: Option<u64>,
}

impl Hello {
    pub fn new() -> Hello {
        Hello {
            xmlns: NETCONF_URN.to_string(),
            session_id: None,
            capabilities: Capabilities {
                capability: vec![
                    crate::NETCONF_BASE_10_CAP.to_string(),
                    crate::NETCONF_BASE_11_CAP.to_string(),
                ],
            },
        }
    }

    pub fn capabilities(&self) -> &[String] {
        &self.capabilities.capability
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .capability
            .iter()
            .any(|cap| cap == capability)
    }

    pub fn session_id(&self) -> Option<u64> {
        self.session_id
    }
}

impl Display for Hello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::Serialize;
        let mut buffer = String::with_capacity(206);
        let ser = Serializer::new(&mut buffer);
        self.serialize(ser).map_err(|_| fmt::Error)?;
        write!(f, "{}", buffer)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Capabilities {
    capability: Vec<String>,
}

/// An `<rpc>` envelope. The operation is caller-supplied inner XML and is
/// written through untouched.
#[derive(Debug)]
pub struct Rpc {
    message_id: String,
    operation: String,
}

impl Rpc {
    pub fn new(operation: impl Into<String>) -> Rpc {
        Rpc {
            message_id: Uuid::new_v4().to_string(),
            operation: operation.into(),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

impl Display for Rpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"<rpc message-id="{}" xmlns="{}">{}</rpc>"#,
            self.message_id, NETCONF_URN, self.operation
        )
    }
}

/// An `<rpc-reply>` as far as the session layer cares: its message-id and
/// whether it carries errors. Any `<data>` payload stays in the raw reply
/// string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RpcReply {
    #[serde(rename = "@message-id")]
    message_id: String,
    rpc_error: Option<Vec<RpcError>>,
    ok: Option<()>,
}

impl RpcReply {
    pub fn is_ok(&self) -> bool {
        self.ok.is_some() && self.rpc_error.is_none()
    }

    pub fn has_errors(&self) -> bool {
        self.rpc_error.is_some()
    }

    pub fn errors(&self) -> &[RpcError] {
        self.rpc_error.as_deref().unwrap_or_default()
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

impl Display for RpcReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in self.errors() {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcReply {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RpcError {
    error_type: String,
    error_tag: String,
    error_severity: String,
    #[serde(default)]
    error_path: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

impl RpcError {
    pub fn severity(&self) -> &str {
        &self.error_severity
    }

    pub fn tag(&self) -> &str {
        &self.error_tag
    }

    pub fn message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.error_path.as_deref()
    }
}

impl Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "netconf rpc [{}] {}: '{}'",
            self.error_severity,
            self.error_tag,
            self.error_message.as_deref().unwrap_or(&self.error_type),
        )
    }
}
