use crate::error::{Error, Result};
use crate::framer::{Decoder, Encoder};
use crate::message::{Hello, Rpc, RpcReply};
use crate::NETCONF_BASE_11_CAP;
use core::time::Duration;
use log::{debug, trace};
use quick_xml::de::from_str;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

const HELLO_DEADLINE: Duration = Duration::from_secs(5);

/// A NETCONF session over an established transport (typically the two
/// halves of an SSH subsystem channel). Drives the hello exchange on
/// construction and, when both peers advertise `base:1.1`, switches the
/// decoder and encoder to chunked framing before the first rpc.
pub struct Connection<R, W> {
    decoder: Decoder<R>,
    encoder: Encoder<W>,
    session_id: Option<u64>,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub async fn new(reader: R, writer: W) -> Result<Connection<R, W>> {
        let mut conn = Connection {
            decoder: Decoder::new(reader),
            encoder: Encoder::new(writer),
            session_id: None,
        };
        conn.session_id = conn.hello().await?;
        Ok(conn)
    }

    pub fn session_id(&self) -> u64 {
        self.session_id.unwrap_or(0)
    }

    async fn hello(&mut self) -> Result<Option<u64>> {
        let hello = Hello::new();
        self.encoder.encode(hello.to_string()).await?;
        let response = timeout(HELLO_DEADLINE, self.decoder.read_message())
            .await??
            .ok_or(Error::UnexpectedEof)?;
        debug!("Hello:\n{}", response.trim());

        let peer: Hello = from_str(response.trim())?;
        if peer.has_capability(NETCONF_BASE_11_CAP) {
            debug!("peer supports base:1.1, enabling chunked framing");
            self.decoder.set_chunked_framing();
            self.encoder.set_chunked_framing();
        }
        Ok(peer.session_id())
    }

    /// Sends one rpc operation and waits for the reply. The operation is
    /// wrapped in an `<rpc>` envelope with a fresh message-id; a reply
    /// carrying `<rpc-error>` elements is surfaced as an error.
    pub async fn rpc(&mut self, operation: &str) -> Result<String> {
        let rpc = Rpc::new(operation);
        trace!("RPC:\n{}", rpc);
        self.encoder.encode(rpc.to_string()).await?;

        let response = self
            .decoder
            .read_message()
            .await?
            .ok_or(Error::UnexpectedEof)?;
        let response = response.trim();
        trace!("Reply:\n{}", response);

        let reply: RpcReply = from_str(response)?;
        if reply.has_errors() {
            return Err(Error::Netconf(reply));
        }
        Ok(response.to_string())
    }

    /// Next inbound message verbatim, e.g. for notification streams.
    /// `Ok(None)` once the peer closes the session cleanly.
    pub async fn recv(&mut self) -> Result<Option<String>> {
        self.decoder.read_message().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::FramingMode;
    use crate::NETCONF_URN;
    use pretty_assertions::assert_eq;
    use tokio::io::split;

    const BASE_11_HELLO: &str = r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability><capability>urn:ietf:params:netconf:base:1.1</capability></capabilities><session-id>17</session-id></hello>"#;
    const BASE_10_HELLO: &str = r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability></capabilities><session-id>4</session-id></hello>"#;

    fn message_id_of(rpc: &str) -> String {
        let start = rpc.find("message-id=\"").unwrap() + "message-id=\"".len();
        let end = rpc[start..].find('"').unwrap();
        rpc[start..start + end].to_string()
    }

    #[tokio::test]
    async fn hello_upgrades_both_directions_to_chunked() {
        let (client, server) = tokio::io::duplex(8192);
        let (server_read, server_write) = split(server);

        let server_task = tokio::spawn(async move {
            let mut decoder = Decoder::new(server_read);
            let encoder = Encoder::new(server_write);

            encoder.encode(BASE_11_HELLO).await.unwrap();
            let client_hello = decoder.read_message().await.unwrap().unwrap();
            assert!(client_hello.contains(NETCONF_BASE_11_CAP));
            decoder.set_chunked_framing();
            encoder.set_chunked_framing();

            let rpc = decoder.read_message().await.unwrap().unwrap();
            assert_eq!(decoder.framing_mode(), FramingMode::Chunked);
            assert!(rpc.contains("<get-config>"));
            let reply = format!(
                r#"<rpc-reply message-id="{}" xmlns="{}"><ok/></rpc-reply>"#,
                message_id_of(&rpc),
                NETCONF_URN
            );
            encoder.encode(reply).await.unwrap();

            assert_eq!(decoder.read_message().await.unwrap(), None);
        });

        let (client_read, client_write) = split(client);
        let mut conn = Connection::new(client_read, client_write).await.unwrap();
        assert_eq!(conn.session_id(), 17);

        let reply = conn
            .rpc("<get-config><source><running/></source></get-config>")
            .await
            .unwrap();
        assert!(reply.contains("<ok/>"));
        drop(conn);

        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn session_stays_on_eom_without_base_11() {
        let (client, server) = tokio::io::duplex(8192);
        let (server_read, server_write) = split(server);

        let server_task = tokio::spawn(async move {
            let mut decoder = Decoder::new(server_read);
            let encoder = Encoder::new(server_write);

            encoder.encode(BASE_10_HELLO).await.unwrap();
            let client_hello = decoder.read_message().await.unwrap().unwrap();
            assert!(client_hello.contains("<hello"));

            let rpc = decoder.read_message().await.unwrap().unwrap();
            assert_eq!(decoder.framing_mode(), FramingMode::EndOfMessage);
            let reply = format!(
                r#"<rpc-reply message-id="{}"><ok/></rpc-reply>"#,
                message_id_of(&rpc)
            );
            encoder.encode(reply).await.unwrap();

            assert_eq!(decoder.read_message().await.unwrap(), None);
        });

        let (client_read, client_write) = split(client);
        let mut conn = Connection::new(client_read, client_write).await.unwrap();
        assert_eq!(conn.session_id(), 4);

        let reply = conn.rpc("<get/>").await.unwrap();
        assert!(reply.contains("<ok/>"));
        drop(conn);

        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn rpc_error_reply_is_surfaced() {
        let (client, server) = tokio::io::duplex(8192);
        let (server_read, server_write) = split(server);

        let server_task = tokio::spawn(async move {
            let mut decoder = Decoder::new(server_read);
            let encoder = Encoder::new(server_write);

            encoder.encode(BASE_10_HELLO).await.unwrap();
            decoder.read_message().await.unwrap().unwrap();

            let rpc = decoder.read_message().await.unwrap().unwrap();
            let reply = format!(
                r#"<rpc-reply message-id="{}"><rpc-error><error-type>protocol</error-type><error-tag>operation-failed</error-tag><error-severity>error</error-severity><error-message>boom</error-message></rpc-error></rpc-reply>"#,
                message_id_of(&rpc)
            );
            encoder.encode(reply).await.unwrap();
        });

        let (client_read, client_write) = split(client);
        let mut conn = Connection::new(client_read, client_write).await.unwrap();

        match conn.rpc("<bad/>").await {
            Err(Error::Netconf(reply)) => {
                assert!(reply.has_errors());
                assert_eq!(reply.errors()[0].message(), Some("boom"));
            }
            other => panic!("expected rpc-error, got {:?}", other),
        }

        server_task.await.unwrap();
    }
}
