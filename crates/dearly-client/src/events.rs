use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use dearly_types::events::{GatewayCommand, GatewayEvent};

use crate::error::ClientError;

/// How long the server gets to answer Identify with Ready.
const READY_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An identified connection to the push gateway.
pub struct EventStream {
    socket: Socket,
    user_id: String,
}

impl EventStream {
    /// Connect, identify with `token` and wait for the Ready event.
    pub async fn connect(gateway_url: &str, token: &str) -> Result<Self, ClientError> {
        let (mut socket, _) = connect_async(gateway_url)
            .await
            .map_err(|e| ClientError::Gateway(format!("connect to {gateway_url} failed: {e}")))?;

        let identify = serde_json::to_string(&GatewayCommand::Identify {
            token: token.to_string(),
        })?;
        socket
            .send(Message::Text(identify.into()))
            .await
            .map_err(|e| ClientError::Gateway(format!("identify failed: {e}")))?;

        let user_id = tokio::time::timeout(READY_TIMEOUT, async {
            match next_gateway_event(&mut socket).await? {
                Some(GatewayEvent::Ready { user_id }) => Ok(user_id),
                Some(other) => Err(ClientError::Gateway(format!(
                    "expected Ready, got {other:?}"
                ))),
                None => Err(ClientError::Gateway("closed before Ready".into())),
            }
        })
        .await
        .map_err(|_| ClientError::Gateway("timed out waiting for Ready".into()))??;

        info!("Gateway ready for {}", user_id);
        Ok(Self { socket, user_id })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The next event, or `None` once the server closes the connection.
    pub async fn next_event(&mut self) -> Result<Option<GatewayEvent>, ClientError> {
        next_gateway_event(&mut self.socket).await
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket
            .close(None)
            .await
            .map_err(|e| ClientError::Gateway(format!("close failed: {e}")))
    }
}

/// Read frames until a gateway event arrives. Pings are answered by the
/// socket itself; unknown text frames are skipped.
async fn next_gateway_event(socket: &mut Socket) -> Result<Option<GatewayEvent>, ClientError> {
    while let Some(frame) = socket.next().await {
        let frame = frame.map_err(|e| ClientError::Gateway(format!("read failed: {e}")))?;
        match frame {
            Message::Text(text) => match serde_json::from_str::<GatewayEvent>(text.as_str()) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => warn!("Ignoring unknown gateway message: {}", e),
            },
            Message::Close(_) => {
                debug!("Gateway closed the connection");
                return Ok(None);
            }
            _ => {}
        }
    }
    Ok(None)
}
