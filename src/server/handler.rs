//! Greeting exchange handler
//!
//! Runs the fixed two-step exchange on one established connection: send the
//! greeting, wait for the client's name, send back a personalized reply.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, warn};

/// Errors that can occur during the greeting exchange
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Connection closed before the exchange completed")]
    ConnectionClosed,

    #[error("WebSocket transport error: {0}")]
    Transport(tungstenite::Error),
}

/// Result type for handler operations
pub type HandlerResult<T> = Result<T, HandlerError>;

impl From<tungstenite::Error> for HandlerError {
    fn from(err: tungstenite::Error) -> Self {
        if is_closed(&err) {
            HandlerError::ConnectionClosed
        } else {
            HandlerError::Transport(err)
        }
    }
}

/// Format the reply for a received name
pub fn greeting_reply(name: &str) -> String {
    format!("Hello {name}!")
}

/// Run the greeting exchange on one connection
///
/// Sends `greeting`, waits for the first inbound text frame and treats its
/// payload as the client's name, then sends back `"Hello {name}!"`. The
/// exchange fails with [`HandlerError::ConnectionClosed`] if the peer goes
/// away at any point before the reply is delivered; the caller is expected
/// to discard the connection in that case.
pub async fn greet<S, R>(sender: &mut S, receiver: &mut R, greeting: &str) -> HandlerResult<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    sender.send(Message::Text(greeting.to_string())).await?;

    let name = receive_name(sender, receiver).await?;
    debug!("Received name: {}", name);

    let reply = greeting_reply(&name);
    sender.send(Message::Text(reply.clone())).await?;
    debug!("Sent reply: {}", reply);

    Ok(())
}

/// Wait for the first text frame and return its payload
///
/// Frames other than text are handled in place while waiting: pings are
/// answered with pongs, binary frames are ignored.
async fn receive_name<S, R>(sender: &mut S, receiver: &mut R) -> HandlerResult<String>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(name))) => {
                return Ok(name);
            }
            Some(Ok(Message::Binary(data))) => {
                warn!(
                    "Ignoring binary frame ({} bytes) while waiting for a name",
                    data.len()
                );
            }
            Some(Ok(Message::Ping(data))) => {
                sender.send(Message::Pong(data)).await?;
            }
            Some(Ok(Message::Pong(_))) => {
                // Ignore pong messages
            }
            Some(Ok(Message::Frame(_))) => {
                // Raw frame, ignore
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(HandlerError::ConnectionClosed);
            }
            Some(Err(e)) => {
                return Err(e.into());
            }
        }
    }
}

/// Whether a transport error means the peer is simply gone
fn is_closed(err: &tungstenite::Error) -> bool {
    use tungstenite::error::ProtocolError;

    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_reply() {
        assert_eq!(greeting_reply("Ada"), "Hello Ada!");
    }

    #[test]
    fn test_greeting_reply_empty_name() {
        assert_eq!(greeting_reply(""), "Hello !");
    }

    #[test]
    fn test_greeting_reply_unicode_name() {
        assert_eq!(greeting_reply("Grüße"), "Hello Grüße!");
    }

    #[test]
    fn test_closed_errors_map_to_connection_closed() {
        let err: HandlerError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, HandlerError::ConnectionClosed));

        let err: HandlerError = tungstenite::Error::AlreadyClosed.into();
        assert!(matches!(err, HandlerError::ConnectionClosed));
    }

    #[test]
    fn test_reset_without_handshake_maps_to_connection_closed() {
        use tungstenite::error::ProtocolError;

        let err: HandlerError =
            tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake).into();
        assert!(matches!(err, HandlerError::ConnectionClosed));
    }

    #[test]
    fn test_other_errors_map_to_transport() {
        let err: HandlerError = tungstenite::Error::Utf8.into();
        assert!(matches!(err, HandlerError::Transport(_)));
    }
}
