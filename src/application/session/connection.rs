//! One live WebSocket connection to a charge point

use tokio::sync::mpsc;

use super::SendError;

#[derive(Debug)]
pub struct Connection {
    /// Generation number; distinguishes a reconnect from the session it replaced.
    pub connection_id: u64,
    pub charge_point_id: String,
    /// Outbound frames, drained by the connection's writer task.
    pub sender: mpsc::UnboundedSender<String>,
}

impl Connection {
    pub fn new(
        connection_id: u64,
        charge_point_id: impl Into<String>,
        sender: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            connection_id,
            charge_point_id: charge_point_id.into(),
            sender,
        }
    }

    pub fn send(&self, frame: String) -> Result<(), SendError> {
        self.sender
            .send(frame)
            .map_err(|_| SendError::ChannelClosed(self.charge_point_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection() -> (Connection, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(1, "CP001", tx), rx)
    }

    #[test]
    fn send_delivers_frame() {
        let (conn, mut rx) = make_connection();
        conn.send("[2,\"1\",\"Reset\",{}]".into()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "[2,\"1\",\"Reset\",{}]");
    }

    #[test]
    fn send_after_writer_gone_is_channel_closed() {
        let (conn, rx) = make_connection();
        drop(rx);
        assert!(matches!(
            conn.send("msg".into()),
            Err(SendError::ChannelClosed(id)) if id == "CP001"
        ));
    }
}
