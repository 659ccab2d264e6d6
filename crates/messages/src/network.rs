//! Message marker traits.

/// A message that can travel between nodes.
///
/// The type id names the logical channel a message belongs to; transports
/// use it for routing and metrics labels.
pub trait NetworkMessage {
    /// Stable identifier for this message type.
    fn message_type_id() -> &'static str;
}

/// Type-safe request/response pairing.
pub trait Request: NetworkMessage {
    /// The response type a well-behaved responder returns.
    type Response: NetworkMessage;
}
