pub mod protocols;
pub mod utilities;

use thiserror::Error;

// Capacity of the batched message buffer, counted in field elements.
// Each element occupies 5 bytes on the wire.
pub const MESSAGE_BUFFER_SIZE: usize = 1 << 18;

// Maximum number of field elements a single OT correlation may carry.
pub const SCRATCH_CAP: usize = 10;

/// Everything that can go wrong during a session.
///
/// None of these are recoverable: any detected inconsistency surfaces
/// as a rejected proof or an aborted session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A batch width or record count exceeded a static capacity.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// The underlying link failed.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] std::io::Error),

    /// The peer sent something of unexpected size or order.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A zero-check digest or commitment opening did not match.
    #[error("integrity mismatch: {0}")]
    IntegrityMismatch(String),
}
