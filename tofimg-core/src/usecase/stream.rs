use serde::{Deserialize, Serialize};

/// Identifier of a stream. Zero is not a valid id.
pub type StreamId = u16;

/// The id of the first stream of a use case that did not ask for a specific one.
pub const DEFAULT_STREAM_ID: StreamId = 0xDEFA;

/// Raw frame sets that are captured together and processed into one depth frame.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGroup {
    /// Indices into the raw frame sets of the use case.
    pub raw_frame_set_indices: Vec<usize>,
}

/// A sequence of frame groups delivered under one [`StreamId`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    /// Id of the stream.
    pub id: StreamId,
    /// Frame groups in capture order.
    pub frame_groups: Vec<FrameGroup>,
}

impl Stream {
    /// Creates a stream without frame groups.
    #[must_use]
    pub const fn new(id: StreamId) -> Self {
        Self {
            id,
            frame_groups: Vec::new(),
        }
    }
}
