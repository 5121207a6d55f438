pub mod boxes;
pub mod error;
pub mod inject;
pub mod known_boxes;
pub mod parser;
pub mod reader;
pub mod spatial_audio;
pub mod spherical;
pub mod tree;
pub mod util;

pub use boxes::{BoxHeader, BoxKey, FourCC, Mp4Box, NodeKind, Payload, SizeForm};
pub use error::{Error, Result};
pub use inject::{Metadata, inject_metadata, inject_tree, write_output};
pub use parser::{ReadMode, parse_children, read_box_header, read_tree};
pub use reader::{Summary, read_metadata, summarize};
pub use spatial_audio::{SPATIAL_AUDIO_UUID, SpatialAudioMetadata};
pub use spherical::{Crop, SPHERICAL_UUID, SphericalMetadata, StereoMode};
pub use tree::BoxTree;
