use crate::boxes::FourCC;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot open {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("box '{typ}' at offset {offset} needs {declared} bytes but only {available} remain")]
    TruncatedBox { typ: FourCC, offset: u64, declared: u64, available: u64 },
    #[error("box '{typ}' at offset {offset} declares size {declared}, smaller than its {header_size}-byte header")]
    MalformedSize { typ: FourCC, offset: u64, declared: u64, header_size: u64 },
    #[error("parse error: {0}")]
    Parse(String),

    #[error("no audio track with an audio sample description found")]
    NoAudioTrack,
    #[error("found {found} audio channel(s), expected {expected} for ambisonics of order {order}")]
    ChannelCountMismatch { found: u32, expected: u32, order: u32 },
    #[error("invalid crop: {0}")]
    InvalidCrop(String),

    #[error("file has no moov box")]
    NoMovieBox,
    #[error("spherical metadata document is empty")]
    EmptyMetadata,
    #[error("input and output are the same file: {}", .0.display())]
    SameFile(PathBuf),
    #[error("chunk offset {0} does not fit a 32-bit stco entry after relocation")]
    ChunkOffsetOverflow(u64),
    #[error("box '{0}' is not a container")]
    NotAContainer(FourCC),
}

pub type Result<T> = std::result::Result<T, Error>;
