use crate::boxes::{FourCC, Mp4Box, Payload};
use crate::error::{Error, Result};
use crate::known_boxes::KnownBox;
use crate::parser::{ReadMode, read_tree};
use crate::spatial_audio::{SA3D, SPATIAL_AUDIO_UUID, SpatialAudioMetadata};
use crate::spherical::{SPHERICAL_UUID, SphericalMetadata};
use crate::tree::BoxTree;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// What a file says about itself. `None` means the box is absent or could not
/// be decoded; the matching `*_error` field tells the two apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub spherical: Option<SphericalMetadata>,
    pub spatial_audio: Option<SpatialAudioMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spherical_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial_audio_error: Option<String>,
}

impl Summary {
    /// A metadata box is present but unreadable.
    pub fn has_errors(&self) -> bool {
        self.spherical_error.is_some() || self.spatial_audio_error.is_some()
    }
}

/// Open `path` and report its spherical and spatial audio metadata.
pub fn read_metadata(path: impl AsRef<Path>) -> Result<Summary> {
    let path = path.as_ref();
    let mut f = File::open(path).map_err(|e| Error::FileOpen { path: path.to_path_buf(), source: e })?;
    let tree = read_tree(&mut f, ReadMode::Scan)?;
    Ok(summarize(&tree))
}

/// Each box is decoded on its own, so a damaged spherical box does not hide
/// a good audio descriptor and the other way round.
pub fn summarize(tree: &BoxTree) -> Summary {
    let Some(moov) = tree.find("moov") else {
        tracing::debug!("no moov box; nothing to report");
        return Summary::default();
    };

    let (spherical, spherical_error) = decode_box(find_spherical(moov), crate::spherical::decode);
    let (spatial_audio, spatial_audio_error) = decode_box(find_spatial_audio(moov), SpatialAudioMetadata::decode);
    Summary { spherical, spatial_audio, spherical_error, spatial_audio_error }
}

fn decode_box<T>(b: Option<&Mp4Box>, decode: impl FnOnce(&[u8]) -> Result<T>) -> (Option<T>, Option<String>) {
    let Some(b) = b else {
        return (None, None);
    };
    match inline_payload(b).and_then(decode) {
        Ok(v) => (Some(v), None),
        Err(e) => {
            tracing::warn!(box_key = %b.key(), error = %e, "metadata box could not be decoded");
            (None, Some(e.to_string()))
        }
    }
}

/// `moov/udta` first, then each track, which is where other tools put it.
fn find_spherical(moov: &Mp4Box) -> Option<&Mp4Box> {
    moov.find("udta")
        .and_then(|udta| udta.find_uuid(&SPHERICAL_UUID))
        .or_else(|| tracks(moov).find_map(|trak| trak.find_uuid(&SPHERICAL_UUID)))
}

fn find_spatial_audio(moov: &Mp4Box) -> Option<&Mp4Box> {
    let entry = first_audio_entry(moov)?;
    entry
        .find_uuid(&SPATIAL_AUDIO_UUID)
        .or_else(|| entry.children().iter().find(|c| c.hdr.typ == SA3D))
}

fn tracks(moov: &Mp4Box) -> impl Iterator<Item = &Mp4Box> {
    moov.children().iter().filter(|b| b.hdr.typ == FourCC(*b"trak"))
}

fn first_audio_entry(moov: &Mp4Box) -> Option<&Mp4Box> {
    tracks(moov).filter_map(|trak| trak.find("mdia/minf/stbl/stsd")).find_map(|stsd| {
        stsd.children()
            .iter()
            .find(|e| e.is_container() && KnownBox::from(e.hdr.typ).is_audio_sample_entry())
    })
}

fn inline_payload(b: &Mp4Box) -> Result<&[u8]> {
    b.payload()
        .and_then(Payload::as_bytes)
        .ok_or_else(|| Error::Parse(format!("payload of '{}' was not loaded", b.key())))
}
