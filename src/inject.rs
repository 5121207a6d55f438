use crate::boxes::{FourCC, Mp4Box, NodeKind, Payload};
use crate::error::{Error, Result};
use crate::known_boxes::KnownBox;
use crate::parser::{ReadMode, read_tree};
use crate::spatial_audio::{SA3D, SPATIAL_AUDIO_UUID, SpatialAudioMetadata};
use crate::spherical::SPHERICAL_UUID;
use crate::tree::BoxTree;
use byteorder::{BigEndian, ByteOrder};
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::Path;

const TRAK: FourCC = FourCC(*b"trak");
const UDTA: FourCC = FourCC(*b"udta");

/// One injection request: the spherical XML document and, optionally, the
/// ambisonic layout of the first audio track.
#[derive(Debug, Clone)]
pub struct Metadata {
    video_xml: String,
    audio: Option<SpatialAudioMetadata>,
}

impl Metadata {
    pub fn new(video_xml: impl Into<String>) -> Result<Self> {
        let video_xml = video_xml.into();
        if video_xml.trim().is_empty() {
            return Err(Error::EmptyMetadata);
        }
        Ok(Metadata { video_xml, audio: None })
    }

    pub fn with_audio(mut self, audio: SpatialAudioMetadata) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn video_xml(&self) -> &str {
        &self.video_xml
    }

    pub fn audio(&self) -> Option<&SpatialAudioMetadata> {
        self.audio.as_ref()
    }
}

/// Write a copy of `source` carrying `metadata` to `dest`.
///
/// `dest` only appears once the whole file has been written; `source` is
/// never modified.
pub fn inject_metadata(source: impl AsRef<Path>, dest: impl AsRef<Path>, metadata: &Metadata) -> Result<()> {
    let source = source.as_ref();
    let dest = dest.as_ref();
    if same_file(source, dest) {
        return Err(Error::SameFile(dest.to_path_buf()));
    }

    let mut src = File::open(source).map_err(|e| Error::FileOpen { path: source.to_path_buf(), source: e })?;
    let mut tree = read_tree(&mut src, ReadMode::Scan)?;
    inject_tree(&mut tree, metadata)?;

    let write_err = |e: io::Error| Error::FileWrite { path: dest.to_path_buf(), source: e };
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    let written = write_output(&tree, &mut src, tmp.as_file_mut(), dest)?;
    tmp.persist(dest).map_err(|e| write_err(e.error))?;
    tracing::info!(output = %dest.display(), bytes = written, "wrote file with spatial media metadata");
    Ok(())
}

/// Serialize `tree` into `dst`, buffered and flushed. I/O failures on the
/// destination side come back as [`Error::FileWrite`] for `path`; failures
/// reading deferred payloads from `src` keep their own error.
pub fn write_output<R: Read + Seek, W: Write>(tree: &BoxTree, src: &mut R, dst: W, path: &Path) -> Result<u64> {
    let mut w = DestWriter { inner: BufWriter::new(dst), failed: false };
    let result = tree.write_to(src, &mut w).and_then(|n| {
        w.flush()?;
        Ok(n)
    });
    match result {
        Err(Error::Io(e)) if w.failed => Err(Error::FileWrite { path: path.to_path_buf(), source: e }),
        other => other,
    }
}

/// Remembers whether an error came out of the wrapped writer.
struct DestWriter<W> {
    inner: W,
    failed: bool,
}

impl<W> DestWriter<W> {
    fn note<T>(&mut self, r: io::Result<T>) -> io::Result<T> {
        if let Err(e) = &r
            && e.kind() != io::ErrorKind::Interrupted
        {
            self.failed = true;
        }
        r
    }
}

impl<W: Write> Write for DestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let r = self.inner.write(buf);
        self.note(r)
    }

    fn flush(&mut self) -> io::Result<()> {
        let r = self.inner.flush();
        self.note(r)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Apply `metadata` to a parsed tree: spherical XML under `moov/udta`, the
/// audio descriptor under the first audio sample entry, then sizes and chunk
/// offsets are brought up to date.
pub fn inject_tree(tree: &mut BoxTree, metadata: &Metadata) -> Result<()> {
    let before = tree.layout();
    let moov = tree.find_mut("moov").ok_or(Error::NoMovieBox)?;

    let udta = moov.ensure_container(UDTA)?;
    udta.replace_or_append(Mp4Box::extended(SPHERICAL_UUID, metadata.video_xml.as_bytes().to_vec()))?;

    if let Some(audio) = &metadata.audio {
        inject_spatial_audio(moov, audio)?;
    }

    tree.recompute_sizes();
    relocate_chunk_offsets(tree, &before)?;
    Ok(())
}

fn inject_spatial_audio(moov: &mut Mp4Box, audio: &SpatialAudioMetadata) -> Result<()> {
    let payload = audio.encode()?;
    let expected = audio.expected_channels()?;
    let entry = first_audio_entry_mut(moov).ok_or(Error::NoAudioTrack)?;

    if let Some(found) = sound_channel_count(entry.preamble())
        && found != expected
    {
        return Err(Error::ChannelCountMismatch { found, expected, order: audio.order });
    }

    let typ = entry.hdr.typ;
    if let Some(kids) = entry.children_mut() {
        let n = kids.len();
        kids.retain(|c| c.hdr.typ != SA3D);
        if kids.len() != n {
            tracing::debug!(entry = %typ, "dropped existing SA3D box in favour of the uuid form");
        }
    }
    entry.replace_or_append(Mp4Box::extended(SPATIAL_AUDIO_UUID, payload))
}

/// First sound sample entry under `trak/mdia/minf/stbl/stsd`, in track order.
pub(crate) fn first_audio_entry_mut(moov: &mut Mp4Box) -> Option<&mut Mp4Box> {
    moov.children_mut()?
        .iter_mut()
        .filter(|b| b.hdr.typ == TRAK)
        .filter_map(|trak| trak.find_mut("mdia/minf/stbl/stsd"))
        .find_map(|stsd| {
            stsd.children_mut()?
                .iter_mut()
                .find(|e| e.is_container() && KnownBox::from(e.hdr.typ).is_audio_sample_entry())
        })
}

/// Channel count from the fixed fields of a sound sample entry.
pub fn sound_channel_count(preamble: &[u8]) -> Option<u32> {
    if preamble.len() < 28 {
        return None;
    }
    match BigEndian::read_u16(&preamble[8..10]) {
        // QuickTime v2 keeps a 32-bit count after the 64-bit sample rate.
        2 if preamble.len() >= 44 => Some(BigEndian::read_u32(&preamble[40..44])),
        _ => Some(BigEndian::read_u16(&preamble[16..18]) as u32),
    }
}

struct Shift {
    start: u64,
    end: u64,
    delta: i128,
}

/// Shift `stco`/`co64` entries that point into top-level boxes whose start
/// moved between `before` and the tree's current layout.
fn relocate_chunk_offsets(tree: &mut BoxTree, before: &[(u64, u64)]) -> Result<()> {
    let after = tree.layout();
    let shifts: Vec<Shift> = before
        .iter()
        .zip(&after)
        .filter(|(b, a)| b.0 != a.0)
        .map(|(b, a)| Shift { start: b.0, end: b.0 + b.1, delta: a.0 as i128 - b.0 as i128 })
        .collect();
    if shifts.is_empty() {
        return Ok(());
    }

    let mut moved = 0;
    for b in &mut tree.boxes {
        moved += relocate_in(b, &shifts)?;
    }
    tracing::debug!(entries = moved, "relocated chunk offsets");
    Ok(())
}

fn relocate_in(b: &mut Mp4Box, shifts: &[Shift]) -> Result<usize> {
    let kb = KnownBox::from(b.hdr.typ);
    match &mut b.kind {
        NodeKind::Container { children, .. } => {
            let mut moved = 0;
            for c in children {
                moved += relocate_in(c, shifts)?;
            }
            Ok(moved)
        }
        NodeKind::Leaf(Payload::Inline(data)) if kb == KnownBox::Stco => relocate_table(data, 4, shifts),
        NodeKind::Leaf(Payload::Inline(data)) if kb == KnownBox::Co64 => relocate_table(data, 8, shifts),
        _ => Ok(0),
    }
}

/// Rewrite a chunk offset table: version/flags, entry count, then `width`-byte
/// offsets.
fn relocate_table(data: &mut [u8], width: usize, shifts: &[Shift]) -> Result<usize> {
    if data.len() < 8 {
        return Err(Error::Parse("chunk offset box is shorter than its header fields".into()));
    }
    let count = BigEndian::read_u32(&data[4..8]) as usize;
    let table = &mut data[8..];
    if count.saturating_mul(width) > table.len() {
        return Err(Error::Parse(format!(
            "chunk offset box declares {count} entries but holds {} bytes",
            table.len()
        )));
    }

    let mut moved = 0;
    for entry in table.chunks_exact_mut(width).take(count) {
        let old = if width == 4 { BigEndian::read_u32(entry) as u64 } else { BigEndian::read_u64(entry) };
        let Some(s) = shifts.iter().find(|s| s.start <= old && old < s.end) else {
            continue;
        };
        let new = u64::try_from(old as i128 + s.delta).map_err(|_| Error::ChunkOffsetOverflow(old))?;
        if width == 4 {
            let new = u32::try_from(new).map_err(|_| Error::ChunkOffsetOverflow(new))?;
            BigEndian::write_u32(entry, new);
        } else {
            BigEndian::write_u64(entry, new);
        }
        moved += 1;
    }
    Ok(moved)
}
