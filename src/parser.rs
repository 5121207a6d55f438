use crate::boxes::{BoxHeader, FourCC, Mp4Box, NodeKind, Payload, SizeForm};
use crate::error::{Error, Result};
use crate::known_boxes::{
    ContainerLayout, KnownBox, SOUND_DESCRIPTION_LEN, SOUND_DESCRIPTION_V1_EXTRA, SOUND_DESCRIPTION_V2_EXTRA,
};
use crate::tree::BoxTree;
use crate::util::read_slice;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

const MAX_DEPTH: usize = 64;

/// Which leaf payloads are pulled into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Capture every box nested in a container; top-level leaves (`mdat`,
    /// `free`, ...) stay in the source as deferred ranges.
    Scan,
    /// Buffer every payload.
    Capture,
}

/// Read the box header at the current position. `limit` is the end of the
/// enclosing region (parent end or stream length).
pub fn read_box_header<R: Read + Seek>(r: &mut R, limit: u64) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let available = limit.saturating_sub(start);
    let unknown = FourCC(*b"????");
    if available < 8 {
        return Err(Error::TruncatedBox { typ: unknown, offset: start, declared: 8, available });
    }

    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;
    let typ = FourCC(typ);

    let (size, form) = match size32 {
        0 => (available, SizeForm::ToEnd),
        1 => {
            if available < 16 {
                return Err(Error::TruncatedBox { typ, offset: start, declared: 16, available });
            }
            (r.read_u64::<BigEndian>()?, SizeForm::Large)
        }
        n => (n as u64, SizeForm::Compact),
    };

    let mut uuid = None;
    if typ == FourCC::UUID {
        let need = if form == SizeForm::Large { 32 } else { 24 };
        if available < need {
            return Err(Error::TruncatedBox { typ, offset: start, declared: need, available });
        }
        let mut u = [0u8; 16];
        r.read_exact(&mut u)?;
        uuid = Some(u);
    }

    let hdr = BoxHeader { size, typ, uuid, form, start };
    let header_size = hdr.header_size();
    if size < header_size {
        return Err(Error::MalformedSize { typ, offset: start, declared: size, header_size });
    }
    if size > available {
        return Err(Error::TruncatedBox { typ, offset: start, declared: size, available });
    }
    Ok(hdr)
}

/// Parse the boxes between the current position and `parent_end`.
///
/// `parent` is the type of the enclosing box, `None` at file level. Inside a
/// container, trailing bytes too short for a header are returned as padding;
/// at file level they are a truncation error.
pub fn parse_children<R: Read + Seek>(
    r: &mut R,
    parent_end: u64,
    parent: Option<FourCC>,
    mode: ReadMode,
) -> Result<(Vec<Mp4Box>, Vec<u8>)> {
    parse_level(r, parent_end, parent, mode, 0)
}

/// Parse a whole stream into a [`BoxTree`].
pub fn read_tree<R: Read + Seek>(r: &mut R, mode: ReadMode) -> Result<BoxTree> {
    let len = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(0))?;
    let (boxes, _) = parse_level(r, len, None, mode, 0)?;
    tracing::debug!(top_level = boxes.len(), bytes = len, "parsed box tree");
    Ok(BoxTree { boxes })
}

fn parse_level<R: Read + Seek>(
    r: &mut R,
    parent_end: u64,
    parent: Option<FourCC>,
    mode: ReadMode,
    depth: usize,
) -> Result<(Vec<Mp4Box>, Vec<u8>)> {
    if depth > MAX_DEPTH {
        return Err(Error::Parse(format!("boxes nested deeper than {MAX_DEPTH} levels")));
    }
    let mut kids = Vec::new();
    let mut padding = Vec::new();
    loop {
        let pos = r.stream_position()?;
        if pos >= parent_end {
            break;
        }
        let remaining = parent_end - pos;
        if let Some(p) = parent
            && remaining < 8
        {
            padding = read_slice(r, pos, remaining)?;
            tracing::warn!(parent = %p, bytes = remaining, "trailing bytes inside container kept as padding");
            break;
        }

        let h = read_box_header(r, parent_end)?;
        let box_end = h.start + h.size;
        let b = parse_box(r, h, parent, mode, depth)?;

        // Skip to end of box
        r.seek(SeekFrom::Start(box_end))?;
        kids.push(b);
    }
    Ok((kids, padding))
}

fn parse_box<R: Read + Seek>(
    r: &mut R,
    h: BoxHeader,
    parent: Option<FourCC>,
    mode: ReadMode,
    depth: usize,
) -> Result<Mp4Box> {
    let content_start = h.start + h.header_size();
    let content_len = h.size - h.header_size();
    let box_end = h.start + h.size;
    let kb = KnownBox::from(h.typ);
    tracing::trace!(typ = %h.typ, name = kb.full_name(), offset = h.start, size = h.size, "box");

    if h.uuid.is_none()
        && let Some(layout) = kb.container_layout(parent)
        && let Some(preamble) = read_preamble(r, layout, content_start, content_len)?
    {
        r.seek(SeekFrom::Start(content_start + preamble.len() as u64))?;
        let (children, padding) = parse_level(r, box_end, Some(h.typ), mode, depth + 1)?;
        return Ok(Mp4Box { hdr: h, kind: NodeKind::Container { preamble, children, padding } });
    }

    let payload = if mode == ReadMode::Scan && parent.is_none() {
        Payload::Deferred { offset: content_start, len: content_len }
    } else {
        Payload::Inline(read_slice(r, content_start, content_len)?)
    };
    let kind = if h.uuid.is_some() { NodeKind::Extended(payload) } else { NodeKind::Leaf(payload) };
    Ok(Mp4Box { hdr: h, kind })
}

/// Fixed fields before the children, or `None` when the content is too short
/// for the layout and the box should be kept as a leaf.
fn read_preamble<R: Read + Seek>(
    r: &mut R,
    layout: ContainerLayout,
    content_start: u64,
    content_len: u64,
) -> Result<Option<Vec<u8>>> {
    let len = match layout {
        ContainerLayout::Plain => 0,
        ContainerLayout::Preamble(n) => n,
        ContainerLayout::SoundDescription => {
            if content_len < SOUND_DESCRIPTION_LEN {
                return Ok(None);
            }
            let base = read_slice(r, content_start, SOUND_DESCRIPTION_LEN)?;
            // Sound description version sits right after the 8-byte SampleEntry prefix.
            match BigEndian::read_u16(&base[8..10]) {
                1 => SOUND_DESCRIPTION_LEN + SOUND_DESCRIPTION_V1_EXTRA,
                2 => SOUND_DESCRIPTION_LEN + SOUND_DESCRIPTION_V2_EXTRA,
                _ => SOUND_DESCRIPTION_LEN,
            }
        }
    };
    if content_len < len {
        return Ok(None);
    }
    Ok(Some(read_slice(r, content_start, len)?))
}
