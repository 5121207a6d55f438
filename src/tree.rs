use crate::boxes::{BoxHeader, FourCC, Mp4Box, NodeKind, Payload, SizeForm};
use crate::error::{Error, Result};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// The top-level boxes of a file, in file order.
#[derive(Debug, Clone, Default)]
pub struct BoxTree {
    pub boxes: Vec<Mp4Box>,
}

/// Split a `moov/trak/mdia` style path into type tags. Segments that are not
/// exactly four bytes make the whole path unmatched.
fn parse_path(path: &str) -> Option<Vec<FourCC>> {
    path.split('/').map(FourCC::from_str).collect()
}

fn find_in<'a>(kids: &'a [Mp4Box], path: &[FourCC]) -> Option<&'a Mp4Box> {
    let (first, rest) = path.split_first()?;
    let b = kids.iter().find(|b| b.hdr.typ == *first)?;
    if rest.is_empty() { Some(b) } else { find_in(b.children(), rest) }
}

fn find_in_mut<'a>(kids: &'a mut [Mp4Box], path: &[FourCC]) -> Option<&'a mut Mp4Box> {
    let (first, rest) = path.split_first()?;
    let b = kids.iter_mut().find(|b| b.hdr.typ == *first)?;
    if rest.is_empty() { Some(b) } else { find_in_mut(b.children_mut()?, rest) }
}

fn find_uuid_in<'a>(kids: &'a [Mp4Box], uuid: &[u8; 16]) -> Option<&'a Mp4Box> {
    kids.iter().find(|b| b.hdr.typ == FourCC::UUID && b.hdr.uuid.as_ref() == Some(uuid))
}

impl BoxTree {
    /// First box matching `path` from the file level; the first occurrence
    /// wins at every level.
    pub fn find(&self, path: &str) -> Option<&Mp4Box> {
        find_in(&self.boxes, &parse_path(path)?)
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Mp4Box> {
        find_in_mut(&mut self.boxes, &parse_path(path)?)
    }

    /// Top-level `uuid` box with the given extended type.
    pub fn find_uuid(&self, uuid: &[u8; 16]) -> Option<&Mp4Box> {
        find_uuid_in(&self.boxes, uuid)
    }

    /// Recompute every box size. A size-0 box keeps that form only while it
    /// is the last top-level box.
    pub fn recompute_sizes(&mut self) -> u64 {
        let last = self.boxes.len().saturating_sub(1);
        for b in &mut self.boxes[..last] {
            b.hdr.pin_size();
        }
        self.boxes.iter_mut().map(Mp4Box::recompute_sizes).sum()
    }

    /// `(offset, size)` of every top-level box, derived from current sizes.
    pub fn layout(&self) -> Vec<(u64, u64)> {
        let mut offset = 0;
        self.boxes
            .iter()
            .map(|b| {
                let entry = (offset, b.hdr.size);
                offset += b.hdr.size;
                entry
            })
            .collect()
    }

    /// Serialize the tree. Deferred payloads are copied from `src`, which must
    /// be the stream the tree was read from. Call `recompute_sizes` first.
    pub fn write_to<R: Read + Seek, W: Write>(&self, src: &mut R, dst: &mut W) -> Result<u64> {
        let mut written = 0;
        for b in &self.boxes {
            written += b.write_to(src, dst)?;
        }
        Ok(written)
    }
}

impl Mp4Box {
    /// First descendant matching `path`, relative to this box.
    pub fn find(&self, path: &str) -> Option<&Mp4Box> {
        find_in(self.children(), &parse_path(path)?)
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Mp4Box> {
        find_in_mut(self.children_mut()?, &parse_path(path)?)
    }

    /// Direct `uuid` child with the given extended type.
    pub fn find_uuid(&self, uuid: &[u8; 16]) -> Option<&Mp4Box> {
        find_uuid_in(self.children(), uuid)
    }

    /// Replace the first child with the same key (type, or extended type for
    /// `uuid`) in place, or append `child` when there is none.
    pub fn replace_or_append(&mut self, child: Mp4Box) -> Result<()> {
        let typ = self.hdr.typ;
        let kids = self.children_mut().ok_or(Error::NotAContainer(typ))?;
        let key = child.key();
        match kids.iter().position(|c| c.key() == key) {
            Some(i) => {
                tracing::debug!(parent = %typ, child = %key, index = i, "replacing box");
                kids[i] = child;
            }
            None => {
                tracing::debug!(parent = %typ, child = %key, "appending box");
                kids.push(child);
            }
        }
        Ok(())
    }

    /// First child container of type `typ`, created empty at the end if absent.
    pub fn ensure_container(&mut self, typ: FourCC) -> Result<&mut Mp4Box> {
        let parent = self.hdr.typ;
        let kids = self.children_mut().ok_or(Error::NotAContainer(parent))?;
        let idx = match kids.iter().position(|c| c.hdr.typ == typ) {
            Some(i) => i,
            None => {
                tracing::debug!(parent = %parent, child = %typ, "creating container");
                kids.push(Mp4Box::container(typ, Vec::new()));
                kids.len() - 1
            }
        };
        let child = &mut kids[idx];
        if !child.is_container() {
            return Err(Error::NotAContainer(typ));
        }
        Ok(child)
    }

    pub fn write_to<R: Read + Seek, W: Write>(&self, src: &mut R, dst: &mut W) -> Result<u64> {
        write_header(&self.hdr, dst)?;
        let mut written = self.hdr.header_size();
        match &self.kind {
            NodeKind::Container { preamble, children, padding } => {
                dst.write_all(preamble)?;
                written += preamble.len() as u64;
                for c in children {
                    written += c.write_to(src, dst)?;
                }
                dst.write_all(padding)?;
                written += padding.len() as u64;
            }
            NodeKind::Leaf(p) | NodeKind::Extended(p) => {
                written += write_payload(&self.hdr, p, src, dst)?;
            }
        }
        if written != self.hdr.size {
            return Err(Error::Parse(format!(
                "box '{}' wrote {written} bytes but declares {}; sizes not recomputed",
                self.hdr.typ, self.hdr.size
            )));
        }
        Ok(written)
    }
}

fn write_header<W: Write>(hdr: &BoxHeader, w: &mut W) -> Result<()> {
    match hdr.form {
        SizeForm::Compact => {
            let size = u32::try_from(hdr.size).map_err(|_| Error::MalformedSize {
                typ: hdr.typ,
                offset: hdr.start,
                declared: hdr.size,
                header_size: hdr.header_size(),
            })?;
            w.write_u32::<BigEndian>(size)?;
        }
        SizeForm::Large => w.write_u32::<BigEndian>(1)?,
        SizeForm::ToEnd => w.write_u32::<BigEndian>(0)?,
    }
    w.write_all(&hdr.typ.0)?;
    if hdr.form == SizeForm::Large {
        w.write_u64::<BigEndian>(hdr.size)?;
    }
    if let Some(u) = &hdr.uuid {
        w.write_all(u)?;
    }
    Ok(())
}

fn write_payload<R: Read + Seek, W: Write>(hdr: &BoxHeader, p: &Payload, src: &mut R, dst: &mut W) -> Result<u64> {
    match p {
        Payload::Inline(v) => {
            dst.write_all(v)?;
            Ok(v.len() as u64)
        }
        Payload::Deferred { offset, len } => {
            src.seek(SeekFrom::Start(*offset))?;
            let copied = io::copy(&mut (&mut *src).take(*len), dst)?;
            if copied != *len {
                return Err(Error::TruncatedBox {
                    typ: hdr.typ,
                    offset: hdr.start,
                    declared: hdr.size,
                    available: hdr.header_size() + copied,
                });
            }
            Ok(copied)
        }
    }
}
