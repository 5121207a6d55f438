#![allow(dead_code)]

use spatialmedia::{BoxTree, Mp4Box, NodeKind};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SAMPLES: &[u8] = b"SAMPLES!";

/// A compact box with a literal 32-bit size.
pub fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

pub fn container(typ: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    bx(typ, &children.concat())
}

pub fn ftyp() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(b"isom");
    p.extend_from_slice(&512u32.to_be_bytes());
    p.extend_from_slice(b"isomiso2mp41");
    bx(b"ftyp", &p)
}

pub fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut p = vec![0u8; 8]; // version/flags + pre_defined
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0u8; 12]);
    p.push(0); // empty name
    bx(b"hdlr", &p)
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(&(offsets.len() as u32).to_be_bytes());
    for o in offsets {
        p.extend_from_slice(&o.to_be_bytes());
    }
    bx(b"stco", &p)
}

pub fn co64(offsets: &[u64]) -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(&(offsets.len() as u32).to_be_bytes());
    for o in offsets {
        p.extend_from_slice(&o.to_be_bytes());
    }
    bx(b"co64", &p)
}

/// 28-byte version 0 sound description followed by `children`.
pub fn sound_entry(typ: &[u8; 4], channels: u16, children: &[Vec<u8>]) -> Vec<u8> {
    let mut p = vec![0u8; 6];
    p.extend_from_slice(&1u16.to_be_bytes()); // data_reference_index
    p.extend_from_slice(&0u16.to_be_bytes()); // version
    p.extend_from_slice(&0u16.to_be_bytes()); // revision
    p.extend_from_slice(&0u32.to_be_bytes()); // vendor
    p.extend_from_slice(&channels.to_be_bytes());
    p.extend_from_slice(&16u16.to_be_bytes()); // sample size
    p.extend_from_slice(&0u16.to_be_bytes()); // compression id
    p.extend_from_slice(&0u16.to_be_bytes()); // packet size
    p.extend_from_slice(&(48000u32 << 16).to_be_bytes());
    assert_eq!(p.len(), 28);
    p.extend_from_slice(&children.concat());
    bx(typ, &p)
}

pub fn visual_entry() -> Vec<u8> {
    bx(b"avc1", &[0u8; 78])
}

pub fn stsd(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut p = vec![0u8; 4];
    p.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    p.extend_from_slice(&entries.concat());
    bx(b"stsd", &p)
}

pub fn trak(handler: &[u8; 4], entry: Vec<u8>, chunk_offset: u32) -> Vec<u8> {
    container(
        b"trak",
        &[
            bx(b"tkhd", &[0u8; 84]),
            container(
                b"mdia",
                &[
                    bx(b"mdhd", &[0u8; 24]),
                    hdlr(handler),
                    container(b"minf", &[container(b"stbl", &[stsd(&[entry]), stco(&[chunk_offset])])]),
                ],
            ),
        ],
    )
}

pub fn audio_trak(channels: u16, chunk_offset: u32) -> Vec<u8> {
    trak(b"soun", sound_entry(b"mp4a", channels, &[bx(b"esds", &[0u8; 12])]), chunk_offset)
}

pub fn video_trak(chunk_offset: u32) -> Vec<u8> {
    trak(b"vide", visual_entry(), chunk_offset)
}

pub fn moov(children: &[Vec<u8>]) -> Vec<u8> {
    let mut kids = vec![bx(b"mvhd", &[0u8; 100])];
    kids.extend_from_slice(children);
    container(b"moov", &kids)
}

/// ftyp + moov + mdat, with every track's single chunk pointing at `SAMPLES`
/// inside the mdat. `audio_channels` adds an `mp4a` track.
pub fn movie_file(audio_channels: Option<u16>) -> Vec<u8> {
    let build = |offset: u32| {
        let mut traks = vec![video_trak(offset)];
        if let Some(ch) = audio_channels {
            traks.push(audio_trak(ch, offset));
        }
        [ftyp(), moov(&traks)].concat()
    };
    let head = build(0);
    let offset = (head.len() + 8) as u32;
    let mut file = build(offset);
    file.extend_from_slice(&bx(b"mdat", SAMPLES));
    file
}

/// Same layout with mdat before moov.
pub fn movie_file_moov_last() -> Vec<u8> {
    let offset = (ftyp().len() + 8) as u32;
    [ftyp(), bx(b"mdat", SAMPLES), moov(&[video_trak(offset)])].concat()
}

pub fn write_temp(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    let mut f = File::create(&path).unwrap();
    f.write_all(bytes).unwrap();
    path
}

/// Every box's size equals its header plus its content, recursively.
pub fn assert_sizes(tree: &BoxTree, file_len: u64) {
    fn check(b: &Mp4Box) -> u64 {
        let content = match &b.kind {
            NodeKind::Container { preamble, children, padding } => {
                preamble.len() as u64 + children.iter().map(check).sum::<u64>() + padding.len() as u64
            }
            NodeKind::Leaf(p) | NodeKind::Extended(p) => p.len(),
        };
        assert_eq!(b.hdr.size, b.hdr.header_size() + content, "size of {}", b.key());
        b.hdr.size
    }
    let total: u64 = tree.boxes.iter().map(check).sum();
    assert_eq!(total, file_len);
}

/// First chunk offset of the first `stco` under `trak`.
pub fn first_chunk_offset(trak: &Mp4Box) -> u32 {
    let stco = trak.find("mdia/minf/stbl/stco").expect("stco");
    let data = stco.payload().and_then(|p| p.as_bytes()).expect("inline stco");
    u32::from_be_bytes([data[8], data[9], data[10], data[11]])
}
