use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const UUID: FourCC = FourCC(*b"uuid");

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }
    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}
impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}
impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

/// How the size field of a box is encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeForm {
    /// 32-bit size field.
    Compact,
    /// 32-bit field holds 1, followed by a 64-bit size.
    Large,
    /// 32-bit field holds 0: the box runs to the end of its parent.
    ToEnd,
}

#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub size: u64,          // total size including header, resolved even for ToEnd
    pub typ: FourCC,        // 4CC or b"uuid"
    pub uuid: Option<[u8; 16]>,
    pub form: SizeForm,
    pub start: u64,         // offset of header start in the source, 0 for new boxes
}

impl BoxHeader {
    pub fn new(typ: FourCC) -> Self {
        let mut hdr = BoxHeader { size: 0, typ, uuid: None, form: SizeForm::Compact, start: 0 };
        hdr.size = hdr.header_size();
        hdr
    }

    pub fn new_uuid(uuid: [u8; 16]) -> Self {
        let mut hdr = BoxHeader { size: 0, typ: FourCC::UUID, uuid: Some(uuid), form: SizeForm::Compact, start: 0 };
        hdr.size = hdr.header_size();
        hdr
    }

    /// 8, 16, 24 or 32 bytes.
    pub fn header_size(&self) -> u64 {
        let mut n = 8;
        if self.form == SizeForm::Large {
            n += 8;
        }
        if self.uuid.is_some() {
            n += 16;
        }
        n
    }

    /// Give a `ToEnd` box an explicit size. Only the last box of the file may
    /// keep the zero size field; anywhere else it would swallow what follows.
    pub fn pin_size(&mut self) {
        if self.form == SizeForm::ToEnd {
            self.form = SizeForm::Compact;
        }
    }

    /// Set `size` for a payload of `content_len` bytes, switching to the 64-bit
    /// form when the compact field can no longer hold it. Returns the new size.
    pub fn fit(&mut self, content_len: u64) -> u64 {
        if self.form == SizeForm::Compact && self.header_size() + content_len > u32::MAX as u64 {
            self.form = SizeForm::Large;
        }
        self.size = self.header_size() + content_len;
        self.size
    }
}

/// Bytes of a leaf box: either held in memory or left in the source stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Inline(Vec<u8>),
    Deferred { offset: u64, len: u64 },
}

impl Payload {
    pub fn len(&self) -> u64 {
        match self {
            Payload::Inline(v) => v.len() as u64,
            Payload::Deferred { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Inline(v) => Some(v),
            Payload::Deferred { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Child boxes, optionally preceded by fixed fields (`stsd`, sample entries)
    /// and followed by bytes too short to form a box.
    Container { preamble: Vec<u8>, children: Vec<Mp4Box>, padding: Vec<u8> },
    Leaf(Payload),
    /// Payload of a `uuid` box; the extended type lives in the header.
    Extended(Payload),
}

#[derive(Debug, Clone)]
pub struct Mp4Box {
    pub hdr: BoxHeader,
    pub kind: NodeKind,
}

impl Mp4Box {
    pub fn leaf(typ: FourCC, data: Vec<u8>) -> Self {
        let mut b = Mp4Box { hdr: BoxHeader::new(typ), kind: NodeKind::Leaf(Payload::Inline(data)) };
        b.recompute_sizes();
        b
    }

    pub fn container(typ: FourCC, children: Vec<Mp4Box>) -> Self {
        let mut b = Mp4Box {
            hdr: BoxHeader::new(typ),
            kind: NodeKind::Container { preamble: Vec::new(), children, padding: Vec::new() },
        };
        b.recompute_sizes();
        b
    }

    pub fn extended(uuid: [u8; 16], data: Vec<u8>) -> Self {
        let mut b = Mp4Box { hdr: BoxHeader::new_uuid(uuid), kind: NodeKind::Extended(Payload::Inline(data)) };
        b.recompute_sizes();
        b
    }

    pub fn key(&self) -> BoxKey {
        match self.hdr.uuid {
            Some(u) => BoxKey::Uuid(u),
            None => BoxKey::FourCC(self.hdr.typ),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container { .. })
    }

    pub fn children(&self) -> &[Mp4Box] {
        match &self.kind {
            NodeKind::Container { children, .. } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Mp4Box>> {
        match &mut self.kind {
            NodeKind::Container { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match &self.kind {
            NodeKind::Leaf(p) | NodeKind::Extended(p) => Some(p),
            NodeKind::Container { .. } => None,
        }
    }

    /// Fixed fields that precede the children of a container.
    pub fn preamble(&self) -> &[u8] {
        match &self.kind {
            NodeKind::Container { preamble, .. } => preamble,
            _ => &[],
        }
    }

    /// Bottom-up size pass: every container becomes header + preamble +
    /// children + padding, leaves keep their payload length.
    pub fn recompute_sizes(&mut self) -> u64 {
        let content = match &mut self.kind {
            NodeKind::Container { preamble, children, padding } => {
                let kids: u64 = children
                    .iter_mut()
                    .map(|c| {
                        c.hdr.pin_size();
                        c.recompute_sizes()
                    })
                    .sum();
                preamble.len() as u64 + kids + padding.len() as u64
            }
            NodeKind::Leaf(p) | NodeKind::Extended(p) => p.len(),
        };
        self.hdr.fit(content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKey {
    FourCC(FourCC),
    Uuid([u8; 16]),
}

impl fmt::Display for BoxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxKey::FourCC(cc) => write!(f, "{cc}"),
            BoxKey::Uuid(u) => write!(f, "uuid:{}", crate::util::format_uuid(u)),
        }
    }
}
