use crate::boxes::FourCC;

/// The box types the metadata tools have to understand structurally.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)` and is kept
/// as an opaque leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // Plain containers
    Moov,
    Trak,
    Mdia,
    Minf,
    Stbl,
    Edts,
    Udta,
    Dinf,
    Mvex,
    Moof,
    Traf,
    Mfra,
    Sinf,
    Schi,

    // Sample table entries we look into
    Stsd,
    Stco,
    Co64,

    // Sound sample entries
    Mp4a,
    Lpcm,
    Sowt,
    Twos,
    In24,
    In32,
    Fl32,
    Fl64,
    Raw,
    NoneCodec,
    Opus,
    Alac,
    Ac3,
    Ec3,
    Flac,
    Ulaw,
    Alaw,

    Sa3d,
    Uuid,

    Unknown(FourCC),
}

/// How the bytes of a container are split between fixed fields and children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerLayout {
    /// Children start right after the header.
    Plain,
    /// A fixed number of bytes precede the children.
    Preamble(u64),
    /// QuickTime/ISO sound sample description: 28 bytes, more for v1/v2.
    SoundDescription,
}

/// Fixed fields of `stsd`: version/flags + entry_count.
pub const STSD_PREAMBLE_LEN: u64 = 8;
/// SampleEntry (8) + AudioSampleEntry v0 fields (20).
pub const SOUND_DESCRIPTION_LEN: u64 = 28;
pub const SOUND_DESCRIPTION_V1_EXTRA: u64 = 16;
pub const SOUND_DESCRIPTION_V2_EXTRA: u64 = 36;

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"moov" => KnownBox::Moov,
            b"trak" => KnownBox::Trak,
            b"mdia" => KnownBox::Mdia,
            b"minf" => KnownBox::Minf,
            b"stbl" => KnownBox::Stbl,
            b"edts" => KnownBox::Edts,
            b"udta" => KnownBox::Udta,
            b"dinf" => KnownBox::Dinf,
            b"mvex" => KnownBox::Mvex,
            b"moof" => KnownBox::Moof,
            b"traf" => KnownBox::Traf,
            b"mfra" => KnownBox::Mfra,
            b"sinf" => KnownBox::Sinf,
            b"schi" => KnownBox::Schi,

            b"stsd" => KnownBox::Stsd,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,

            b"mp4a" => KnownBox::Mp4a,
            b"lpcm" => KnownBox::Lpcm,
            b"sowt" => KnownBox::Sowt,
            b"twos" => KnownBox::Twos,
            b"in24" => KnownBox::In24,
            b"in32" => KnownBox::In32,
            b"fl32" => KnownBox::Fl32,
            b"fl64" => KnownBox::Fl64,
            b"raw " => KnownBox::Raw,
            b"NONE" => KnownBox::NoneCodec,
            b"Opus" => KnownBox::Opus,
            b"alac" => KnownBox::Alac,
            b"ac-3" => KnownBox::Ac3,
            b"ec-3" => KnownBox::Ec3,
            b"fLaC" => KnownBox::Flac,
            b"ulaw" => KnownBox::Ulaw,
            b"alaw" => KnownBox::Alaw,

            b"SA3D" => KnownBox::Sa3d,
            b"uuid" => KnownBox::Uuid,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    /// Human-readable box name, for trace output.
    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Moov => "Movie Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Moof => "Movie Fragment Box",
            KnownBox::Traf => "Track Fragment Box",
            KnownBox::Mfra => "Movie Fragment Random Access Box",
            KnownBox::Sinf => "Protection Scheme Info Box",
            KnownBox::Schi => "Scheme Information Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "64-bit Chunk Offset Box",
            KnownBox::Sa3d => "Spatial Audio Box",
            KnownBox::Uuid => "User Extension Box",
            KnownBox::Unknown(_) => "Unknown Box",
            _ => "Audio Sample Entry",
        }
    }

    pub fn is_audio_sample_entry(&self) -> bool {
        matches!(
            self,
            KnownBox::Mp4a
                | KnownBox::Lpcm
                | KnownBox::Sowt
                | KnownBox::Twos
                | KnownBox::In24
                | KnownBox::In32
                | KnownBox::Fl32
                | KnownBox::Fl64
                | KnownBox::Raw
                | KnownBox::NoneCodec
                | KnownBox::Opus
                | KnownBox::Alac
                | KnownBox::Ac3
                | KnownBox::Ec3
                | KnownBox::Flac
                | KnownBox::Ulaw
                | KnownBox::Alaw
        )
    }

    /// Is this a container whose children are plain boxes?
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            KnownBox::Moov
                | KnownBox::Trak
                | KnownBox::Mdia
                | KnownBox::Minf
                | KnownBox::Stbl
                | KnownBox::Edts
                | KnownBox::Udta
                | KnownBox::Dinf
                | KnownBox::Mvex
                | KnownBox::Moof
                | KnownBox::Traf
                | KnownBox::Mfra
                | KnownBox::Sinf
                | KnownBox::Schi
        )
    }

    /// Container layout for this box when found under `parent`, or `None`
    /// if it is read as an opaque leaf.
    pub fn container_layout(&self, parent: Option<FourCC>) -> Option<ContainerLayout> {
        if self.is_container() {
            return Some(ContainerLayout::Plain);
        }
        match self {
            KnownBox::Stsd => Some(ContainerLayout::Preamble(STSD_PREAMBLE_LEN)),
            // Codes like `mp4a` also appear as plain leaves inside QuickTime `wave`.
            kb if kb.is_audio_sample_entry() && parent == Some(FourCC(*b"stsd")) => {
                Some(ContainerLayout::SoundDescription)
            }
            _ => None,
        }
    }
}
