//! Ambisonic audio descriptor (the `SA3D` body of the Spatial Audio RFC).

use crate::boxes::FourCC;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

/// Extended type of the spatial audio `uuid` box: the ISO/IEC 14496-12 UUID
/// form of the `SA3D` four-character code.
pub const SPATIAL_AUDIO_UUID: [u8; 16] = [
    0x53, 0x41, 0x33, 0x44, 0x00, 0x11, 0x00, 0x10, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// Plain box type used by other writers for the same descriptor.
pub const SA3D: FourCC = FourCC(*b"SA3D");

const VERSION: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbisonicType {
    Periphonic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelOrdering {
    Acn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Normalization {
    Sn3d,
}

impl AmbisonicType {
    fn code(self) -> u8 {
        match self {
            AmbisonicType::Periphonic => 0,
        }
    }
    fn from_code(c: u8) -> Result<Self> {
        match c {
            0 => Ok(AmbisonicType::Periphonic),
            _ => Err(Error::Parse(format!("unsupported ambisonic type {c}"))),
        }
    }
}

impl ChannelOrdering {
    fn code(self) -> u8 {
        match self {
            ChannelOrdering::Acn => 0,
        }
    }
    fn from_code(c: u8) -> Result<Self> {
        match c {
            0 => Ok(ChannelOrdering::Acn),
            _ => Err(Error::Parse(format!("unsupported channel ordering {c}"))),
        }
    }
}

impl Normalization {
    fn code(self) -> u8 {
        match self {
            Normalization::Sn3d => 0,
        }
    }
    fn from_code(c: u8) -> Result<Self> {
        match c {
            0 => Ok(Normalization::Sn3d),
            _ => Err(Error::Parse(format!("unsupported normalization {c}"))),
        }
    }
}

/// Ambisonic layout of an audio track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialAudioMetadata {
    pub ambisonic_type: AmbisonicType,
    pub order: u32,
    pub channel_ordering: ChannelOrdering,
    pub normalization: Normalization,
    /// Output channel for each ambisonic component.
    pub channel_map: Vec<u32>,
}

impl Default for SpatialAudioMetadata {
    /// First-order periphonic ambisonics, ACN/SN3D, identity channel map.
    fn default() -> Self {
        SpatialAudioMetadata {
            ambisonic_type: AmbisonicType::Periphonic,
            order: 1,
            channel_ordering: ChannelOrdering::Acn,
            normalization: Normalization::Sn3d,
            channel_map: vec![0, 1, 2, 3],
        }
    }
}

impl SpatialAudioMetadata {
    /// Number of ambisonic components, `(order + 1)^2` for periphonic.
    pub fn expected_channels(&self) -> Result<u32> {
        self.order
            .checked_add(1)
            .and_then(|n| n.checked_mul(n))
            .ok_or_else(|| Error::Parse(format!("ambisonic order {} is too large", self.order)))
    }

    /// The channel map must be a permutation of the ambisonic components.
    pub fn validate(&self) -> Result<()> {
        let n = self.expected_channels()?;
        if self.channel_map.len() as u64 != n as u64 {
            return Err(Error::Parse(format!(
                "channel map has {} entries, order {} needs {n}",
                self.channel_map.len(),
                self.order
            )));
        }
        let mut seen = vec![false; self.channel_map.len()];
        for &c in &self.channel_map {
            match seen.get_mut(c as usize) {
                Some(s) if !*s => *s = true,
                _ => return Err(Error::Parse(format!("channel map entry {c} is out of range or repeated"))),
            }
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let mut out = Vec::with_capacity(12 + 4 * self.channel_map.len());
        out.write_u8(VERSION)?;
        out.write_u8(self.ambisonic_type.code())?;
        out.write_u32::<BigEndian>(self.order)?;
        out.write_u8(self.channel_ordering.code())?;
        out.write_u8(self.normalization.code())?;
        out.write_u32::<BigEndian>(self.channel_map.len() as u32)?;
        for &c in &self.channel_map {
            out.write_u32::<BigEndian>(c)?;
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = bytes;
        let truncated = |_| Error::Parse("spatial audio descriptor is truncated".into());

        let version = r.read_u8().map_err(truncated)?;
        if version != VERSION {
            return Err(Error::Parse(format!("unsupported spatial audio descriptor version {version}")));
        }
        let ambisonic_type = AmbisonicType::from_code(r.read_u8().map_err(truncated)?)?;
        let order = r.read_u32::<BigEndian>().map_err(truncated)?;
        let channel_ordering = ChannelOrdering::from_code(r.read_u8().map_err(truncated)?)?;
        let normalization = Normalization::from_code(r.read_u8().map_err(truncated)?)?;
        let num_channels = r.read_u32::<BigEndian>().map_err(truncated)?;
        if num_channels as u64 * 4 > r.len() as u64 {
            return Err(Error::Parse(format!(
                "spatial audio descriptor declares {num_channels} channels but holds {} bytes of channel map",
                r.len()
            )));
        }
        let mut channel_map = Vec::with_capacity(num_channels as usize);
        for _ in 0..num_channels {
            channel_map.push(r.read_u32::<BigEndian>().map_err(truncated)?);
        }
        if !r.is_empty() {
            tracing::debug!(bytes = r.len(), "ignoring bytes after spatial audio channel map");
        }
        Ok(SpatialAudioMetadata { ambisonic_type, order, channel_ordering, normalization, channel_map })
    }
}

pub fn encode(descriptor: &SpatialAudioMetadata) -> Result<Vec<u8>> {
    descriptor.encode()
}

pub fn decode(bytes: &[u8]) -> Result<SpatialAudioMetadata> {
    SpatialAudioMetadata::decode(bytes)
}
