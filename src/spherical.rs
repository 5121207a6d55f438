//! Spherical video XML (Spherical Video RFC v1) carried in a `uuid` box.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Extended type of the spherical video `uuid` box.
pub const SPHERICAL_UUID: [u8; 16] = [
    0xff, 0xcc, 0x82, 0x63, 0xf8, 0x55, 0x4a, 0x93, 0x88, 0x14, 0x58, 0x7a, 0x02, 0x52, 0x1f, 0xdd,
];

pub const STITCHING_SOFTWARE: &str = "Spherical Metadata Tool";
pub const EQUIRECTANGULAR: &str = "equirectangular";

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const GSPHERICAL_NS: &str = "http://ns.google.com/videos/1.0/spherical/";
const ROOT: &str = "rdf:SphericalVideo";
const ROOT_LOCAL: &[u8] = b"SphericalVideo";

// Element names, exactly as players expect them.
const SPHERICAL: &str = "Spherical";
const STITCHED: &str = "Stitched";
const SOFTWARE: &str = "StitchingSoftware";
const PROJECTION: &str = "ProjectionType";
const STEREO: &str = "StereoMode";
const CROP_WIDTH: &str = "CroppedAreaImageWidthPixels";
const CROP_HEIGHT: &str = "CroppedAreaImageHeightPixels";
const FULL_WIDTH: &str = "FullPanoWidthPixels";
const FULL_HEIGHT: &str = "FullPanoHeightPixels";
const CROP_LEFT: &str = "CroppedAreaLeftPixels";
const CROP_TOP: &str = "CroppedAreaTopPixels";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StereoMode {
    #[default]
    None,
    TopBottom,
    LeftRight,
}

impl StereoMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StereoMode::None => "none",
            StereoMode::TopBottom => "top-bottom",
            StereoMode::LeftRight => "left-right",
        }
    }
}

impl fmt::Display for StereoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StereoMode {
    type Err = Error;

    /// Case-insensitive; `mono` is accepted as a synonym for `none`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "mono" => Ok(StereoMode::None),
            "top-bottom" => Ok(StereoMode::TopBottom),
            "left-right" => Ok(StereoMode::LeftRight),
            other => Err(Error::Parse(format!("unknown stereo mode '{other}'"))),
        }
    }
}

/// Cropped area of the full panorama actually stored in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub width: u32,
    pub height: u32,
    pub full_width: u32,
    pub full_height: u32,
    pub left: u32,
    pub top: u32,
}

impl Crop {
    pub fn new(width: u32, height: u32, full_width: u32, full_height: u32, left: u32, top: u32) -> Result<Self> {
        let crop = Crop { width, height, full_width, full_height, left, top };
        crop.validate()?;
        Ok(crop)
    }

    /// The cropped rectangle must lie inside the full panorama.
    pub fn validate(&self) -> Result<()> {
        if self.width > self.full_width {
            return Err(Error::InvalidCrop(format!(
                "cropped width {} exceeds full width {}",
                self.width, self.full_width
            )));
        }
        if self.height > self.full_height {
            return Err(Error::InvalidCrop(format!(
                "cropped height {} exceeds full height {}",
                self.height, self.full_height
            )));
        }
        let right = self.left as u64 + self.width as u64;
        if right > self.full_width as u64 {
            return Err(Error::InvalidCrop(format!(
                "left {} + width {} exceeds full width {}",
                self.left, self.width, self.full_width
            )));
        }
        let bottom = self.top as u64 + self.height as u64;
        if bottom > self.full_height as u64 {
            return Err(Error::InvalidCrop(format!(
                "top {} + height {} exceeds full height {}",
                self.top, self.height, self.full_height
            )));
        }
        Ok(())
    }

    /// All six values zero, which callers treat as "no crop".
    pub fn is_empty(&self) -> bool {
        *self == Crop { width: 0, height: 0, full_width: 0, full_height: 0, left: 0, top: 0 }
    }
}

impl FromStr for Crop {
    type Err = Error;

    /// `w:h:f_w:f_h:x:y`, e.g. `2048:1024:3186:1482:100:100`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(Error::InvalidCrop(format!("expected w:h:f_w:f_h:x:y, got '{s}'")));
        }
        let mut v = [0u32; 6];
        for (slot, part) in v.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|c| c.is_ascii_digit()) {
                return Err(Error::InvalidCrop(format!("'{part}' is not a non-negative integer")));
            }
            *slot = part
                .parse()
                .map_err(|_| Error::InvalidCrop(format!("'{part}' is out of range")))?;
        }
        Crop::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}",
            self.width, self.height, self.full_width, self.full_height, self.left, self.top
        )
    }
}

/// Contents of a spherical video XML document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SphericalMetadata {
    pub spherical: bool,
    pub stitched: bool,
    pub stitching_software: Option<String>,
    pub projection_type: String,
    pub stereo_mode: StereoMode,
    pub crop: Option<Crop>,
}

impl SphericalMetadata {
    pub fn new(stereo_mode: StereoMode, crop: Option<Crop>) -> Self {
        SphericalMetadata {
            spherical: true,
            stitched: true,
            stitching_software: Some(STITCHING_SOFTWARE.to_string()),
            projection_type: EQUIRECTANGULAR.to_string(),
            stereo_mode,
            crop,
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        if let Some(crop) = &self.crop {
            crop.validate()?;
        }
        let mut w = Writer::new(Vec::new());
        w.write_event(Event::Decl(BytesDecl::new("1.0", None, None))).map_err(xml_error)?;
        let mut root = BytesStart::new(ROOT);
        root.push_attribute(("xmlns:rdf", RDF_NS));
        root.push_attribute(("xmlns:GSpherical", GSPHERICAL_NS));
        w.write_event(Event::Start(root)).map_err(xml_error)?;

        let mut fields: Vec<(&str, String)> = vec![
            (SPHERICAL, self.spherical.to_string()),
            (STITCHED, self.stitched.to_string()),
        ];
        if let Some(sw) = &self.stitching_software {
            fields.push((SOFTWARE, sw.clone()));
        }
        fields.push((PROJECTION, self.projection_type.clone()));
        if self.stereo_mode != StereoMode::None {
            fields.push((STEREO, self.stereo_mode.to_string()));
        }
        if let Some(c) = &self.crop {
            fields.push((CROP_WIDTH, c.width.to_string()));
            fields.push((CROP_HEIGHT, c.height.to_string()));
            fields.push((FULL_WIDTH, c.full_width.to_string()));
            fields.push((FULL_HEIGHT, c.full_height.to_string()));
            fields.push((CROP_LEFT, c.left.to_string()));
            fields.push((CROP_TOP, c.top.to_string()));
        }
        for (name, value) in &fields {
            let tag = format!("GSpherical:{name}");
            w.create_element(tag.as_str())
                .write_text_content(BytesText::new(value))
                .map_err(xml_error)?;
        }
        w.write_event(Event::End(BytesEnd::new(ROOT))).map_err(xml_error)?;

        String::from_utf8(w.into_inner()).map_err(xml_error)
    }
}

/// Build the XML document for an equirectangular video.
pub fn encode(stereo_mode: StereoMode, crop: Option<Crop>) -> Result<String> {
    SphericalMetadata::new(stereo_mode, crop).to_xml()
}

/// Parse a spherical XML document. Fields may be child elements or attributes
/// in any order; a missing `SphericalVideo` root is an error.
pub fn decode(bytes: &[u8]) -> Result<SphericalMetadata> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Parse(format!("spherical metadata is not UTF-8: {e}")))?
        .trim_end_matches('\0');

    let mut reader = Reader::from_str(text);
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut open: Option<String> = None;
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                if depth == 0 {
                    check_root(&e)?;
                    saw_root = true;
                }
                collect_attributes(&e, &mut fields)?;
                depth += 1;
                open = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::Empty(e) => {
                if depth == 0 {
                    check_root(&e)?;
                    saw_root = true;
                }
                collect_attributes(&e, &mut fields)?;
            }
            Event::Text(t) => {
                if let Some(name) = &open
                    && depth >= 2
                {
                    let value = t.unescape().map_err(xml_error)?;
                    let value = value.trim();
                    if !value.is_empty() {
                        fields.push((name.clone(), value.to_string()));
                    }
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                open = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !saw_root {
        return Err(Error::Parse("no SphericalVideo root element".into()));
    }
    build(&fields)
}

fn xml_error(e: impl fmt::Display) -> Error {
    Error::Parse(format!("xml: {e}"))
}

fn check_root(e: &BytesStart<'_>) -> Result<()> {
    if e.local_name().as_ref() != ROOT_LOCAL {
        return Err(Error::Parse(format!(
            "root element is '{}', expected SphericalVideo",
            String::from_utf8_lossy(e.name().as_ref())
        )));
    }
    Ok(())
}

fn collect_attributes(e: &BytesStart<'_>, fields: &mut Vec<(String, String)>) -> Result<()> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?;
        fields.push((key, value.trim().to_string()));
    }
    Ok(())
}

fn build(fields: &[(String, String)]) -> Result<SphericalMetadata> {
    let get = |name: &str| fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
    let flag = |name: &str| get(name).is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let stereo_mode = match get(STEREO) {
        Some(v) => v.parse()?,
        None => StereoMode::None,
    };

    let names = [CROP_WIDTH, CROP_HEIGHT, FULL_WIDTH, FULL_HEIGHT, CROP_LEFT, CROP_TOP];
    let crop = if names.iter().all(|n| get(n).is_none()) {
        None
    } else {
        let mut v = [0u32; 6];
        for (slot, name) in v.iter_mut().zip(names) {
            let value = get(name).ok_or_else(|| Error::Parse(format!("crop field {name} missing")))?;
            *slot = value
                .parse()
                .map_err(|_| Error::Parse(format!("{name} is not an integer: '{value}'")))?;
        }
        Some(Crop::new(v[0], v[1], v[2], v[3], v[4], v[5])?)
    };

    Ok(SphericalMetadata {
        spherical: flag(SPHERICAL),
        stitched: flag(STITCHED),
        stitching_software: get(SOFTWARE).map(str::to_string),
        projection_type: get(PROJECTION).unwrap_or(EQUIRECTANGULAR).to_string(),
        stereo_mode,
        crop,
    })
}
