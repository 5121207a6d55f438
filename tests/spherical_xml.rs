use spatialmedia::spherical::{self, EQUIRECTANGULAR, STITCHING_SOFTWARE};
use spatialmedia::{Crop, Error, SphericalMetadata, StereoMode};

#[test]
fn encode_mono_has_required_fields_only() {
    let xml = spherical::encode(StereoMode::None, None).unwrap();

    assert!(xml.starts_with(r#"<?xml version="1.0"?>"#));
    assert!(xml.contains(r#"xmlns:GSpherical="http://ns.google.com/videos/1.0/spherical/""#));
    assert!(xml.contains("<GSpherical:Spherical>true</GSpherical:Spherical>"));
    assert!(xml.contains("<GSpherical:Stitched>true</GSpherical:Stitched>"));
    assert!(xml.contains("<GSpherical:StitchingSoftware>Spherical Metadata Tool</GSpherical:StitchingSoftware>"));
    assert!(xml.contains("<GSpherical:ProjectionType>equirectangular</GSpherical:ProjectionType>"));
    assert!(!xml.contains("StereoMode"));
    assert!(!xml.contains("Cropped"));
    assert!(xml.trim_end().ends_with("</rdf:SphericalVideo>"));
}

#[test]
fn encode_stereo_and_crop_use_published_tag_names() {
    let crop = Crop::new(2048, 1024, 3186, 1482, 100, 100).unwrap();
    let xml = spherical::encode(StereoMode::TopBottom, Some(crop)).unwrap();

    for expected in [
        "<GSpherical:StereoMode>top-bottom</GSpherical:StereoMode>",
        "<GSpherical:CroppedAreaImageWidthPixels>2048</GSpherical:CroppedAreaImageWidthPixels>",
        "<GSpherical:CroppedAreaImageHeightPixels>1024</GSpherical:CroppedAreaImageHeightPixels>",
        "<GSpherical:FullPanoWidthPixels>3186</GSpherical:FullPanoWidthPixels>",
        "<GSpherical:FullPanoHeightPixels>1482</GSpherical:FullPanoHeightPixels>",
        "<GSpherical:CroppedAreaLeftPixels>100</GSpherical:CroppedAreaLeftPixels>",
        "<GSpherical:CroppedAreaTopPixels>100</GSpherical:CroppedAreaTopPixels>",
    ] {
        assert!(xml.contains(expected), "missing {expected} in {xml}");
    }
}

#[test]
fn decode_reads_back_what_encode_wrote() {
    let crop = Crop::new(100, 100, 200, 200, 50, 50).unwrap();
    let xml = spherical::encode(StereoMode::LeftRight, Some(crop)).unwrap();

    let m = spherical::decode(xml.as_bytes()).unwrap();
    assert_eq!(m, SphericalMetadata::new(StereoMode::LeftRight, Some(crop)));
    assert!(m.spherical && m.stitched);
    assert_eq!(m.stitching_software.as_deref(), Some(STITCHING_SOFTWARE));
    assert_eq!(m.projection_type, EQUIRECTANGULAR);
}

#[test]
fn decode_accepts_attribute_form_and_trailing_nul() {
    let xml = concat!(
        r#"<rdf:SphericalVideo xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" "#,
        r#"xmlns:GSpherical="http://ns.google.com/videos/1.0/spherical/" "#,
        r#"GSpherical:Spherical="true" GSpherical:Stitched="false" "#,
        r#"GSpherical:StereoMode="TOP-BOTTOM"/>"#,
        "\0"
    );
    let m = spherical::decode(xml.as_bytes()).unwrap();
    assert!(m.spherical);
    assert!(!m.stitched);
    assert_eq!(m.stitching_software, None);
    assert_eq!(m.projection_type, EQUIRECTANGULAR);
    assert_eq!(m.stereo_mode, StereoMode::TopBottom);
    assert_eq!(m.crop, None);
}

#[test]
fn decode_rejects_wrong_root() {
    let err = spherical::decode(b"<?xml version=\"1.0\"?><Other><Spherical>true</Spherical></Other>").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));

    assert!(matches!(spherical::decode(b"").unwrap_err(), Error::Parse(_)));
}

#[test]
fn decode_rejects_partial_crop() {
    let xml = concat!(
        r#"<rdf:SphericalVideo xmlns:rdf="r" xmlns:GSpherical="g">"#,
        "<GSpherical:Spherical>true</GSpherical:Spherical>",
        "<GSpherical:CroppedAreaImageWidthPixels>10</GSpherical:CroppedAreaImageWidthPixels>",
        "</rdf:SphericalVideo>"
    );
    assert!(matches!(spherical::decode(xml.as_bytes()).unwrap_err(), Error::Parse(_)));
}

#[test]
fn crop_outside_full_pano_is_rejected() {
    let err = Crop::new(100, 100, 200, 200, 150, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidCrop(_)));

    assert!(Crop::new(100, 100, 200, 200, 50, 50).is_ok());
    assert!(Crop::new(200, 200, 200, 200, 0, 0).is_ok());
    assert!(matches!(Crop::new(300, 100, 200, 200, 0, 0), Err(Error::InvalidCrop(_))));
    assert!(matches!(Crop::new(100, 100, 200, 200, 0, 101), Err(Error::InvalidCrop(_))));
    // left + width must not wrap around
    assert!(matches!(Crop::new(10, 10, 100, 100, u32::MAX, 0), Err(Error::InvalidCrop(_))));
}

#[test]
fn crop_string_parsing() {
    let crop: Crop = "2048:1024:3186:1482:100:100".parse().unwrap();
    assert_eq!(crop, Crop::new(2048, 1024, 3186, 1482, 100, 100).unwrap());
    assert_eq!(crop.to_string(), "2048:1024:3186:1482:100:100");

    for bad in ["", "1:2:3:4:5", "1:2:3:4:5:6:7", "a:1:1:1:0:0", "-1:1:1:1:0:0", "1:1:1:1:0:", "99999999999:1:1:1:0:0"]
    {
        assert!(matches!(bad.parse::<Crop>(), Err(Error::InvalidCrop(_))), "accepted {bad:?}");
    }
    assert!(matches!("100:100:200:200:150:0".parse::<Crop>(), Err(Error::InvalidCrop(_))));

    let zero: Crop = "0:0:0:0:0:0".parse().unwrap();
    assert!(zero.is_empty());
}

#[test]
fn stereo_mode_parsing() {
    assert_eq!("none".parse::<StereoMode>().unwrap(), StereoMode::None);
    assert_eq!("mono".parse::<StereoMode>().unwrap(), StereoMode::None);
    assert_eq!("Top-Bottom".parse::<StereoMode>().unwrap(), StereoMode::TopBottom);
    assert_eq!("left-right".parse::<StereoMode>().unwrap(), StereoMode::LeftRight);
    assert!("side-by-side".parse::<StereoMode>().is_err());
    assert_eq!(StereoMode::LeftRight.to_string(), "left-right");
}
