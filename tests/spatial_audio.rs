use spatialmedia::spatial_audio::{self, AmbisonicType, ChannelOrdering, Normalization};
use spatialmedia::{Error, SpatialAudioMetadata};

const FIRST_ORDER: [u8; 28] = [
    0, // version
    0, // periphonic
    0, 0, 0, 1, // order
    0, // ACN
    0, // SN3D
    0, 0, 0, 4, // channels
    0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3,
];

#[test]
fn default_descriptor_encodes_to_literal_bytes() {
    let bytes = spatial_audio::encode(&SpatialAudioMetadata::default()).unwrap();
    assert_eq!(bytes, FIRST_ORDER);
}

#[test]
fn decode_literal_bytes() {
    let m = spatial_audio::decode(&FIRST_ORDER).unwrap();
    assert_eq!(m.ambisonic_type, AmbisonicType::Periphonic);
    assert_eq!(m.order, 1);
    assert_eq!(m.channel_ordering, ChannelOrdering::Acn);
    assert_eq!(m.normalization, Normalization::Sn3d);
    assert_eq!(m.channel_map, vec![0, 1, 2, 3]);
    assert_eq!(m, SpatialAudioMetadata::default());
}

#[test]
fn second_order_needs_nine_channels() {
    let mut m = SpatialAudioMetadata { order: 2, ..SpatialAudioMetadata::default() };
    assert_eq!(m.expected_channels().unwrap(), 9);
    assert!(m.encode().is_err());

    m.channel_map = vec![8, 7, 6, 5, 4, 3, 2, 1, 0];
    let bytes = m.encode().unwrap();
    assert_eq!(bytes.len(), 12 + 9 * 4);
    assert_eq!(SpatialAudioMetadata::decode(&bytes).unwrap(), m);
}

#[test]
fn channel_map_must_be_a_permutation() {
    for map in [vec![0, 1, 2], vec![0, 1, 1, 2], vec![0, 1, 2, 4]] {
        let m = SpatialAudioMetadata { channel_map: map.clone(), ..SpatialAudioMetadata::default() };
        assert!(matches!(m.validate(), Err(Error::Parse(_))), "accepted {map:?}");
    }
    let shuffled = SpatialAudioMetadata { channel_map: vec![3, 0, 2, 1], ..SpatialAudioMetadata::default() };
    assert!(shuffled.validate().is_ok());
}

#[test]
fn huge_order_does_not_overflow() {
    let m = SpatialAudioMetadata { order: u32::MAX, ..SpatialAudioMetadata::default() };
    assert!(m.expected_channels().is_err());
}

#[test]
fn decode_rejects_truncation() {
    for len in [0, 1, 5, 11, 12, 27] {
        assert!(matches!(spatial_audio::decode(&FIRST_ORDER[..len]), Err(Error::Parse(_))), "accepted {len} bytes");
    }
}

#[test]
fn decode_rejects_unknown_codes() {
    let mut bad_version = FIRST_ORDER;
    bad_version[0] = 1;
    assert!(matches!(spatial_audio::decode(&bad_version), Err(Error::Parse(_))));

    let mut bad_type = FIRST_ORDER;
    bad_type[1] = 1;
    assert!(matches!(spatial_audio::decode(&bad_type), Err(Error::Parse(_))));

    let mut bad_norm = FIRST_ORDER;
    bad_norm[7] = 1;
    assert!(matches!(spatial_audio::decode(&bad_norm), Err(Error::Parse(_))));
}
