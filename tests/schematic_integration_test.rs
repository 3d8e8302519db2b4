use assert_matches::assert_matches;
use schemkit::nbt::{Compound, Compression, Endianness, NbtFile};
use schemkit::open::{self, ReadOptions, Target, WriteOptions};
use schemkit::{
    detect, BlockEntity, BlockPos, BlockState, Dimensions, FormatKind, LogSeverity, MemoryLogger,
    NullLogger, Palette, Region, SchemError, Schematic,
};
use std::io::Write;

const TARGETS: [Target; 5] = [
    Target::Sponge(1),
    Target::Sponge(2),
    Target::Sponge(3),
    Target::Litematica,
    Target::Schematica,
];

fn sample_schematic() -> Schematic {
    let palette = Palette::from_tokens([
        BlockState::new("minecraft:air"),
        BlockState::new("minecraft:stone"),
        BlockState::new("minecraft:dirt"),
        BlockState::new("minecraft:chest"),
    ]);
    let size = Dimensions::new(3, 2, 2);
    let blocks = (0..size.volume() as u32).map(|i| i % 4).collect();
    let mut region = Region::new("main", BlockPos::ORIGIN, size, palette, blocks).unwrap();
    let mut data = Compound::new();
    data.insert("CustomName", "\"loot\"");
    region.block_entities.push(BlockEntity {
        position: BlockPos::new(0, 1, 0),
        id: "minecraft:chest".to_string(),
        data,
    });
    let mut schematic = Schematic::new(FormatKind::Sponge, vec![region]);
    schematic.metadata.name = Some("sample".to_string());
    schematic.metadata.author = Some("tester".to_string());
    schematic
}

fn assert_same_blocks(decoded: &Schematic, original: &Schematic) {
    let size = original.dimensions();
    assert_eq!(decoded.dimensions(), size);
    for y in 0..size.height as i32 {
        for z in 0..size.length as i32 {
            for x in 0..size.width as i32 {
                assert_eq!(
                    decoded.block(x, y, z),
                    original.block(x, y, z),
                    "block at {} {} {}",
                    x,
                    y,
                    z
                );
            }
        }
    }
}

fn encode(schematic: &Schematic, options: &WriteOptions) -> Vec<u8> {
    let mut buffer = Vec::new();
    open::write_schematic(&mut buffer, schematic, options, &NullLogger).unwrap();
    buffer
}

#[test]
fn test_round_trip_every_format_endianness_and_compression() {
    let original = sample_schematic();
    for target in TARGETS {
        for endianness in [Endianness::Big, Endianness::Little] {
            for compression in [Compression::Gzip, Compression::None] {
                let options = WriteOptions {
                    nbt: schemkit::nbt::WriteOptions {
                        endianness,
                        compression,
                    },
                    target,
                };
                let bytes = encode(&original, &options);
                assert_eq!(
                    bytes.starts_with(&[0x1F, 0x8B]),
                    compression == Compression::Gzip
                );

                let read_options = ReadOptions {
                    nbt: schemkit::nbt::ReadOptions {
                        endianness,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                let decoded =
                    open::read_schematic(bytes.as_slice(), &read_options, &NullLogger).unwrap();
                assert_eq!(decoded.format, target.kind());
                assert_same_blocks(&decoded, &original);

                let block_entities = decoded.block_entities();
                assert_eq!(block_entities.len(), 1, "{}", target);
                assert_eq!(block_entities[0].position, BlockPos::new(0, 1, 0));
                assert_eq!(block_entities[0].id, "minecraft:chest");
            }
        }
    }
}

#[test]
fn test_encoded_roots_are_detected() {
    let original = sample_schematic();
    for target in TARGETS {
        let file = target.encode(&original, &NullLogger).unwrap();
        assert_eq!(detect(&file.root), Some(target.kind()), "{}", target);
    }
}

#[test]
fn test_metadata_survives_sponge_and_litematica() {
    let original = sample_schematic();
    for target in [Target::Sponge(2), Target::Sponge(3), Target::Litematica] {
        let bytes = encode(
            &original,
            &WriteOptions {
                target,
                ..Default::default()
            },
        );
        let decoded =
            open::read_schematic(bytes.as_slice(), &ReadOptions::default(), &NullLogger).unwrap();
        assert_eq!(decoded.metadata.name.as_deref(), Some("sample"));
        assert_eq!(decoded.metadata.author.as_deref(), Some("tester"));
    }
}

#[test]
fn test_unknown_root_is_no_decoder_found() {
    let mut root = Compound::new();
    root.insert("Level", Compound::new());
    let bytes = NbtFile::new("", root)
        .to_bytes(&Default::default())
        .unwrap();
    assert_matches!(
        open::read_schematic(bytes.as_slice(), &ReadOptions::default(), &NullLogger),
        Err(SchemError::NoDecoderFound)
    );
}

#[test]
fn test_truncated_stream_is_malformed() {
    let options = WriteOptions {
        nbt: schemkit::nbt::WriteOptions {
            endianness: Endianness::Big,
            compression: Compression::None,
        },
        target: Target::Sponge(2),
    };
    let bytes = encode(&sample_schematic(), &options);
    let cut = &bytes[..bytes.len() / 2];
    assert_matches!(
        open::read_schematic(cut, &ReadOptions::default(), &NullLogger),
        Err(SchemError::MalformedWire(_))
    );
}

#[test]
fn test_strict_versions_reject_newer_sponge() {
    let file = Target::Sponge(3)
        .encode(&sample_schematic(), &NullLogger)
        .unwrap();
    let mut inner = file.root.get_compound("Schematic").unwrap().clone();
    inner.insert("Version", 4i32);
    let mut root = Compound::new();
    root.insert("Schematic", inner);

    let logger = MemoryLogger::new();
    let decoded = open::decode_root(&root, &ReadOptions::default(), &logger).unwrap();
    assert_eq!(decoded.version, Some(4));
    assert_eq!(logger.messages_at(LogSeverity::Warning).len(), 1);
    assert_same_blocks(&decoded, &sample_schematic());

    let strict = ReadOptions {
        strict_versions: true,
        ..Default::default()
    };
    assert_matches!(
        open::decode_root(&root, &strict, &NullLogger),
        Err(SchemError::UnsupportedVersion { version: 4, newest: 3, .. })
    );
}

#[test]
fn test_multi_region_litematica_converts_to_sponge() {
    let stone = Palette::from_tokens([
        BlockState::new("minecraft:air"),
        BlockState::new("minecraft:stone"),
    ]);
    let glass = Palette::from_tokens([
        BlockState::new("minecraft:air"),
        BlockState::new("minecraft:glass"),
    ]);
    let left = Region::new(
        "left",
        BlockPos::ORIGIN,
        Dimensions::new(2, 1, 1),
        stone,
        vec![1, 1],
    )
    .unwrap();
    let right = Region::new(
        "right",
        BlockPos::new(3, 0, 0),
        Dimensions::new(1, 2, 1),
        glass,
        vec![1, 0],
    )
    .unwrap();
    let source = Schematic::new(FormatKind::Litematica, vec![left, right]);

    let litematic = encode(
        &source,
        &WriteOptions {
            target: Target::Litematica,
            ..Default::default()
        },
    );
    let decoded =
        open::read_schematic(litematic.as_slice(), &ReadOptions::default(), &NullLogger).unwrap();
    assert_eq!(decoded.regions.len(), 2);

    let sponge = encode(&decoded, &WriteOptions::default());
    let converted =
        open::read_schematic(sponge.as_slice(), &ReadOptions::default(), &NullLogger).unwrap();
    assert_eq!(converted.format, FormatKind::Sponge);
    assert_eq!(converted.regions.len(), 1);
    assert_eq!(converted.dimensions(), Dimensions::new(4, 2, 1));
    assert_same_blocks(&converted, &source);
    assert!(converted.block(2, 0, 0).is_air());
    assert_eq!(converted.block(3, 0, 0).name, "minecraft:glass");
}

#[test]
fn test_negative_litematica_position_keeps_coordinates_across_formats() {
    let palette = Palette::from_tokens([
        BlockState::new("minecraft:air"),
        BlockState::new("minecraft:chest"),
    ]);
    let mut region = Region::new(
        "shifted",
        BlockPos::new(-2, 0, 0),
        Dimensions::new(2, 1, 1),
        palette,
        vec![1, 0],
    )
    .unwrap();
    region.block_entities.push(BlockEntity {
        position: BlockPos::ORIGIN,
        id: "minecraft:chest".to_string(),
        data: Compound::new(),
    });
    let source = Schematic::new(FormatKind::Litematica, vec![region]);
    let litematic = encode(
        &source,
        &WriteOptions {
            target: Target::Litematica,
            ..Default::default()
        },
    );
    let decoded =
        open::read_schematic(litematic.as_slice(), &ReadOptions::default(), &NullLogger).unwrap();
    assert_eq!(decoded.regions[0].position, BlockPos::new(-2, 0, 0));

    for target in [Target::Sponge(3), Target::Schematica] {
        let bytes = encode(
            &decoded,
            &WriteOptions {
                target,
                ..Default::default()
            },
        );
        let converted =
            open::read_schematic(bytes.as_slice(), &ReadOptions::default(), &NullLogger).unwrap();
        assert_same_blocks(&converted, &decoded);
        assert_eq!(converted.block(0, 0, 0).name, "minecraft:chest");
        assert_eq!(converted.block(-2, 0, 0), decoded.block(-2, 0, 0));

        for schematic in [&decoded, &converted] {
            let block_entities = schematic.block_entities();
            assert_eq!(block_entities.len(), 1);
            let at = block_entities[0].position;
            assert_eq!(schematic.block(at.x, at.y, at.z).name, "minecraft:chest");
        }
    }
}

#[test]
fn test_read_file_uses_content_before_extension() {
    let bytes = encode(
        &sample_schematic(),
        &WriteOptions {
            target: Target::Litematica,
            ..Default::default()
        },
    );
    let mut file = tempfile::Builder::new().suffix(".schem").tempfile().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let decoded = open::read_file(file.path(), &ReadOptions::default(), &NullLogger).unwrap();
    assert_eq!(decoded.format, FormatKind::Litematica);
}

#[test]
fn test_write_then_read_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.schematic");
    let original = sample_schematic();
    let options = WriteOptions {
        target: Target::Schematica,
        ..Default::default()
    };
    open::write_file(&path, &original, &options, &NullLogger).unwrap();

    let decoded = open::read_file(&path, &ReadOptions::default(), &NullLogger).unwrap();
    assert_eq!(decoded.format, FormatKind::Schematica);
    assert_same_blocks(&decoded, &original);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert_matches!(
        open::read_file(
            dir.path().join("missing.schem"),
            &ReadOptions::default(),
            &NullLogger
        ),
        Err(SchemError::Io(_))
    );
}

#[tokio::test]
async fn test_read_file_async() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("async.schem");
    let original = sample_schematic();
    open::write_file(&path, &original, &WriteOptions::default(), &NullLogger).unwrap();

    let decoded = open::read_file_async(&path, &ReadOptions::default(), &NullLogger)
        .await
        .unwrap();
    assert_eq!(decoded.format, FormatKind::Sponge);
    assert_eq!(decoded.version, Some(3));
    assert_same_blocks(&decoded, &original);
}
