//! Sponge schematics (`.schem`), versions 1 to 3.
//!
//! Versions 1 and 2 keep everything at the root, store blocks as a varint stream in
//! `BlockData` and biomes as one entry per column. Version 3 nests everything under a
//! `Schematic` compound, wraps blocks and biomes in `Blocks`/`Biomes` containers and stores
//! biomes per block. Block entity and entity payloads move under a `Data` sub-compound.

use crate::block_state::BlockState;
use crate::fields::*;
use crate::format::{DecodeContext, SchematicCodec, DEFAULT_DATA_VERSION};
use crate::packing::varint;
use crate::palette::Palette;
use crate::schematic::{
    BiomeGrid, BiomeLayout, BlockEntity, Entity, FormatKind, Metadata, Region, Schematic,
};
use schemkit_common::{BlockPos, Dimensions, Result, SchemError};
use schemkit_logger::Logger;
use schemkit_nbt::{Compound, List, NbtFile, Tag};

pub const NEWEST_VERSION: i32 = 3;
const OLDEST_VERSION: i32 = 1;
const FORMAT: &str = "Sponge";
const ROOT: &str = "Schematic";

const KNOWN_V1: &[&str] = &[
    "Version",
    "DataVersion",
    "Metadata",
    "Width",
    "Height",
    "Length",
    "Offset",
    "PaletteMax",
    "Palette",
    "BlockData",
    "TileEntities",
];
const KNOWN_V2: &[&str] = &[
    "Version",
    "DataVersion",
    "Metadata",
    "Width",
    "Height",
    "Length",
    "Offset",
    "PaletteMax",
    "Palette",
    "BlockData",
    "BlockEntities",
    "TileEntities",
    "Entities",
    "BiomePaletteMax",
    "BiomePalette",
    "BiomeData",
];
const KNOWN_V3: &[&str] = &[
    "Version",
    "DataVersion",
    "Metadata",
    "Width",
    "Height",
    "Length",
    "Offset",
    "Blocks",
    "Biomes",
    "Entities",
];
const KNOWN_METADATA: &[&str] = &["Name", "Author", "Date", "RequiredMods"];

/// Sponge codec. Decoding accepts every known version; `version` selects the layout written
/// by `encode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sponge {
    pub version: i32,
}

impl Sponge {
    pub const fn new(version: i32) -> Self {
        Sponge { version }
    }
}

impl Default for Sponge {
    fn default() -> Self {
        Sponge::new(NEWEST_VERSION)
    }
}

/// Version 3 files wrap the schematic in a `Schematic` compound below an unnamed root
fn schematic_root(root: &Compound) -> &Compound {
    match root.get_compound(ROOT) {
        Some(inner) if !root.contains_key("Version") => inner,
        _ => root,
    }
}

impl SchematicCodec for Sponge {
    fn kind(&self) -> FormatKind {
        FormatKind::Sponge
    }

    fn matches(&self, root: &Compound) -> bool {
        let root = schematic_root(root);
        if !root.contains_key("Version") || root.contains_key("Regions") {
            return false;
        }
        (root.contains_key("BlockData") && root.contains_key("Palette"))
            || root.get_compound("Blocks").is_some()
            || (optional_int(root, "Version").unwrap_or(0) >= 3 && root.contains_key("Width"))
    }

    fn decode(&self, root: &Compound, ctx: &DecodeContext) -> Result<Schematic> {
        let root = schematic_root(root);
        let raw_version = require_int(root, ROOT, "Version")?;
        let version = ctx.check_version(FORMAT, raw_version, OLDEST_VERSION, NEWEST_VERSION)?;

        let data_version = if version >= 2 {
            Some(require_int(root, ROOT, "DataVersion")?)
        } else {
            optional_int(root, "DataVersion")
        };
        let size = Dimensions::new(
            require_extent(root, ROOT, "Width")?,
            require_extent(root, ROOT, "Height")?,
            require_extent(root, ROOT, "Length")?,
        );
        let offset = match root.get("Offset") {
            None => BlockPos::ORIGIN,
            Some(tag) => match tag.as_int_array().and_then(BlockPos::from_slice) {
                Some(pos) => pos,
                None => {
                    ctx.logger
                        .warning(&format!("ignoring malformed Sponge offset {}", tag));
                    BlockPos::ORIGIN
                }
            },
        };

        let mut region = if version < 3 {
            decode_blocks(root, ROOT, "Palette", "BlockData", size)?
        } else {
            match root.get_compound("Blocks") {
                Some(blocks) => decode_blocks(blocks, "Schematic.Blocks", "Palette", "Data", size)?,
                None => Region::empty("", BlockPos::ORIGIN, size),
            }
        };
        if let Some(max) = optional_int(root, "PaletteMax") {
            if max as usize != region.palette.size() {
                ctx.logger.debug(&format!(
                    "PaletteMax is {} but the palette spans {} entries",
                    max,
                    region.palette.size()
                ));
            }
        }

        match version {
            1 => {
                region.block_entities =
                    read_block_entities(root.get_list("TileEntities"), "TileEntities", false)?;
            }
            2 => {
                region.biomes = decode_biomes_v2(root, size)?;
                let (list, context) = match root.get_list("BlockEntities") {
                    Some(list) => (Some(list), "BlockEntities"),
                    None => (root.get_list("TileEntities"), "TileEntities"),
                };
                region.block_entities = read_block_entities(list, context, false)?;
                region.entities = read_entities(root.get_list("Entities"), false)?;
            }
            _ => {
                region.biomes = match root.get_compound("Biomes") {
                    Some(biomes) => Some(decode_biomes(
                        biomes,
                        "Schematic.Biomes",
                        "Palette",
                        "Data",
                        BiomeLayout::Volume,
                        size,
                    )?),
                    None => None,
                };
                let list = root
                    .get_compound("Blocks")
                    .and_then(|blocks| blocks.get_list("BlockEntities"));
                region.block_entities = read_block_entities(list, "Blocks.BlockEntities", true)?;
                region.entities = read_entities(root.get_list("Entities"), true)?;
            }
        }

        let known = match version {
            1 => KNOWN_V1,
            2 => KNOWN_V2,
            _ => KNOWN_V3,
        };
        Ok(Schematic {
            format: FormatKind::Sponge,
            version: Some(raw_version),
            sub_version: None,
            data_version,
            metadata: read_metadata(root.get_compound("Metadata")),
            offset,
            regions: vec![region],
            extra: unknown_keys(root, known),
        })
    }

    fn encode(&self, schematic: &Schematic, logger: &dyn Logger) -> Result<NbtFile> {
        let version = self.version;
        if !(OLDEST_VERSION..=NEWEST_VERSION).contains(&version) {
            return Err(SchemError::Unencodable(format!(
                "Sponge version {} is not writable",
                version
            )));
        }
        if schematic.regions.len() > 1 {
            logger.info(&format!(
                "flattening {} regions into one Sponge region",
                schematic.regions.len()
            ));
        }
        let region = schematic.flatten()?;
        let (palette, blocks) = region.compacted();

        let mut root = Compound::new();
        root.insert("Version", version);
        match schematic.data_version {
            Some(data_version) => {
                root.insert("DataVersion", data_version);
            }
            None if version >= 2 => {
                logger.info(&format!(
                    "no data version recorded, writing {}",
                    DEFAULT_DATA_VERSION
                ));
                root.insert("DataVersion", DEFAULT_DATA_VERSION);
            }
            None => {}
        }
        root.insert("Width", extent_tag(region.size.width, "Width")?);
        root.insert("Height", extent_tag(region.size.height, "Height")?);
        root.insert("Length", extent_tag(region.size.length, "Length")?);
        root.insert("Offset", (schematic.offset + region.position).to_array().to_vec());

        let metadata = write_metadata(schematic)?;
        if !metadata.is_empty() {
            root.insert("Metadata", metadata);
        }

        let palette_tag = palette_compound(&palette);
        let block_data = varint::encode_varints(&blocks);

        if version < 3 {
            root.insert("PaletteMax", palette.size() as i32);
            root.insert("Palette", palette_tag);
            root.insert("BlockData", block_data);
            let block_entities = write_block_entities(&region.block_entities, false)?;
            if version == 1 {
                root.insert("TileEntities", block_entities);
                if !region.entities.is_empty() || region.biomes.is_some() {
                    logger.warning("Sponge version 1 has no entities or biomes, dropping them");
                }
            } else {
                root.insert("BlockEntities", block_entities);
                root.insert("Entities", write_entities(&region.entities, false)?);
                if let Some(biomes) = &region.biomes {
                    let data = biomes.to_flat(&region.size);
                    root.insert("BiomePaletteMax", biomes.palette.size() as i32);
                    root.insert("BiomePalette", biome_palette_compound(&biomes.palette));
                    root.insert("BiomeData", varint::encode_varints(&data));
                }
            }
        } else {
            let mut container = Compound::new();
            container.insert("Palette", palette_tag);
            container.insert("Data", block_data);
            container.insert(
                "BlockEntities",
                write_block_entities(&region.block_entities, true)?,
            );
            root.insert("Blocks", container);

            if let Some(biomes) = &region.biomes {
                let data = biomes.to_volume(&region.size);
                let mut container = Compound::new();
                container.insert("Palette", biome_palette_compound(&biomes.palette));
                container.insert("Data", varint::encode_varints(&data));
                root.insert("Biomes", container);
            }
            root.insert("Entities", write_entities(&region.entities, true)?);
        }

        if schematic.format == FormatKind::Sponge {
            merge_missing(&mut root, &schematic.extra);
        }

        if version < 3 {
            Ok(NbtFile::new(ROOT, root))
        } else {
            let mut outer = Compound::new();
            outer.insert(ROOT, root);
            Ok(NbtFile::new("", outer))
        }
    }
}

fn read_palette<T, F>(palette: &Compound, context: &str, parse: F) -> Result<Palette<T>>
where
    T: Eq + std::hash::Hash + Clone,
    F: Fn(&str) -> Result<T>,
{
    let mut result = Palette::new();
    for (key, tag) in palette {
        let index = palette_index(tag, context, key)?;
        result.put(index, parse(key)?);
    }
    Ok(result)
}

fn decode_blocks(
    container: &Compound,
    context: &str,
    palette_key: &str,
    data_key: &str,
    size: Dimensions,
) -> Result<Region> {
    let palette = read_palette(
        require_compound(container, context, palette_key)?,
        palette_key,
        |key| key.parse::<BlockState>(),
    )?;
    let data = require_byte_array(container, context, data_key)?;
    let blocks = varint::decode_varints(data, size.volume())?;
    Region::new("", BlockPos::ORIGIN, size, palette, blocks)
}

fn decode_biomes(
    container: &Compound,
    context: &str,
    palette_key: &str,
    data_key: &str,
    layout: BiomeLayout,
    size: Dimensions,
) -> Result<BiomeGrid> {
    let palette = read_palette(
        require_compound(container, context, palette_key)?,
        palette_key,
        |key| Ok(key.to_string()),
    )?;
    let count = match layout {
        BiomeLayout::Flat => size.area(),
        BiomeLayout::Volume => size.volume(),
    };
    let data = require_byte_array(container, context, data_key)?;
    let indices = varint::decode_varints(data, count)?;
    BiomeGrid::new(palette, indices, layout, size)
}

fn decode_biomes_v2(root: &Compound, size: Dimensions) -> Result<Option<BiomeGrid>> {
    if !root.contains_key("BiomeData") {
        return Ok(None);
    }
    decode_biomes(
        root,
        ROOT,
        "BiomePalette",
        "BiomeData",
        BiomeLayout::Flat,
        size,
    )
    .map(Some)
}

/// `nested` selects the version 3 shape where the payload lives under `Data`
fn read_block_entities(list: Option<&List>, context: &str, nested: bool) -> Result<Vec<BlockEntity>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    list.compounds()
        .enumerate()
        .map(|(i, compound)| {
            let context = format!("{}[{}]", context, i);
            let position = require_int_pos(compound, &context, "Pos")?;
            let (id, data) = split_payload(compound, nested);
            Ok(BlockEntity { position, id, data })
        })
        .collect()
}

fn read_entities(list: Option<&List>, nested: bool) -> Result<Vec<Entity>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    list.compounds()
        .enumerate()
        .map(|(i, compound)| {
            let context = format!("Entities[{}]", i);
            let position = require_vec3(compound, &context, "Pos")?;
            let (id, data) = split_payload(compound, nested);
            Ok(Entity::new(position, id, data))
        })
        .collect()
}

/// Separates the id from the rest of a block entity or entity compound. Older writers use a
/// lowercase `id`.
fn split_payload(compound: &Compound, nested: bool) -> (String, Compound) {
    let (id, id_key) = match compound.get("Id").and_then(Tag::as_str) {
        Some(id) => (id.to_string(), "Id"),
        None => (compound.get_str("id").to_string(), "id"),
    };
    if nested {
        let mut data = unknown_keys(compound, &["Pos", id_key, "Data"]);
        if let Some(inner) = compound.get_compound("Data") {
            data.extend(inner.clone());
        }
        (id, data)
    } else {
        (id, unknown_keys(compound, &["Pos", id_key]))
    }
}

fn read_metadata(metadata: Option<&Compound>) -> Metadata {
    let Some(metadata) = metadata else {
        return Metadata::default();
    };
    Metadata {
        name: optional_string(metadata, "Name"),
        author: optional_string(metadata, "Author"),
        description: None,
        created: metadata.get("Date").and_then(Tag::as_i64),
        modified: None,
        required_mods: metadata
            .get_list("RequiredMods")
            .map(|mods| {
                mods.iter()
                    .filter_map(Tag::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        extra: unknown_keys(metadata, KNOWN_METADATA),
    }
}

fn write_metadata(schematic: &Schematic) -> Result<Compound> {
    let source = &schematic.metadata;
    let mut metadata = Compound::new();
    if let Some(name) = &source.name {
        metadata.insert("Name", name.as_str());
    }
    if let Some(author) = &source.author {
        metadata.insert("Author", author.as_str());
    }
    if let Some(date) = source.created {
        metadata.insert("Date", date);
    }
    if !source.required_mods.is_empty() {
        metadata.insert("RequiredMods", string_list(&source.required_mods)?);
    }
    if schematic.format == FormatKind::Sponge {
        merge_missing(&mut metadata, &source.extra);
    }
    Ok(metadata)
}

fn palette_compound(palette: &Palette<BlockState>) -> Compound {
    palette
        .entries()
        .into_iter()
        .map(|(index, state)| (state.to_string(), Tag::Int(index as i32)))
        .collect()
}

fn biome_palette_compound(palette: &Palette<String>) -> Compound {
    palette
        .entries()
        .into_iter()
        .map(|(index, biome)| (biome.clone(), Tag::Int(index as i32)))
        .collect()
}

fn write_block_entities(block_entities: &[BlockEntity], nested: bool) -> Result<List> {
    compound_list(block_entities.iter().map(|be| {
        let mut compound = Compound::new();
        compound.insert("Pos", be.position.to_array().to_vec());
        compound.insert("Id", be.id.as_str());
        wrap_payload(compound, &be.data, nested)
    }))
}

fn write_entities(entities: &[Entity], nested: bool) -> Result<List> {
    let mut compounds = Vec::with_capacity(entities.len());
    for entity in entities {
        let mut compound = Compound::new();
        compound.insert("Pos", vec3_list(entity.position)?);
        compound.insert("Id", entity.id.as_str());
        compounds.push(wrap_payload(compound, &entity.data, nested));
    }
    compound_list(compounds)
}

fn wrap_payload(mut compound: Compound, data: &Compound, nested: bool) -> Compound {
    if nested {
        if !data.is_empty() {
            compound.insert("Data", data.clone());
        }
    } else {
        merge_missing(&mut compound, data);
    }
    compound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_state::AIR;
    use assert_matches::assert_matches;
    use schemkit_common::Vec3;
    use schemkit_logger::{LogSeverity, MemoryLogger, NullLogger};

    fn decode(root: &Compound) -> Result<Schematic> {
        Sponge::default().decode(root, &DecodeContext::new(&NullLogger))
    }

    fn one_block_v2() -> Compound {
        let mut palette = Compound::new();
        palette.insert("minecraft:stone", 0i32);
        let mut root = Compound::new();
        root.insert("Version", 2i32);
        root.insert("DataVersion", 3465i32);
        root.insert("Width", 1i16);
        root.insert("Height", 1i16);
        root.insert("Length", 1i16);
        root.insert("Palette", palette);
        root.insert("BlockData", vec![0i8]);
        root
    }

    #[test]
    fn test_single_block_v2() {
        let schematic = decode(&one_block_v2()).unwrap();
        assert_eq!(schematic.version, Some(2));
        assert_eq!(schematic.data_version, Some(3465));
        assert_eq!(schematic.block(0, 0, 0).name, "minecraft:stone");
        assert_eq!(schematic.block(1, 0, 0), &*AIR);
        assert!(Sponge::default().matches(&one_block_v2()));
    }

    #[test]
    fn test_data_version_required_from_v2() {
        let mut root = one_block_v2();
        root.remove("DataVersion");
        match decode(&root) {
            Err(SchemError::MissingRequiredField { field, .. }) => assert_eq!(field, "DataVersion"),
            other => panic!("unexpected {:?}", other),
        }

        root.insert("Version", 1i32);
        let schematic = decode(&root).unwrap();
        assert_eq!(schematic.data_version, None);
        assert_eq!(schematic.block(0, 0, 0).name, "minecraft:stone");
    }

    #[test]
    fn test_missing_block_data() {
        let mut root = one_block_v2();
        root.remove("BlockData");
        assert_matches!(decode(&root), Err(SchemError::MissingRequiredField { .. }));
    }

    #[test]
    fn test_unset_palette_index_is_an_error() {
        let mut root = one_block_v2();
        root.insert("BlockData", vec![3i8]);
        assert_matches!(
            decode(&root),
            Err(SchemError::IndexOutOfRange { index: 3, size: 1 })
        );
    }

    #[test]
    fn test_short_block_data() {
        let mut root = one_block_v2();
        root.insert("Width", 2i16);
        assert_matches!(decode(&root), Err(SchemError::MalformedWire(_)));
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let mut root = one_block_v2();
        root.insert("WorldEditData", "kept");
        let mut metadata = Compound::new();
        metadata.insert("Name", "house");
        metadata.insert("WEOffsetX", 3i32);
        root.insert("Metadata", metadata);

        let schematic = decode(&root).unwrap();
        assert_eq!(schematic.extra.get_str("WorldEditData"), "kept");
        assert_eq!(schematic.extra.len(), 1);
        assert_eq!(schematic.metadata.name.as_deref(), Some("house"));
        assert_eq!(schematic.metadata.extra.get_int("WEOffsetX"), 3);
    }

    #[test]
    fn test_v2_biomes_and_entities() {
        let mut root = one_block_v2();
        root.insert("Width", 2i16);
        root.insert("BlockData", vec![0i8, 0]);
        let mut biomes = Compound::new();
        biomes.insert("minecraft:plains", 0i32);
        biomes.insert("minecraft:desert", 1i32);
        root.insert("BiomePalette", biomes);
        root.insert("BiomeData", vec![1i8, 0]);

        let mut chest = Compound::new();
        chest.insert("Pos", vec![1i32, 0, 0]);
        chest.insert("Id", "minecraft:chest");
        chest.insert("Lock", "");
        root.insert("BlockEntities", compound_list([chest]).unwrap());

        let mut pig = Compound::new();
        pig.insert("Pos", vec3_list(Vec3::new(0.5, 0.0, 0.5)).unwrap());
        pig.insert("Id", "minecraft:pig");
        pig.insert("UUID", vec![1i32, 2, 3, 4]);
        root.insert("Entities", compound_list([pig]).unwrap());

        let schematic = decode(&root).unwrap();
        let region = &schematic.regions[0];
        assert_eq!(schematic.biome(0, 5, 0), None);
        assert_eq!(schematic.biome(0, 0, 0), Some("minecraft:desert"));
        assert_eq!(schematic.biome(1, 0, 0), Some("minecraft:plains"));
        assert_eq!(region.block_entities[0].id, "minecraft:chest");
        assert_eq!(region.block_entities[0].position, BlockPos::new(1, 0, 0));
        assert!(region.block_entities[0].data.contains_key("Lock"));
        assert!(!region.block_entities[0].data.contains_key("Pos"));
        assert_eq!(region.entities[0].id, "minecraft:pig");
        assert!(region.entities[0].uuid.is_some());
    }

    fn one_block_v3(blocks: Option<Compound>) -> Compound {
        let mut inner = Compound::new();
        inner.insert("Version", 3i32);
        inner.insert("DataVersion", 3700i32);
        inner.insert("Width", 1i16);
        inner.insert("Height", 1i16);
        inner.insert("Length", 1i16);
        if let Some(blocks) = blocks {
            inner.insert("Blocks", blocks);
        }
        let mut root = Compound::new();
        root.insert("Schematic", inner);
        root
    }

    #[test]
    fn test_v3_nested_layout() {
        let mut palette = Compound::new();
        palette.insert("minecraft:chest[facing=north]", 0i32);
        let mut payload = Compound::new();
        payload.insert("CustomName", "box");
        let mut chest = Compound::new();
        chest.insert("Pos", vec![0i32, 0, 0]);
        chest.insert("Id", "minecraft:chest");
        chest.insert("Data", payload);
        let mut blocks = Compound::new();
        blocks.insert("Palette", palette);
        blocks.insert("Data", vec![0i8]);
        blocks.insert("BlockEntities", compound_list([chest]).unwrap());

        let root = one_block_v3(Some(blocks));
        assert!(Sponge::default().matches(&root));
        let schematic = decode(&root).unwrap();
        assert_eq!(schematic.version, Some(3));
        assert_eq!(schematic.block(0, 0, 0).property("facing"), Some("north"));
        let chest = &schematic.regions[0].block_entities[0];
        assert_eq!(chest.data.get_str("CustomName"), "box");
        assert!(!chest.data.contains_key("Data"));
    }

    #[test]
    fn test_v3_without_blocks_is_air() {
        let schematic = decode(&one_block_v3(None)).unwrap();
        assert!(schematic.block(0, 0, 0).is_air());
    }

    #[test]
    fn test_newer_version_decodes_with_warning() {
        let mut root = one_block_v3(None);
        if let Some(Tag::Compound(inner)) = root.remove("Schematic") {
            let mut inner = inner;
            inner.insert("Version", 4i32);
            root.insert("Schematic", inner);
        }
        let logger = MemoryLogger::new();
        let schematic = Sponge::default()
            .decode(&root, &DecodeContext::new(&logger))
            .unwrap();
        assert_eq!(schematic.version, Some(4));
        assert_eq!(logger.messages_at(LogSeverity::Warning).len(), 1);
    }

    #[test]
    fn test_version_zero_is_unsupported() {
        let mut root = one_block_v2();
        root.insert("Version", 0i32);
        assert_matches!(
            decode(&root),
            Err(SchemError::UnsupportedVersion { version: 0, .. })
        );
    }

    #[test]
    fn test_encode_decode_each_version() {
        let original = decode(&one_block_v2()).unwrap();
        for version in 1..=3 {
            let file = Sponge::new(version).encode(&original, &NullLogger).unwrap();
            let expected_name = if version == 3 { "" } else { "Schematic" };
            assert_eq!(file.name, expected_name);
            assert!(Sponge::default().matches(&file.root));

            let decoded = decode(&file.root).unwrap();
            assert_eq!(decoded.version, Some(version));
            assert_eq!(decoded.data_version, Some(3465));
            assert_eq!(decoded.dimensions(), original.dimensions());
            assert_eq!(decoded.block(0, 0, 0).name, "minecraft:stone");
        }
    }

    #[test]
    fn test_encode_rejects_oversized_extent() {
        let region = Region::empty("", BlockPos::ORIGIN, Dimensions::new(70000, 1, 1));
        let schematic = Schematic::new(FormatKind::Sponge, vec![region]);
        assert_matches!(
            Sponge::new(2).encode(&schematic, &NullLogger),
            Err(SchemError::Unencodable(_))
        );
    }
}
