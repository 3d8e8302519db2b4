//! Legacy Schematica / MCEdit schematics (`.schematic`).
//!
//! Blocks are numeric ids split into a `Blocks` byte array plus optional high bits
//! (`AddBlocks` nibbles or the older one-byte-per-block `Add`), with a 4-bit metadata value
//! per block in `Data`. `SchematicaMapping` names the numeric ids. Ids without a mapping
//! become `legacy:<id>`, and a non-zero metadata value becomes the `data` property.

use crate::block_state::{BlockState, AIR_ID};
use crate::fields::*;
use crate::format::{DecodeContext, SchematicCodec};
use crate::packing::nibble::{self, AddBlocks};
use crate::palette::Palette;
use crate::schematic::{BlockEntity, Entity, FormatKind, Region, Schematic};
use schemkit_common::{BlockPos, Dimensions, Result, SchemError};
use schemkit_logger::Logger;
use schemkit_nbt::{Compound, List, NbtFile, Tag};
use std::collections::{HashMap, HashSet};

const ROOT: &str = "Schematic";
const MATERIALS: &str = "Alpha";
const LEGACY_PREFIX: &str = "legacy:";
const DATA_PROPERTY: &str = "data";
/// Ids are 12 bits wide once `AddBlocks` is applied
const MAX_BLOCK_ID: u16 = 0x0FFF;

const KNOWN_ROOT: &[&str] = &[
    "Width",
    "Height",
    "Length",
    "Materials",
    "Blocks",
    "Data",
    "AddBlocks",
    "Add",
    "SchematicaMapping",
    "TileEntities",
    "Entities",
    "WEOffsetX",
    "WEOffsetY",
    "WEOffsetZ",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schematica;

impl SchematicCodec for Schematica {
    fn kind(&self) -> FormatKind {
        FormatKind::Schematica
    }

    fn matches(&self, root: &Compound) -> bool {
        root.get_compound("SchematicaMapping").is_some()
            || (matches!(root.get("Blocks"), Some(Tag::ByteArray(_)))
                && (root.contains_key("Materials") || root.contains_key("Data")))
    }

    fn decode(&self, root: &Compound, ctx: &DecodeContext) -> Result<Schematic> {
        let size = Dimensions::new(
            require_extent(root, ROOT, "Width")?,
            require_extent(root, ROOT, "Height")?,
            require_extent(root, ROOT, "Length")?,
        );
        let volume = size.volume();

        let materials = root.get_str("Materials");
        if !materials.is_empty() && materials != MATERIALS {
            ctx.logger.warning(&format!(
                "materials {:?} are not {:?}, block ids may be misread",
                materials, MATERIALS
            ));
        }

        let blocks = require_byte_array(root, ROOT, "Blocks")?;
        if blocks.len() < volume {
            return Err(SchemError::MalformedWire(format!(
                "Blocks holds {} ids for a {} schematic",
                blocks.len(),
                size
            )));
        }
        let add = match (
            root.get("AddBlocks").and_then(Tag::as_byte_array),
            root.get("Add").and_then(Tag::as_byte_array),
        ) {
            (Some(packed), _) => Some(AddBlocks::Packed(packed)),
            (None, Some(per_block)) => Some(AddBlocks::PerBlock(per_block)),
            (None, None) => None,
        };
        let ids = nibble::merge_block_ids(&blocks[..volume], add)?;

        let data = root.get_byte_array("Data");
        if !data.is_empty() && data.len() < volume {
            return Err(SchemError::MalformedWire(format!(
                "Data holds {} values for a {} schematic",
                data.len(),
                size
            )));
        }

        let mapping = read_mapping(root.get_compound("SchematicaMapping"), ctx.logger);
        let mut palette = Palette::new();
        let mut lookup: HashMap<(u16, u8), u32> = HashMap::new();
        let indices = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                let meta = data.get(i).map_or(0, |&d| d as u8 & 0x0F);
                *lookup
                    .entry((id, meta))
                    .or_insert_with(|| palette.get_or_insert(legacy_state(id, meta, &mapping)))
            })
            .collect();

        let mut region = Region::new("", BlockPos::ORIGIN, size, palette, indices)?;
        if let Some(list) = root.get_list("TileEntities") {
            region.block_entities = read_block_entities(list)?;
        }
        if let Some(list) = root.get_list("Entities") {
            region.entities = read_entities(list)?;
        }

        let mut schematic = Schematic::new(FormatKind::Schematica, vec![region]);
        schematic.offset = BlockPos::new(
            root.get_int("WEOffsetX"),
            root.get_int("WEOffsetY"),
            root.get_int("WEOffsetZ"),
        );
        schematic.extra = unknown_keys(root, KNOWN_ROOT);
        Ok(schematic)
    }

    fn encode(&self, schematic: &Schematic, logger: &dyn Logger) -> Result<NbtFile> {
        let region = schematic.flatten()?;
        let (palette, blocks) = region.compacted();
        let entries = palette.entries();

        // explicit legacy ids are reserved before names get fresh ones
        let mut used: HashSet<u16> = HashSet::from([0]);
        for (_, state) in &entries {
            if let Some(id) = legacy_id(state) {
                used.insert(id);
            }
        }

        let mut mapping: HashMap<String, u16> = HashMap::new();
        mapping.insert(AIR_ID.to_string(), 0);
        let mut next_id: u16 = 1;
        let mut dropped_properties = 0usize;
        let mut keys: HashMap<u32, (u16, u8)> = HashMap::new();

        for (index, state) in &entries {
            let id = if state.is_air() {
                0
            } else if let Some(id) = legacy_id(state) {
                id
            } else if let Some(&id) = mapping.get(&state.name) {
                id
            } else {
                while used.contains(&next_id) {
                    next_id += 1;
                }
                if next_id > MAX_BLOCK_ID {
                    return Err(SchemError::Unencodable(format!(
                        "more than {} distinct blocks",
                        MAX_BLOCK_ID
                    )));
                }
                used.insert(next_id);
                mapping.insert(state.name.clone(), next_id);
                next_id
            };
            let meta = state
                .property(DATA_PROPERTY)
                .and_then(|v| v.parse::<u8>().ok())
                .filter(|v| *v <= 0x0F)
                .unwrap_or(0);
            dropped_properties += state
                .properties
                .keys()
                .filter(|k| k.as_str() != DATA_PROPERTY)
                .count();
            keys.insert(*index, (id, meta));
        }
        if dropped_properties > 0 {
            logger.warning(&format!(
                "Schematica stores no block properties, {} were dropped",
                dropped_properties
            ));
        }

        let mut ids = Vec::with_capacity(blocks.len());
        let mut data = Vec::with_capacity(blocks.len());
        for index in &blocks {
            let (id, meta) = keys.get(index).copied().unwrap_or((0, 0));
            ids.push(id);
            data.push(meta as i8);
        }
        let (block_bytes, add_blocks) = nibble::split_block_ids(&ids);

        let mut root = Compound::new();
        root.insert("Width", extent_tag(region.size.width, "Width")?);
        root.insert("Height", extent_tag(region.size.height, "Height")?);
        root.insert("Length", extent_tag(region.size.length, "Length")?);
        root.insert("Materials", MATERIALS);
        root.insert("Blocks", block_bytes);
        root.insert("Data", data);
        if let Some(add_blocks) = add_blocks {
            root.insert("AddBlocks", add_blocks);
        }
        root.insert(
            "SchematicaMapping",
            mapping
                .into_iter()
                .map(|(name, id)| (name, Tag::Short(id as i16)))
                .collect::<Compound>(),
        );
        root.insert(
            "TileEntities",
            compound_list(region.block_entities.iter().map(|be| {
                let mut tile = xyz_compound(be.position);
                if !be.id.is_empty() {
                    tile.insert("id", be.id.as_str());
                }
                merge_missing(&mut tile, &be.data);
                tile
            }))?,
        );
        let mut entities = Vec::with_capacity(region.entities.len());
        for entity in &region.entities {
            let mut compound = Compound::new();
            compound.insert("Pos", vec3_list(entity.position)?);
            if !entity.id.is_empty() {
                compound.insert("id", entity.id.as_str());
            }
            merge_missing(&mut compound, &entity.data);
            entities.push(compound);
        }
        root.insert("Entities", compound_list(entities)?);

        let offset = schematic.offset + region.position;
        root.insert("WEOffsetX", offset.x);
        root.insert("WEOffsetY", offset.y);
        root.insert("WEOffsetZ", offset.z);
        if schematic.format == FormatKind::Schematica {
            merge_missing(&mut root, &schematic.extra);
        }
        Ok(NbtFile::new(ROOT, root))
    }
}

/// Id encoded in a `legacy:<id>` name
fn legacy_id(state: &BlockState) -> Option<u16> {
    state
        .name
        .strip_prefix(LEGACY_PREFIX)
        .and_then(|id| id.parse::<u16>().ok())
        .filter(|id| *id <= MAX_BLOCK_ID)
}

fn legacy_state(id: u16, meta: u8, mapping: &HashMap<u16, String>) -> BlockState {
    let name = match mapping.get(&id) {
        Some(name) => name.clone(),
        None if id == 0 => AIR_ID.to_string(),
        None => format!("{}{}", LEGACY_PREFIX, id),
    };
    let state = BlockState::new(name);
    if meta != 0 {
        state.with_property(DATA_PROPERTY, meta.to_string())
    } else {
        state
    }
}

fn read_mapping(mapping: Option<&Compound>, logger: &dyn Logger) -> HashMap<u16, String> {
    let mut ids = HashMap::new();
    let Some(mapping) = mapping else {
        return ids;
    };
    for (name, tag) in mapping {
        match tag.as_integer().and_then(|id| u16::try_from(id).ok()) {
            Some(id) if id <= MAX_BLOCK_ID => {
                ids.insert(id, name.clone());
            }
            _ => logger.warning(&format!("ignoring mapping {:?} -> {}", name, tag)),
        }
    }
    ids
}

fn read_block_entities(list: &List) -> Result<Vec<BlockEntity>> {
    list.compounds()
        .enumerate()
        .map(|(i, compound)| {
            let context = format!("TileEntities[{}]", i);
            Ok(BlockEntity {
                position: BlockPos::new(
                    require_int(compound, &context, "x")?,
                    require_int(compound, &context, "y")?,
                    require_int(compound, &context, "z")?,
                ),
                id: compound.get_str("id").to_string(),
                data: unknown_keys(compound, &["x", "y", "z", "id"]),
            })
        })
        .collect()
}

fn read_entities(list: &List) -> Result<Vec<Entity>> {
    list.compounds()
        .enumerate()
        .map(|(i, compound)| {
            let context = format!("Entities[{}]", i);
            Ok(Entity::new(
                require_vec3(compound, &context, "Pos")?,
                compound.get_str("id"),
                unknown_keys(compound, &["Pos", "id"]),
            ))
        })
        .collect()
}
