//! Litematica schematics (`.litematic`).
//!
//! A file holds any number of named regions. Each region stores its own palette as a list
//! of `{Name, Properties}` compounds and its blocks in a bit-packed long array whose entry
//! width follows the palette size. Region sizes may be negative on any axis, meaning the
//! region extends from `Position` towards smaller coordinates.

use crate::block_state::{BlockState, AIR};
use crate::fields::*;
use crate::format::{DecodeContext, SchematicCodec, DEFAULT_DATA_VERSION};
use crate::packing::bitpack;
use crate::palette::Palette;
use crate::schematic::{
    BlockEntity, Entity, FormatKind, Metadata, Region, ScheduledTick, Schematic,
};
use schemkit_common::{BlockPos, Dimensions, Result, SchemError};
use schemkit_logger::{time, Logger};
use schemkit_nbt::{Compound, List, NbtFile, Tag};
use std::collections::HashSet;

pub const NEWEST_VERSION: i32 = 7;
const OLDEST_VERSION: i32 = 1;
/// Layout produced by `encode`
pub const WRITE_VERSION: i32 = 6;
const WRITE_SUB_VERSION: i32 = 1;
const FORMAT: &str = "Litematica";
const ROOT: &str = "Litematica";

const KNOWN_ROOT: &[&str] = &[
    "Version",
    "SubVersion",
    "MinecraftDataVersion",
    "Metadata",
    "Regions",
];
const KNOWN_REGION: &[&str] = &[
    "Position",
    "Size",
    "BlockStatePalette",
    "BlockStates",
    "TileEntities",
    "Entities",
    "PendingBlockTicks",
    "PendingFluidTicks",
];
const KNOWN_METADATA: &[&str] = &["Name", "Author", "Description", "TimeCreated", "TimeModified"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Litematica;

impl SchematicCodec for Litematica {
    fn kind(&self) -> FormatKind {
        FormatKind::Litematica
    }

    fn matches(&self, root: &Compound) -> bool {
        root.get_compound("Regions").is_some() && root.contains_key("Version")
    }

    fn decode(&self, root: &Compound, ctx: &DecodeContext) -> Result<Schematic> {
        let raw_version = require_int(root, ROOT, "Version")?;
        ctx.check_version(FORMAT, raw_version, OLDEST_VERSION, NEWEST_VERSION)?;
        let regions_tag = require_compound(root, ROOT, "Regions")?;

        let mut regions = Vec::with_capacity(regions_tag.len());
        for (name, tag) in regions_tag {
            let region = tag
                .as_compound()
                .ok_or_else(|| missing("Regions", name, schemkit_nbt::TagType::Compound))?;
            regions.push(decode_region(name, region)?);
        }

        Ok(Schematic {
            format: FormatKind::Litematica,
            version: Some(raw_version),
            sub_version: optional_int(root, "SubVersion"),
            data_version: optional_int(root, "MinecraftDataVersion"),
            metadata: read_metadata(root.get_compound("Metadata")),
            offset: BlockPos::ORIGIN,
            regions,
            extra: unknown_keys(root, KNOWN_ROOT),
        })
    }

    fn encode(&self, schematic: &Schematic, logger: &dyn Logger) -> Result<NbtFile> {
        let mut regions = Compound::new();
        let mut names = HashSet::new();
        let mut total_blocks = 0usize;
        let mut total_volume = 0usize;

        for region in &schematic.regions {
            let name = unique_name(&region.name, &mut names);
            if name != region.name {
                logger.debug(&format!(
                    "region {:?} renamed to {:?} to keep names unique",
                    region.name, name
                ));
            }
            total_blocks += region.non_air_count();
            total_volume += region.size.volume();
            regions.insert(name, encode_region(region)?);
        }

        let mut root = Compound::new();
        root.insert("Version", WRITE_VERSION);
        root.insert(
            "SubVersion",
            match schematic.format {
                FormatKind::Litematica => schematic.sub_version.unwrap_or(WRITE_SUB_VERSION),
                _ => WRITE_SUB_VERSION,
            },
        );
        root.insert(
            "MinecraftDataVersion",
            schematic.data_version.unwrap_or(DEFAULT_DATA_VERSION),
        );
        root.insert(
            "Metadata",
            write_metadata(schematic, total_blocks, total_volume),
        );
        root.insert("Regions", regions);
        if schematic.format == FormatKind::Litematica {
            merge_missing(&mut root, &schematic.extra);
        }
        Ok(NbtFile::new("", root))
    }
}

/// Minimum corner and absolute extent along one axis
fn normalize_axis(position: i32, size: i32) -> (i32, u32) {
    if size < 0 {
        (position.wrapping_add(size).wrapping_add(1), size.unsigned_abs())
    } else {
        (position, size as u32)
    }
}

fn decode_region(name: &str, compound: &Compound) -> Result<Region> {
    let context = format!("Regions.{}", name);
    let position = require_xyz(compound, &context, "Position")?;
    let raw_size = require_xyz(compound, &context, "Size")?;

    let (x, width) = normalize_axis(position.x, raw_size.x);
    let (y, height) = normalize_axis(position.y, raw_size.y);
    let (z, length) = normalize_axis(position.z, raw_size.z);
    let min = BlockPos::new(x, y, z);
    let size = Dimensions::new(width, height, length);
    let volume = size.checked_volume().ok_or_else(|| {
        SchemError::MalformedWire(format!("region {:?} of size {} is too large", name, size))
    })?;

    let palette_list = require_list(compound, &context, "BlockStatePalette")?;
    let mut palette = Palette::new();
    for (index, entry) in palette_list.iter().enumerate() {
        let state = entry
            .as_compound()
            .and_then(BlockState::from_compound)
            .ok_or_else(|| {
                SchemError::MalformedWire(format!(
                    "{}.BlockStatePalette[{}] is not a block state",
                    context, index
                ))
            })?;
        palette.put(index as u32, state);
    }

    let words = require_long_array(compound, &context, "BlockStates")?;
    let blocks = bitpack::unpack(words, palette.bits_per_entry(), volume)?;
    let mut region = Region::new(name, min, size, palette, blocks)?;

    if let Some(list) = compound.get_list("TileEntities") {
        region.block_entities = read_block_entities(list, &context)?;
    }
    if let Some(list) = compound.get_list("Entities") {
        region.entities = read_entities(list, &context)?;
    }
    if let Some(list) = compound.get_list("PendingBlockTicks") {
        region.block_ticks = read_ticks(list, "Block");
    }
    if let Some(list) = compound.get_list("PendingFluidTicks") {
        region.fluid_ticks = read_ticks(list, "Fluid");
    }
    region.extra = unknown_keys(compound, KNOWN_REGION);
    Ok(region)
}

fn read_block_entities(list: &List, context: &str) -> Result<Vec<BlockEntity>> {
    list.compounds()
        .enumerate()
        .map(|(i, compound)| {
            let context = format!("{}.TileEntities[{}]", context, i);
            let position = BlockPos::new(
                require_int(compound, &context, "x")?,
                require_int(compound, &context, "y")?,
                require_int(compound, &context, "z")?,
            );
            Ok(BlockEntity {
                position,
                id: compound.get_str("id").to_string(),
                data: unknown_keys(compound, &["x", "y", "z", "id"]),
            })
        })
        .collect()
}

fn read_entities(list: &List, context: &str) -> Result<Vec<Entity>> {
    list.compounds()
        .enumerate()
        .map(|(i, compound)| {
            let context = format!("{}.Entities[{}]", context, i);
            let position = require_vec3(compound, &context, "Pos")?;
            Ok(Entity::new(
                position,
                compound.get_str("id"),
                unknown_keys(compound, &["Pos", "id"]),
            ))
        })
        .collect()
}

fn read_ticks(list: &List, target_key: &str) -> Vec<ScheduledTick> {
    list.compounds()
        .map(|tick| ScheduledTick {
            position: BlockPos::new(tick.get_int("x"), tick.get_int("y"), tick.get_int("z")),
            target: tick.get_str(target_key).to_string(),
            priority: tick.get_int("Priority"),
            sub_tick: tick.get_long("SubTick"),
            delay: tick.get_int("Time"),
        })
        .collect()
}

fn read_metadata(metadata: Option<&Compound>) -> Metadata {
    let Some(metadata) = metadata else {
        return Metadata::default();
    };
    Metadata {
        name: optional_string(metadata, "Name"),
        author: optional_string(metadata, "Author"),
        description: optional_string(metadata, "Description"),
        created: metadata.get("TimeCreated").and_then(Tag::as_i64),
        modified: metadata.get("TimeModified").and_then(Tag::as_i64),
        required_mods: Vec::new(),
        extra: unknown_keys(metadata, KNOWN_METADATA),
    }
}

fn write_metadata(schematic: &Schematic, total_blocks: usize, total_volume: usize) -> Compound {
    let source = &schematic.metadata;
    let now = time::unix_millis();
    let mut metadata = Compound::new();
    metadata.insert("Name", source.name.as_deref().unwrap_or("Unnamed"));
    metadata.insert("Author", source.author.as_deref().unwrap_or(""));
    metadata.insert("Description", source.description.as_deref().unwrap_or(""));
    metadata.insert("RegionCount", schematic.regions.len() as i32);
    metadata.insert("TotalBlocks", total_blocks.min(i32::MAX as usize) as i32);
    metadata.insert("TotalVolume", total_volume.min(i32::MAX as usize) as i32);
    metadata.insert("TimeCreated", source.created.unwrap_or(now));
    metadata.insert("TimeModified", source.modified.unwrap_or(now));
    let size = schematic.dimensions();
    metadata.insert(
        "EnclosingSize",
        xyz_compound(BlockPos::new(
            size.width as i32,
            size.height as i32,
            size.length as i32,
        )),
    );
    if schematic.format == FormatKind::Litematica {
        merge_missing(&mut metadata, &source.extra);
    }
    metadata
}

fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    let base = if name.is_empty() { "Unnamed" } else { name };
    let mut candidate = base.to_string();
    let mut suffix = 2;
    while taken.contains(&candidate) {
        candidate = format!("{} ({})", base, suffix);
        suffix += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn encode_region(region: &Region) -> Result<Compound> {
    let (palette, blocks) = region.compacted();
    debug_assert_eq!(palette.get(0).ok(), Some(&*AIR));
    let bits = palette.bits_per_entry();

    let palette_list = compound_list(
        palette
            .entries()
            .into_iter()
            .map(|(_, state)| state.to_compound()),
    )?;

    let mut compound = Compound::new();
    compound.insert("Position", xyz_compound(region.position));
    compound.insert(
        "Size",
        xyz_compound(BlockPos::new(
            signed_extent(region.size.width)?,
            signed_extent(region.size.height)?,
            signed_extent(region.size.length)?,
        )),
    );
    compound.insert("BlockStatePalette", palette_list);
    compound.insert("BlockStates", bitpack::pack(&blocks, bits));
    compound.insert(
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
    compound.insert("Entities", compound_list(entities)?);
    compound.insert(
        "PendingBlockTicks",
        compound_list(region.block_ticks.iter().map(|t| tick_compound(t, "Block")))?,
    );
    compound.insert(
        "PendingFluidTicks",
        compound_list(region.fluid_ticks.iter().map(|t| tick_compound(t, "Fluid")))?,
    );
    merge_missing(&mut compound, &region.extra);
    Ok(compound)
}

fn signed_extent(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| SchemError::Unencodable(format!("region extent {} does not fit an int", value)))
}

fn tick_compound(tick: &ScheduledTick, target_key: &str) -> Compound {
    let mut compound = xyz_compound(tick.position);
    compound.insert(target_key, tick.target.as_str());
    compound.insert("Priority", tick.priority);
    compound.insert("SubTick", tick.sub_tick);
    compound.insert("Time", tick.delay);
    compound
}
