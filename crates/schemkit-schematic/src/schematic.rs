use crate::block_state::{BlockState, AIR};
use crate::palette::Palette;
use schemkit_common::{BlockPos, Dimensions, Result, SchemError, Vec3};
use schemkit_nbt::{Compound, Tag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    Sponge,
    Litematica,
    Schematica,
}

impl FormatKind {
    pub fn name(self) -> &'static str {
        match self {
            FormatKind::Sponge => "Sponge",
            FormatKind::Litematica => "Litematica",
            FormatKind::Schematica => "Schematica",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FormatKind::Sponge => "schem",
            FormatKind::Litematica => "litematic",
            FormatKind::Schematica => "schematic",
        }
    }

    pub fn from_extension(extension: &str) -> Option<FormatKind> {
        match extension.to_ascii_lowercase().as_str() {
            "schem" => Some(FormatKind::Sponge),
            "litematic" => Some(FormatKind::Litematica),
            "schematic" => Some(FormatKind::Schematica),
            _ => None,
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Milliseconds since the unix epoch
    pub created: Option<i64>,
    pub modified: Option<i64>,
    pub required_mods: Vec<String>,
    /// Metadata keys this crate does not interpret
    pub extra: Compound,
}

/// A block entity. `position` is relative to its region's minimum corner.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntity {
    pub position: BlockPos,
    pub id: String,
    pub data: Compound,
}

/// An entity. `position` is relative to its region's minimum corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub position: Vec3,
    pub id: String,
    pub uuid: Option<Uuid>,
    pub data: Compound,
}

impl Entity {
    /// The UUID is taken from `data` when it carries one
    pub fn new(position: Vec3, id: impl Into<String>, data: Compound) -> Self {
        Entity {
            position,
            id: id.into(),
            uuid: uuid_from_data(&data),
            data,
        }
    }
}

/// Reads either the 4-int `UUID` array or the `UUIDMost`/`UUIDLeast` long pair
pub fn uuid_from_data(data: &Compound) -> Option<Uuid> {
    if let Some(Tag::IntArray(parts)) = data.get("UUID") {
        if let [a, b, c, d] = parts.as_slice() {
            let value = ((*a as u32 as u128) << 96)
                | ((*b as u32 as u128) << 64)
                | ((*c as u32 as u128) << 32)
                | (*d as u32 as u128);
            return Some(Uuid::from_u128(value));
        }
    }
    let most = data.get("UUIDMost")?.as_i64()?;
    let least = data.get("UUIDLeast")?.as_i64()?;
    Some(Uuid::from_u128(
        ((most as u64 as u128) << 64) | (least as u64 as u128),
    ))
}

/// A pending block or fluid update
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTick {
    pub position: BlockPos,
    /// Block or fluid identifier the tick targets
    pub target: String,
    pub priority: i32,
    pub sub_tick: i64,
    /// Ticks until the update fires
    pub delay: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiomeLayout {
    /// One entry per column, indexed `x + z*width`
    Flat,
    /// One entry per block, indexed like the block grid
    Volume,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiomeGrid {
    pub palette: Palette<String>,
    pub data: Vec<u32>,
    pub layout: BiomeLayout,
}

impl BiomeGrid {
    pub fn new(
        palette: Palette<String>,
        data: Vec<u32>,
        layout: BiomeLayout,
        size: Dimensions,
    ) -> Result<Self> {
        let expected = match layout {
            BiomeLayout::Flat => size.area(),
            BiomeLayout::Volume => size.volume(),
        };
        if data.len() != expected {
            return Err(SchemError::MalformedWire(format!(
                "biome grid holds {} entries, {} expected for {}",
                data.len(),
                expected,
                size
            )));
        }
        palette.validate(&data)?;
        Ok(BiomeGrid {
            palette,
            data,
            layout,
        })
    }

    pub fn get(&self, size: &Dimensions, x: i32, y: i32, z: i32) -> Option<&str> {
        if !size.contains(x, y, z) {
            return None;
        }
        let index = match self.layout {
            BiomeLayout::Flat => x as usize + z as usize * size.width as usize,
            BiomeLayout::Volume => size.index(x, y, z)?,
        };
        let entry = *self.data.get(index)?;
        self.palette.get(entry).ok().map(String::as_str)
    }

    /// Per-column entries. Volume grids contribute their bottom layer.
    pub fn to_flat(&self, size: &Dimensions) -> Vec<u32> {
        match self.layout {
            BiomeLayout::Flat => self.data.clone(),
            BiomeLayout::Volume => self.data.iter().take(size.area()).copied().collect(),
        }
    }

    /// Per-block entries. Flat grids are repeated on every layer.
    pub fn to_volume(&self, size: &Dimensions) -> Vec<u32> {
        match self.layout {
            BiomeLayout::Volume => self.data.clone(),
            BiomeLayout::Flat => {
                let mut data = Vec::with_capacity(size.volume());
                for _ in 0..size.height {
                    data.extend_from_slice(&self.data);
                }
                data
            }
        }
    }
}

/// A box of blocks with its own palette. Every Sponge and Schematica file holds exactly one;
/// Litematica files hold one per named sub-region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    /// Minimum corner, in the coordinates of the source file
    pub position: BlockPos,
    pub size: Dimensions,
    pub palette: Palette<BlockState>,
    /// Palette indices in `x + z*width + y*width*length` order. Empty means all air.
    pub blocks: Vec<u32>,
    pub biomes: Option<BiomeGrid>,
    pub block_entities: Vec<BlockEntity>,
    pub entities: Vec<Entity>,
    pub block_ticks: Vec<ScheduledTick>,
    pub fluid_ticks: Vec<ScheduledTick>,
    /// Region keys this crate does not interpret
    pub extra: Compound,
}

impl Region {
    /// Fails when `blocks` does not cover the box or references an unset palette slot
    pub fn new(
        name: impl Into<String>,
        position: BlockPos,
        size: Dimensions,
        palette: Palette<BlockState>,
        blocks: Vec<u32>,
    ) -> Result<Self> {
        if !blocks.is_empty() && size.checked_volume() != Some(blocks.len()) {
            return Err(SchemError::MalformedWire(format!(
                "{} block indices for a {} region",
                blocks.len(),
                size
            )));
        }
        palette.validate(&blocks)?;
        Ok(Region {
            name: name.into(),
            position,
            size,
            palette,
            blocks,
            biomes: None,
            block_entities: Vec::new(),
            entities: Vec::new(),
            block_ticks: Vec::new(),
            fluid_ticks: Vec::new(),
            extra: Compound::new(),
        })
    }

    /// A region where every position is air
    pub fn empty(name: impl Into<String>, position: BlockPos, size: Dimensions) -> Self {
        Region {
            name: name.into(),
            position,
            size,
            palette: Palette::from_tokens([AIR.clone()]),
            blocks: Vec::new(),
            biomes: None,
            block_entities: Vec::new(),
            entities: Vec::new(),
            block_ticks: Vec::new(),
            fluid_ticks: Vec::new(),
            extra: Compound::new(),
        }
    }

    pub fn block_index(&self, x: i32, y: i32, z: i32) -> Option<u32> {
        let index = self.size.index(x, y, z)?;
        self.blocks.get(index).copied()
    }

    /// Block at a region-local position; air outside the box or where nothing was stored
    pub fn block(&self, x: i32, y: i32, z: i32) -> &BlockState {
        self.block_index(x, y, z)
            .and_then(|index| self.palette.get(index).ok())
            .unwrap_or(&AIR)
    }

    pub fn biome(&self, x: i32, y: i32, z: i32) -> Option<&str> {
        self.biomes.as_ref()?.get(&self.size, x, y, z)
    }

    pub fn block_entity_at(&self, position: BlockPos) -> Option<&BlockEntity> {
        self.block_entities.iter().find(|be| be.position == position)
    }

    /// Exclusive maximum corner, in the same coordinates as `position`
    pub fn end(&self) -> BlockPos {
        BlockPos::new(
            self.position.x.saturating_add(self.size.width as i32),
            self.position.y.saturating_add(self.size.height as i32),
            self.position.z.saturating_add(self.size.length as i32),
        )
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        let local = pos - self.position;
        self.size.contains(local.x, local.y, local.z)
    }

    pub fn non_air_count(&self) -> usize {
        let mut is_air: HashMap<u32, bool> = HashMap::new();
        self.blocks
            .iter()
            .filter(|&&index| {
                !*is_air.entry(index).or_insert_with(|| {
                    self.palette.get(index).map_or(true, BlockState::is_air)
                })
            })
            .count()
    }

    /// Palette and indices reduced to the states actually placed, with air at index 0
    pub fn compacted(&self) -> (Palette<BlockState>, Vec<u32>) {
        let mut palette = Palette::from_tokens([AIR.clone()]);
        let mut remap: HashMap<u32, u32> = HashMap::new();
        let volume = self.size.volume();
        if self.blocks.is_empty() {
            return (palette, vec![0; volume]);
        }
        let blocks = self
            .blocks
            .iter()
            .map(|&index| {
                *remap.entry(index).or_insert_with(|| match self.palette.get(index) {
                    Ok(state) if !state.is_air() => palette.get_or_insert(state.clone()),
                    _ => 0,
                })
            })
            .collect();
        (palette, blocks)
    }
}

/// Format-agnostic view of a decoded schematic
#[derive(Debug, Clone, PartialEq)]
pub struct Schematic {
    pub format: FormatKind,
    /// Schema version; Schematica files are unversioned
    pub version: Option<i32>,
    pub sub_version: Option<i32>,
    /// Minecraft data version the blocks were saved with
    pub data_version: Option<i32>,
    pub metadata: Metadata,
    pub offset: BlockPos,
    pub regions: Vec<Region>,
    /// Root keys this crate does not interpret
    pub extra: Compound,
}

impl Schematic {
    pub fn new(format: FormatKind, regions: Vec<Region>) -> Self {
        Schematic {
            format,
            version: None,
            sub_version: None,
            data_version: None,
            metadata: Metadata::default(),
            offset: BlockPos::ORIGIN,
            regions,
            extra: Compound::new(),
        }
    }

    /// Block at a position relative to the minimum corner of the enclosing box, the same
    /// origin [`Schematic::block_entities`] and [`Schematic::entities`] report. Where regions
    /// overlap, the last region holding a non-air block wins.
    pub fn block(&self, x: i32, y: i32, z: i32) -> &BlockState {
        let Some(pos) = self.region_space(x, y, z) else {
            return &AIR;
        };
        for region in self.regions.iter().rev() {
            if region.contains(pos) {
                let local = pos - region.position;
                let state = region.block(local.x, local.y, local.z);
                if !state.is_air() {
                    return state;
                }
            }
        }
        &AIR
    }

    /// Biome at a position relative to the minimum corner of the enclosing box
    pub fn biome(&self, x: i32, y: i32, z: i32) -> Option<&str> {
        let pos = self.region_space(x, y, z)?;
        self.regions.iter().rev().find_map(|region| {
            let local = pos - region.position;
            region.biome(local.x, local.y, local.z)
        })
    }

    /// Maps a box-relative position to the coordinates region positions are stored in
    fn region_space(&self, x: i32, y: i32, z: i32) -> Option<BlockPos> {
        let (min, _) = self.bounds()?;
        if !self.dimensions().contains(x, y, z) {
            return None;
        }
        Some(min + BlockPos::new(x, y, z))
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// Minimum and exclusive maximum corner of the box enclosing every region
    pub fn bounds(&self) -> Option<(BlockPos, BlockPos)> {
        let first = self.regions.first()?;
        Some(self.regions.iter().fold(
            (first.position, first.end()),
            |(min, max), region| (min.min(region.position), max.max(region.end())),
        ))
    }

    pub fn dimensions(&self) -> Dimensions {
        match self.bounds() {
            Some((min, max)) => Dimensions::new(
                span(min.x, max.x),
                span(min.y, max.y),
                span(min.z, max.z),
            ),
            None => Dimensions::default(),
        }
    }

    /// Block entities of every region, positioned relative to the enclosing box
    pub fn block_entities(&self) -> Vec<BlockEntity> {
        let origin = self.bounds().map_or(BlockPos::ORIGIN, |(min, _)| min);
        self.regions
            .iter()
            .flat_map(|region| {
                let shift = region.position - origin;
                region.block_entities.iter().map(move |be| BlockEntity {
                    position: be.position + shift,
                    ..be.clone()
                })
            })
            .collect()
    }

    pub fn entities(&self) -> Vec<Entity> {
        let origin = self.bounds().map_or(BlockPos::ORIGIN, |(min, _)| min);
        self.regions
            .iter()
            .flat_map(|region| {
                let shift = region.position - origin;
                region.entities.iter().map(move |entity| Entity {
                    position: entity.position.offset(shift),
                    ..entity.clone()
                })
            })
            .collect()
    }

    /// Merges every region into one covering the enclosing box, for formats that hold a
    /// single region. Later regions' non-air blocks override earlier ones. Biomes survive
    /// only when there is a single region.
    pub fn flatten(&self) -> Result<Region> {
        if let [only] = self.regions.as_slice() {
            return Ok(only.clone());
        }
        let Some((min, _)) = self.bounds() else {
            return Ok(Region::empty("", BlockPos::ORIGIN, Dimensions::default()));
        };
        let size = self.dimensions();
        let volume = size.checked_volume().ok_or_else(|| {
            SchemError::Unencodable(format!("enclosing box {} is too large", size))
        })?;

        let mut palette = Palette::from_tokens([AIR.clone()]);
        let mut blocks = vec![0u32; volume];
        let mut flat = Region::empty(self.regions[0].name.clone(), min, size);

        for region in &self.regions {
            let shift = region.position - min;
            let mut remap: HashMap<u32, u32> = HashMap::new();
            for (i, &index) in region.blocks.iter().enumerate() {
                let state = region.palette.get(index)?;
                if state.is_air() {
                    continue;
                }
                let target = *remap
                    .entry(index)
                    .or_insert_with(|| palette.get_or_insert(state.clone()));
                let (x, y, z) = region.size.coords(i);
                if let Some(dest) = size.index(x + shift.x, y + shift.y, z + shift.z) {
                    blocks[dest] = target;
                }
            }

            for be in &region.block_entities {
                let position = be.position + shift;
                flat.block_entities.retain(|existing| existing.position != position);
                flat.block_entities.push(BlockEntity {
                    position,
                    ..be.clone()
                });
            }
            flat.entities
                .extend(region.entities.iter().map(|entity| Entity {
                    position: entity.position.offset(shift),
                    ..entity.clone()
                }));
            let shifted = |tick: &ScheduledTick| ScheduledTick {
                position: tick.position + shift,
                ..tick.clone()
            };
            flat.block_ticks.extend(region.block_ticks.iter().map(shifted));
            flat.fluid_ticks.extend(region.fluid_ticks.iter().map(shifted));
        }

        flat.palette = palette;
        flat.blocks = blocks;
        Ok(flat)
    }

    pub fn summary(&self) -> SchematicSummary {
        SchematicSummary {
            format: self.format,
            version: self.version,
            data_version: self.data_version,
            name: self.metadata.name.clone(),
            author: self.metadata.author.clone(),
            size: self.dimensions(),
            offset: self.offset,
            regions: self
                .regions
                .iter()
                .map(|region| RegionSummary {
                    name: region.name.clone(),
                    position: region.position,
                    size: region.size,
                    palette_size: region.palette.len(),
                    non_air_blocks: region.non_air_count(),
                    block_entities: region.block_entities.len(),
                    entities: region.entities.len(),
                    block_ticks: region.block_ticks.len(),
                    fluid_ticks: region.fluid_ticks.len(),
                })
                .collect(),
        }
    }
}

fn span(min: i32, max: i32) -> u32 {
    (max as i64 - min as i64).clamp(0, u32::MAX as i64) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchematicSummary {
    pub format: FormatKind,
    pub version: Option<i32>,
    pub data_version: Option<i32>,
    pub name: Option<String>,
    pub author: Option<String>,
    pub size: Dimensions,
    pub offset: BlockPos,
    pub regions: Vec<RegionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub name: String,
    pub position: BlockPos,
    pub size: Dimensions,
    pub palette_size: usize,
    pub non_air_blocks: usize,
    pub block_entities: usize,
    pub entities: usize,
    pub block_ticks: usize,
    pub fluid_ticks: usize,
}
