use clap::{Parser, Subcommand};
use schemkit::nbt::{self, Compression, Endianness, Tag};
use schemkit::open::{self, ReadOptions, Target, WriteOptions};
use schemkit::{ConsoleLogger, Logger, Result, Schematic};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Inspect and convert Minecraft schematic files
#[derive(Parser)]
#[command(name = "schemkit", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print format, size and per-region counts
    Info {
        file: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the raw tag tree
    Dump {
        file: PathBuf,
        /// Print JSON instead of SNBT
        #[arg(long)]
        json: bool,
        /// Read the file as little-endian
        #[arg(long)]
        little_endian: bool,
        /// Maximum nesting depth accepted while reading
        #[arg(long, default_value_t = nbt::DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },
    /// Re-encode a schematic in another format
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// sponge1, sponge2, sponge3, litematica or schematica
        #[arg(long)]
        to: Target,
        /// Write the output without gzip
        #[arg(long)]
        uncompressed: bool,
    },
    /// Print the block state at a position
    Block {
        file: PathBuf,
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
        #[arg(allow_hyphen_values = true)]
        z: i32,
    },
}

async fn load(file: &Path, logger: &dyn Logger) -> Result<Schematic> {
    open::read_file_async(file, &ReadOptions::default(), logger).await
}

fn print_info(schematic: &Schematic) {
    let summary = schematic.summary();
    println!("Format:       {} {}", summary.format, opt(summary.version));
    println!("Data version: {}", opt(summary.data_version));
    if let Some(name) = &summary.name {
        println!("Name:         {}", name);
    }
    if let Some(author) = &summary.author {
        println!("Author:       {}", author);
    }
    println!("Size:         {}", summary.size);
    println!("Offset:       {}", summary.offset);
    for region in &summary.regions {
        println!(
            "Region {:?} at {} size {}: {} palette entries, {} non-air blocks, {} block entities, {} entities",
            region.name,
            region.position,
            region.size,
            region.palette_size,
            region.non_air_blocks,
            region.block_entities,
            region.entities
        );
        if region.block_ticks + region.fluid_ticks > 0 {
            println!(
                "  pending ticks: {} block, {} fluid",
                region.block_ticks, region.fluid_ticks
            );
        }
    }
}

fn opt(value: Option<i32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

async fn run(command: Commands, logger: &dyn Logger) -> Result<()> {
    match command {
        Commands::Info { file, json } => {
            let schematic = load(&file, logger).await?;
            if json {
                println!("{}", to_pretty(&schematic.summary()));
            } else {
                print_info(&schematic);
            }
        }
        Commands::Dump {
            file,
            json,
            little_endian,
            max_depth,
        } => {
            let options = nbt::ReadOptions {
                endianness: if little_endian {
                    Endianness::Little
                } else {
                    Endianness::Big
                },
                max_depth,
            };
            let parsed = open::read_nbt_file(&file, &options)?;
            logger.debug(&format!(
                "read {:?} root {:?} ({:?})",
                file, parsed.name, parsed.compression
            ));
            let root = Tag::Compound(parsed.root);
            if json {
                println!("{}", to_pretty(&nbt::json::to_json(&root)));
            } else {
                println!("{}", root);
            }
        }
        Commands::Convert {
            input,
            output,
            to,
            uncompressed,
        } => {
            let schematic = load(&input, logger).await?;
            let options = WriteOptions {
                nbt: nbt::WriteOptions {
                    endianness: Endianness::Big,
                    compression: if uncompressed {
                        Compression::None
                    } else {
                        Compression::Gzip
                    },
                },
                target: to,
            };
            open::write_file(&output, &schematic, &options, logger)?;
            logger.info(&format!(
                "converted {} {:?} to {} {:?}",
                schematic.format,
                input,
                to,
                output
            ));
        }
        Commands::Block { file, x, y, z } => {
            let schematic = load(&file, logger).await?;
            println!("{}", schematic.block(x, y, z));
        }
    }
    Ok(())
}

fn to_pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger = ConsoleLogger::from_env();
    match run(cli.command, &logger).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
