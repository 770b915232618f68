// src/cli/inspect.rs
// Argument parsing and report printing for `b3dm_inspect`

use std::env;
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::{DecodeOptions, InstancedOptions};
use crate::decoder::{B3dmDecoder, DecodedScene};
use crate::merge::InstancedBufferSet;
use crate::model::GlbDecoder;
use crate::readiness::CodecReadiness;

pub const USAGE: &str =
    "usage: b3dm_inspect [--scene-z-up] [--mesh-z-up] [--instanced N] [--options FILE] <tile.b3dm>";

/// Error raised for malformed command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectCliError {
    msg: String,
}

impl InspectCliError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl fmt::Display for InspectCliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl std::error::Error for InspectCliError {}

/// Parsed `b3dm_inspect` command line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InspectArgs {
    pub path: PathBuf,
    pub decode: DecodeOptions,
    /// Run the instanced merge with this capacity
    pub instanced: Option<u32>,
    /// JSON file with decode options, applied before the flags
    pub options_file: Option<PathBuf>,
}

impl InspectArgs {
    pub fn parse(args: &[String]) -> Result<Self, InspectCliError> {
        let mut parsed = InspectArgs::default();
        let mut path = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--scene-z-up" => parsed.decode.scene_z_up_to_y_up = true,
                "--mesh-z-up" => parsed.decode.mesh_z_up_to_y_up = true,
                "--instanced" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| InspectCliError::new("--instanced requires a capacity"))?;
                    let capacity = value.parse::<u32>().map_err(|_| {
                        InspectCliError::new(format!("invalid --instanced capacity '{value}'"))
                    })?;
                    parsed.instanced = Some(capacity);
                }
                "--options" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| InspectCliError::new("--options requires a file"))?;
                    parsed.options_file = Some(PathBuf::from(value));
                }
                flag if flag.starts_with("--") => {
                    return Err(InspectCliError::new(format!("unknown flag '{flag}'")));
                }
                file => {
                    if path.replace(PathBuf::from(file)).is_some() {
                        return Err(InspectCliError::new("expected exactly one input file"));
                    }
                }
            }
        }

        parsed.path = path.ok_or_else(|| InspectCliError::new(USAGE))?;
        Ok(parsed)
    }

    /// Merge options from `--options` with the flags given on the command line.
    fn resolve_options(&self) -> Result<DecodeOptions> {
        let mut options = match &self.options_file {
            Some(file) => {
                let text = std::fs::read_to_string(file)
                    .with_context(|| format!("failed to read options file {}", file.display()))?;
                DecodeOptions::from_json_str(&text)
                    .with_context(|| format!("invalid options file {}", file.display()))?
            }
            None => DecodeOptions::default(),
        };
        options.scene_z_up_to_y_up |= self.decode.scene_z_up_to_y_up;
        options.mesh_z_up_to_y_up |= self.decode.mesh_z_up_to_y_up;
        Ok(options)
    }
}

fn print_scene(scene: &DecodedScene) {
    let header = &scene.header;
    println!("b3dm v{} ({} bytes)", header.version, header.byte_length);
    println!(
        "  feature table: {} json + {} binary bytes, keys {:?}",
        header.feature_table_json_byte_length,
        header.feature_table_binary_byte_length,
        scene.feature_table.keys().collect::<Vec<_>>()
    );
    println!(
        "  batch table: {} json + {} binary bytes, properties {:?}",
        header.batch_table_json_byte_length,
        header.batch_table_binary_byte_length,
        scene.batch_table.property_names().collect::<Vec<_>>()
    );
    println!("  features: {}", scene.feature_table.batch_length());
    match scene.rtc_center {
        Some(center) => println!("  rtc center: [{}, {}, {}]", center.x, center.y, center.z),
        None => println!("  rtc center: none"),
    }
    if let Some(generator) = scene
        .asset
        .as_ref()
        .and_then(|a| a.get("generator"))
        .and_then(|g| g.as_str())
    {
        println!("  generator: {generator}");
    }
    println!("  meshes: {}", scene.root.mesh_count());
}

fn print_instanced(set: &InstancedBufferSet) {
    let geometry = &set.geometry;
    println!("instanced buffer set (capacity {})", set.capacity);
    println!("  vertices: {}", geometry.vertex_count);
    println!(
        "  attributes: {:?}",
        geometry.attributes.keys().map(|k| k.name()).collect::<Vec<_>>()
    );
    match &geometry.indices {
        Some(indices) => println!("  indices: {}", indices.len()),
        None => println!("  indices: none"),
    }
    println!("  groups: {}", geometry.groups.len());
}

/// Entry point for `b3dm_inspect`.
pub fn run_inspect_cli() -> Result<()> {
    env_logger::init();

    let all_args: Vec<String> = env::args().skip(1).collect();
    let args = InspectArgs::parse(&all_args)?;
    let options = args.resolve_options()?;

    let data = std::fs::read(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let decoder = B3dmDecoder::new(GlbDecoder::new(), CodecReadiness::ready());

    let scene = pollster::block_on(decoder.decode(&data, &options, None))
        .with_context(|| format!("failed to decode {}", args.path.display()))?;
    print_scene(&scene);

    if let Some(capacity) = args.instanced {
        let instanced = InstancedOptions {
            decode: options,
            capacity,
        };
        let set = pollster::block_on(decoder.decode_instanced(&data, &instanced, None))
            .context("failed to build instanced buffer set")?;
        print_instanced(&set);
    }

    Ok(())
}
