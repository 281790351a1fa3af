//! m3d-export - M3D scene export tool
//!
//! Converts scene snapshots (JSON) and glTF files into `.m3d` binary assets.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use m3d_common::formats::{NameIndexEntry, Section};
use m3d_export::{
    export_to_file, find_problems, import_gltf, parse_attribute_list, ExportConfig, ImportOptions,
    M3dAsset, Scene, M3D_EXT,
};

#[derive(Parser)]
#[command(name = "m3d-export")]
#[command(about = "M3D scene export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene snapshot (JSON) to .m3d
    Export {
        /// Input scene JSON file
        scene: PathBuf,

        /// Output .m3d file (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to export config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Vertex attributes (e.g., POSITION+NORMAL+TEXTURE)
        #[arg(short, long)]
        attributes: Option<String>,

        /// Write 0xFFFF for unresolved references instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Validate a scene snapshot without writing anything
    Check {
        /// Input scene JSON file
        scene: PathBuf,

        /// Path to export config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Import a glTF/GLB file and export it to .m3d
    Gltf {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output .m3d file (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to export config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also write the imported scene snapshot as JSON
        #[arg(long)]
        dump_scene: Option<PathBuf>,
    },

    /// Print the contents of an .m3d file
    Inspect {
        /// Input .m3d file
        input: PathBuf,
    },
}

/// `-o`, then the config's output path, then the input with an `.m3d` extension
fn output_path(input: &Path, output: Option<PathBuf>, config: &ExportConfig) -> PathBuf {
    output
        .or_else(|| config.output.path.clone())
        .unwrap_or_else(|| input.with_extension(M3D_EXT))
}

/// Exit status when the scene itself is rejected (I/O failures exit with 1)
const EXIT_INVALID_INPUT: i32 = 2;

fn export(scene: &Scene, config: &ExportConfig, output: &Path) -> Result<()> {
    match export_to_file(scene, config, output) {
        Ok(summary) => {
            tracing::info!("Done! {} bytes written", summary.bytes_written);
            Ok(())
        }
        Err(err) if err.is_input_error() => {
            tracing::error!("Cannot export {:?}: {}", output, err);
            std::process::exit(EXIT_INVALID_INPUT);
        }
        Err(err) => Err(err).with_context(|| format!("Failed to export: {:?}", output)),
    }
}

/// Name table entries paired with the records they point at
fn section_entries<T>(section: &Section<T>) -> impl Iterator<Item = (&NameIndexEntry, &T)> {
    section
        .names
        .entries()
        .iter()
        .filter_map(|entry| section.records.get(entry.index as usize).map(|r| (entry, r)))
}

fn inspect(input: &Path) -> Result<()> {
    let asset =
        M3dAsset::from_file(input).with_context(|| format!("Failed to load asset: {:?}", input))?;

    println!("{}", input.display());

    println!("meshes: {}", asset.meshes.len());
    for (entry, mesh) in section_entries(&asset.meshes) {
        println!(
            "  [{}] {}: stride {}, {} vertices, {} triangles",
            entry.index,
            entry.name,
            mesh.stride,
            mesh.vertex_count(),
            mesh.indices.len() / 3
        );
    }

    println!("armatures: {}", asset.armatures.len());
    for (entry, armature) in section_entries(&asset.armatures) {
        println!("  [{}] {}: {} bones", entry.index, entry.name, armature.bones.len());
    }

    println!("actions: {}", asset.actions.len());
    for (entry, stream) in section_entries(&asset.actions) {
        println!(
            "  [{}] {}: {} frames, {} tracks, {} samples",
            entry.index,
            entry.name,
            stream.header.frame_count,
            stream.header.track_count,
            stream.sample_count()
        );
    }

    println!("materials: {}", asset.materials.len());
    for (entry, material) in section_entries(&asset.materials) {
        println!(
            "  [{}] {}: images {:?}",
            entry.index, entry.name, material.image_indices
        );
    }

    println!("images: {}", asset.images.len());
    for entry in asset.images.names.entries() {
        println!("  [{}] {}", entry.index, entry.name);
    }

    println!("scenes: {}", asset.scenes.len());
    for (entry, scene) in section_entries(&asset.scenes) {
        println!(
            "  [{}] {}: {} objects, {} lamps, {} cameras",
            entry.index,
            entry.name,
            scene.objects.len(),
            scene.lamps.len(),
            scene.cameras.len()
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            scene,
            output,
            config,
            attributes,
            lenient,
        } => {
            let mut export_config = ExportConfig::load_or_default(config.as_deref())?;
            if let Some(list) = attributes {
                let parsed = parse_attribute_list(&list)
                    .with_context(|| format!("Unknown vertex attribute in {:?}", list))?;
                export_config.vertex.attributes = Some(parsed);
            }
            if lenient {
                export_config.validation.strict = false;
            }

            let output = output_path(&scene, output, &export_config);
            tracing::info!("Exporting {:?} -> {:?}", scene, output);
            let snapshot = Scene::load(&scene)?;
            export(&snapshot, &export_config, &output)?;
        }

        Commands::Check { scene, config } => {
            tracing::info!("Checking {:?}", scene);
            let export_config = ExportConfig::load_or_default(config.as_deref())?;
            let snapshot = Scene::load(&scene)?;

            let problems = find_problems(&snapshot, &export_config);
            if !problems.is_empty() {
                for problem in &problems {
                    tracing::error!("{}", problem);
                }
                tracing::error!("{} problem(s) found in {:?}", problems.len(), scene);
                std::process::exit(EXIT_INVALID_INPUT);
            }
            tracing::info!("Scene is valid!");
        }

        Commands::Gltf {
            input,
            output,
            config,
            dump_scene,
        } => {
            let export_config = ExportConfig::load_or_default(config.as_deref())?;
            let options = ImportOptions {
                frame_rate: export_config.animation.frame_rate,
            };

            let output = output_path(&input, output, &export_config);
            tracing::info!("Converting {:?} -> {:?}", input, output);
            let snapshot = import_gltf(&input, &options)?;
            if let Some(path) = dump_scene {
                snapshot.save(&path)?;
                tracing::info!("Wrote scene snapshot {:?}", path);
            }
            export(&snapshot, &export_config, &output)?;
        }

        Commands::Inspect { input } => inspect(&input)?,
    }

    Ok(())
}
