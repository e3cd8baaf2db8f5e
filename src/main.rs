//! spatial-ground CLI: ground referring expressions in 3-D scenes.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use spatial_ground::config::GroundConfig;
use spatial_ground::error::SceneError;
use spatial_ground::export::{OffsetTableExport, relation_table};
use spatial_ground::graph::analytics;
use spatial_ground::ground::{Grounder, GroundingReport};
use spatial_ground::mention::{MentionSet, load_expressions};
use spatial_ground::scene::{Scene, SceneDocument};

#[derive(Parser)]
#[command(name = "spatial-ground", version, about = "Spatial grounding of referring expressions")]
struct Cli {
    /// TOML configuration file (camera, scoring, limits).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ground expressions against a scene and print the reports as JSON.
    Ground {
        /// Scene document (single scene or {"scenes": [...]}).
        #[arg(long)]
        scene: PathBuf,

        /// Mention document or list of expressions.
        #[arg(long)]
        mentions: PathBuf,

        /// Scene to use when the file holds several.
        #[arg(long, default_value = "0")]
        scene_index: usize,

        /// Ground only this expression (zero-based); all by default.
        #[arg(long)]
        expression: Option<usize>,
    },

    /// Print the offset table and its value ranges as JSON.
    Offsets {
        #[arg(long)]
        scene: PathBuf,

        #[arg(long, default_value = "0")]
        scene_index: usize,
    },

    /// Print the combined relation table as JSON.
    Relations {
        #[arg(long)]
        scene: PathBuf,

        #[arg(long, default_value = "0")]
        scene_index: usize,
    },

    /// Relation-pattern uniqueness analysis for every scene in a file.
    Analyze {
        #[arg(long)]
        scene: PathBuf,
    },

    /// Print the effective configuration as TOML, optionally saving it.
    Config {
        /// Write the configuration to this path.
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct ExpressionReport<'a> {
    sentence: &'a str,
    report: GroundingReport,
}

#[derive(Serialize)]
struct SceneAnalysis {
    scene: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_filename: Option<String>,
    report: analytics::UniquenessReport,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GroundConfig::load(path)?,
        None => GroundConfig::default(),
    };

    match cli.command {
        Commands::Ground {
            scene,
            mentions,
            scene_index,
            expression,
        } => {
            let scene = load_scene(&scene, scene_index, &config)?;
            let expressions = load_expressions(&mentions)?;
            let selected: Vec<_> = match expression {
                Some(i) => match expressions.get(i) {
                    Some(e) => vec![e],
                    None => miette::bail!(
                        "expression {i} out of range ({} expressions)",
                        expressions.len()
                    ),
                },
                None => expressions.iter().collect(),
            };

            let sets: Vec<MentionSet> = selected
                .iter()
                .map(|e| e.mentions.to_mentions())
                .collect::<std::result::Result<_, _>>()?;
            let jobs: Vec<(&Scene, &MentionSet)> = sets.iter().map(|m| (&scene, m)).collect();

            let grounder = Grounder::new(config)?;
            let reports: Vec<ExpressionReport<'_>> = selected
                .iter()
                .zip(grounder.ground_batch(&jobs))
                .map(|(e, report)| ExpressionReport {
                    sentence: &e.sentence,
                    report,
                })
                .collect();
            print_json(&reports)?;
        }

        Commands::Offsets { scene, scene_index } => {
            let scene = load_scene(&scene, scene_index, &config)?;
            print_json(&OffsetTableExport::from_scene(&scene))?;
        }

        Commands::Relations { scene, scene_index } => {
            let scene = load_scene(&scene, scene_index, &config)?;
            print_json(&relation_table(&scene))?;
        }

        Commands::Analyze { scene } => {
            let docs = SceneDocument::load_all(&scene)?;
            let camera = config.camera.to_camera();
            let mut analyses = Vec::with_capacity(docs.len());
            for (index, doc) in docs.iter().enumerate() {
                let scene = Scene::from_document(doc, camera)?;
                analyses.push(SceneAnalysis {
                    scene: index,
                    image_filename: doc.image_filename.clone(),
                    report: analytics::analyze(&scene),
                });
            }
            print_json(&analyses)?;
        }

        Commands::Config { write } => {
            if let Some(path) = write {
                config.save(&path)?;
                tracing::info!(path = %path.display(), "configuration written");
            }
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn load_scene(path: &Path, index: usize, config: &GroundConfig) -> Result<Scene> {
    let docs = SceneDocument::load_all(path)?;
    let count = docs.len();
    let doc = docs
        .get(index)
        .ok_or(SceneError::IndexOutOfRange { index, count })?;
    Ok(Scene::from_document(doc, config.camera.to_camera())?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
