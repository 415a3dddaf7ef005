//! Segmentation task graph planner CLI.
//!
//! Builds the task graph for one run from a TOML configuration and prints a
//! summary, exports it as JSON, or shows how post-hoc batch jobs would split
//! the volume.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use seg_planner::graph::{ExportedGraph, GateDecision, LevelPlan, ScalingPlan, StageGate};
use seg_planner::octree::partition_batches;
use seg_planner::{build, PipelineConfig, Stage, TaskGraph};

#[derive(Parser, Debug)]
#[command(name = "seg_plan")]
#[command(about = "Plan segmentation task graphs for chunked volumes", long_about = None)]
struct Cli {
	/// Path to pipeline configuration TOML file.
	#[arg(short, long, default_value = "pipeline.toml", global = true)]
	config: PathBuf,

	/// Override the batch level.
	#[arg(long, global = true)]
	batch_mip: Option<u32>,

	/// Override the first level with a dedicated queue.
	#[arg(long, global = true)]
	high_mip: Option<u32>,

	/// Enable the agglomeration overlap pass.
	#[arg(long, global = true)]
	overlap: bool,

	/// Stages to skip (ws, agg).
	#[arg(long, value_delimiter = ',', global = true)]
	skip: Vec<Stage>,

	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Build the graph and print a summary (default)
	Plan,

	/// Build the graph and write it as JSON
	Export {
		/// Output file (default: stdout).
		#[arg(short, long)]
		output: Option<PathBuf>,

		/// Pretty-print the JSON.
		#[arg(long)]
		pretty: bool,
	},

	/// Show how batch jobs split the volume
	Batches,

	/// Validate configuration
	Validate,

	/// Generate a sample configuration file
	GenerateConfig {
		/// Output path for configuration file.
		#[arg(short, long, default_value = "pipeline.toml")]
		output: PathBuf,
	},
}

fn main() -> Result<()> {
	tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
		.init();

	let cli = Cli::parse();

	match &cli.command {
		None | Some(Commands::Plan) => plan_command(&cli),
		Some(Commands::Export { output, pretty }) => export_command(&cli, output.as_deref(), *pretty),
		Some(Commands::Batches) => batches_command(&cli),
		Some(Commands::Validate) => validate_command(&cli),
		Some(Commands::GenerateConfig { output }) => generate_config_command(output),
	}
}

/// Load the configuration file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
	let mut config = PipelineConfig::load(&cli.config)
		.with_context(|| format!("Loading config from {}", cli.config.display()))?;
	apply_overrides(cli, &mut config);
	Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut PipelineConfig) {
	if let Some(mip) = cli.batch_mip {
		config.batch_mip = mip;
	}
	if let Some(mip) = cli.high_mip {
		config.high_mip = mip;
	}
	if cli.overlap {
		config.overlap = true;
	}
	for stage in &cli.skip {
		if !config.skip.contains(stage) {
			config.skip.push(*stage);
		}
	}
}

fn build_graph(config: &PipelineConfig) -> Result<TaskGraph> {
	build(config).with_context(|| format!("Building task graph for run `{}`", config.name))
}

fn plan_command(cli: &Cli) -> Result<()> {
	let config = load_config(cli)?;
	let graph = build_graph(&config)?;
	let plan = LevelPlan::new(&config, graph.grid());

	println!("\n=== Run: {} ===", config.name);
	println!("Bounding box: {:?}", config.bbox);
	println!("Chunk size: {:?}", config.chunk_size);
	println!(
		"Levels: top mip {}, batch mip {}, high mip {}, overlap {}",
		plan.top_mip,
		plan.batch_mip,
		plan.high_mip,
		if plan.overlap { "on" } else { "off" }
	);

	println!("\n=== Chunks per level ===");
	for mip in plan.batch_mip..=plan.top_mip {
		let dims = graph.grid().dims_at(mip);
		println!(
			"  mip {mip:>2}: {:>8} chunks ({}x{}x{}) on {}",
			graph.grid().chunk_count(mip),
			dims.x,
			dims.y,
			dims.z,
			plan.queue_for(mip)
		);
	}

	println!("\n=== Stages ===");
	for stage in Stage::ALL {
		match StageGate::evaluate(&config, stage) {
			GateDecision::Proceed => {
				let scaling = ScalingPlan::new(&config.pools, graph.grid(), &plan);
				println!("  {}: {}", stage.label(), describe_scaling(&scaling));
			}
			GateDecision::Skipped(reason) => println!("  {}: skipped ({reason})", stage.label()),
		}
	}

	println!("\n=== Graph ===");
	print!("{}", graph.stats());
	println!("=============\n");
	Ok(())
}

fn describe_scaling(scaling: &ScalingPlan) -> String {
	let mut parts = vec![format!("elastic {}", scaling.elastic_size)];
	if let Some(size) = scaling.shed {
		parts.push(format!("shed to {size} after remap"));
	}
	if let Some((mip, size)) = scaling.intermediate {
		parts.push(format!("down to {size} after mip {mip}"));
	}
	if let Some(deep) = scaling.deep {
		parts.push(format!(
			"deep {} from mip {} to {}",
			deep.deep_size, deep.elastic_off_after, deep.deep_off_after
		));
	}
	if scaling.restore {
		parts.push("restore after top".to_string());
	}
	parts.join(", ")
}

fn export_command(cli: &Cli, output: Option<&Path>, pretty: bool) -> Result<()> {
	let config = load_config(cli)?;
	let graph = build_graph(&config)?;
	let exported = ExportedGraph::new(&graph);

	let writer: Box<dyn Write> = match output {
		Some(path) => Box::new(
			File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
		),
		None => Box::new(std::io::stdout().lock()),
	};
	let mut writer = BufWriter::new(writer);

	if pretty {
		serde_json::to_writer_pretty(&mut writer, &exported)
	} else {
		serde_json::to_writer(&mut writer, &exported)
	}
	.context("Serializing task graph")?;
	writeln!(writer)?;
	writer.flush()?;

	if let Some(path) = output {
		tracing::info!(nodes = graph.len(), "wrote {}", path.display());
	}
	Ok(())
}

fn batches_command(cli: &Cli) -> Result<()> {
	let config = load_config(cli)?;
	let grid = config.validate().context("Invalid configuration")?;
	let partition = partition_batches(&grid);

	println!("\n=== Batch partition ===");
	println!("Top mip: {}", grid.top_mip_level());
	println!("Batch mip: {}", partition.batch_mip);
	println!("High-level chunks: {}", partition.high_chunks.len());
	println!("Batches: {}", partition.len());
	if let Some(root) = partition.batch_roots.first() {
		let per_batch = grid.chunks_from(*root)?.count();
		println!("Chunks in first batch: {per_batch}");
	}
	println!("=======================\n");
	Ok(())
}

fn validate_command(cli: &Cli) -> Result<()> {
	let config = load_config(cli)?;
	let grid = config.validate().context("Invalid configuration")?;
	println!(
		"Configuration is valid: top mip {}, {} chunks at mip 0",
		grid.top_mip_level(),
		grid.chunk_count(0)
	);
	Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# Segmentation run configuration

# Run name, used in notifications
name = "example"

# Voxel bounding box [x0, y0, z0, x1, y1, z1], half-open
bbox = [0, 0, 0, 8192, 8192, 1024]

# Mip-0 chunk size in voxels
chunk_size = [512, 512, 128]

# Level where single-chunk tasks give way to batch tasks plus remap
batch_mip = 3

# First level routed to its own composite_<mip> queue
high_mip = 5

# Boundary overlap pass for agglomeration
overlap = false

# Reject chunk sizes that do not tile the box exactly
require_aligned = false

# Stages to skip, reusing their existing output ("ws", "agg")
skip = []

# Ground-truth segmentation; enables the evaluation task
# ground_truth = "gs://bucket/ground_truth"

[layers]
# affinity = "gs://bucket/affinity"
affinity_mip = 0
# watershed = "gs://bucket/ws"
# segmentation = "gs://bucket/seg"

[pools]
elastic = "cluster1"
elastic_capacity = 1000
shed_size = 20
fan_out_threshold = 100
deep = "cluster2"
reduction = "igneous"

[timeouts]
wrap_minutes = 11520
batch_minutes = 180
remap_minutes = 180
overlap_minutes = 180

[retry]
retries = 100
retry_delay_secs = 10
exponential_backoff = true
"#;

fn generate_config_command(output: &Path) -> Result<()> {
	std::fs::write(output, CONFIG_TEMPLATE)
		.with_context(|| format!("Failed to write {}", output.display()))?;
	println!("Generated sample configuration at: {}", output.display());
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cli_parse_default() {
		let cli = Cli::try_parse_from(["seg_plan"]).unwrap();
		assert!(cli.command.is_none());
		assert_eq!(cli.config, PathBuf::from("pipeline.toml"));
	}

	#[test]
	fn test_cli_parse_overrides() {
		let cli = Cli::try_parse_from([
			"seg_plan",
			"plan",
			"--batch-mip",
			"2",
			"--high-mip",
			"4",
			"--overlap",
			"--skip",
			"ws,agglomeration",
		])
		.unwrap();

		assert_eq!(cli.batch_mip, Some(2));
		assert_eq!(cli.high_mip, Some(4));
		assert!(cli.overlap);
		assert_eq!(cli.skip, vec![Stage::Ws, Stage::Agg]);
	}

	#[test]
	fn test_cli_rejects_unknown_stage() {
		assert!(Cli::try_parse_from(["seg_plan", "--skip", "mesh"]).is_err());
	}

	#[test]
	fn test_cli_parse_export() {
		let cli = Cli::try_parse_from(["seg_plan", "export", "-o", "graph.json", "--pretty", "-c", "run.toml"]).unwrap();
		assert_eq!(cli.config, PathBuf::from("run.toml"));
		assert!(matches!(
			cli.command,
			Some(Commands::Export { output: Some(_), pretty: true })
		));
	}

	#[test]
	fn test_overrides_applied() {
		let cli = Cli::try_parse_from(["seg_plan", "--batch-mip", "1", "--skip", "ws"]).unwrap();
		let mut config = PipelineConfig::new("cli", [0, 0, 0, 1024, 1024, 128], [128, 128, 128]);
		config.skip = vec![Stage::Ws];
		apply_overrides(&cli, &mut config);

		assert_eq!(config.batch_mip, 1);
		assert_eq!(config.high_mip, 5, "Unset overrides keep the file value");
		assert_eq!(config.skip, vec![Stage::Ws], "No duplicate skips");
	}

	/// The generated sample is a valid, buildable configuration.
	#[test]
	fn test_config_template_builds() {
		let config = PipelineConfig::from_toml_str(CONFIG_TEMPLATE).unwrap();
		let graph = build(&config).unwrap();
		assert_eq!(graph.top_mip(), 4);
		assert_eq!(graph.effective_batch_mip(), 3);
	}
}
