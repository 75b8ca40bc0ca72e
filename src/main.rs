use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use docxide_images::{
    Alignment, CommandPlanner, DEFAULT_WIDTH_INCHES, Error, FilePlanner, HeadingPlanner,
    InsertOptions, InsertionPlanner, PipelineConfig, analyze_structure, extract_images,
    insert_batch, parse_plan_response, pipeline, read_manifest, validate_plan, write_manifest,
};

/// Move images from one DOCX into another at planned positions.
#[derive(Debug, Parser)]
#[command(name = "docxide-images", version)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the body paragraph structure of a document.
    Analyze {
        document: PathBuf,
        /// Print the full structure as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Extract every embedded image to a directory.
    Extract {
        document: PathBuf,
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
    },
    /// Insert extracted images according to a plan file.
    Insert {
        document: PathBuf,
        /// JSON plan: an array of {image_index, insert_after_paragraph}.
        #[arg(long)]
        plan: PathBuf,
        /// Directory written by `extract`.
        #[arg(long, value_name = "DIR")]
        images: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Extract, plan, insert and verify in one go.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct LayoutArgs {
    /// Width of inserted images in inches.
    #[arg(long, env = "DOCXIDE_IMAGES_WIDTH", default_value_t = DEFAULT_WIDTH_INCHES)]
    width: f32,
    /// left, center or right.
    #[arg(long, env = "DOCXIDE_IMAGES_ALIGN", default_value = "center")]
    align: String,
}

impl LayoutArgs {
    fn options(&self) -> InsertOptions {
        InsertOptions {
            width_inches: self.width,
            alignment: Alignment::parse(&self.align),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlannerKind {
    Heading,
    File,
    Command,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long, env = "DOCXIDE_IMAGES_SOURCE")]
    source: PathBuf,
    #[arg(long, env = "DOCXIDE_IMAGES_TARGET")]
    target: PathBuf,
    #[arg(long, env = "DOCXIDE_IMAGES_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,
    #[arg(long, env = "DOCXIDE_IMAGES_TEMP_DIR", default_value = "temp")]
    temp_dir: PathBuf,
    #[arg(long, value_enum, env = "DOCXIDE_IMAGES_PLANNER", default_value = "heading")]
    planner: PlannerKind,
    /// Plan read by the `file` planner.
    #[arg(long)]
    plan_file: Option<PathBuf>,
    /// Program run by the `command` planner.
    #[arg(long, env = "DOCXIDE_IMAGES_PLANNER_COMMAND")]
    planner_command: Option<String>,
    #[command(flatten)]
    layout: LayoutArgs,
}

fn analyze(document: &Path, json: bool) -> Result<(), Error> {
    let structure = analyze_structure(document)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&structure)?);
        return Ok(());
    }
    println!("Total paragraphs: {}", structure.total_paragraphs);
    println!("Headings: {}", structure.headings.len());
    println!("Empty paragraphs: {:?}", structure.empty_paragraphs);
    for p in &structure.paragraphs {
        let text: String = p.text.chars().take(60).collect();
        println!("{:>4} [{}] {}", p.index, p.style, text);
    }
    Ok(())
}

fn extract(document: &Path, out: &Path) -> Result<(), Error> {
    let images = extract_images(document, out)?;
    write_manifest(out, &images)?;
    for img in &images {
        let size = match (img.width, img.height) {
            (Some(w), Some(h)) => format!("{w}x{h}"),
            _ => "unknown size".to_string(),
        };
        println!(
            "{:>3} {} ({}, {} bytes, {})",
            img.index, img.filename, img.content_type, img.size_bytes, size
        );
    }
    println!("Extracted {} images to {}", images.len(), out.display());
    Ok(())
}

fn insert(
    document: &Path,
    plan: &Path,
    images: &Path,
    output: &Path,
    options: InsertOptions,
) -> Result<(), Error> {
    let text = std::fs::read_to_string(plan)?;
    let plan = parse_plan_response(&text)?;
    let records = read_manifest(images)?;
    let validated = validate_plan(&plan, &records);
    let report = insert_batch(document, output, &validated.insertions, &options)?;
    println!(
        "Inserted {} of {} images into {}",
        report.applied,
        plan.len(),
        report.output_path.display()
    );
    for warning in validated.warnings.iter().chain(&report.warnings) {
        println!("  skipped: {warning}");
    }
    Ok(())
}

fn run(args: RunArgs) -> Result<(), Error> {
    let planner: Box<dyn InsertionPlanner> = match args.planner {
        PlannerKind::Heading => Box::new(HeadingPlanner),
        PlannerKind::File => {
            let path = args
                .plan_file
                .ok_or_else(|| Error::InvalidInput("--plan-file is required for the file planner".into()))?;
            Box::new(FilePlanner::new(path))
        }
        PlannerKind::Command => {
            let line = args.planner_command.ok_or_else(|| {
                Error::InvalidInput("--planner-command is required for the command planner".into())
            })?;
            Box::new(CommandPlanner::from_command_line(&line)?)
        }
    };

    let mut config = PipelineConfig::new(args.source, args.target);
    config.output_dir = args.output_dir;
    config.temp_dir = args.temp_dir;
    config.insert = args.layout.options();

    let summary = pipeline::run(&config, planner.as_ref())?;

    println!("Planner: {}", summary.planner);
    println!("Images extracted: {}", summary.images_extracted);
    println!("Decisions: {}", summary.decisions);
    println!("Images inserted: {}", summary.applied);
    println!(
        "Paragraphs: {} -> {}{}",
        summary.paragraphs_before,
        summary.paragraphs_after,
        if summary.verified { "" } else { " (unexpected)" }
    );
    for warning in &summary.warnings {
        println!("  warning: {warning}");
    }
    println!("Output: {}", summary.output_path.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();

    let result = match cli.command {
        Commands::Analyze { document, json } => analyze(&document, json),
        Commands::Extract { document, out } => extract(&document, &out),
        Commands::Insert {
            document,
            plan,
            images,
            output,
            layout,
        } => insert(&document, &plan, &images, &output, layout.options()),
        Commands::Run(args) => run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
