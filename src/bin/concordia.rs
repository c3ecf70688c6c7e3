use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use concordia::cli;
use concordia::config::EngineConfig;
use concordia::genome::add_genome;
use concordia::nomenclature::register::register_nomenclature;
use concordia::nomenclature::remove::remove_nomenclature;
use concordia::nomenclature::translate::load_mapping_tsv;
use concordia::query::{gene_view, transcript_view};
use concordia::reconcile::delete::delete_submission;
use concordia::reconcile::{ConfirmRequest, Reconciler};
use concordia::store::{MemoryStore, Store};
use concordia::transcript::{AttributeKind, SemanticKeys};

#[derive(Parser)]
#[command(
    name = "concordia",
    version,
    about = "Genome annotation ingestion and transcript reconciliation"
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config", global = true, default_value = "concordia.json")]
    config: PathBuf,

    /// Log filter, e.g. `info` or `concordia=debug`
    #[arg(long = "log-level", global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a configuration file and create the data directory
    Init {
        /// Data directory root
        #[arg(short = 'd', long = "data-dir")]
        data_dir: PathBuf,
    },
    /// Register an assembly
    AddAssembly {
        #[arg(long)]
        name: String,
    },
    /// Register an annotation source version
    AddSourceVersion {
        #[arg(long)]
        source: String,
        /// Release of the source, e.g. `44`
        #[arg(long)]
        release: String,
    },
    /// Add the genome FASTA that defines an assembly's sequences
    AddGenome {
        #[arg(short = 'a', long)]
        assembly: u64,
        #[arg(short = 'n', long)]
        nomenclature: String,
        #[arg(short = 'f', long)]
        fasta: PathBuf,
    },
    /// Register a further nomenclature from a two-column TSV name mapping
    RegisterNomenclature {
        #[arg(short = 'a', long)]
        assembly: u64,
        /// Nomenclature whose files are translated
        #[arg(long)]
        from: String,
        /// Name of the new nomenclature
        #[arg(long)]
        name: String,
        #[arg(short = 'm', long)]
        mapping: PathBuf,
    },
    /// Normalize an annotation and report candidate nomenclatures and attributes
    Detect {
        #[arg(short = 'a', long)]
        assembly: u64,
        #[arg(short = 'g', long)]
        gtf: PathBuf,
        /// Print the detection as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Reconcile an annotation into the store
    Ingest {
        #[arg(short = 'a', long)]
        assembly: u64,
        #[arg(short = 's', long = "source-version")]
        source_version: u64,
        #[arg(short = 'g', long)]
        gtf: PathBuf,
        /// Nomenclature of the file; defaults to the best candidate
        #[arg(short = 'n', long)]
        nomenclature: Option<String>,
        #[arg(long, default_value = "gene_name")]
        gene_name_key: String,
        #[arg(long, default_value = "gene_type")]
        gene_type_key: String,
        #[arg(long, default_value = "transcript_type")]
        transcript_type_key: String,
        /// Attribute to capture as `key=categorical` or `key=variable`
        #[arg(long = "capture", value_parser = parse_capture)]
        capture: Vec<(String, AttributeKind)>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Remove a nomenclature with its sequence names, genome and source files
    RemoveNomenclature {
        #[arg(short = 'a', long)]
        assembly: u64,
        #[arg(short = 'n', long)]
        nomenclature: String,
    },
    /// Delete a submission with its rows and source files; transcripts and
    /// introns no other submission uses go with it
    DeleteSubmission {
        #[arg(long)]
        sva: u64,
    },
    /// Show one transcript as submitted by one source version
    Transcript {
        #[arg(short = 'a', long)]
        assembly: u64,
        #[arg(short = 'n', long)]
        nomenclature: String,
        #[arg(long)]
        tid: u64,
        #[arg(long)]
        sva: u64,
        #[arg(long = "transcript-id")]
        transcript_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Show a gene with every transcript its submission bound to it
    Gene {
        #[arg(short = 'n', long)]
        nomenclature: String,
        /// Internal gene id
        #[arg(long, conflicts_with_all = ["sva", "gene_id"], required_unless_present = "gene_id")]
        gid: Option<u64>,
        /// Submission to look `--gene-id` up in
        #[arg(long, requires = "gene_id")]
        sva: Option<u64>,
        /// File-local gene id
        #[arg(long = "gene-id", requires = "sva")]
        gene_id: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Remove temp entries left behind by runs that did not finish
    SweepTemp {
        /// Only entries untouched for at least this many hours
        #[arg(long = "older-than-hours", default_value_t = 24)]
        older_than_hours: u64,
    },
}

fn parse_capture(s: &str) -> Result<(String, AttributeKind), String> {
    let (key, kind) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=kind, got '{s}'"))?;
    let kind = match kind {
        "categorical" => AttributeKind::Categorical,
        "variable" => AttributeKind::Variable,
        other => return Err(format!("unknown attribute kind '{other}'")),
    };
    Ok((key.to_string(), kind))
}

fn init_tracing(level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn open_store(config: &EngineConfig) -> Result<MemoryStore> {
    let path = config.store_path();
    MemoryStore::open(&path).with_context(|| format!("failed to open store: {}", path.display()))
}

fn save_store(store: &MemoryStore, config: &EngineConfig) -> Result<()> {
    store
        .save()
        .with_context(|| format!("failed to save store: {}", config.store_path().display()))
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli_args = Cli::parse();
    init_tracing(&cli_args.log_level)?;

    match cli_args.command {
        Command::Init { data_dir } => init(&cli_args.config, &data_dir)?,
        command => {
            let config = EngineConfig::from_file(&cli_args.config)?;
            run(&config, command)?;
        }
    }

    cli::print_summary(start);
    Ok(())
}

fn init(config_path: &Path, data_dir: &Path) -> Result<()> {
    cli::banner("Init");
    if config_path.exists() {
        bail!("config file already exists: {}", config_path.display());
    }
    let config = EngineConfig::for_data_dir(data_dir);
    config.layout().ensure()?;
    config.write_file(config_path)?;
    MemoryStore::open(&config.store_path())?.save()?;

    cli::kv("Config", &config_path.display().to_string());
    cli::kv("Data dir", &data_dir.display().to_string());
    cli::kv("Store", &config.store_path().display().to_string());
    cli::success("initialized");
    Ok(())
}

fn run(config: &EngineConfig, command: Command) -> Result<()> {
    let layout = config.layout();
    let mut store = open_store(config)?;

    match command {
        Command::Init { .. } => bail!("init runs without an existing config"),
        Command::AddAssembly { name } => {
            cli::banner("Add Assembly");
            let id = store.insert_assembly(&name)?;
            save_store(&store, config)?;
            cli::kv("Assembly", &name);
            cli::kv("Id", &id.to_string());
            cli::success("assembly added");
        }
        Command::AddSourceVersion { source, release } => {
            cli::banner("Add Source Version");
            let id = store.insert_source_version(&source, &release)?;
            save_store(&store, config)?;
            cli::kv("Source", &format!("{source} {release}"));
            cli::kv("Id", &id.to_string());
            cli::success("source version added");
        }
        Command::AddGenome {
            assembly,
            nomenclature,
            fasta,
        } => {
            cli::banner("Add Genome");
            cli::section("Genome");
            cli::kv("FASTA", &fasta.display().to_string());
            let report = add_genome(&mut store, &layout, assembly, &nomenclature, &fasta)?;
            save_store(&store, config)?;
            cli::rows(&cli::genome_rows(&report));
            cli::success(&format!("genome registered under '{nomenclature}'"));
        }
        Command::RegisterNomenclature {
            assembly,
            from,
            name,
            mapping,
        } => {
            cli::banner("Register Nomenclature");
            let pairs = load_mapping_tsv(&mapping)
                .with_context(|| format!("failed to read mapping: {}", mapping.display()))?;
            cli::kv("Mapping", &format!("{} ({} names)", mapping.display(), pairs.len()));
            let report = register_nomenclature(&mut store, &layout, assembly, &from, &name, &pairs)?;
            save_store(&store, config)?;
            cli::rows(&cli::registration_rows(&report));
            cli::success(&format!("nomenclature '{name}' registered"));
        }
        Command::Detect {
            assembly,
            gtf,
            json,
        } => {
            cli::banner("Detect");
            let reconciler = Reconciler::from_config(config);
            let pending = reconciler.receive(&store, assembly, &gtf)?;
            let detection = pending.detection();
            if json {
                println!("{}", serde_json::to_string_pretty(detection)?);
            } else {
                let (candidates, attributes) = cli::detection_rows(detection);
                cli::section("Candidates");
                cli::rows(&candidates);
                eprintln!();
                cli::section("Attributes");
                cli::rows(&attributes);
            }
        }
        Command::Ingest {
            assembly,
            source_version,
            gtf,
            nomenclature,
            gene_name_key,
            gene_type_key,
            transcript_type_key,
            capture,
            description,
        } => {
            cli::banner("Ingest");
            let reconciler = Reconciler::from_config(config);
            let pending = reconciler.receive(&store, assembly, &gtf)?;

            let nomenclature = match nomenclature {
                Some(n) => n,
                None => pending
                    .detection()
                    .candidates
                    .first()
                    .map(|c| c.nomenclature.clone())
                    .context("no candidate nomenclature")?,
            };
            if let Some(candidate) = pending.detection().candidate(&nomenclature) {
                for seqid in &candidate.unmatched {
                    cli::warning(&format!("{seqid} is not named under '{nomenclature}'; dropped"));
                }
            }
            let request = ConfirmRequest {
                source_version_id: source_version,
                nomenclature,
                keys: SemanticKeys::new(&gene_name_key, &gene_type_key, &transcript_type_key),
                attribute_types: capture.into_iter().collect::<BTreeMap<_, _>>(),
                description,
            };

            let report = reconciler.confirm(&mut store, pending, &request)?;
            save_store(&store, config)?;

            cli::section("Result");
            cli::rows(&cli::ingest_rows(&report));
            cli::success("upload committed");
        }
        Command::RemoveNomenclature {
            assembly,
            nomenclature,
        } => {
            cli::banner("Remove Nomenclature");
            let removal = remove_nomenclature(&mut store, &layout, assembly, &nomenclature)?;
            save_store(&store, config)?;
            cli::rows(&cli::removal_rows(&removal));
            cli::success(&format!("nomenclature '{nomenclature}' removed"));
        }
        Command::DeleteSubmission { sva } => {
            cli::banner("Delete Submission");
            let removal = delete_submission(&mut store, &layout, sva)?;
            save_store(&store, config)?;
            cli::rows(&cli::removal_rows(&removal));
            cli::success(&format!("submission {sva} deleted"));
        }
        Command::SweepTemp { older_than_hours } => {
            cli::banner("Sweep Temp");
            let older_than = Duration::from_secs(older_than_hours * 3600);
            let removed = layout.sweep_temp(older_than)?;
            cli::kv("Directory", &layout.temp_dir().display().to_string());
            cli::kv("Older than", &format!("{older_than_hours} h"));
            cli::kv("Removed", &cli::format_count(removed as u64));
            cli::success("temp directory swept");
        }
        Command::Transcript {
            assembly,
            nomenclature,
            tid,
            sva,
            transcript_id,
            json,
        } => {
            let view = transcript_view(&store, assembly, &nomenclature, tid, sva, &transcript_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                cli::banner("Transcript");
                cli::rows(&cli::transcript_rows(&view));
                println!(">{}\n{}", view.transcript_id, view.nucleotides);
                if let Some(protein) = &view.protein {
                    println!(">{}_protein\n{protein}", view.transcript_id);
                }
            }
        }
        Command::Gene {
            nomenclature,
            gid,
            sva,
            gene_id,
            json,
        } => {
            let gid = match (gid, sva, gene_id) {
                (Some(gid), ..) => gid,
                (None, Some(sva), Some(gene_id)) => store
                    .find_gene(sva, &gene_id)
                    .with_context(|| format!("no gene '{gene_id}' in submission {sva}"))?,
                _ => bail!("give --gid, or --sva with --gene-id"),
            };
            let view = gene_view(&store, gid, &nomenclature)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                cli::banner("Gene");
                let (gene, transcripts) = cli::gene_rows(&view);
                cli::rows(&gene);
                eprintln!();
                cli::section("Transcripts");
                cli::rows(&transcripts);
            }
        }
    }
    Ok(())
}
