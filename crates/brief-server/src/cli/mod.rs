pub mod config_cmd;
pub mod ingest;
pub mod project;
pub mod shell;

use brief_core::pipeline::{BriefingPipeline, PipelineOutcome};
use brief_core::{BriefingStore, ProjectId, RedbStore};
use brief_server::BriefConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "brief")]
#[command(version, about = "Progressive briefing extraction from chat, documents and websites")]
pub struct Cli {
    /// Path to brief.toml
    #[arg(long, global = true, env = "BRIEF_CONFIG", default_value = "brief.toml")]
    pub config: PathBuf,

    /// Path to data directory (overrides config file)
    #[arg(long, global = true, env = "BRIEF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve,
    /// Interactive chat with a project's briefing assistant
    Chat(ChatArgs),
    /// Feed a document or a web page into a project
    #[command(subcommand)]
    Ingest(IngestCommands),
    /// Project operations
    #[command(subcommand)]
    Project(ProjectCommands),
    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Project id or exact name
    pub project: String,
}

#[derive(Subcommand, Debug)]
pub enum IngestCommands {
    /// Upload a local file as a document
    File(IngestFileArgs),
    /// Fetch and process a web page
    Url(IngestUrlArgs),
}

#[derive(Args, Debug)]
pub struct IngestFileArgs {
    /// Project id or exact name
    pub project: String,
    pub path: PathBuf,
    /// Media type recorded with the upload
    #[arg(long, default_value = "text/plain")]
    pub media_type: String,
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct IngestUrlArgs {
    /// Project id or exact name
    pub project: String,
    pub url: String,
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    Create(ProjectCreateArgs),
    List(ProjectListArgs),
    Show(ProjectShowArgs),
    Delete(ProjectDeleteArgs),
}

#[derive(Args, Debug)]
pub struct ProjectCreateArgs {
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProjectListArgs {
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct ProjectShowArgs {
    /// Project id or exact name
    pub project: String,
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct ProjectDeleteArgs {
    /// Project id or exact name
    pub project: String,
    /// Skip confirmation
    #[arg(long)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Validate,
    Show,
}

// --- Pipeline helpers ---

pub type CliPipeline = BriefingPipeline<RedbStore>;

pub fn open_pipeline(config: &BriefConfig) -> anyhow::Result<CliPipeline> {
    let store = RedbStore::open(config.db_path()).map_err(|e| {
        anyhow::anyhow!(
            "Failed to open database at {}: {}",
            config.db_path().display(),
            e
        )
    })?;
    Ok(BriefingPipeline::with_config(
        Arc::new(store),
        config.text_model(),
        config.website_fetcher()?,
        config.pipeline_config(),
    ))
}

/// Accept a UUID or an exact project name.
pub fn resolve_project(pipeline: &CliPipeline, reference: &str) -> anyhow::Result<ProjectId> {
    if let Ok(id) = reference.parse::<ProjectId>() {
        return Ok(pipeline.project(id)?.id);
    }
    let matches: Vec<_> = pipeline
        .store()
        .list_projects()?
        .into_iter()
        .filter(|p| p.name == reference)
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id),
        [] => anyhow::bail!("No project named '{}'", reference),
        _ => anyhow::bail!(
            "{} projects are named '{}'; use the project id",
            matches.len(),
            reference
        ),
    }
}

// --- Printing helpers ---

pub fn print_outcome(outcome: &PipelineOutcome, format: &str) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    println!();
    println!("{}", outcome.reply);
    println!();
    println!(
        "[{}% complete{}]",
        outcome.state.completion_percentage,
        if outcome.extraction_succeeded { "" } else { ", extraction degraded" }
    );
    Ok(())
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}…", s.chars().take(max - 1).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "brief",
            "project",
            "create",
            "Roastery",
            "--description",
            "Coffee",
            "--data-dir",
            "/tmp/brief",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/brief")));
        match cli.command {
            Commands::Project(ProjectCommands::Create(args)) => {
                assert_eq!(args.name, "Roastery");
                assert_eq!(args.description.as_deref(), Some("Coffee"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ingest_url_parses() {
        let cli = Cli::try_parse_from(["brief", "ingest", "url", "Roastery", "https://example.com"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ingest(IngestCommands::Url(ref a)) if a.url == "https://example.com"
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 6), "a lon…");
    }

    #[test]
    fn test_resolve_project_by_id_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BriefConfig::default();
        config.server.data_dir = dir.path().to_path_buf();
        config.model.provider = "disabled".into();
        let pipeline = open_pipeline(&config).unwrap();

        let project = pipeline.create_project("Roastery", None).unwrap();
        assert_eq!(resolve_project(&pipeline, &project.id.to_string()).unwrap(), project.id);
        assert_eq!(resolve_project(&pipeline, "Roastery").unwrap(), project.id);
        assert!(resolve_project(&pipeline, "Bakery").is_err());

        pipeline.create_project("Roastery", None).unwrap();
        assert!(resolve_project(&pipeline, "Roastery").is_err());
    }
}
