use crate::cli::{open_pipeline, print_outcome, resolve_project, IngestCommands, IngestFileArgs, IngestUrlArgs};
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use brief_server::BriefConfig;

pub async fn run(cmd: IngestCommands, config: BriefConfig) -> Result<()> {
    match cmd {
        IngestCommands::File(args) => file(args, &config).await,
        IngestCommands::Url(args) => url(args, &config).await,
    }
}

async fn file(args: IngestFileArgs, config: &BriefConfig) -> Result<()> {
    let bytes = std::fs::read(&args.path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.path.display(), e))?;
    let payload = format!("data:{};base64,{}", args.media_type, STANDARD.encode(bytes));

    let pipeline = open_pipeline(config)?;
    let id = resolve_project(&pipeline, &args.project)?;
    let outcome = pipeline.document(id, &payload).await?;
    print_outcome(&outcome, &args.format)
}

async fn url(args: IngestUrlArgs, config: &BriefConfig) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    let id = resolve_project(&pipeline, &args.project)?;
    let outcome = pipeline.website(id, &args.url).await?;
    print_outcome(&outcome, &args.format)
}
