use crate::cli::{
    open_pipeline, resolve_project, truncate, ProjectCommands, ProjectCreateArgs, ProjectDeleteArgs,
    ProjectListArgs, ProjectShowArgs,
};
use anyhow::Result;
use brief_core::BriefingStore;
use brief_server::BriefConfig;

pub async fn run(cmd: ProjectCommands, config: BriefConfig) -> Result<()> {
    match cmd {
        ProjectCommands::Create(args) => create(args, &config),
        ProjectCommands::List(args) => list(args, &config),
        ProjectCommands::Show(args) => show(args, &config),
        ProjectCommands::Delete(args) => delete(args, &config).await,
    }
}

fn create(args: ProjectCreateArgs, config: &BriefConfig) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    let project = pipeline.create_project(&args.name, args.description)?;
    println!("Created project {}", project.id);
    Ok(())
}

fn list(args: ProjectListArgs, config: &BriefConfig) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    let projects = pipeline.store().list_projects()?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }
    if projects.is_empty() {
        println!("(no projects)");
        return Ok(());
    }

    println!("{:<36}  {:<5}  {:<16}  {}", "ID", "DONE", "UPDATED", "NAME");
    println!("{}", "─".repeat(80));
    for p in &projects {
        let pct = pipeline
            .store()
            .load(p.id)?
            .map(|s| s.completion_percentage)
            .unwrap_or(0);
        println!(
            "{:<36}  {:>4}%  {:<16}  {}",
            p.id,
            pct,
            p.updated_at.format("%Y-%m-%d %H:%M"),
            truncate(&p.name, 30)
        );
    }
    Ok(())
}

fn show(args: ProjectShowArgs, config: &BriefConfig) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    let id = resolve_project(&pipeline, &args.project)?;
    let project = pipeline.project(id)?;
    let briefing = pipeline.briefing(id)?;

    if args.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "project": project,
                "briefing": briefing,
            }))?
        );
        return Ok(());
    }

    println!();
    println!("{} ({})", project.name, project.id);
    if let Some(desc) = &project.description {
        println!("{}", desc);
    }
    println!("{}", "─".repeat(50));
    println!("Completion: {}%", briefing.completion_percentage);
    println!();
    if let Some(summary) = &briefing.stage_summary {
        println!("{}", summary);
    }
    Ok(())
}

async fn delete(args: ProjectDeleteArgs, config: &BriefConfig) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    let id = resolve_project(&pipeline, &args.project)?;

    if !args.yes {
        println!("Refusing to delete {} without --yes.", id);
        return Ok(());
    }
    pipeline.delete_project(id).await?;
    println!("Deleted project {}", id);
    Ok(())
}
