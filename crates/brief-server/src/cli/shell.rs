use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use brief_core::ProjectId;
use brief_server::BriefConfig;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::{open_pipeline, print_outcome, resolve_project, ChatArgs, CliPipeline};

pub async fn run(args: ChatArgs, config: BriefConfig) -> Result<()> {
    let pipeline = open_pipeline(&config)?;
    let id = resolve_project(&pipeline, &args.project)?;
    let project = pipeline.project(id)?;

    let mut rl = DefaultEditor::new()?;

    println!();
    println!("Brief chat for project '{}' ({})", project.name, id);
    println!("Model: {}", pipeline.model_name());
    println!("Tell us about your product. Type '/help' for commands, 'exit' to quit.");
    println!();

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if line == "exit" || line == "quit" {
                    println!("Goodbye.");
                    break;
                }

                if let Err(e) = dispatch(&pipeline, id, &line).await {
                    eprintln!("Error: {}", e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(e) => {
                eprintln!("readline error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

async fn dispatch(pipeline: &CliPipeline, id: ProjectId, line: &str) -> Result<()> {
    match ShellInput::parse(line) {
        ShellInput::Help => print_help(),
        ShellInput::Show => {
            let briefing = pipeline.briefing(id)?;
            println!("{}", briefing.stage_summary.unwrap_or_default());
            println!("Completion: {}%", briefing.completion_percentage);
        }
        ShellInput::Summary => println!("{}", pipeline.summarize(id).await?),
        ShellInput::File(path) => {
            let bytes = std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
            let payload = format!("data:text/plain;base64,{}", STANDARD.encode(bytes));
            print_outcome(&pipeline.document(id, &payload).await?, "text")?;
        }
        ShellInput::Link(url) => print_outcome(&pipeline.website(id, url).await?, "text")?,
        ShellInput::Unknown(cmd) => println!("Unknown command '{}'. Type '/help'.", cmd),
        ShellInput::Message(text) => print_outcome(&pipeline.chat(id, text).await?, "text")?,
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ShellInput<'a> {
    Help,
    Show,
    Summary,
    File(&'a str),
    Link(&'a str),
    Unknown(&'a str),
    Message(&'a str),
}

impl<'a> ShellInput<'a> {
    fn parse(line: &'a str) -> Self {
        let Some(command) = line.strip_prefix('/') else {
            return ShellInput::Message(line);
        };
        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map(|(n, r)| (n, r.trim()))
            .unwrap_or((command, ""));
        match (name, rest) {
            ("help", _) => ShellInput::Help,
            ("show", _) => ShellInput::Show,
            ("summary", _) => ShellInput::Summary,
            ("file", path) if !path.is_empty() => ShellInput::File(path),
            ("link", url) if !url.is_empty() => ShellInput::Link(url),
            _ => ShellInput::Unknown(name),
        }
    }
}

fn print_help() {
    println!("Anything not starting with '/' is sent as a chat message.");
    println!("  /file <path>   upload a text document");
    println!("  /link <url>    process a web page");
    println!("  /show          print the current briefing");
    println!("  /summary       generate a project summary");
    println!("  /help");
    println!("  exit / quit");
}
