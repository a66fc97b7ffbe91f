use clap::{Parser, Subcommand};
use projectchat_core::{ProjectChatError, ProjectStore, Settings};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "projectchat")]
#[command(about = "Chat with Claude using per-project prompts and reference files")]
#[command(version)]
pub struct Cli {
    /// Directory holding project folders
    #[arg(long, global = true)]
    pub projects_dir: Option<PathBuf>,

    /// Claude model to use
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Fold command-line overrides into loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(ref dir) = self.projects_dir {
            settings.storage.projects_dir = dir.clone();
        }
        if let Some(ref model) = self.model {
            settings.llm.model = model.clone();
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create a new project
    Create { name: String },

    /// List all projects
    #[command(alias = "list-projects")]
    List,

    /// Copy a file into a project and attach it
    AddFile { project: String, path: PathBuf },

    /// Set a project's system prompt from a file
    SetPrompt { project: String, prompt_file: PathBuf },

    /// Start an interactive chat, optionally primed with a project
    Chat {
        #[arg(short, long)]
        project: Option<String>,
    },
}

/// Result of running a non-interactive command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Hand off to the interactive chat loop.
    StartChat { project: Option<String> },
}

pub fn handle_command(
    store: &ProjectStore,
    command: &Command,
) -> Result<CommandResult, ProjectChatError> {
    match command {
        Command::Create { name } => {
            store.open(name)?;
            Ok(CommandResult::Message(format!("Created project: {name}")))
        }
        Command::List => {
            let projects = store.list()?;
            if projects.is_empty() {
                return Ok(CommandResult::Message("No projects found".into()));
            }
            let mut text = String::from("Projects:");
            for project in projects {
                text.push_str(&format!("\n- {project}"));
            }
            Ok(CommandResult::Message(text))
        }
        Command::AddFile { project, path } => {
            // Checked before opening so a bad path never creates the project.
            if !path.is_file() {
                return Err(ProjectChatError::NotFound(path.clone()));
            }
            let mut loaded = store.open(project)?;
            let name = store.import_file(&mut loaded, path)?;
            Ok(CommandResult::Message(format!(
                "Added file {name} to project {project}"
            )))
        }
        Command::SetPrompt {
            project,
            prompt_file,
        } => {
            if !prompt_file.is_file() {
                return Err(ProjectChatError::NotFound(prompt_file.clone()));
            }
            let mut loaded = store.open(project)?;
            store.set_prompt_from_file(&mut loaded, prompt_file)?;
            Ok(CommandResult::Message(format!(
                "Updated system prompt for project {project}"
            )))
        }
        Command::Chat { project } => Ok(CommandResult::StartChat {
            project: project.clone(),
        }),
    }
}
