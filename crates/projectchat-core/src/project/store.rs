use crate::error::ProjectChatError;
use crate::project::builder::ContextBuilder;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";
const FILES_DIR: &str = "files";

/// The persisted part of a project: `config.toml` inside the project directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub system_prompt: String,
    pub files: Vec<String>,
}

/// A loaded project: its name, where it lives, and its record.
#[derive(Debug, Clone)]
pub struct Project {
    name: String,
    dir: PathBuf,
    record: ProjectRecord,
}

impl Project {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn files_dir(&self) -> PathBuf {
        self.dir.join(FILES_DIR)
    }

    pub fn system_prompt(&self) -> &str {
        &self.record.system_prompt
    }

    pub fn files(&self) -> &[String] {
        &self.record.files
    }

    pub fn record(&self) -> &ProjectRecord {
        &self.record
    }

    /// Flatten the prompt and every readable attached file into one context string.
    ///
    /// Files missing from storage are skipped; this never fails.
    pub fn render_context(&self) -> String {
        let files_dir = self.files_dir();
        let mut builder = ContextBuilder::new().with_system_prompt(&self.record.system_prompt);

        for name in &self.record.files {
            if !is_bare_file_name(name) {
                tracing::warn!(project = %self.name, file = %name, "skipping file name with path components");
                continue;
            }
            let path = files_dir.join(name);
            match fs::read_to_string(&path) {
                Ok(content) => builder = builder.add_context_file(name, content),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!(project = %self.name, file = %name, "skipping missing file");
                }
                Err(e) => {
                    tracing::warn!(project = %self.name, file = %name, "skipping unreadable file: {e}");
                }
            }
        }

        builder.build()
    }
}

/// Owns the on-disk layout `<root>/<name>/{config.toml,files/}`.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, name: &str) -> Result<PathBuf, ProjectChatError> {
        let invalid = name.trim().is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\']);
        if invalid {
            return Err(ProjectChatError::Config(format!(
                "Invalid project name: {name:?}"
            )));
        }
        Ok(self.root.join(name))
    }

    /// Read a project's record if one exists. Never writes.
    ///
    /// A record that exists but cannot be read or parsed is a `Config` error.
    pub fn load(&self, name: &str) -> Result<Option<Project>, ProjectChatError> {
        let dir = self.project_dir(name)?;
        let config_path = dir.join(CONFIG_FILE);

        let content = match fs::read_to_string(&config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ProjectChatError::Config(format!(
                    "Failed to read {}: {e}",
                    config_path.display()
                )))
            }
        };

        let record: ProjectRecord = toml::from_str(&content).map_err(|e| {
            ProjectChatError::Config(format!("Corrupt project record {}: {e}", config_path.display()))
        })?;

        tracing::debug!(project = name, files = record.files.len(), "loaded project");
        Ok(Some(Project {
            name: name.to_string(),
            dir,
            record,
        }))
    }

    /// Create the project directories and persist an empty record.
    pub fn create_default(&self, name: &str) -> Result<Project, ProjectChatError> {
        let dir = self.project_dir(name)?;
        fs::create_dir_all(dir.join(FILES_DIR))?;

        let project = Project {
            name: name.to_string(),
            dir,
            record: ProjectRecord::default(),
        };
        write_record(&project.config_path(), &project.record)?;
        tracing::debug!(project = name, "created project");
        Ok(project)
    }

    /// Load `name`, creating it with defaults if it does not exist yet.
    pub fn open(&self, name: &str) -> Result<Project, ProjectChatError> {
        match self.load(name)? {
            Some(project) => {
                fs::create_dir_all(project.files_dir())?;
                Ok(project)
            }
            None => self.create_default(name),
        }
    }

    /// Names of all project directories, sorted.
    pub fn list(&self) -> Result<Vec<String>, ProjectChatError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Replace the system prompt and persist. Empty text clears it.
    pub fn set_system_prompt(
        &self,
        project: &mut Project,
        text: impl Into<String>,
    ) -> Result<(), ProjectChatError> {
        let mut record = project.record.clone();
        record.system_prompt = text.into();
        self.commit(project, record)
    }

    /// Register `file_name` if not already present, then persist.
    ///
    /// The bytes must already be in the project's file storage.
    pub fn add_file(
        &self,
        project: &mut Project,
        file_name: impl Into<String>,
    ) -> Result<(), ProjectChatError> {
        let file_name = file_name.into();
        if !is_bare_file_name(&file_name) {
            return Err(ProjectChatError::Config(format!(
                "Invalid file name: {file_name:?}"
            )));
        }
        let mut record = project.record.clone();
        if !record.files.contains(&file_name) {
            record.files.push(file_name);
        }
        self.commit(project, record)
    }

    /// Copy `source` into the project's file storage under its base name and register it.
    pub fn import_file(
        &self,
        project: &mut Project,
        source: &Path,
    ) -> Result<String, ProjectChatError> {
        if !source.is_file() {
            return Err(ProjectChatError::NotFound(source.to_path_buf()));
        }
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ProjectChatError::NotFound(source.to_path_buf()))?;

        let files_dir = project.files_dir();
        fs::create_dir_all(&files_dir)?;

        // Stage the bytes so an existing attachment is only replaced once the record is saved.
        let staged = files_dir.join(format!(".{file_name}.import"));
        fs::copy(source, &staged)?;
        if let Err(e) = self.add_file(project, file_name.clone()) {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }
        fs::rename(&staged, files_dir.join(&file_name))?;
        tracing::debug!(project = %project.name, file = %file_name, "imported file");
        Ok(file_name)
    }

    /// Read a prompt file and make its text the project's system prompt.
    pub fn set_prompt_from_file(
        &self,
        project: &mut Project,
        path: &Path,
    ) -> Result<(), ProjectChatError> {
        if !path.is_file() {
            return Err(ProjectChatError::NotFound(path.to_path_buf()));
        }
        let prompt = fs::read_to_string(path)?;
        self.set_system_prompt(project, prompt)
    }

    fn commit(&self, project: &mut Project, record: ProjectRecord) -> Result<(), ProjectChatError> {
        write_record(&project.config_path(), &record)?;
        project.record = record;
        Ok(())
    }
}

/// A single path component naming a file, e.g. `notes.txt` but not `../x` or `a/b`.
fn is_bare_file_name(name: &str) -> bool {
    Path::new(name).file_name() == Some(OsStr::new(name))
}

fn write_record(path: &Path, record: &ProjectRecord) -> Result<(), ProjectChatError> {
    let contents = toml::to_string_pretty(record)?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
