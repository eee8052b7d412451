use anyhow::Context;
use log::{debug, info};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::AnalysisError;

// @module: Evaluation question battery

/// Extension of question definition files
pub const QUESTION_EXTENSION: &str = "txt";

/// One legal check, applied to every document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationQuestion {
    /// File stem of the definition, e.g. `01_kaution`
    pub name: String,
    /// Instruction text sent ahead of the contract
    pub instruction: String,
}

impl EvaluationQuestion {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
        }
    }
}

/// The ordered question battery, sorted by name
#[derive(Debug, Clone, Default)]
pub struct QuestionSet {
    questions: Vec<EvaluationQuestion>,
}

impl QuestionSet {
    /// Build a set from questions in any order
    pub fn new(mut questions: Vec<EvaluationQuestion>) -> Self {
        questions.sort_by(|a, b| a.name.cmp(&b.name));
        Self { questions }
    }

    /// Load every `*.txt` file directly inside `dir`.
    ///
    /// A missing directory, an unreadable file or an empty set is a
    /// configuration error.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, AnalysisError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AnalysisError::Configuration(format!(
                "Question directory does not exist: {}",
                dir.display()
            )));
        }

        let files = Self::question_files(dir)
            .map_err(|e| AnalysisError::Configuration(format!("{:#}", e)))?;

        let mut questions = Vec::with_capacity(files.len());
        for path in files {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let instruction = std::fs::read_to_string(&path).map_err(|e| {
                AnalysisError::Configuration(format!(
                    "Failed to read question {}: {}",
                    path.display(),
                    e
                ))
            })?;
            debug!("Loaded question '{}' ({} characters)", name, instruction.len());
            questions.push(EvaluationQuestion::new(name, instruction));
        }

        if questions.is_empty() {
            return Err(AnalysisError::Configuration(format!(
                "No question definitions (*.{}) found in {}",
                QUESTION_EXTENSION,
                dir.display()
            )));
        }

        info!("Loaded {} evaluation questions from {}", questions.len(), dir.display());
        Ok(Self::new(questions))
    }

    fn question_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.context("Failed to read question directory entry")?;
            let path = entry.path();

            let is_question = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(QUESTION_EXTENSION));
            if is_question {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }

    pub fn questions(&self) -> &[EvaluationQuestion] {
        &self.questions
    }

    pub fn names(&self) -> Vec<&str> {
        self.questions.iter().map(|q| q.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvaluationQuestion> {
        self.questions.iter()
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a EvaluationQuestion;
    type IntoIter = std::slice::Iter<'a, EvaluationQuestion>;

    fn into_iter(self) -> Self::IntoIter {
        self.questions.iter()
    }
}
