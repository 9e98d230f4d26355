// ============================================================
// Layer 4 — Corpus Loaders
// ============================================================
// Two ways to get the 20 Newsgroups corpus:
//
//   HubCorpusSource      (default)
//     Downloads the dataset repo from the Hugging Face Hub via
//     hf-hub. The repo ships two JSON-lines files; each row is
//       {"text": "...", "label": 7, "label_text": "rec.autos"}
//     Both files are merged into one corpus, the split is ours.
//     The hub copy already has headers, footers and quotes
//     removed.
//
//   NewsgroupsDirSource
//     Reads a local copy of the raw `20news-bydate` archive:
//
//       root/
//         20news-bydate-train/
//           alt.atheism/49960
//           comp.graphics/37261
//           ...
//         20news-bydate-test/
//           ...
//
//     A "category directory" is any directory holding files; the
//     split directories are walked through. Labels are the
//     indices of the sorted category names. Metadata is stripped
//     with MetadataStripper.
//
// hf-hub caches downloads in the standard HF cache directory,
// so only the first run touches the network.
//
// Reference: hf-hub crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use crate::data::preprocessor::{decode_latin1, MetadataStripper};
use crate::domain::document::{default_label_names, Corpus, Document};
use crate::domain::traits::CorpusSource;

/// Hub dataset repo holding the metadata-stripped corpus
pub const DEFAULT_DATASET_REPO: &str = "SetFit/20_newsgroups";

/// Files merged into the full corpus, in order
const HUB_FILES: [&str; 2] = ["train.jsonl", "test.jsonl"];

// ─── Hub source ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct HubRow {
    text:  String,
    label: usize,
    #[serde(default)]
    label_text: Option<String>,
}

pub struct HubCorpusSource {
    repo_id: String,
}

impl HubCorpusSource {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self { repo_id: repo_id.into() }
    }
}

impl CorpusSource for HubCorpusSource {
    fn load(&self) -> Result<Corpus> {
        let api  = Api::new().context("Cannot initialise the Hugging Face Hub client")?;
        let repo = api.repo(Repo::new(self.repo_id.clone(), RepoType::Dataset));

        let mut corpus = Corpus::new(Vec::new(), default_label_names());

        for file in HUB_FILES {
            tracing::info!("Fetching '{}' from dataset '{}'", file, self.repo_id);
            let path = repo.get(file).with_context(|| {
                format!("Cannot download '{file}' from dataset '{}'", self.repo_id)
            })?;
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Cannot read '{}'", path.display()))?;
            merge_jsonl(&mut corpus, &contents, file)?;
        }

        tracing::info!("Loaded {} documents from the hub", corpus.len());
        Ok(corpus)
    }
}

/// Parse JSON-lines rows into `corpus`, extending the class-name
/// table with any `label_text` the rows carry.
fn merge_jsonl(corpus: &mut Corpus, contents: &str, origin: &str) -> Result<()> {
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: HubRow = serde_json::from_str(line)
            .with_context(|| format!("{origin}:{}: malformed row", line_no + 1))?;

        if row.label >= corpus.label_names.len() {
            let start = corpus.label_names.len();
            corpus
                .label_names
                .extend((start..=row.label).map(|l| format!("class_{l}")));
        }
        if let Some(name) = row.label_text.filter(|n| !n.is_empty()) {
            corpus.label_names[row.label] = name;
        }

        corpus.documents.push(Document::new(
            format!("{origin}:{}", line_no + 1),
            row.text,
            row.label,
        ));
    }
    Ok(())
}

// ─── Local raw-archive source ─────────────────────────────────────────────────

pub struct NewsgroupsDirSource {
    root:     PathBuf,
    stripper: MetadataStripper,
}

impl NewsgroupsDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root:     root.into(),
            stripper: MetadataStripper::new(),
        }
    }
}

impl CorpusSource for NewsgroupsDirSource {
    fn load(&self) -> Result<Corpus> {
        if !self.root.is_dir() {
            bail!("Corpus directory '{}' does not exist", self.root.display());
        }

        let mut category_dirs = Vec::new();
        collect_category_dirs(&self.root, 2, &mut category_dirs)?;
        if category_dirs.is_empty() {
            bail!("No category directories found under '{}'", self.root.display());
        }

        let label_names: Vec<String> = category_dirs
            .iter()
            .map(|(name, _)| name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut documents = Vec::new();
        for (name, dir) in &category_dirs {
            let label = label_names
                .iter()
                .position(|n| n == name)
                .context("category vanished from the name table")?;

            for path in sorted_entries(dir)? {
                if !path.is_file() {
                    continue;
                }
                match fs::read(&path) {
                    Ok(bytes) => {
                        let text = self.stripper.strip(&decode_latin1(&bytes));
                        documents.push(Document::new(path.display().to_string(), text, label));
                    }
                    // Unreadable messages are skipped
                    Err(e) => tracing::warn!("Skipping '{}': {}", path.display(), e),
                }
            }
        }

        tracing::info!(
            "Loaded {} documents in {} categories from '{}'",
            documents.len(),
            label_names.len(),
            self.root.display()
        );
        Ok(Corpus::new(documents, label_names))
    }
}

/// Directory entries sorted by path so loading order is stable.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Find directories that directly contain message files.
fn collect_category_dirs(
    dir:   &Path,
    depth: usize,
    out:   &mut Vec<(String, PathBuf)>,
) -> Result<()> {
    for path in sorted_entries(dir)? {
        if !path.is_dir() {
            continue;
        }
        let holds_files = sorted_entries(&path)?.iter().any(|p| p.is_file());
        if holds_files {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();
            out.push((name, path));
        } else if depth > 0 {
            collect_category_dirs(&path, depth - 1, out)?;
        }
    }
    Ok(())
}
