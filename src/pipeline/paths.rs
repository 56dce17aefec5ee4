use std::path::{Path, PathBuf};

use crate::app_config::OutputFormat;
use crate::file_utils::{FileManager, FileType};

/// Suffix appended to the text file stem for the bilingual document
pub const BILINGUAL_SUFFIX: &str = "_bilingual";

/// Conventional locations derived from one input document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    pub input_file: PathBuf,
    // @field: Input file name without extension
    pub stem: String,
    // @field: `<output_root>/<stem>`
    pub work_dir: PathBuf,
}

impl DocumentPaths {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input_file: P, output_root: Q) -> Self {
        let input_file = input_file.as_ref().to_path_buf();
        let stem = FileManager::file_stem(&input_file);
        let work_dir = output_root.as_ref().join(&stem);
        Self { input_file, stem, work_dir }
    }

    /// Whether the input is already structured text
    pub fn input_is_text(&self) -> bool {
        FileManager::detect_file_type(&self.input_file) == FileType::Text
    }

    pub fn state_file(&self, file_name: &str) -> PathBuf {
        self.work_dir.join(file_name)
    }

    pub fn log_file(&self) -> PathBuf {
        self.work_dir.join(format!("{}.log", self.stem))
    }

    /// Places a converted text file may live, in probe order
    pub fn text_candidates(&self) -> Vec<PathBuf> {
        if self.input_is_text() {
            return vec![self.input_file.clone()];
        }
        let file_name = format!("{}.md", self.stem);
        vec![
            self.work_dir.join(&file_name),
            self.work_dir.join("auto").join(&file_name),
        ]
    }

    /// First existing text candidate
    pub fn find_text_file(&self) -> Option<PathBuf> {
        self.text_candidates().into_iter().find(|path| FileManager::file_exists(path))
    }
}

// @returns: `<text_dir>/<text_stem>_bilingual.md`
pub fn bilingual_path(text_file: &Path) -> PathBuf {
    FileManager::sibling_path(text_file, BILINGUAL_SUFFIX, "md")
}

// @returns: `<text_dir>/<text_stem>_bilingual.<epub|pdf>`
pub fn output_path(text_file: &Path, format: OutputFormat) -> PathBuf {
    FileManager::sibling_path(text_file, BILINGUAL_SUFFIX, format.extension())
}

/// Cover image locations for a text or bilingual file, in probe order
pub fn cover_candidates(text_file: &Path) -> Vec<PathBuf> {
    let dir = text_file.parent().unwrap_or_else(|| Path::new(""));
    let stem = FileManager::file_stem(text_file);

    let mut candidates = vec![dir.join(format!("{}_cover.png", stem))];
    if let Some(base) = stem.strip_suffix(BILINGUAL_SUFFIX) {
        candidates.push(dir.join(format!("{}_cover.png", base)));
    }
    candidates.push(dir.join("cover.png"));
    candidates
}

pub fn find_cover(text_file: &Path) -> Option<PathBuf> {
    cover_candidates(text_file).into_iter().find(|path| FileManager::file_exists(path))
}
