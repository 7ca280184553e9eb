//! Directory browser that only offers PDF files.

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use ratatui::widgets::ListState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// What choosing the highlighted entry did
#[derive(Debug, PartialEq, Eq)]
pub enum Pick {
    Entered,
    File(PathBuf),
    Nothing,
}

pub struct FilePicker {
    pub dir: PathBuf,
    pub entries: Vec<Entry>,
    pub state: ListState,
    pub error: Option<String>,
}

impl FilePicker {
    pub fn new(dir: PathBuf) -> Self {
        let mut picker = Self {
            dir,
            entries: Vec::new(),
            state: ListState::default(),
            error: None,
        };
        picker.refresh();
        picker
    }

    /// Re-read the current directory. Errors are kept for display.
    pub fn refresh(&mut self) {
        match list_dir(&self.dir) {
            Ok(entries) => {
                self.entries = entries;
                self.error = None;
            }
            Err(err) => {
                tracing::warn!(dir = %self.dir.display(), error = %err, "cannot list directory");
                self.entries.clear();
                self.error = Some(err.to_string());
            }
        }
        if let Some(parent) = self.dir.parent() {
            self.entries.insert(
                0,
                Entry {
                    name: "..".to_string(),
                    path: parent.to_path_buf(),
                    is_dir: true,
                },
            );
        }
        self.state.select(if self.entries.is_empty() { None } else { Some(0) });
    }

    pub fn nav_down(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + 1) % self.entries.len());
        self.state.select(Some(i));
    }

    pub fn nav_up(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let len = self.entries.len();
        let i = self.state.selected().map_or(0, |i| (i + len - 1) % len);
        self.state.select(Some(i));
    }

    pub fn parent(&mut self) {
        if let Some(parent) = self.dir.parent() {
            self.dir = parent.to_path_buf();
            self.refresh();
        }
    }

    pub fn choose(&mut self) -> Pick {
        let Some(entry) = self.state.selected().and_then(|i| self.entries.get(i)).cloned() else {
            return Pick::Nothing;
        };
        if entry.is_dir {
            self.dir = entry.path;
            self.refresh();
            Pick::Entered
        } else {
            Pick::File(entry.path)
        }
    }
}

/// Visible subdirectories first, then `*.pdf` files, each sorted by name
fn list_dir(dir: &Path) -> Result<Vec<Entry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for item in fs::read_dir(dir)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = item.path();
        if path.is_dir() {
            dirs.push(Entry { name, path, is_dir: true });
        } else if is_pdf(&path) {
            files.push(Entry { name, path, is_dir: false });
        }
    }

    dirs.sort_by_key(|e| e.name.to_lowercase());
    files.sort_by_key(|e| e.name.to_lowercase());
    dirs.extend(files);
    Ok(dirs)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("q3")).unwrap();
        fs::create_dir(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join("annual.PDF"), b"%PDF").unwrap();
        fs::write(dir.path().join("budget.pdf"), b"%PDF").unwrap();
        fs::write(dir.path().join("notes.txt"), b"text").unwrap();
        fs::write(dir.path().join("q3").join("interim.pdf"), b"%PDF").unwrap();
        dir
    }

    fn names(picker: &FilePicker) -> Vec<&str> {
        picker.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn lists_directories_then_pdfs() {
        let dir = fixture();
        let picker = FilePicker::new(dir.path().to_path_buf());
        assert_eq!(names(&picker), vec!["..", "q3", "annual.PDF", "budget.pdf"]);
        assert_eq!(picker.state.selected(), Some(0));
    }

    #[test]
    fn choosing_a_directory_enters_it() {
        let dir = fixture();
        let mut picker = FilePicker::new(dir.path().to_path_buf());
        picker.nav_down();
        assert_eq!(picker.choose(), Pick::Entered);
        assert_eq!(picker.dir, dir.path().join("q3"));
        assert_eq!(names(&picker), vec!["..", "interim.pdf"]);

        picker.parent();
        assert_eq!(picker.dir, dir.path());
    }

    #[test]
    fn choosing_a_file_returns_its_path() {
        let dir = fixture();
        let mut picker = FilePicker::new(dir.path().to_path_buf());
        picker.nav_up();
        assert_eq!(picker.choose(), Pick::File(dir.path().join("budget.pdf")));
    }

    #[test]
    fn unreadable_directory_keeps_error() {
        let dir = tempfile::tempdir().unwrap();
        let picker = FilePicker::new(dir.path().join("missing"));
        assert!(picker.error.is_some());
        assert_eq!(names(&picker), vec![".."]);
    }
}
