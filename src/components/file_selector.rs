//! File selector with preview, used by Create's config-loading action and
//! Bulk's FileBrowser mode. Lists entries under a root directory, filtered
//! incrementally by query, with a text preview of the highlighted file.

use std::fs;
use std::path::{Path, PathBuf};

const PREVIEW_LINES: usize = 20;
const PREVIEW_BYTES_CAP: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct FileSelector {
    root: PathBuf,
    entries: Vec<PathBuf>,
    filtered: Vec<usize>,
    query: String,
    selected: usize,
    active: bool,
}

fn list_dir(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(read_dir) = fs::read_dir(root) else {
        return out;
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        if path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    out
}

impl FileSelector {
    pub fn new(root: PathBuf) -> Self {
        let entries = list_dir(&root);
        let filtered: Vec<usize> = (0..entries.len()).collect();
        Self {
            root,
            entries,
            filtered,
            query: String::new(),
            selected: 0,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
        self.entries = list_dir(&self.root);
        self.query.clear();
        self.recompute();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn set_query(&mut self, query: String) {
        self.query = query;
        self.recompute();
    }

    pub fn push_query_char(&mut self, ch: char) {
        self.query.push(ch);
        self.recompute();
    }

    pub fn pop_query_char(&mut self) {
        self.query.pop();
        self.recompute();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    fn recompute(&mut self) {
        let q = self.query.to_lowercase();
        self.filtered = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                q.is_empty()
                    || p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.to_lowercase().contains(&q))
                        .unwrap_or(false)
            })
            .map(|(idx, _)| idx)
            .collect();
        if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len().saturating_sub(1);
        }
    }

    pub fn move_down(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.filtered.len();
    }

    pub fn move_up(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        self.selected = if self.selected == 0 {
            self.filtered.len() - 1
        } else {
            self.selected - 1
        };
    }

    pub fn get_filtered_items(&self) -> Vec<&Path> {
        self.filtered.iter().map(|&i| self.entries[i].as_path()).collect()
    }

    pub fn get_selection(&self) -> Option<&Path> {
        self.filtered.get(self.selected).map(|&i| self.entries[i].as_path())
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// First `PREVIEW_LINES` lines of the selected file, capped at
    /// `PREVIEW_BYTES_CAP` bytes so a huge binary-ish file can't stall the
    /// render loop.
    pub fn preview(&self) -> Option<String> {
        let path = self.get_selection()?;
        let bytes = fs::read(path).ok()?;
        let cropped = &bytes[..bytes.len().min(PREVIEW_BYTES_CAP)];
        let text = String::from_utf8_lossy(cropped);
        Some(text.lines().take(PREVIEW_LINES).collect::<Vec<_>>().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_and_filters_files() {
        let dir = std::env::temp_dir().join(format!("repobird-fsel-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("run-a.json"), "{\"prompt\":\"a\"}").unwrap();
        fs::write(dir.join("run-b.yaml"), "prompt: b\n").unwrap();

        let mut sel = FileSelector::new(dir.clone());
        assert_eq!(sel.get_filtered_items().len(), 2);
        sel.set_query("a".to_string());
        assert_eq!(sel.get_filtered_items().len(), 1);
        assert!(sel.get_selection().unwrap().to_string_lossy().ends_with("run-a.json"));
        assert!(sel.preview().unwrap().contains("prompt"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn query_builds_incrementally() {
        let dir = std::env::temp_dir().join(format!("repobird-fsel-inc-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bulk-batch.json"), "{}").unwrap();
        fs::write(dir.join("other.json"), "{}").unwrap();

        let mut sel = FileSelector::new(dir.clone());
        sel.push_query_char('b');
        sel.push_query_char('u');
        sel.push_query_char('l');
        assert_eq!(sel.query(), "bul");
        assert_eq!(sel.get_filtered_items().len(), 1);
        sel.pop_query_char();
        assert_eq!(sel.query(), "bu");

        let _ = fs::remove_dir_all(&dir);
    }
}
