//! A scrollable list filtered by an incremental fuzzy query, used by the
//! Create view's repository field and any other free-text-into-a-known-set
//! input.

#[derive(Debug, Clone)]
pub struct FuzzyDropdown {
    items: Vec<String>,
    query: String,
    filtered: Vec<usize>,
    selected: usize,
    active: bool,
}

/// Cheap subsequence match: every character of `query` must appear in
/// `item` in order, case-insensitively. Good enough for a repository
/// picker with a few hundred entries; not a scored fuzzy ranker.
fn subsequence_matches(item: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let item_lower = item.to_lowercase();
    let mut chars = item_lower.chars();
    'outer: for q in query.to_lowercase().chars() {
        for c in chars.by_ref() {
            if c == q {
                continue 'outer;
            }
        }
        return false;
    }
    true
}

impl FuzzyDropdown {
    pub fn new(items: Vec<String>) -> Self {
        let filtered: Vec<usize> = (0..items.len()).collect();
        Self {
            items,
            query: String::new(),
            filtered,
            selected: 0,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
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

    pub fn query(&self) -> &str {
        &self.query
    }

    fn recompute(&mut self) {
        self.filtered = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| subsequence_matches(item, &self.query))
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

    pub fn get_filtered_items(&self) -> Vec<&str> {
        self.filtered.iter().map(|&i| self.items[i].as_str()).collect()
    }

    pub fn get_selection(&self) -> Option<&str> {
        self.filtered
            .get(self.selected)
            .map(|&i| self.items[i].as_str())
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_subsequence() {
        let mut fzf = FuzzyDropdown::new(vec![
            "acme/backend".to_string(),
            "acme/frontend".to_string(),
            "other/widgets".to_string(),
        ]);
        fzf.set_query("acbk".to_string());
        assert_eq!(fzf.get_filtered_items(), vec!["acme/backend"]);
    }

    #[test]
    fn selection_clamps_when_filter_shrinks() {
        let mut fzf = FuzzyDropdown::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        fzf.move_down();
        fzf.move_down();
        assert_eq!(fzf.selected_index(), 2);
        fzf.set_query("a".to_string());
        assert_eq!(fzf.selected_index(), 0);
        assert_eq!(fzf.get_selection(), Some("a"));
    }
}
