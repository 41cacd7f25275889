//! C6: the navigation router. Views never address each other directly —
//! they emit one of these messages and the top-level loop (`app.rs`)
//! performs the actual view swap, restoring Dashboard's column/selection
//! state from the cache's one-shot `NavigationContext` when coming back.

use crate::model::{NavigationContext, RunId};

#[derive(Debug, Clone)]
pub enum NavMsg {
    /// Pop the current view and return to whatever was open before it.
    Back,
    /// Drop straight to the Dashboard, discarding any intermediate views.
    ToDashboard,
    /// Open Details for `run_id`, stashing `parent_state` so `Back` can
    /// restore the exact Dashboard selection the user came from.
    ToDetails {
        run_id: RunId,
        parent_state: NavigationContext,
    },
}

pub const KEY_SELECTED_REPO_IDX: &str = "selectedRepoIdx";
pub const KEY_SELECTED_RUN_IDX: &str = "selectedRunIdx";
pub const KEY_SELECTED_DETAIL_LINE: &str = "selectedDetailLine";
pub const KEY_FOCUSED_COLUMN: &str = "focusedColumn";

/// Snapshot of the Dashboard's column/selection state, the only state that
/// survives a round trip through Details and back.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardRestore {
    pub selected_repo_idx: usize,
    pub selected_run_idx: usize,
    pub selected_detail_line: usize,
    pub focused_column: usize,
}

impl DashboardRestore {
    pub fn to_context(self) -> NavigationContext {
        let mut ctx = NavigationContext::new();
        ctx.insert(KEY_SELECTED_REPO_IDX.to_string(), self.selected_repo_idx.into());
        ctx.insert(KEY_SELECTED_RUN_IDX.to_string(), self.selected_run_idx.into());
        ctx.insert(KEY_SELECTED_DETAIL_LINE.to_string(), self.selected_detail_line.into());
        ctx.insert(KEY_FOCUSED_COLUMN.to_string(), self.focused_column.into());
        ctx
    }

    pub fn from_context(ctx: &NavigationContext) -> Self {
        let get = |key: &str| ctx.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        Self {
            selected_repo_idx: get(KEY_SELECTED_REPO_IDX),
            selected_run_idx: get(KEY_SELECTED_RUN_IDX),
            selected_detail_line: get(KEY_SELECTED_DETAIL_LINE),
            focused_column: get(KEY_FOCUSED_COLUMN),
        }
    }

    /// Clamps each index so a restore after the underlying data shrank (a
    /// repository lost runs while Details was open, say) can't land on an
    /// out-of-bounds row.
    pub fn clamp(mut self, repo_count: usize, run_count: usize, detail_line_count: usize) -> Self {
        self.selected_repo_idx = clamp_index(self.selected_repo_idx, repo_count);
        self.selected_run_idx = clamp_index(self.selected_run_idx, run_count);
        self.selected_detail_line = clamp_index(self.selected_detail_line, detail_line_count);
        if self.focused_column > 2 {
            self.focused_column = 2;
        }
        self
    }
}

fn clamp_index(idx: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        idx.min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_context() {
        let restore = DashboardRestore {
            selected_repo_idx: 2,
            selected_run_idx: 5,
            selected_detail_line: 1,
            focused_column: 1,
        };
        let ctx = restore.to_context();
        let back = DashboardRestore::from_context(&ctx);
        assert_eq!(back.selected_repo_idx, 2);
        assert_eq!(back.selected_run_idx, 5);
        assert_eq!(back.selected_detail_line, 1);
        assert_eq!(back.focused_column, 1);
    }

    #[test]
    fn clamps_when_data_shrank() {
        let restore = DashboardRestore {
            selected_repo_idx: 9,
            selected_run_idx: 9,
            selected_detail_line: 9,
            focused_column: 5,
        };
        let clamped = restore.clamp(3, 0, 2);
        assert_eq!(clamped.selected_repo_idx, 2);
        assert_eq!(clamped.selected_run_idx, 0);
        assert_eq!(clamped.selected_detail_line, 1);
        assert_eq!(clamped.focused_column, 2);
    }
}
