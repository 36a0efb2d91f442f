//! # Constants
//!
//! Fixed tables shared by the mapper, the task graph builder and the pipeline.

use crate::events::RunStage;

/// Column names preferred for list display, in rank order.
pub const DISPLAY_COLUMN_PRIORITY: [&str; 6] =
    ["name", "title", "description", "email", "status", "created_at"];

pub mod limits {
    /// Columns shown by a list view.
    pub const MAX_DISPLAY_COLUMNS: usize = 6;
    /// Display columns the list search box is bound to.
    pub const MAX_SEARCH_COLUMNS: usize = 3;
    /// Columns offered by the list filter panel.
    pub const MAX_FILTER_COLUMNS: usize = 4;
    /// Related-data sections appended to a detail view.
    pub const MAX_RELATED_SECTIONS: usize = 3;
    /// Numeric columns summed in the dashboard stats grid.
    pub const MAX_STAT_COLUMNS: usize = 3;
}

pub mod priorities {
    pub const LIST: i32 = 4;
    pub const DETAIL: i32 = 3;
    pub const FORM: i32 = 3;
    pub const DASHBOARD: i32 = 2;
    pub const DEFAULT: i32 = 1;
    pub const INTEGRATION: i32 = 1;
}

/// Task id of the single aggregate task.
pub const INTEGRATION_TASK_ID: &str = "integration_setup";

/// Progress percentage reported on entry to each stage.
pub fn stage_percent(stage: RunStage) -> u8 {
    match stage {
        RunStage::Parsing => 5,
        RunStage::Mapping => 15,
        RunStage::PromptCreation => 25,
        RunStage::SubagentCoordination => 35,
        RunStage::ResponseValidation => 85,
        RunStage::PrototypeCreation => 92,
        RunStage::Complete => 100,
        RunStage::Error => 0,
    }
}

/// Span of the progress bar owned by task execution.
pub const COORDINATION_PERCENT_SPAN: u8 = 50;
