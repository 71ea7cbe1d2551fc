// UI and formatting module

pub mod formatters;
pub mod prompts;

// Re-export commonly used items for cleaner imports
pub use formatters::{
    fit_width, format_details, format_overview, format_row, format_series, format_size,
    format_status, table_header,
};
pub use prompts::{confirm, dimmed, success, warn};
