//! Terminal presentation of rankings and price history.

pub mod history;
pub mod table;

pub use history::render_history;
pub use table::{build_rows, humanize_age, render_table, FlipRow};
