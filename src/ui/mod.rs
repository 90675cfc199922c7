pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    dim, drift, error, header, muted, section, status, success, summary_row, timing, warn,
};
pub use table::{counts_table, rows_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
