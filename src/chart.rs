//! Time series, axis ranges and table export for the motion charts.

mod export;
mod range;
mod series;

pub use export::{
    Axis, ExportConfig, Table, TableRow, object_series_path, read_table, write_object_series,
    write_table,
};
pub use range::{ChartRange, RangeAggregator, SeriesVisibility, aggregate};
pub use series::{Sample, SeriesPair, TimeSeries};
