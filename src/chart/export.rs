//! Delimited text tables of tracked motion.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chart::series::SeriesPair;
use crate::error::{ConfigError, ExportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Significant digits written per number (1..=17)
    pub precision: usize,
    pub delimiter: char,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            precision: 6,
            delimiter: '\t',
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=17).contains(&self.precision) {
            return Err(ConfigError::Invalid {
                field: "export.precision",
                reason: format!("{} is outside 1..=17", self.precision),
            });
        }
        if self.delimiter.is_ascii_digit() || matches!(self.delimiter, '.' | '-' | '+' | 'e' | '\n' | '\r') {
            return Err(ConfigError::Invalid {
                field: "export.delimiter",
                reason: format!("{:?} can appear inside a number", self.delimiter),
            });
        }
        Ok(())
    }

    fn number(&self, v: f64) -> String {
        format!("{:.*e}", self.precision.saturating_sub(1), v)
    }
}

/// Which coordinate of an object to write with [`write_object_series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// Write the combined table `time, x_0, y_0, x_1, y_1, ...`.
///
/// Row `i` holds sample `i` of every object, with the time taken from the
/// first object; the table stops at the shortest series. Nothing is written
/// for an empty object list. Returns the number of data rows.
pub fn write_table<'a, W: Write>(
    objects: impl IntoIterator<Item = &'a SeriesPair>,
    config: &ExportConfig,
    mut writer: W,
) -> Result<usize, ExportError> {
    let objects: Vec<&SeriesPair> = objects.into_iter().collect();
    if objects.is_empty() {
        return Ok(0);
    }

    let d = config.delimiter;
    let mut header = String::from("time");
    for n in 0..objects.len() {
        header.push_str(&format!("{d}x_{n}{d}y_{n}"));
    }
    writeln!(writer, "{header}")?;

    let rows = objects.iter().map(|o| o.len()).min().unwrap_or(0);
    for i in 0..rows {
        let mut line = String::new();
        for (n, object) in objects.iter().enumerate() {
            let (Some(sx), Some(sy)) = (object.x().get(i), object.y().get(i)) else {
                continue;
            };
            if n == 0 {
                line.push_str(&config.number(sx.time));
            }
            line.push(d);
            line.push_str(&config.number(sx.value));
            line.push(d);
            line.push_str(&config.number(sy.value));
        }
        writeln!(writer, "{line}")?;
    }

    writer.flush()?;
    Ok(rows)
}

/// One parsed row of a combined table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub time: f64,
    /// `(x, y)` per object, in column order
    pub points: Vec<(f64, f64)>,
}

/// A combined table read back with [`read_table`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub objects: usize,
    pub rows: Vec<TableRow>,
}

impl Table {
    /// `(time, x, y)` triples of one object.
    pub fn object(&self, index: usize) -> Vec<(f64, f64, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.points.get(index).map(|&(x, y)| (r.time, x, y)))
            .collect()
    }
}

/// Parse a table produced by [`write_table`] with the same delimiter.
pub fn read_table<R: BufRead>(reader: R, delimiter: char) -> Result<Table, ExportError> {
    let mut lines = reader.lines().enumerate();

    let Some((_, header)) = lines.next() else {
        return Ok(Table::default());
    };
    let header = header?;
    let columns: Vec<&str> = header.trim_end().split(delimiter).collect();
    if columns.first() != Some(&"time") || columns.len() % 2 == 0 {
        return Err(ExportError::Parse {
            line: 1,
            reason: format!("unexpected header {header:?}"),
        });
    }
    let objects = (columns.len() - 1) / 2;

    let mut rows = Vec::new();
    for (i, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let values = line
            .trim_end()
            .split(delimiter)
            .map(|field| {
                field.trim().parse::<f64>().map_err(|e| ExportError::Parse {
                    line: i + 1,
                    reason: format!("{field:?}: {e}"),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if values.len() != columns.len() {
            return Err(ExportError::Parse {
                line: i + 1,
                reason: format!("expected {} fields, found {}", columns.len(), values.len()),
            });
        }

        rows.push(TableRow {
            time: values[0],
            points: values[1..].chunks_exact(2).map(|c| (c[0], c[1])).collect(),
        });
    }

    Ok(Table { objects, rows })
}

/// Write the two-column `time, value` series of one object's coordinate.
pub fn write_object_series<W: Write>(
    pair: &SeriesPair,
    axis: Axis,
    config: &ExportConfig,
    mut writer: W,
) -> Result<usize, ExportError> {
    let series = match axis {
        Axis::X => pair.x(),
        Axis::Y => pair.y(),
    };

    for s in series.iter() {
        writeln!(
            writer,
            "{}{}{}",
            config.number(s.time),
            config.delimiter,
            config.number(s.value)
        )?;
    }

    writer.flush()?;
    Ok(series.len())
}

/// `dir/stem_<index>.tsv` for the per-object file of `base`.
pub fn object_series_path(base: &Path, index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "series".to_string());
    base.with_file_name(format!("{stem}_{index}.tsv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_stop_at_shortest_series() {
        let mut a = SeriesPair::new();
        let mut b = SeriesPair::new();
        for i in 0..4 {
            a.push(i as f64, 1.0, 2.0, 10);
        }
        for i in 0..2 {
            b.push(i as f64, 3.0, 4.0, 10);
        }

        let mut out = Vec::new();
        let rows = write_table([&a, &b], &ExportConfig::default(), &mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time\tx_0\ty_0\tx_1\ty_1");
        assert_eq!(lines[1], "0.00000e0\t1.00000e0\t2.00000e0\t3.00000e0\t4.00000e0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_registry_writes_nothing() {
        let mut out = Vec::new();
        let rows = write_table(std::iter::empty(), &ExportConfig::default(), &mut out).unwrap();
        assert_eq!(rows, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_read_rejects_bad_header_and_fields() {
        let bad_header = read_table("t\tx_0\ty_0\n".as_bytes(), '\t');
        assert!(matches!(bad_header, Err(ExportError::Parse { line: 1, .. })));

        let bad_field = read_table("time\tx_0\ty_0\n1\tfoo\t2\n".as_bytes(), '\t');
        assert!(matches!(bad_field, Err(ExportError::Parse { line: 2, .. })));

        let short_row = read_table("time\tx_0\ty_0\n1\t2\n".as_bytes(), '\t');
        assert!(matches!(short_row, Err(ExportError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_object_series_file() {
        let mut pair = SeriesPair::new();
        pair.push(0.5, 10.0, 20.0, 10);

        let config = ExportConfig {
            precision: 3,
            delimiter: ',',
        };
        let mut out = Vec::new();
        write_object_series(&pair, Axis::Y, &config, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "5.00e-1,2.00e1\n");

        assert_eq!(
            object_series_path(Path::new("/tmp/run.tsv"), 2),
            PathBuf::from("/tmp/run_2.tsv")
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(ExportConfig::default().validate().is_ok());
        assert!(ExportConfig { precision: 0, ..Default::default() }.validate().is_err());
        assert!(ExportConfig { delimiter: '.', ..Default::default() }.validate().is_err());
    }
}
