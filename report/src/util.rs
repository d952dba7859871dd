//! Shared report formatting helpers

use colored::{ColoredString, Colorize};

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a millisecond value; zero renders as "n/a"
pub(crate) fn to_ms(value: f64) -> String {
    if value == 0.0 {
        "n/a".to_string()
    } else {
        format!("{} ms", round2(value))
    }
}

/// Format a raw mark value with its optional unit
pub(crate) fn to_unit(value: f64, unit: Option<&str>) -> String {
    match unit {
        Some(unit) => format!("{} {}", round2(value), unit),
        None => round2(value).to_string(),
    }
}

/// Optional per-cell accent applied after width padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Accent {
    None,
    Green,
    Yellow,
    Magenta,
}

impl Accent {
    fn paint(self, text: String) -> String {
        let painted: ColoredString = match self {
            Accent::None => return text,
            Accent::Green => text.green(),
            Accent::Yellow => text.yellow(),
            Accent::Magenta => text.magenta(),
        };
        painted.to_string()
    }
}

/// A width-aligned text table.
///
/// Column widths come from the raw cell text; accents are applied after
/// padding so colored cells keep the grid straight.
pub(crate) struct Table {
    columns: Vec<&'static str>,
    rows: Vec<Vec<(String, Accent)>>,
}

impl Table {
    pub(crate) fn new(columns: Vec<&'static str>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub(crate) fn push_row(&mut self, cells: Vec<(String, Accent)>) {
        debug_assert_eq!(cells.len(), self.columns.len());
        self.rows.push(cells);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn render(&self) -> String {
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                self.rows
                    .iter()
                    .map(|row| row[idx].0.len())
                    .max()
                    .unwrap_or(0)
                    .max(col.len())
            })
            .collect();

        let mut out = String::new();
        for (idx, col) in self.columns.iter().enumerate() {
            out.push_str(&format!("  {:<width$}", col, width = widths[idx]));
        }
        out.push('\n');
        for (idx, _) in self.columns.iter().enumerate() {
            out.push_str(&format!("  {}", "-".repeat(widths[idx])));
        }
        out.push('\n');

        for row in &self.rows {
            for (idx, (text, accent)) in row.iter().enumerate() {
                let padded = format!("{:<width$}", text, width = widths[idx]);
                out.push_str(&format!("  {}", accent.paint(padded)));
            }
            out.push('\n');
        }
        out
    }
}

/// Section header used by every report
pub(crate) fn section(title: &str) -> String {
    format!("\n{}\n", title.cyan().bold())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_ms() {
        assert_eq!(to_ms(0.0), "n/a");
        assert_eq!(to_ms(1.234), "1.23 ms");
        assert_eq!(to_ms(10.0), "10 ms");
    }

    #[test]
    fn test_to_unit() {
        assert_eq!(to_unit(42.5, Some("MB")), "42.5 MB");
        assert_eq!(to_unit(3.14159, None), "3.14");
    }

    #[test]
    fn test_table_alignment() {
        colored::control::set_override(false);
        let mut table = Table::new(vec!["name", "count"]);
        table.push_row(vec![
            ("a-very-long-name".to_string(), Accent::None),
            ("3".to_string(), Accent::Green),
        ]);

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[0].contains("name"));
        assert!(lines[1].starts_with("  ----"));
        assert!(lines[2].contains("a-very-long-name"));
    }
}
