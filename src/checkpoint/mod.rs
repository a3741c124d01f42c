//! Human-readable checkpoint records.
//!
//! Every artifact shares one layout: an asterisk banner around a title line,
//! a block of `Name = value` parameters and an optional `=====`-delimited
//! table. Each artifact kind declares the exact parameter names it accepts;
//! a wrong title or an unknown parameter fails the whole load.

pub mod configurations;
pub mod pmf;
pub mod rate;
pub mod recrossing;
pub mod sampling;

use crate::error::{Result, RpmdError};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

const NAME_WIDTH: usize = 40;

/// Builds the text of a checkpoint record.
pub struct RecordWriter {
    text: String,
}

impl RecordWriter {
    pub fn new(title: &str) -> Self {
        let stars = "*".repeat(title.len());
        Self {
            text: format!("{stars}\n{title}\n{stars}\n\n"),
        }
    }

    pub fn param(&mut self, name: &str, value: impl Display) -> &mut Self {
        self.text
            .push_str(&format!("{name:<width$}= {value}\n", width = NAME_WIDTH));
        self
    }

    /// Second value line for the preceding parameter (e.g. another unit).
    pub fn continuation(&mut self, value: impl Display) -> &mut Self {
        self.text
            .push_str(&format!("{:<width$}= {value}\n", "", width = NAME_WIDTH));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.text.push('\n');
        self
    }

    pub fn rule(&mut self, widths: &[usize]) -> &mut Self {
        let line = widths
            .iter()
            .map(|&w| "=".repeat(w))
            .collect::<Vec<_>>()
            .join(" ");
        self.text.push_str(&line);
        self.text.push('\n');
        self
    }

    pub fn table_header(&mut self, widths: &[usize], titles: &[&str]) -> &mut Self {
        self.rule(widths);
        let line = widths
            .iter()
            .zip(titles)
            .map(|(&w, t)| format!("{t:<w$}"))
            .collect::<Vec<_>>()
            .join(" ");
        self.text.push_str(line.trim_end());
        self.text.push('\n');
        self.rule(widths)
    }

    pub fn line(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
        self
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Replace `path` with the record. The text goes to a sibling file
    /// first, so an interrupted write never leaves a truncated record.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, &self.text).map_err(|e| RpmdError::io(&staging, e))?;
        fs::rename(&staging, path).map_err(|e| RpmdError::io(path, e))
    }
}

/// How the parameter section of a record ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLayout {
    /// A single block terminated by the first blank line.
    Block,
    /// Parameters continue to the end of the file; blank lines separate
    /// groups and `= value` continuation lines are skipped.
    ToEnd,
}

/// Declared shape of one artifact kind.
pub struct Schema {
    pub title: &'static str,
    pub fields: &'static [&'static str],
    pub layout: ParamLayout,
}

/// Parsed checkpoint: validated parameters plus every line after them.
#[derive(Debug)]
pub struct Record<'a> {
    path: &'a Path,
    params: Vec<(String, Vec<String>)>,
    body: Vec<String>,
}

impl<'a> Record<'a> {
    pub fn read(path: &'a Path, schema: &Schema) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| RpmdError::io(path, e))?;
        Self::parse(path, &text, schema)
    }

    pub fn parse(path: &'a Path, text: &str, schema: &Schema) -> Result<Self> {
        let mut lines = text.lines();
        let _ = lines.next();
        let title = lines.next().unwrap_or("").trim();
        if title != schema.title {
            return Err(RpmdError::format(
                path,
                format!("{title:?} is not a valid {} file", schema.title),
            ));
        }
        let _ = lines.next();
        let _ = lines.next();

        let mut params = Vec::new();
        let mut body = Vec::new();
        let mut in_params = true;
        for line in lines {
            if !in_params {
                body.push(line.to_string());
                continue;
            }
            if line.trim().is_empty() {
                if schema.layout == ParamLayout::Block {
                    in_params = false;
                }
                continue;
            }
            let (name, value) = line.split_once('=').ok_or_else(|| {
                RpmdError::format(path, format!("malformed parameter line {line:?}"))
            })?;
            let name = name.trim();
            if name.is_empty() && schema.layout == ParamLayout::ToEnd {
                continue;
            }
            if !schema.fields.contains(&name) {
                return Err(RpmdError::format(
                    path,
                    format!("invalid {} parameter {name:?}", schema.title),
                ));
            }
            params.push((
                name.to_string(),
                value.split_whitespace().map(str::to_string).collect(),
            ));
        }

        Ok(Self { path, params, body })
    }

    pub fn path(&self) -> &Path {
        self.path
    }

    fn tokens(&self, name: &str) -> Result<&[String]> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .ok_or_else(|| RpmdError::format(self.path, format!("missing parameter {name:?}")))
    }

    pub fn number(&self, name: &str) -> Result<f64> {
        let tokens = self.tokens(name)?;
        tokens
            .first()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| self.bad_value(name, tokens))
    }

    pub fn integer(&self, name: &str) -> Result<usize> {
        let tokens = self.tokens(name)?;
        tokens
            .first()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| self.bad_value(name, tokens))
    }

    /// Step count written as `... (<n> steps)`.
    pub fn steps(&self, name: &str) -> Result<usize> {
        let tokens = self.tokens(name)?;
        tokens
            .iter()
            .find_map(|t| t.strip_prefix('(').and_then(|n| n.parse().ok()))
            .ok_or_else(|| self.bad_value(name, tokens))
    }

    fn bad_value(&self, name: &str, tokens: &[String]) -> RpmdError {
        RpmdError::format(
            self.path,
            format!("unreadable value {:?} for parameter {name:?}", tokens.join(" ")),
        )
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }

    /// Data rows of the table that opens the body: everything after the
    /// rule/header/rule triple up to the closing rule or the end of file.
    pub fn table_rows(&self) -> Vec<&str> {
        self.body
            .iter()
            .skip_while(|l| l.trim().is_empty())
            .skip(3)
            .map(|l| l.trim())
            .take_while(|l| !l.is_empty() && !l.starts_with("===="))
            .collect()
    }

    pub fn format_error(&self, detail: impl Into<String>) -> RpmdError {
        RpmdError::format(self.path, detail)
    }
}

/// Parse whitespace-separated columns of a table row.
pub fn columns<const N: usize>(row: &str) -> Option<[&str; N]> {
    let mut cells = row.split_whitespace();
    let mut out = [""; N];
    for cell in out.iter_mut() {
        *cell = cells.next()?;
    }
    match cells.next() {
        Some(_) => None,
        None => Some(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: Schema = Schema {
        title: "RPMD test record",
        fields: &["Temperature", "Trajectory evolution time"],
        layout: ParamLayout::Block,
    };

    fn sample() -> String {
        let mut w = RecordWriter::new("RPMD test record");
        w.param("Temperature", "300 K")
            .param("Trajectory evolution time", "0.1 ps (4134 steps)")
            .blank()
            .table_header(&[5, 5], &["a", "b"])
            .line("1 2")
            .line("3 4")
            .rule(&[5, 5]);
        w.as_str().to_string()
    }

    #[test]
    fn writer_output_parses_back() {
        let text = sample();
        assert!(text.starts_with("****************\nRPMD test record\n"));
        let path = Path::new("test.dat");
        let record = Record::parse(path, &text, &SCHEMA).unwrap();
        assert_eq!(record.number("Temperature").unwrap(), 300.0);
        assert_eq!(record.steps("Trajectory evolution time").unwrap(), 4134);
        assert_eq!(record.table_rows(), vec!["1 2", "3 4"]);
    }

    #[test]
    fn wrong_title_is_rejected() {
        let text = sample().replace("RPMD test record", "Not An RPMD File");
        let err = Record::parse(Path::new("x.dat"), &text, &SCHEMA).unwrap_err();
        assert!(matches!(err, RpmdError::CheckpointFormat { .. }));
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let text = sample().replace("Temperature", "Pressure   ");
        let err = Record::parse(Path::new("x.dat"), &text, &SCHEMA).unwrap_err();
        assert!(err.to_string().contains("Pressure"));
    }

    #[test]
    fn columns_require_exact_count() {
        assert_eq!(columns::<2>("1.0  2"), Some(["1.0", "2"]));
        assert_eq!(columns::<3>("1.0 2"), None);
        assert_eq!(columns::<1>("1.0 2"), None);
    }
}
