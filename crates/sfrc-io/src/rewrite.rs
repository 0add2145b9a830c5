//! Streaming line rewriter driven by ordered edit rules.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{IoError, Result};

/// Replacement produced by a rule for one keyword line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edit {
    /// Lines to write instead of the matched one, without line endings.
    pub lines: Vec<String>,
    /// Source lines to drop after the matched one.
    pub skip: usize,
}

/// A rule consulted on every line that contains `*`.
///
/// Rules may keep state across lines, so both hooks take `&mut self`.
pub trait EditRule {
    fn name(&self) -> &str;

    fn applies(&mut self, line: &str) -> bool;

    fn transform(&mut self, line: &str) -> Result<Edit>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub lines_read: usize,
    pub lines_written: usize,
    pub edits: usize,
    pub lines_skipped: usize,
    /// Matched lines per rule name.
    pub rule_hits: BTreeMap<String, usize>,
    /// Line that matched the break point, if copying stopped early.
    pub stopped_at: Option<usize>,
}

#[derive(Default)]
pub struct RewritePipeline {
    rules: Vec<Box<dyn EditRule>>,
    break_point: Option<String>,
}

impl RewritePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: impl EditRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn push_rule(&mut self, rule: Box<dyn EditRule>) {
        self.rules.push(rule);
    }

    /// Stop copying at the first line containing `marker`.
    pub fn break_at(mut self, marker: Option<String>) -> Self {
        self.break_point = marker.filter(|m| !m.is_empty());
        self
    }

    pub fn hits(stats: &RewriteStats, rule: &str) -> usize {
        stats.rule_hits.get(rule).copied().unwrap_or_default()
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<RewriteStats> {
        let mut stats = RewriteStats::default();
        let mut line = String::new();

        loop {
            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            stats.lines_read += 1;

            if let Some(marker) = &self.break_point
                && line.contains(marker.as_str())
            {
                log::debug!("break point '{marker}' reached at line {}", stats.lines_read);
                stats.stopped_at = Some(stats.lines_read);
                break;
            }

            if !line.contains('*') {
                output.write_all(line.as_bytes())?;
                stats.lines_written += 1;
                continue;
            }

            let mut replacement: Option<Vec<String>> = None;
            let mut skip = 0;
            for rule in &mut self.rules {
                if !rule.applies(&line) {
                    continue;
                }
                let edit = rule.transform(&line)?;
                *stats.rule_hits.entry(rule.name().to_string()).or_default() += 1;
                log::debug!(
                    "rule '{}' rewrote line {} into {} lines",
                    rule.name(),
                    stats.lines_read,
                    edit.lines.len()
                );
                replacement.get_or_insert_with(Vec::new).extend(edit.lines);
                skip = skip.max(edit.skip);
            }

            match replacement {
                Some(lines) => {
                    stats.edits += 1;
                    for new_line in &lines {
                        output.write_all(new_line.as_bytes())?;
                        output.write_all(b"\n")?;
                    }
                    stats.lines_written += lines.len();
                }
                None => {
                    output.write_all(line.as_bytes())?;
                    stats.lines_written += 1;
                }
            }

            for _ in 0..skip {
                line.clear();
                if input.read_line(&mut line)? == 0 {
                    break;
                }
                stats.lines_read += 1;
                stats.lines_skipped += 1;
            }
        }

        output.flush()?;
        Ok(stats)
    }

    /// Rewrite `input` into `output`, creating the output directory if needed.
    pub fn rewrite_file(&mut self, input: &Path, output: &Path) -> Result<RewriteStats> {
        if fs::canonicalize(input).ok() == fs::canonicalize(output).ok() && output.exists() {
            return Err(IoError::Config(format!(
                "refusing to rewrite {} in place",
                input.display()
            )));
        }
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let reader = BufReader::new(File::open(input)?);
        let writer = BufWriter::new(File::create(output)?);
        let stats = self.run(reader, writer)?;
        log::info!(
            "wrote {} ({} edits, {} lines)",
            output.display(),
            stats.edits,
            stats.lines_written
        );
        Ok(stats)
    }
}
