// ============================================================
// Layer 6 — Discriminator Score Log
// ============================================================
// Records the discriminator's mean sigmoid output on real pairs
// (dPos) and on generated pairs (dNeg) for every iteration.
//
// After each epoch the rows are appended to a flat text file,
// one iteration per line, two space-separated columns written
// like numpy's savetxt default ("%.18e"):
//
//   8.998231887817382812e-01 1.012345671653747559e-01
//   8.871134519577026367e-01 1.187001615762710571e-01
//   ...
//
// A healthy run keeps dPos above dNeg without either saturating
// at 0 or 1.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Per-iteration scores collected during one epoch
#[derive(Debug, Clone, Default)]
pub struct EpochScores {
    /// The epoch these scores belong to (starts at 1)
    pub epoch: usize,
    d_pos: Vec<f64>,
    d_neg: Vec<f64>,
}

impl EpochScores {
    pub fn new(epoch: usize) -> Self {
        Self { epoch, ..Self::default() }
    }

    pub fn push(&mut self, d_pos: f64, d_neg: f64) {
        self.d_pos.push(d_pos);
        self.d_neg.push(d_neg);
    }

    pub fn len(&self) -> usize {
        self.d_pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.d_pos.is_empty()
    }

    /// Mean dPos over the epoch, NaN if nothing was recorded
    pub fn mean_pos(&self) -> f64 {
        mean(&self.d_pos)
    }

    /// Mean dNeg over the epoch, NaN if nothing was recorded
    pub fn mean_neg(&self) -> f64 {
        mean(&self.d_neg)
    }

    pub fn rows(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.d_pos.iter().copied().zip(self.d_neg.iter().copied())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Format like C's "%.18e": 18 fractional digits and a signed,
/// at-least-two-digit exponent (`9.0…e-01`).
pub fn format_savetxt(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let s = format!("{v:.18e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => s,
    }
}

/// Appends epoch scores to the flat log file.
pub struct ScoreLog {
    path: PathBuf,
}

impl ScoreLog {
    /// Create the parent directory if needed. An existing log is
    /// kept and appended to, so resumed runs extend the same file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create log directory '{}'", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn append(&self, scores: &EpochScores) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open score log '{}'", self.path.display()))?;
        let mut out = BufWriter::new(file);

        for (pos, neg) in scores.rows() {
            writeln!(out, "{} {}", format_savetxt(pos), format_savetxt(neg))?;
        }
        out.flush()?;

        tracing::debug!(
            "Logged {} iterations for epoch {} to '{}'",
            scores.len(),
            scores.epoch,
            self.path.display()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_matches_savetxt() {
        assert_eq!(format_savetxt(0.9), "9.000000000000000222e-01");
        assert_eq!(format_savetxt(1.0), "1.000000000000000000e+00");
        assert_eq!(format_savetxt(123.0), "1.230000000000000000e+02");
        assert_eq!(format_savetxt(0.0), "0.000000000000000000e+00");
        assert_eq!(format_savetxt(-0.25), "-2.500000000000000000e-01");
        // not exact in binary; digits as printed by C's printf
        assert_eq!(format_savetxt(-2.5e-120), "-2.500000000000000033e-120");
        assert_eq!(format_savetxt(2.0f64.powi(-400)), "3.872591914849318273e-121");
        assert_eq!(format_savetxt(f64::NAN), "nan");
    }

    #[test]
    fn test_epoch_means() {
        let mut s = EpochScores::new(1);
        assert!(s.mean_pos().is_nan());
        s.push(0.8, 0.2);
        s.push(0.6, 0.4);
        assert_eq!(s.len(), 2);
        assert!((s.mean_pos() - 0.7).abs() < 1e-12);
        assert!((s.mean_neg() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_append_accumulates_rows() {
        let dir = tempfile::tempdir().unwrap();
        let log = ScoreLog::new(dir.path().join("runs").join("logs.dat")).unwrap();

        let mut first = EpochScores::new(1);
        first.push(1.0, 0.0);
        log.append(&first).unwrap();

        let mut second = EpochScores::new(2);
        second.push(0.5, 0.25);
        second.push(0.75, 0.125);
        log.append(&second).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "1.000000000000000000e+00 0.000000000000000000e+00");
        assert_eq!(lines[2], "7.500000000000000000e-01 1.250000000000000000e-01");
    }
}
