// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean (MSE + weighted L2 penalty) over training batches
//   - test_loss:  mean reconstruction MSE on the held-out split
//   - test_psnr:  peak signal-to-noise ratio of that MSE, in dB
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,test_loss,test_psnr
//   1,0.041250,0.038120,14.188700
//   2,0.029870,0.027310,15.636200
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,train_loss,test_loss,test_psnr";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean training loss, regularisation included
    pub train_loss: f64,

    /// Mean MSE on the test split (NaN when the split is empty)
    pub test_loss: f64,

    /// PSNR in dB derived from test_loss
    pub test_psnr: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, test_loss: f64) -> Self {
        Self { epoch, train_loss, test_loss, test_psnr: psnr(test_loss) }
    }

    /// Returns true if this epoch improved over the previous best test_loss
    pub fn is_improvement(&self, best_test_loss: f64) -> bool {
        self.test_loss < best_test_loss
    }
}

/// PSNR for signals in [0, 1]: 10 · log10(1 / mse).
pub fn psnr(mse: f64) -> f64 {
    if mse.is_nan() {
        return f64::NAN;
    }
    if mse <= 0.0 {
        return f64::INFINITY;
    }
    10.0 * (1.0 / mse).log10()
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.test_loss,
            m.test_psnr,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, test_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.test_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 0.05, 0.03);
        assert!(m.is_improvement(0.04));
        assert!(!m.is_improvement(0.02));
    }

    #[test]
    fn test_psnr() {
        assert!((psnr(0.01) - 20.0).abs() < 1e-9);
        assert!((psnr(1.0)).abs() < 1e-9);
        assert!(psnr(0.0).is_infinite());
        assert!(psnr(f64::NAN).is_nan());
    }

    #[test]
    fn test_rows_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.25)).unwrap();
        logger.log(&EpochMetrics::new(2, 0.4, 0.2)).unwrap();

        // Reopening keeps the existing rows
        let logger = MetricsLogger::new(dir.path()).unwrap();
        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("1,0.500000,0.250000,"));
    }
}
