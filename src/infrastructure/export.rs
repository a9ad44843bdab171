use std::path::Path;

use thiserror::Error;

use crate::domain::PaymentReceipt;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV export failed: {0}")]
    Io(#[from] std::io::Error),
}

pub struct CsvExporter;

impl CsvExporter {
    /// Writes the payment history with a header row and returns the path
    /// written to.
    pub fn export_payments(payments: &[PaymentReceipt], path: impl AsRef<Path>) -> Result<String, ExportError> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["Date", "Provider", "Customer code", "Card", "Amount"])?;
        for payment in payments {
            writer.write_record([
                payment.paid_at.format("%d.%m.%Y %H:%M").to_string(),
                payment.provider.name().to_string(),
                payment.customer_code.clone(),
                payment.card_id.clone(),
                format!("-{:.2}", payment.amount),
            ])?;
        }
        writer.flush()?;
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UtilityProvider;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[test]
    fn test_export_writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payments.csv");
        let payments = vec![PaymentReceipt {
            id: "r1".into(),
            provider: UtilityProvider::Azerishiq,
            customer_code: "1234567890".into(),
            card_id: "card-1".into(),
            amount: 42.5,
            paid_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        }];

        let written = CsvExporter::export_payments(&payments, &path).unwrap();
        assert_eq!(written, path.display().to_string());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Date,Provider,Customer code,Card,Amount");
        assert_eq!(lines[1], "01.03.2024 09:30,Azerishiq,1234567890,card-1,-42.50");
    }

    #[test]
    fn test_export_empty_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payments.csv");
        CsvExporter::export_payments(&[], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
