//! Bond CSV loading.
//!
//! Expected header: `key,maturity,coupon,frequency,bid,ask[,weight]`.
//! `bid`/`ask` may be left empty for instruments without quotes; `coupon` is
//! a decimal annual rate and `maturity` is in years.

use fitter_models::FixedRateBond;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::{CliError, Result};

#[derive(Debug, Deserialize)]
struct BondRecord {
    key: String,
    maturity: f64,
    coupon: f64,
    frequency: u32,
    bid: Option<f64>,
    ask: Option<f64>,
    #[serde(default)]
    weight: Option<f64>,
}

impl BondRecord {
    fn into_bond(self) -> Result<FixedRateBond> {
        let mut bond = FixedRateBond::new(self.key, self.maturity, self.coupon, self.frequency)?;
        if let Some(weight) = self.weight {
            bond = bond.with_weight(weight);
            bond.validate()?;
        }
        if let Some(bid) = self.bid {
            bond.set_bid(bid);
        }
        if let Some(ask) = self.ask {
            bond.set_ask(ask);
        }
        Ok(bond)
    }
}

/// Read bonds from a CSV file.
pub fn load_bonds(path: &Path) -> Result<Vec<FixedRateBond>> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    read_bonds(std::fs::File::open(path)?)
}

/// Read bonds from any CSV source.
pub fn read_bonds<R: Read>(source: R) -> Result<Vec<FixedRateBond>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);

    let mut bonds = Vec::new();
    for record in reader.deserialize::<BondRecord>() {
        bonds.push(record?.into_bond()?);
    }
    Ok(bonds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bonds() {
        let data = "\
key,maturity,coupon,frequency,bid,ask,weight
UST2Y,2.0,0.04,2,99.90,100.10,
UST5Y,5.0,0.035,2,,,2.0
ZERO1Y,1.0,0.0,0,97.0,97.2,
";
        let bonds = read_bonds(data.as_bytes()).unwrap();
        assert_eq!(bonds.len(), 3);

        assert_eq!(bonds[0].key(), "UST2Y");
        assert_eq!(bonds[0].bid(), Some(99.90));
        assert!(bonds[0].has_fittable_values());

        assert!(!bonds[1].has_fittable_values());
        assert_eq!(bonds[1].weight(), 2.0);

        assert_eq!(bonds[2].frequency(), 0);
    }

    #[test]
    fn test_read_bonds_without_weight_column() {
        let data = "key,maturity,coupon,frequency,bid,ask\nA,1.0,0.02,1,99.0,99.5\n";
        let bonds = read_bonds(data.as_bytes()).unwrap();
        assert_eq!(bonds[0].weight(), 1.0);
    }

    #[test]
    fn test_invalid_bond_is_rejected() {
        let data = "key,maturity,coupon,frequency,bid,ask\nBAD,-1.0,0.02,2,99.0,99.5\n";
        assert!(matches!(read_bonds(data.as_bytes()), Err(CliError::Model(_))));
    }

    #[test]
    fn test_malformed_number_is_csv_error() {
        let data = "key,maturity,coupon,frequency,bid,ask\nA,soon,0.02,2,99.0,99.5\n";
        assert!(matches!(read_bonds(data.as_bytes()), Err(CliError::Csv(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_bonds(Path::new("/nonexistent/bonds.csv")).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }
}
