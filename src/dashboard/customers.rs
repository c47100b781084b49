//! Customer overview, top customers and geographic spread

use polars::prelude::*;

use crate::data::columns::{AMOUNT, CUSTOMER_NAME, ORDER_ID, PROVINCE};
use crate::data::{aggregate_by, sort_descending, SalesFrame};

/// Customer-level headline metrics
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerOverview {
    pub unique_customers: usize,
    /// Mean total spend per customer
    pub average_customer_value: f64,
    /// Mean distinct orders per customer
    pub average_orders_per_customer: f64,
    /// Percentage of customers with more than one distinct order
    pub repeat_customer_rate: f64,
}

impl CustomerOverview {
    pub fn compute(frame: &SalesFrame) -> crate::Result<Self> {
        let df = frame.frame();
        let spend = aggregate_by(df, CUSTOMER_NAME, col(AMOUNT).sum())?;
        let orders = aggregate_by(df, CUSTOMER_NAME, col(ORDER_ID).drop_nulls().n_unique())?;

        let unique_customers = spend.len();
        if unique_customers == 0 {
            return Ok(Self {
                unique_customers: 0,
                average_customer_value: 0.0,
                average_orders_per_customer: 0.0,
                repeat_customer_rate: 0.0,
            });
        }

        let customers = unique_customers as f64;
        let repeat = orders.iter().filter(|(_, n)| *n > 1.0).count();
        Ok(Self {
            unique_customers,
            average_customer_value: spend.iter().map(|(_, v)| v).sum::<f64>() / customers,
            average_orders_per_customer: orders.iter().map(|(_, n)| n).sum::<f64>() / customers,
            repeat_customer_rate: repeat as f64 / customers * 100.0,
        })
    }
}

/// The `limit` customers with the highest total spend
pub fn top_customers(frame: &SalesFrame, limit: usize) -> crate::Result<Vec<(String, f64)>> {
    let mut spend = aggregate_by(frame.frame(), CUSTOMER_NAME, col(AMOUNT).sum())?;
    sort_descending(&mut spend);
    spend.truncate(limit);
    Ok(spend)
}

/// Distinct customers per province, most first
pub fn customers_by_province(frame: &SalesFrame) -> crate::Result<Vec<(String, f64)>> {
    let mut provinces = aggregate_by(frame.frame(), PROVINCE, col(CUSTOMER_NAME).drop_nulls().n_unique())?;
    sort_descending(&mut provinces);
    Ok(provinces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::sample_frame;
    use crate::data::SalesFilter;

    #[test]
    fn test_customer_overview() {
        let overview = CustomerOverview::compute(&sample_frame()).unwrap();
        assert_eq!(overview.unique_customers, 3);
        assert!((overview.average_customer_value - 1628.0).abs() < 1e-9);
        assert!((overview.average_orders_per_customer - 4.0 / 3.0).abs() < 1e-9);
        assert!((overview.repeat_customer_rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_customer_overview_of_empty_frame() {
        let nothing = SalesFilter {
            channel: Some("Distributor".to_string()),
            ..Default::default()
        };
        let frame = sample_frame().filter(&nothing).unwrap();
        let overview = CustomerOverview::compute(&frame).unwrap();
        assert_eq!(overview.unique_customers, 0);
        assert_eq!(overview.repeat_customer_rate, 0.0);
    }

    #[test]
    fn test_padded_names_count_as_one_customer() {
        use crate::data::load_sales;
        use crate::data::tests::HEADER;
        use crate::rfm::compute_rfm;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "1,DD1,Nattaya Jaidee ,Phuket,Shopee,01/05/2025,DD010,Chews,Treats,1,250,,0,250").unwrap();
        writeln!(file, "2,DD2,Nattaya Jaidee,Phuket,Shopee,09/05/2025,DD010,Chews,Treats,1,250,,0,250").unwrap();
        let frame = load_sales(file.path()).unwrap();

        let overview = CustomerOverview::compute(&frame).unwrap();
        let rows = compute_rfm(&frame.transactions().unwrap()).unwrap();
        assert_eq!(overview.unique_customers, 1);
        assert_eq!(rows.len(), overview.unique_customers);
        assert_eq!(overview.repeat_customer_rate, 100.0);
    }

    #[test]
    fn test_top_customers() {
        let top = top_customers(&sample_frame(), 2).unwrap();
        assert_eq!(
            top,
            vec![
                ("Somchai Srisuk".to_string(), 3484.0),
                ("Ratree Thongsuk".to_string(), 1200.0)
            ]
        );
    }

    #[test]
    fn test_customers_by_province() {
        let provinces = customers_by_province(&sample_frame()).unwrap();
        assert_eq!(provinces.len(), 3);
        assert!(provinces.iter().all(|(_, n)| *n == 1.0));
    }
}
