//! Sales overview: headline KPIs and breakdowns

use std::collections::HashSet;

use chrono::NaiveDate;
use polars::prelude::*;

use crate::data::columns::{AMOUNT, CHANNEL, CUSTOMER_NAME, ORDER_DATE, ORDER_ID, PRODUCT_NAME, QUANTITY};
use crate::data::{aggregate_by, f64_values, sort_descending, str_values, SalesFrame, ISO_DATE_FORMAT};

/// Headline sales metrics
#[derive(Debug, Clone, PartialEq)]
pub struct SalesOverview {
    pub total_sales: f64,
    pub total_orders: usize,
    /// Total sales over distinct orders; 0 with no orders
    pub average_order_value: f64,
    /// Best-selling product by units, with its unit count
    pub top_product: Option<(String, f64)>,
    /// Highest-grossing channel, with its sales
    pub top_channel: Option<(String, f64)>,
}

impl SalesOverview {
    pub fn compute(frame: &SalesFrame) -> crate::Result<Self> {
        let df = frame.frame();
        let total_sales: f64 = f64_values(df, AMOUNT)?.into_iter().flatten().sum();
        let total_orders = str_values(df, ORDER_ID)?
            .into_iter()
            .flatten()
            .collect::<HashSet<_>>()
            .len();
        let average_order_value = if total_orders > 0 {
            total_sales / total_orders as f64
        } else {
            0.0
        };

        let mut units = aggregate_by(df, PRODUCT_NAME, col(QUANTITY).sum())?;
        sort_descending(&mut units);

        Ok(Self {
            total_sales,
            total_orders,
            average_order_value,
            top_product: units.into_iter().next(),
            top_channel: sales_by(frame, CHANNEL)?.into_iter().next(),
        })
    }
}

/// Total sales per value of `column`, largest first
pub fn sales_by(frame: &SalesFrame, column: &str) -> crate::Result<Vec<(String, f64)>> {
    let mut totals = aggregate_by(frame.frame(), column, col(AMOUNT).sum())?;
    sort_descending(&mut totals);
    Ok(totals)
}

/// Total sales per calendar day, oldest first. Undated rows are left out.
pub fn daily_sales(frame: &SalesFrame) -> crate::Result<Vec<(NaiveDate, f64)>> {
    let mut days: Vec<(NaiveDate, f64)> = aggregate_by(frame.frame(), ORDER_DATE, col(AMOUNT).sum())?
        .into_iter()
        .filter_map(|(day, total)| Some((NaiveDate::parse_from_str(&day, ISO_DATE_FORMAT).ok()?, total)))
        .collect();
    days.sort_by_key(|(day, _)| *day);
    Ok(days)
}

/// A sales line as listed in the recent orders table
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub order_id: String,
    pub order_date: Option<NaiveDate>,
    pub customer: String,
    pub product: String,
    pub amount: f64,
}

/// The `limit` newest sales lines; undated lines sort last
pub fn recent_orders(frame: &SalesFrame, limit: usize) -> crate::Result<Vec<OrderLine>> {
    let df = frame.frame();
    let orders = str_values(df, ORDER_ID)?;
    let dates = frame.order_dates()?;
    let customers = str_values(df, CUSTOMER_NAME)?;
    let products = str_values(df, PRODUCT_NAME)?;
    let amounts = f64_values(df, AMOUNT)?;

    let mut lines: Vec<OrderLine> = orders
        .into_iter()
        .zip(dates)
        .zip(customers)
        .zip(products)
        .zip(amounts)
        .map(|((((order_id, order_date), customer), product), amount)| OrderLine {
            order_id: order_id.unwrap_or_default(),
            order_date,
            customer: customer.unwrap_or_default(),
            product: product.unwrap_or_default(),
            amount: amount.unwrap_or(0.0),
        })
        .collect();

    // `Option` orders `None` first, so reverse the comparison on `Some` only
    lines.sort_by(|a, b| match (a.order_date, b.order_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    lines.truncate(limit);
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::columns::{CATEGORY, PROVINCE};
    use crate::data::tests::sample_frame;

    #[test]
    fn test_sales_overview() {
        let overview = SalesOverview::compute(&sample_frame()).unwrap();
        assert_eq!(overview.total_sales, 5004.0);
        assert_eq!(overview.total_orders, 5);
        assert!((overview.average_order_value - 1000.8).abs() < 1e-9);
        assert_eq!(
            overview.top_product,
            Some(("Beef & Vegetable Wet Food".to_string(), 4.0))
        );
        assert_eq!(overview.top_channel, Some(("Lazada".to_string(), 3924.0)));
    }

    #[test]
    fn test_sales_by_province_and_category() {
        let frame = sample_frame();
        let provinces = sales_by(&frame, PROVINCE).unwrap();
        assert_eq!(provinces[0], ("Bangkok".to_string(), 3604.0));
        assert_eq!(provinces.len(), 3);

        let categories = sales_by(&frame, CATEGORY).unwrap();
        let names: Vec<&str> = categories.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["Dry Food", "Supplements", "Wet Food", "Treats"]);
    }

    #[test]
    fn test_daily_sales_are_chronological() {
        let days = daily_sales(&sample_frame()).unwrap();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], (NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(), 2724.0));
        assert!(days.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_recent_orders_newest_first() {
        let lines = recent_orders(&sample_frame(), 3).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].order_id, "DD100005");
        assert_eq!(lines[1].order_id, "DD100003");
        assert_eq!(lines[2].order_id, "DD100002");

        let all = recent_orders(&sample_frame(), 100).unwrap();
        assert_eq!(all.last().unwrap().order_date, None);
    }
}
