//! Product performance

use chrono::NaiveDate;
use polars::prelude::*;

use crate::dashboard::mean;
use crate::dashboard::sales::{daily_sales, sales_by};
use crate::data::columns::{AMOUNT, CATEGORY, CHANNEL, PRODUCT_NAME, QUANTITY, UNIT_DISCOUNT, UNIT_PRICE};
use crate::data::{f64_values, str_values, SalesFilter, SalesFrame};

/// Sales of one product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPerformance {
    pub product: String,
    pub units: f64,
    pub revenue: f64,
    pub mean_unit_price: f64,
    pub mean_unit_discount: f64,
}

/// Totals across every product in the frame
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTotals {
    pub units: f64,
    pub revenue: f64,
    pub mean_unit_price: f64,
    pub mean_unit_discount: f64,
}

impl ProductTotals {
    pub fn compute(frame: &SalesFrame) -> crate::Result<Self> {
        let df = frame.frame();
        Ok(Self {
            units: f64_values(df, QUANTITY)?.into_iter().flatten().sum(),
            revenue: f64_values(df, AMOUNT)?.into_iter().flatten().sum(),
            mean_unit_price: mean(f64_values(df, UNIT_PRICE)?),
            mean_unit_discount: mean(f64_values(df, UNIT_DISCOUNT)?),
        })
    }
}

/// Per-product units, revenue and average pricing, highest revenue first
pub fn product_performance(frame: &SalesFrame) -> crate::Result<Vec<ProductPerformance>> {
    let grouped = frame
        .frame()
        .clone()
        .lazy()
        .group_by_stable([col(PRODUCT_NAME)])
        .agg([
            col(QUANTITY).sum().alias("units"),
            col(AMOUNT).sum().alias("revenue"),
            col(UNIT_PRICE).mean().alias("mean_unit_price"),
            col(UNIT_DISCOUNT).mean().alias("mean_unit_discount"),
        ])
        .collect()?;

    let names = str_values(&grouped, PRODUCT_NAME)?;
    let units = f64_values(&grouped, "units")?;
    let revenue = f64_values(&grouped, "revenue")?;
    let prices = f64_values(&grouped, "mean_unit_price")?;
    let discounts = f64_values(&grouped, "mean_unit_discount")?;

    let mut products: Vec<ProductPerformance> = names
        .into_iter()
        .zip(units)
        .zip(revenue)
        .zip(prices)
        .zip(discounts)
        .filter_map(|((((name, units), revenue), price), discount)| {
            Some(ProductPerformance {
                product: name?,
                units: units.unwrap_or(0.0),
                revenue: revenue.unwrap_or(0.0),
                mean_unit_price: price.unwrap_or(0.0),
                mean_unit_discount: discount.unwrap_or(0.0),
            })
        })
        .collect();
    products.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    Ok(products)
}

/// Category of the first sales line for `product`
pub fn product_category(frame: &SalesFrame, product: &str) -> crate::Result<Option<String>> {
    let df = frame.frame();
    let names = str_values(df, PRODUCT_NAME)?;
    let categories = str_values(df, CATEGORY)?;
    Ok(names
        .into_iter()
        .zip(categories)
        .find(|(name, _)| name.as_deref() == Some(product))
        .and_then(|(_, category)| category))
}

/// Sales of every product sharing `product`'s category, largest first.
/// Empty when `product` has no sales lines.
pub fn category_comparison(frame: &SalesFrame, product: &str) -> crate::Result<Vec<(String, f64)>> {
    let Some(category) = product_category(frame, product)? else {
        return Ok(Vec::new());
    };
    let same_category = frame.filter(&SalesFilter {
        category: Some(category),
        ..Default::default()
    })?;
    sales_by(&same_category, PRODUCT_NAME)
}

/// Drill-down into a single product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetail {
    pub product: String,
    pub category: Option<String>,
    pub totals: ProductTotals,
    pub daily: Vec<(NaiveDate, f64)>,
    pub by_channel: Vec<(String, f64)>,
    /// Sales of the products in the same category
    pub category_comparison: Vec<(String, f64)>,
}

impl ProductDetail {
    /// `frame` should not be narrowed to the product already, so the
    /// category comparison still sees its siblings
    pub fn compute(frame: &SalesFrame, product: &str) -> crate::Result<Self> {
        let lines = frame.filter(&SalesFilter {
            product: Some(product.to_string()),
            ..Default::default()
        })?;
        Ok(Self {
            product: product.to_string(),
            category: product_category(frame, product)?,
            totals: ProductTotals::compute(&lines)?,
            daily: daily_sales(&lines)?,
            by_channel: sales_by(&lines, CHANNEL)?,
            category_comparison: category_comparison(frame, product)?,
        })
    }
}
