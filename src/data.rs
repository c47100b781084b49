//! Sales export loading and filtering using Polars

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use polars::prelude::*;

use crate::rfm::Transaction;

/// Column names of the sales export
pub mod columns {
    pub const ROW_NO: &str = "row_no";
    pub const ORDER_ID: &str = "order_id";
    pub const CUSTOMER_NAME: &str = "customer_name";
    pub const CUSTOMER_CODE: &str = "customer_code";
    pub const CUSTOMER_EMAIL: &str = "customer_email";
    pub const CUSTOMER_PHONE: &str = "customer_phone";
    pub const CUSTOMER_ADDRESS: &str = "customer_address";
    pub const PROVINCE: &str = "province";
    pub const POSTAL_CODE: &str = "postal_code";
    pub const CHANNEL: &str = "channel";
    pub const ORDER_DATE: &str = "order_date";
    pub const PRODUCT_CODE: &str = "product_code";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const CATEGORY: &str = "category";
    pub const QUANTITY: &str = "quantity";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const DISCOUNT_PCT: &str = "discount_pct";
    pub const UNIT_DISCOUNT: &str = "unit_discount";
    pub const AMOUNT: &str = "amount";
    pub const SHIPPING_COST: &str = "shipping_cost";
    pub const SHIPPING_METHOD: &str = "shipping_method";
    pub const SHIPPING_ADDRESS: &str = "shipping_address";
    pub const PAYMENT_METHOD: &str = "payment_method";
    pub const PAYMENT_STATUS: &str = "payment_status";
    pub const ORDER_STATUS: &str = "order_status";
    pub const TRACKING_NO: &str = "tracking_no";
    pub const PAYMENT_DATE: &str = "payment_date";
}

use columns::*;

/// Date format written by the export
pub const EXPORT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Normalized in-frame date format; sorts lexicographically
pub(crate) const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Alias used for aggregated value columns
const VALUE: &str = "value";

const TEXT_COLUMNS: [&str; 8] = [
    ORDER_ID,
    CUSTOMER_NAME,
    PROVINCE,
    CHANNEL,
    ORDER_DATE,
    PRODUCT_CODE,
    PRODUCT_NAME,
    CATEGORY,
];

/// Identifier columns; surrounding whitespace is stripped and blanks become null
const TRIMMED_COLUMNS: [&str; 2] = [CUSTOMER_NAME, ORDER_ID];

const MONEY_COLUMNS: [&str; 3] = [UNIT_PRICE, UNIT_DISCOUNT, AMOUNT];

/// Sales lines with typed columns and ISO `order_date` text
#[derive(Debug, Clone)]
pub struct SalesFrame {
    df: DataFrame,
}

/// Explicit dashboard filters. `None` leaves a dimension unfiltered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<String>,
    pub channel: Option<String>,
    /// Product name
    pub product: Option<String>,
}

impl SalesFilter {
    pub fn is_empty(&self) -> bool {
        self.from.is_none()
            && self.to.is_none()
            && self.category.is_none()
            && self.channel.is_none()
            && self.product.is_none()
    }

    /// The same bounds with the product left open
    pub fn without_product(&self) -> SalesFilter {
        SalesFilter {
            product: None,
            ..self.clone()
        }
    }

    fn predicate(&self) -> Option<Expr> {
        let mut parts = Vec::new();
        if let Some(from) = self.from {
            parts.push(col(ORDER_DATE).gt_eq(lit(from.format(ISO_DATE_FORMAT).to_string())));
        }
        if let Some(to) = self.to {
            parts.push(col(ORDER_DATE).lt_eq(lit(to.format(ISO_DATE_FORMAT).to_string())));
        }
        if let Some(category) = &self.category {
            parts.push(col(CATEGORY).eq(lit(category.clone())));
        }
        if let Some(channel) = &self.channel {
            parts.push(col(CHANNEL).eq(lit(channel.clone())));
        }
        if let Some(product) = &self.product {
            parts.push(col(PRODUCT_NAME).eq(lit(product.clone())));
        }
        parts.into_iter().reduce(|acc, expr| acc.and(expr))
    }
}

/// One catalog entry derived from the sales lines
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub code: String,
    pub name: String,
    pub unit_price: f64,
    pub category: String,
}

/// Load a sales export CSV
///
/// # Arguments
/// * `path` - Path to the CSV file
///
/// # Returns
/// * `SalesFrame` with typed columns and normalized order dates
pub fn load_sales(path: impl AsRef<Path>) -> crate::Result<SalesFrame> {
    let path = path.as_ref();
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .finish()
        .with_context(|| format!("failed to open sales export {}", path.display()))?
        .collect()
        .with_context(|| format!("failed to read sales export {}", path.display()))?;

    if df.height() == 0 {
        anyhow::bail!("No sales rows found in {}", path.display());
    }

    tracing::debug!(rows = df.height(), path = %path.display(), "loaded sales export");
    SalesFrame::from_frame(df)
}

impl SalesFrame {
    /// Type the columns the dashboards use and normalize `order_date`
    pub fn from_frame(df: DataFrame) -> crate::Result<Self> {
        let mut selection: Vec<Expr> = TEXT_COLUMNS
            .iter()
            .map(|&name| col(name).cast(DataType::String))
            .collect();
        selection.push(col(QUANTITY).cast(DataType::Int64));
        selection.extend(MONEY_COLUMNS.iter().map(|&name| col(name).cast(DataType::Float64)));

        let mut df = df
            .lazy()
            .select(selection)
            .collect()
            .context("sales export is missing required columns")?;

        let normalized: Vec<Option<String>> = df
            .column(ORDER_DATE)?
            .str()?
            .into_iter()
            .map(|raw| {
                raw.and_then(parse_order_date)
                    .map(|date| date.format(ISO_DATE_FORMAT).to_string())
            })
            .collect();
        let unparsed = normalized.iter().filter(|d| d.is_none()).count();
        if unparsed > 0 {
            tracing::warn!(rows = unparsed, "order dates missing or unparseable");
        }
        df.with_column(Series::new(ORDER_DATE, normalized))?;

        for name in TRIMMED_COLUMNS {
            let trimmed: Vec<Option<String>> = df
                .column(name)?
                .str()?
                .into_iter()
                .map(|v| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string))
                .collect();
            df.with_column(Series::new(name, trimmed))?;
        }

        Ok(Self { df })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Rows matching every bound of `filter`
    pub fn filter(&self, filter: &SalesFilter) -> crate::Result<SalesFrame> {
        let Some(predicate) = filter.predicate() else {
            return Ok(self.clone());
        };
        let df = self.df.clone().lazy().filter(predicate).collect()?;
        tracing::debug!(before = self.height(), after = df.height(), ?filter, "applied sales filter");
        Ok(Self { df })
    }

    /// Order dates as calendar dates; `None` where the export had none
    pub fn order_dates(&self) -> crate::Result<Vec<Option<NaiveDate>>> {
        Ok(str_values(&self.df, ORDER_DATE)?
            .into_iter()
            .map(|d| d.and_then(|d| NaiveDate::parse_from_str(&d, ISO_DATE_FORMAT).ok()))
            .collect())
    }

    /// Segmentation input, keyed by customer name
    ///
    /// Rows without a customer, an order id or a finite amount are skipped.
    pub fn transactions(&self) -> crate::Result<Vec<Transaction>> {
        let customers = str_values(&self.df, CUSTOMER_NAME)?;
        let orders = str_values(&self.df, ORDER_ID)?;
        let dates = self.order_dates()?;
        let amounts = f64_values(&self.df, AMOUNT)?;

        let mut transactions = Vec::with_capacity(self.height());
        for (row, (((customer, order), date), amount)) in customers
            .iter()
            .zip(&orders)
            .zip(dates)
            .zip(amounts)
            .enumerate()
        {
            match Transaction::try_from_parts(row, customer.as_deref(), order.as_deref(), date, amount) {
                Ok(tx) => transactions.push(tx),
                Err(e) => tracing::warn!("skipping sales row: {e}"),
            }
        }
        Ok(transactions)
    }

    /// Distinct products in first-seen order
    pub fn product_catalog(&self) -> crate::Result<Vec<Product>> {
        let codes = str_values(&self.df, PRODUCT_CODE)?;
        let names = str_values(&self.df, PRODUCT_NAME)?;
        let prices = f64_values(&self.df, UNIT_PRICE)?;
        let categories = str_values(&self.df, CATEGORY)?;

        let mut seen = HashSet::new();
        let mut catalog = Vec::new();
        for (((code, name), price), category) in codes.into_iter().zip(names).zip(prices).zip(categories) {
            let (Some(code), Some(name)) = (code, name) else {
                continue;
            };
            if seen.insert(code.clone()) {
                catalog.push(Product {
                    code,
                    name,
                    unit_price: price.unwrap_or(0.0),
                    category: category.unwrap_or_default(),
                });
            }
        }
        Ok(catalog)
    }
}

/// Parse an export date, accepting `dd/mm/yyyy` or ISO `yyyy-mm-dd`
pub fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, EXPORT_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT))
        .ok()
}

/// Text column as owned values
pub(crate) fn str_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    let values = series.str()?.into_iter().map(|v| v.map(str::to_string)).collect();
    Ok(values)
}

/// Numeric column as `f64` values
pub(crate) fn f64_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

/// Group by `key` (first-seen key order) and evaluate `agg` per group.
/// Null keys are dropped; a null aggregate counts as zero.
pub(crate) fn aggregate_by(df: &DataFrame, key: &str, agg: Expr) -> crate::Result<Vec<(String, f64)>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by_stable([col(key)])
        .agg([agg.alias(VALUE)])
        .collect()?;

    let keys = str_values(&grouped, key)?;
    let values = f64_values(&grouped, VALUE)?;
    Ok(keys
        .into_iter()
        .zip(values)
        .filter_map(|(k, v)| Some((k?, v.unwrap_or(0.0))))
        .collect())
}

/// Sort `(label, value)` pairs by value, largest first; ties keep their order
pub(crate) fn sort_descending(pairs: &mut [(String, f64)]) {
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
}
