//! Inventory levels simulated from the product catalog
//!
//! The sales export carries no stock data, so each product gets a seeded
//! random stock level and is classified against fixed thresholds.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::Product;

/// Below this many units a product is low on stock
pub const LOW_STOCK_THRESHOLD: u32 = 30;

/// Below this many units a product is at medium stock
pub const MEDIUM_STOCK_THRESHOLD: u32 = 100;

/// Simulated stock levels are drawn from `[10, 200)`
const STOCK_RANGE: std::ops::Range<u32> = 10..200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StockStatus {
    Low,
    Medium,
    High,
}

impl StockStatus {
    pub fn classify(units: u32) -> Self {
        if units < LOW_STOCK_THRESHOLD {
            StockStatus::Low
        } else if units < MEDIUM_STOCK_THRESHOLD {
            StockStatus::Medium
        } else {
            StockStatus::High
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StockStatus::Low => "Low",
            StockStatus::Medium => "Medium",
            StockStatus::High => "High",
        };
        f.write_str(label)
    }
}

/// Stock position of one product
#[derive(Debug, Clone, PartialEq)]
pub struct StockItem {
    pub code: String,
    pub name: String,
    pub units: u32,
    /// `units` times the product's unit price
    pub value: f64,
    pub status: StockStatus,
}

/// Draw a stock level for every product in `catalog`
pub fn simulate_inventory(catalog: &[Product], seed: u64) -> Vec<StockItem> {
    let mut rng = StdRng::seed_from_u64(seed);
    catalog
        .iter()
        .map(|product| {
            let units = rng.gen_range(STOCK_RANGE);
            StockItem {
                code: product.code.clone(),
                name: product.name.clone(),
                units,
                value: f64::from(units) * product.unit_price,
                status: StockStatus::classify(units),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventorySummary {
    pub total_value: f64,
    pub total_units: u64,
    pub low_stock_count: usize,
    /// Mean stock value per product; 0 for an empty inventory
    pub average_value: f64,
}

impl InventorySummary {
    pub fn compute(items: &[StockItem]) -> Self {
        let total_value: f64 = items.iter().map(|item| item.value).sum();
        let average_value = if items.is_empty() {
            0.0
        } else {
            total_value / items.len() as f64
        };
        Self {
            total_value,
            total_units: items.iter().map(|item| u64::from(item.units)).sum(),
            low_stock_count: items.iter().filter(|item| item.status == StockStatus::Low).count(),
            average_value,
        }
    }
}

/// Low-stock items, fewest units first
pub fn low_stock_alerts(items: &[StockItem]) -> Vec<&StockItem> {
    let mut low: Vec<&StockItem> = items
        .iter()
        .filter(|item| item.status == StockStatus::Low)
        .collect();
    low.sort_by_key(|item| item.units);
    low
}

/// Items by stock value, most valuable first
pub fn by_value(items: &[StockItem]) -> Vec<&StockItem> {
    let mut sorted: Vec<&StockItem> = items.iter().collect();
    sorted.sort_by(|a, b| b.value.total_cmp(&a.value));
    sorted
}
