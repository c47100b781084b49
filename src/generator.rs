//! Synthetic sales export generator
//!
//! Produces a realistic-looking Dog Days export: orders spread over the
//! last six months, weighted channel and province mixes, occasional
//! discounts and a small share of pending or cancelled payments.

use std::fmt;
use std::fs::{self, File};
use std::path::Path;

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::data::columns::*;
use crate::data::EXPORT_DATE_FORMAT;

/// (code, name, unit price, category)
pub const PRODUCTS: [(&str, &str, f64, &str); 18] = [
    ("DD001", "Premium Puppy Kibble (Small Breed)", 1200.0, "Dry Food"),
    ("DD002", "Premium Adult Kibble (All Breeds)", 1500.0, "Dry Food"),
    ("DD003", "Premium Senior Kibble (Large Breed)", 1600.0, "Dry Food"),
    ("DD004", "Grain-Free Salmon & Sweet Potato", 1800.0, "Dry Food"),
    ("DD005", "Weight Management Formula", 1400.0, "Dry Food"),
    ("DD006", "Sensitive Stomach Formula", 1700.0, "Dry Food"),
    ("DD007", "Beef & Vegetable Wet Food", 120.0, "Wet Food"),
    ("DD008", "Chicken & Rice Wet Food", 120.0, "Wet Food"),
    ("DD009", "Lamb & Pea Wet Food", 130.0, "Wet Food"),
    ("DD010", "Dental Chew Sticks (Small)", 250.0, "Treats"),
    ("DD011", "Dental Chew Sticks (Large)", 350.0, "Treats"),
    ("DD012", "Training Treats (Chicken)", 180.0, "Treats"),
    ("DD013", "Peanut Butter Biscuits", 200.0, "Treats"),
    ("DD014", "Hip & Joint Supplement", 800.0, "Supplements"),
    ("DD015", "Skin & Coat Supplement", 750.0, "Supplements"),
    ("DD016", "Multivitamin Chews", 600.0, "Supplements"),
    ("DD017", "Puppy Starter Kit", 2500.0, "Bundles"),
    ("DD018", "Senior Care Package", 2800.0, "Bundles"),
];

const CHANNELS: [&str; 5] = ["Lazada", "Shopee", "Website", "In-store", "Distributor"];
const CHANNEL_WEIGHTS: [f64; 5] = [0.3, 0.25, 0.2, 0.15, 0.1];

const PROVINCES: [&str; 14] = [
    "Bangkok",
    "Chiang Mai",
    "Phuket",
    "Chonburi",
    "Khon Kaen",
    "Songkhla",
    "Nonthaburi",
    "Pathum Thani",
    "Nakhon Ratchasima",
    "Udon Thani",
    "Surat Thani",
    "Chiang Rai",
    "Rayong",
    "Ayutthaya",
];
const PROVINCE_WEIGHTS: [f64; 14] = [
    0.25, 0.1, 0.1, 0.08, 0.07, 0.07, 0.06, 0.06, 0.05, 0.04, 0.04, 0.03, 0.03, 0.02,
];

const FIRST_NAMES: [&str; 36] = [
    "Somchai", "Somsak", "Somying", "Somporn", "Somrak", "Somjai", "Somkiat", "Somkid",
    "Nattapong", "Nattaporn", "Nattawut", "Nattacha", "Nattaya", "Nattanon", "Nattanicha",
    "Siriwan", "Siriporn", "Siripat", "Sirichai", "Sirirat", "Sirithorn", "Siripong",
    "Wichai", "Wichit", "Wichian", "Wichan", "Wichaya", "Wichuda", "Wichitra",
    "Rattana", "Ratree", "Ratchanee", "Ratchada", "Ratchanok", "Ratchapol", "Ratchaphon",
];
const LAST_NAMES: [&str; 33] = [
    "Suksawat", "Srisuk", "Saengchan", "Sae-tang", "Sae-lim", "Ruangrit", "Ruangsan",
    "Pongpanich", "Pongsakorn", "Pongsak", "Pongsuwan", "Pongthep", "Pongpat",
    "Nakorn", "Nakornthai", "Nakornthap", "Nakornsri", "Nakornpat", "Nakornpol",
    "Jaidee", "Jaiyen", "Jaipak", "Jaisai", "Jairai", "Jairak", "Jairam",
    "Thongchai", "Thongsuk", "Thongsri", "Thongpai", "Thongpan", "Thongpat", "Thongpol",
];

const DISCOUNTS: [u32; 7] = [0, 0, 0, 5, 10, 15, 20];
const DISCOUNT_WEIGHTS: [f64; 7] = [0.6, 0.1, 0.1, 0.08, 0.06, 0.04, 0.02];

const PAYMENT_WEIGHTS: [f64; 3] = [0.85, 0.1, 0.05];

const SHIPPING_METHODS: [&str; 4] = ["Flash Express", "Kerry Express", "Thailand Post", "J&T Express"];
const SHIPPING_COSTS: [u32; 5] = [50, 60, 70, 80, 100];
const PAYMENT_METHODS: [&str; 5] = [
    "Credit Card",
    "Bank Transfer",
    "COD",
    "Prompt Pay",
    "TrueMoney Wallet",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Pending,
    Cancelled,
}

impl PaymentStatus {
    const ALL: [PaymentStatus; 3] = [PaymentStatus::Paid, PaymentStatus::Pending, PaymentStatus::Cancelled];

    /// Fulfilment status implied by the payment status
    pub fn order_status(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Completed",
            PaymentStatus::Pending => "Awaiting Shipment",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

/// Generator settings
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub records: usize,
    pub seed: u64,
    /// Orders fall in the `days` days before this date
    pub end_date: NaiveDate,
    pub days: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            records: 500,
            seed: 42,
            end_date: chrono::Local::now().date_naive(),
            days: 180,
        }
    }
}

/// One generated sales line
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub row_no: u32,
    pub order_id: String,
    pub customer_name: String,
    pub customer_code: u32,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub province: String,
    pub postal_code: String,
    pub channel: String,
    pub order_date: NaiveDate,
    pub product_code: String,
    pub product_name: String,
    pub category: String,
    pub quantity: u32,
    pub unit_price: f64,
    /// Discount percentage; absent when no discount applies
    pub discount_pct: Option<u32>,
    pub unit_discount: f64,
    pub amount: f64,
    pub shipping_cost: u32,
    pub shipping_method: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub tracking_no: Option<String>,
    pub payment_date: Option<NaiveDate>,
}

/// House number and village (moo) in `province`
fn address<R: Rng>(rng: &mut R, province: &str) -> String {
    format!("{} Moo {}, {}", rng.gen_range(1..999), rng.gen_range(1..20), province)
}

fn choose<'a, R: Rng>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// Generate `config.records` sales lines
pub fn generate(config: &GeneratorConfig) -> crate::Result<Vec<SalesRecord>> {
    if config.days <= 0 {
        anyhow::bail!("Generator date range must span at least one day");
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let channels = WeightedIndex::new(CHANNEL_WEIGHTS)?;
    let provinces = WeightedIndex::new(PROVINCE_WEIGHTS)?;
    let discounts = WeightedIndex::new(DISCOUNT_WEIGHTS)?;
    let payments = WeightedIndex::new(PAYMENT_WEIGHTS)?;
    let start_date = config.end_date - Duration::days(config.days);

    let mut records = Vec::with_capacity(config.records);
    for i in 0..config.records {
        let order_date = start_date + Duration::days(rng.gen_range(0..config.days));
        let (product_code, product_name, unit_price, category) = PRODUCTS[rng.gen_range(0..PRODUCTS.len())];
        let quantity = rng.gen_range(1..=5);

        let discount = DISCOUNTS[discounts.sample(&mut rng)];
        let unit_discount = unit_price * f64::from(discount) / 100.0;
        let amount = (unit_price - unit_discount) * f64::from(quantity);

        let first_name = choose(&mut rng, &FIRST_NAMES);
        let last_name = choose(&mut rng, &LAST_NAMES);
        let customer_phone = format!("0{}{}", rng.gen_range(6..10), rng.gen_range(1_000_000..9_999_999));

        let province = PROVINCES[provinces.sample(&mut rng)];
        let postal_code = rng.gen_range(10_000..99_999).to_string();
        let customer_address = address(&mut rng, province);

        let order_id = format!("DD{}", rng.gen_range(100_000..999_999));
        let channel = CHANNELS[channels.sample(&mut rng)];
        let payment_status = PaymentStatus::ALL[payments.sample(&mut rng)];

        let tracking_no = (payment_status != PaymentStatus::Cancelled)
            .then(|| format!("TH{}", rng.gen_range(10_000_000..99_999_999)));
        let shipping_method = choose(&mut rng, &SHIPPING_METHODS);
        let shipping_address = address(&mut rng, province);
        let shipping_cost = *SHIPPING_COSTS.choose(&mut rng).unwrap_or(&SHIPPING_COSTS[0]);

        let payment_method = choose(&mut rng, &PAYMENT_METHODS);
        let payment_date = (payment_status == PaymentStatus::Paid)
            .then(|| order_date + Duration::days(rng.gen_range(0..3)));

        records.push(SalesRecord {
            row_no: i as u32 + 1,
            order_id,
            customer_name: format!("{first_name} {last_name}"),
            customer_code: rng.gen_range(1000..9999),
            customer_email: format!("{}.{}@example.com", first_name.to_lowercase(), last_name.to_lowercase()),
            customer_phone,
            customer_address,
            province: province.to_string(),
            postal_code,
            channel: channel.to_string(),
            order_date,
            product_code: product_code.to_string(),
            product_name: product_name.to_string(),
            category: category.to_string(),
            quantity,
            unit_price,
            discount_pct: (discount > 0).then_some(discount),
            unit_discount,
            amount,
            shipping_cost,
            shipping_method: shipping_method.to_string(),
            shipping_address,
            payment_method: payment_method.to_string(),
            payment_status,
            tracking_no,
            payment_date,
        });
    }

    tracing::debug!(records = records.len(), seed = config.seed, %start_date, "generated sales records");
    Ok(records)
}

fn text<F: Fn(&SalesRecord) -> String>(name: &str, records: &[SalesRecord], f: F) -> Series {
    Series::new(name, records.iter().map(f).collect::<Vec<_>>())
}

/// Lay the records out in export column order
pub fn to_frame(records: &[SalesRecord]) -> crate::Result<DataFrame> {
    let date = |d: &NaiveDate| d.format(EXPORT_DATE_FORMAT).to_string();
    let columns = vec![
        Series::new(ROW_NO, records.iter().map(|r| r.row_no).collect::<Vec<_>>()),
        text(ORDER_ID, records, |r| r.order_id.clone()),
        text(CUSTOMER_NAME, records, |r| r.customer_name.clone()),
        Series::new(CUSTOMER_CODE, records.iter().map(|r| r.customer_code).collect::<Vec<_>>()),
        text(CUSTOMER_EMAIL, records, |r| r.customer_email.clone()),
        text(CUSTOMER_PHONE, records, |r| r.customer_phone.clone()),
        text(CUSTOMER_ADDRESS, records, |r| r.customer_address.clone()),
        text(PROVINCE, records, |r| r.province.clone()),
        text(POSTAL_CODE, records, |r| r.postal_code.clone()),
        text(CHANNEL, records, |r| r.channel.clone()),
        text(ORDER_DATE, records, |r| date(&r.order_date)),
        text(PRODUCT_CODE, records, |r| r.product_code.clone()),
        text(PRODUCT_NAME, records, |r| r.product_name.clone()),
        text(CATEGORY, records, |r| r.category.clone()),
        Series::new(QUANTITY, records.iter().map(|r| r.quantity).collect::<Vec<_>>()),
        Series::new(UNIT_PRICE, records.iter().map(|r| r.unit_price).collect::<Vec<_>>()),
        Series::new(DISCOUNT_PCT, records.iter().map(|r| r.discount_pct).collect::<Vec<_>>()),
        Series::new(UNIT_DISCOUNT, records.iter().map(|r| r.unit_discount).collect::<Vec<_>>()),
        Series::new(AMOUNT, records.iter().map(|r| r.amount).collect::<Vec<_>>()),
        Series::new(SHIPPING_COST, records.iter().map(|r| r.shipping_cost).collect::<Vec<_>>()),
        text(SHIPPING_METHOD, records, |r| r.shipping_method.clone()),
        text(SHIPPING_ADDRESS, records, |r| r.shipping_address.clone()),
        text(PAYMENT_METHOD, records, |r| r.payment_method.clone()),
        text(PAYMENT_STATUS, records, |r| r.payment_status.to_string()),
        text(ORDER_STATUS, records, |r| r.payment_status.order_status().to_string()),
        Series::new(TRACKING_NO, records.iter().map(|r| r.tracking_no.clone()).collect::<Vec<_>>()),
        Series::new(
            PAYMENT_DATE,
            records
                .iter()
                .map(|r| r.payment_date.as_ref().map(date))
                .collect::<Vec<_>>(),
        ),
    ];
    Ok(DataFrame::new(columns)?)
}

/// Write the records as a CSV export, creating parent directories
pub fn write_csv(records: &[SalesRecord], path: impl AsRef<Path>) -> crate::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let mut df = to_frame(records)?;
    let mut file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;

    tracing::info!(records = records.len(), path = %path.display(), "wrote sales export");
    Ok(())
}
