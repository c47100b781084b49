//! RFM (Recency, Frequency, Monetary) customer segmentation
//!
//! Customers are scored 1-3 on each dimension by rank-based tertiles and the
//! resulting three-digit code is mapped to one of nine named segments.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;

use crate::error::{RfmError, RfmResult};

/// Number of score tiers per dimension.
const TERTILES: usize = 3;

/// Tier given to every customer when there are too few to rank.
const DEGENERATE_TIER: u8 = 2;

/// A single sales line as seen by the segmentation engine
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub customer_id: String,
    pub order_id: String,
    pub transaction_date: Option<NaiveDate>,
    pub amount: f64,
}

impl Transaction {
    pub fn new(
        customer_id: impl Into<String>,
        order_id: impl Into<String>,
        transaction_date: Option<NaiveDate>,
        amount: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            order_id: order_id.into(),
            transaction_date,
            amount,
        }
    }

    /// Build a transaction from possibly-missing fields of an upstream row.
    ///
    /// # Arguments
    /// * `row` - Zero-based row index, used only in the error
    ///
    /// # Returns
    /// * `RfmError::MalformedRecord` when an id is missing or blank, or the
    ///   amount is missing or not finite
    pub fn try_from_parts(
        row: usize,
        customer_id: Option<&str>,
        order_id: Option<&str>,
        transaction_date: Option<NaiveDate>,
        amount: Option<f64>,
    ) -> RfmResult<Self> {
        let malformed = |reason: &str| RfmError::MalformedRecord {
            row,
            reason: reason.to_string(),
        };

        let customer_id = customer_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("missing customer id"))?;
        let order_id = order_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("missing order id"))?;
        let amount = match amount {
            Some(value) if value.is_finite() => value,
            Some(_) => return Err(malformed("amount is not a finite number")),
            None => return Err(malformed("missing amount")),
        };

        Ok(Self::new(customer_id, order_id, transaction_date, amount))
    }
}

/// Named customer segment derived from the recency and frequency digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    NewHighSpenders,
    NewActiveCustomers,
    NewLowSpenders,
    ActiveHighSpenders,
    ActiveRegularCustomers,
    ActiveLowSpenders,
    InactiveHighSpenders,
    InactiveRegularCustomers,
    InactiveLowSpenders,
    Unscored,
}

impl Segment {
    /// Every named segment, in display order. `Unscored` is not included.
    pub const NAMED: [Segment; 9] = [
        Segment::NewHighSpenders,
        Segment::NewActiveCustomers,
        Segment::NewLowSpenders,
        Segment::ActiveHighSpenders,
        Segment::ActiveRegularCustomers,
        Segment::ActiveLowSpenders,
        Segment::InactiveHighSpenders,
        Segment::InactiveRegularCustomers,
        Segment::InactiveLowSpenders,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Segment::NewHighSpenders => "New High Spenders",
            Segment::NewActiveCustomers => "New Active Customers",
            Segment::NewLowSpenders => "New Low Spenders",
            Segment::ActiveHighSpenders => "Active High Spenders",
            Segment::ActiveRegularCustomers => "Active Regular Customers",
            Segment::ActiveLowSpenders => "Active Low Spenders",
            Segment::InactiveHighSpenders => "Inactive High Spenders",
            Segment::InactiveRegularCustomers => "Inactive Regular Customers",
            Segment::InactiveLowSpenders => "Inactive Low Spenders",
            Segment::Unscored => "unscored",
        }
    }

    /// Look up a three-digit recency/frequency/monetary code.
    ///
    /// All 27 codes over `{1,2,3}` are mapped. The monetary digit never
    /// changes the label. Anything else is `Unscored`.
    pub fn from_code(code: &str) -> Self {
        let digits: Vec<u8> = code.bytes().map(|b| b.wrapping_sub(b'0')).collect();
        match digits.as_slice() {
            [3, 1, 1..=3] => Segment::NewHighSpenders,
            [3, 2, 1..=3] => Segment::NewActiveCustomers,
            [3, 3, 1..=3] => Segment::NewLowSpenders,
            [2, 1, 1..=3] => Segment::ActiveHighSpenders,
            [2, 2, 1..=3] => Segment::ActiveRegularCustomers,
            [2, 3, 1..=3] => Segment::ActiveLowSpenders,
            [1, 1, 1..=3] => Segment::InactiveHighSpenders,
            [1, 2, 1..=3] => Segment::InactiveRegularCustomers,
            [1, 3, 1..=3] => Segment::InactiveLowSpenders,
            _ => Segment::Unscored,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scored RFM row for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRfm {
    pub customer_id: String,
    /// Days between the customer's last purchase and the dataset's latest date
    pub recency_days: i64,
    /// Distinct orders placed
    pub frequency: usize,
    /// Total spend
    pub monetary: f64,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub segment: Segment,
}

impl CustomerRfm {
    /// Three-digit score code in recency, frequency, monetary order
    pub fn code(&self) -> String {
        score_code(self.recency_score, self.frequency_score, self.monetary_score)
    }

    pub fn segment_label(&self) -> &'static str {
        self.segment.label()
    }
}

fn score_code(recency: u8, frequency: u8, monetary: u8) -> String {
    format!("{recency}{frequency}{monetary}")
}

/// Per-customer accumulator, kept in first-seen order
struct CustomerGroup<'a> {
    customer_id: &'a str,
    last_date: Option<NaiveDate>,
    orders: HashSet<&'a str>,
    monetary: f64,
}

impl<'a> CustomerGroup<'a> {
    fn new(customer_id: &'a str) -> Self {
        Self {
            customer_id,
            last_date: None,
            orders: HashSet::new(),
            monetary: 0.0,
        }
    }

    fn add(&mut self, tx: &'a Transaction) {
        self.last_date = self.last_date.max(tx.transaction_date);
        self.orders.insert(tx.order_id.as_str());
        self.monetary += tx.amount;
    }
}

/// Raw metrics of a customer that can be scored
struct RawRfm<'a> {
    customer_id: &'a str,
    recency_days: i64,
    frequency: usize,
    monetary: f64,
}

/// Compute RFM scores and segments for every customer with a dated purchase
///
/// # Arguments
/// * `transactions` - Sales lines; several may share a customer or an order
///
/// # Returns
/// * One `CustomerRfm` per scoreable customer, in first-seen order
/// * `RfmError::InsufficientData` when no transaction has a date
pub fn compute_rfm(transactions: &[Transaction]) -> RfmResult<Vec<CustomerRfm>> {
    let reference_date = transactions
        .iter()
        .filter_map(|tx| tx.transaction_date)
        .max()
        .ok_or(RfmError::InsufficientData)?;

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<CustomerGroup<'_>> = Vec::new();
    for tx in transactions {
        let slot = *index.entry(tx.customer_id.as_str()).or_insert_with(|| {
            groups.push(CustomerGroup::new(&tx.customer_id));
            groups.len() - 1
        });
        groups[slot].add(tx);
    }

    let total_customers = groups.len();
    let raw: Vec<RawRfm<'_>> = groups
        .into_iter()
        .filter_map(|group| {
            let last_date = group.last_date?;
            Some(RawRfm {
                customer_id: group.customer_id,
                recency_days: (reference_date - last_date).num_days(),
                frequency: group.orders.len(),
                monetary: group.monetary,
            })
        })
        .collect();

    tracing::debug!(
        %reference_date,
        customers = total_customers,
        scoreable = raw.len(),
        "computed raw RFM metrics"
    );

    // Recency ranks descending so the least recent customer lands in tier 1.
    let recency_scores = tertile_scores(&raw, |a, b| b.recency_days.cmp(&a.recency_days));
    let frequency_scores = tertile_scores(&raw, |a, b| a.frequency.cmp(&b.frequency));
    let monetary_scores = tertile_scores(&raw, |a, b| a.monetary.total_cmp(&b.monetary));

    let rows = raw
        .iter()
        .enumerate()
        .map(|(i, customer)| {
            let (r, f, m) = (recency_scores[i], frequency_scores[i], monetary_scores[i]);
            CustomerRfm {
                customer_id: customer.customer_id.to_string(),
                recency_days: customer.recency_days,
                frequency: customer.frequency,
                monetary: customer.monetary,
                recency_score: r,
                frequency_score: f,
                monetary_score: m,
                segment: Segment::from_code(&score_code(r, f, m)),
            }
        })
        .collect();

    Ok(rows)
}

/// Assign a 1-3 tier to each item by its rank under `cmp`.
///
/// The sort is stable, so ties keep input order and the earlier item takes
/// the lower rank. Fewer than three items all receive the middle tier.
fn tertile_scores<T, F>(items: &[T], cmp: F) -> Vec<u8>
where
    F: Fn(&T, &T) -> Ordering,
{
    let n = items.len();
    if n < TERTILES {
        return vec![DEGENERATE_TIER; n];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| cmp(&items[a], &items[b]));

    let mut scores = vec![0; n];
    for (rank, &idx) in order.iter().enumerate() {
        scores[idx] = tertile_for_rank(rank, n);
    }
    scores
}

/// Tertile of a zero-based rank among `n >= 3` ranks.
///
/// Matches equal-frequency quantile binning over ranks `1..=n`: the tier is
/// `ceil(3 * rank / (n - 1))`, floored at 1.
fn tertile_for_rank(rank: usize, n: usize) -> u8 {
    let tier = (TERTILES * rank + n - 2) / (n - 1);
    tier.clamp(1, TERTILES) as u8
}

/// Count customers per segment. Empty input yields an empty map.
pub fn segment_distribution(rows: &[CustomerRfm]) -> BTreeMap<Segment, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts.entry(row.segment).or_insert(0) += 1;
    }
    counts
}

/// Average RFM metrics of one segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: usize,
    pub mean_recency_days: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
}

/// Summarize each segment present in `rows`, in segment order
pub fn segment_summaries(rows: &[CustomerRfm]) -> Vec<SegmentSummary> {
    let mut grouped: BTreeMap<Segment, Vec<&CustomerRfm>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.segment).or_default().push(row);
    }

    grouped
        .into_iter()
        .map(|(segment, members)| {
            let count = members.len() as f64;
            SegmentSummary {
                segment,
                customers: members.len(),
                mean_recency_days: members.iter().map(|r| r.recency_days as f64).sum::<f64>()
                    / count,
                mean_frequency: members.iter().map(|r| r.frequency as f64).sum::<f64>() / count,
                mean_monetary: members.iter().map(|r| r.monetary).sum::<f64>() / count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn days_before(reference: NaiveDate, days: i64) -> Option<NaiveDate> {
        Some(reference - chrono::Duration::days(days))
    }

    /// One customer per (recency_days, orders, amount per order)
    fn customers(profiles: &[(&str, i64, usize, f64)]) -> Vec<Transaction> {
        let reference = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let mut txs = Vec::new();
        for &(id, recency, orders, per_order) in profiles {
            for n in 0..orders {
                txs.push(Transaction::new(
                    id,
                    format!("{id}-{n}"),
                    days_before(reference, recency + n as i64),
                    per_order,
                ));
            }
        }
        txs
    }

    fn row<'a>(rows: &'a [CustomerRfm], id: &str) -> &'a CustomerRfm {
        rows.iter().find(|r| r.customer_id == id).unwrap()
    }

    #[test]
    fn test_three_customer_scenario() {
        // c's latest purchase, one day before `reference`, is the set's maximum
        let reference = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let mut txs = vec![Transaction::new("a", "a-1", days_before(reference, 50), 100.0)];
        txs.push(Transaction::new("b", "b-1", days_before(reference, 10), 120.0));
        txs.push(Transaction::new("b", "b-2", days_before(reference, 12), 80.0));
        for n in 0..5 {
            txs.push(Transaction::new(
                "c",
                format!("c-{n}"),
                days_before(reference, 1 + n),
                180.0,
            ));
        }
        let rows = compute_rfm(&txs).unwrap();

        assert_eq!(row(&rows, "a").recency_days, 49);
        assert_eq!(row(&rows, "b").recency_days, 9);
        assert_eq!(row(&rows, "c").recency_days, 0);

        let codes: Vec<String> = ["a", "b", "c"].iter().map(|id| row(&rows, id).code()).collect();
        assert_eq!(codes, vec!["111", "222", "333"]);
        assert_eq!(row(&rows, "a").segment_label(), "Inactive High Spenders");
        assert_eq!(row(&rows, "b").segment_label(), "Active Regular Customers");
        assert_eq!(row(&rows, "c").segment_label(), "New Low Spenders");
        assert_eq!(row(&rows, "b").frequency, 2);
        assert_eq!(row(&rows, "c").monetary, 900.0);
    }

    #[test]
    fn test_all_dates_missing_is_insufficient_data() {
        let txs = vec![
            Transaction::new("a", "1", None, 10.0),
            Transaction::new("b", "2", None, 20.0),
        ];
        assert_eq!(compute_rfm(&txs), Err(RfmError::InsufficientData));
        assert_eq!(compute_rfm(&[]), Err(RfmError::InsufficientData));
    }

    #[test]
    fn test_undated_customer_is_excluded() {
        let txs = vec![
            Transaction::new("a", "1", date(2025, 1, 10), 10.0),
            Transaction::new("b", "2", None, 20.0),
            Transaction::new("b", "3", None, 30.0),
        ];
        let rows = compute_rfm(&txs).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].customer_id, "a");
    }

    #[test]
    fn test_one_or_two_customers_get_middle_tier() {
        let one = vec![Transaction::new("a", "1", date(2025, 1, 10), 10.0)];
        let two = vec![
            Transaction::new("a", "1", date(2025, 1, 10), 10.0),
            Transaction::new("b", "2", date(2025, 3, 1), 99.0),
        ];
        for txs in [one, two] {
            let rows = compute_rfm(&txs).unwrap();
            for r in &rows {
                assert_eq!(r.code(), "222");
                assert_eq!(r.segment, Segment::ActiveRegularCustomers);
            }
        }
    }

    #[test]
    fn test_frequency_counts_distinct_orders() {
        let txs = vec![
            Transaction::new("a", "order-1", date(2025, 1, 10), 10.0),
            Transaction::new("a", "order-1", date(2025, 1, 10), 15.0),
            Transaction::new("a", "order-2", date(2025, 1, 12), 5.0),
        ];
        let rows = compute_rfm(&txs).unwrap();
        assert_eq!(rows[0].frequency, 2);
        assert_eq!(rows[0].monetary, 30.0);
        assert_eq!(rows[0].recency_days, 0);
    }

    #[test]
    fn test_non_positive_amounts_pass_through() {
        let txs = vec![
            Transaction::new("a", "1", date(2025, 1, 10), -40.0),
            Transaction::new("a", "2", date(2025, 1, 11), 0.0),
        ];
        let rows = compute_rfm(&txs).unwrap();
        assert_eq!(rows[0].monetary, -40.0);
    }

    #[test]
    fn test_buckets_are_balanced_and_non_empty() {
        for n in 3..=25 {
            let profiles: Vec<(String, i64, usize, f64)> = (0..n)
                .map(|i| (format!("c{i}"), (i * 7 % 13) as i64, 1 + i % 4, (i * 37 % 11) as f64))
                .collect();
            let profiles_ref: Vec<(&str, i64, usize, f64)> = profiles
                .iter()
                .map(|(id, r, f, m)| (id.as_str(), *r, *f, *m))
                .collect();
            let rows = compute_rfm(&customers(&profiles_ref)).unwrap();
            assert_eq!(rows.len(), n);

            let dims: [fn(&CustomerRfm) -> u8; 3] =
                [|r| r.recency_score, |r| r.frequency_score, |r| r.monetary_score];
            for score in dims {
                let mut sizes = [0usize; 3];
                for r in &rows {
                    sizes[usize::from(score(r)) - 1] += 1;
                }
                let max = *sizes.iter().max().unwrap();
                let min = *sizes.iter().min().unwrap();
                assert!(min > 0, "empty bucket for n={n}: {sizes:?}");
                assert!(max - min <= 1, "unbalanced buckets for n={n}: {sizes:?}");
            }
        }
    }

    #[test]
    fn test_scores_are_monotonic() {
        let profiles = [
            ("a", 90, 1, 50.0),
            ("b", 3, 6, 20.0),
            ("c", 40, 2, 700.0),
            ("d", 12, 4, 90.0),
            ("e", 61, 3, 310.0),
            ("f", 7, 1, 15.0),
            ("g", 25, 5, 120.0),
        ];
        let rows = compute_rfm(&customers(&profiles)).unwrap();
        for a in &rows {
            for b in &rows {
                if a.recency_days < b.recency_days {
                    assert!(a.recency_score >= b.recency_score);
                }
                if a.frequency > b.frequency {
                    assert!(a.frequency_score >= b.frequency_score);
                }
                if a.monetary > b.monetary {
                    assert!(a.monetary_score >= b.monetary_score);
                }
            }
        }
    }

    #[test]
    fn test_ties_prefer_first_seen_for_lower_rank() {
        let txs = vec![
            Transaction::new("first", "1", date(2025, 1, 1), 10.0),
            Transaction::new("second", "2", date(2025, 1, 1), 10.0),
            Transaction::new("third", "3", date(2025, 1, 1), 10.0),
        ];
        let rows = compute_rfm(&txs).unwrap();
        let monetary: Vec<u8> = rows.iter().map(|r| r.monetary_score).collect();
        assert_eq!(monetary, vec![1, 2, 3]);
        let recency: Vec<u8> = rows.iter().map(|r| r.recency_score).collect();
        assert_eq!(recency, vec![1, 2, 3]);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let profiles = [("a", 5, 2, 10.0), ("b", 1, 1, 30.0), ("c", 9, 3, 20.0), ("d", 2, 2, 10.0)];
        let txs = customers(&profiles);
        let snapshot = txs.clone();
        let first = compute_rfm(&txs).unwrap();
        let second = compute_rfm(&txs).unwrap();
        assert_eq!(first, second);
        assert_eq!(txs, snapshot);
    }

    #[test]
    fn test_segment_table_covers_all_codes() {
        for r in 1..=3 {
            for f in 1..=3 {
                let labels: Vec<Segment> =
                    (1..=3).map(|m| Segment::from_code(&score_code(r, f, m))).collect();
                assert!(labels.iter().all(|s| *s != Segment::Unscored));
                assert!(labels.windows(2).all(|w| w[0] == w[1]));
            }
        }
        assert_eq!(Segment::from_code("311"), Segment::NewHighSpenders);
        assert_eq!(Segment::from_code("213"), Segment::ActiveHighSpenders);
        assert_eq!(Segment::from_code("132"), Segment::InactiveLowSpenders);
        assert_eq!(Segment::from_code("411"), Segment::Unscored);
        assert_eq!(Segment::from_code("31"), Segment::Unscored);
        assert_eq!(Segment::from_code("3a1"), Segment::Unscored);
        assert_eq!(Segment::Unscored.to_string(), "unscored");
    }

    #[test]
    fn test_segment_distribution() {
        assert!(segment_distribution(&[]).is_empty());

        let profiles = [
            ("a", 50, 1, 100.0),
            ("b", 10, 2, 100.0),
            ("c", 1, 5, 180.0),
            ("d", 30, 1, 40.0),
            ("e", 2, 3, 10.0),
        ];
        let rows = compute_rfm(&customers(&profiles)).unwrap();
        let counts = segment_distribution(&rows);
        assert_eq!(counts.values().sum::<usize>(), rows.len());
        assert!(!counts.contains_key(&Segment::Unscored));
    }

    #[test]
    fn test_segment_summaries() {
        let txs = vec![
            Transaction::new("a", "1", date(2025, 1, 1), 10.0),
            Transaction::new("b", "2", date(2025, 1, 11), 30.0),
        ];
        let rows = compute_rfm(&txs).unwrap();
        let summaries = segment_summaries(&rows);
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.segment, Segment::ActiveRegularCustomers);
        assert_eq!(summary.customers, 2);
        assert_eq!(summary.mean_recency_days, 5.0);
        assert_eq!(summary.mean_monetary, 20.0);
        assert_eq!(summary.mean_frequency, 1.0);
    }

    #[test]
    fn test_try_from_parts_rejects_malformed_rows() {
        let ok = Transaction::try_from_parts(0, Some(" Ann "), Some("DD1"), None, Some(5.0)).unwrap();
        assert_eq!(ok.customer_id, "Ann");

        let missing_customer = Transaction::try_from_parts(3, Some("  "), Some("DD1"), None, Some(5.0));
        assert!(matches!(missing_customer, Err(RfmError::MalformedRecord { row: 3, .. })));
        assert!(Transaction::try_from_parts(0, Some("a"), None, None, Some(1.0)).is_err());
        assert!(Transaction::try_from_parts(0, Some("a"), Some("1"), None, None).is_err());
        assert!(Transaction::try_from_parts(0, Some("a"), Some("1"), None, Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_tertile_for_rank_matches_quantile_binning() {
        let tiers = |n: usize| (0..n).map(|r| tertile_for_rank(r, n)).collect::<Vec<_>>();
        assert_eq!(tiers(3), vec![1, 2, 3]);
        assert_eq!(tiers(4), vec![1, 1, 2, 3]);
        assert_eq!(tiers(5), vec![1, 1, 2, 3, 3]);
        assert_eq!(tiers(6), vec![1, 1, 2, 2, 3, 3]);
    }
}
