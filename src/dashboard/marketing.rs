//! Marketing campaign performance and discount impact
//!
//! Campaign results are simulated from a fixed campaign plan with a seeded
//! RNG; discount analysis works on the real sales lines.

use std::collections::HashMap;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dashboard::mean;
use crate::dashboard::sales::daily_sales;
use crate::data::columns::{AMOUNT, UNIT_DISCOUNT, UNIT_PRICE};
use crate::data::{f64_values, SalesFrame};

/// A planned campaign
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub budget: f64,
    pub channel: String,
}

impl Campaign {
    fn new(name: &str, start: (i32, u32, u32), end: (i32, u32, u32), budget: f64, channel: &str) -> Option<Self> {
        Some(Self {
            name: name.to_string(),
            start: NaiveDate::from_ymd_opt(start.0, start.1, start.2)?,
            end: NaiveDate::from_ymd_opt(end.0, end.1, end.2)?,
            budget,
            channel: channel.to_string(),
        })
    }
}

/// The store's standing campaign plan
pub fn default_campaigns() -> Vec<Campaign> {
    [
        Campaign::new("Summer Sale", (2024, 5, 1), (2024, 5, 15), 15_000.0, "Social Media"),
        Campaign::new("New Product Launch", (2024, 5, 10), (2024, 5, 20), 25_000.0, "Email"),
        Campaign::new("Loyalty Program", (2024, 5, 1), (2024, 5, 31), 10_000.0, "In-store"),
        Campaign::new("Flash Sale", (2024, 5, 25), (2024, 5, 27), 5_000.0, "Social Media"),
        Campaign::new("Holiday Special", (2024, 5, 28), (2024, 6, 5), 20_000.0, "Multi-channel"),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Return on investment as a percentage; 0 when nothing was spent
pub fn roi(revenue: f64, budget: f64) -> f64 {
    if budget > 0.0 {
        (revenue - budget) / budget * 100.0
    } else {
        0.0
    }
}

/// Simulated outcome of a campaign
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignPerformance {
    pub campaign: Campaign,
    pub impressions: u32,
    pub clicks: f64,
    pub conversions: f64,
    pub revenue: f64,
}

impl CampaignPerformance {
    pub fn roi(&self) -> f64 {
        roi(self.revenue, self.campaign.budget)
    }

    /// Click-through rate, percent
    pub fn ctr(&self) -> f64 {
        if self.impressions == 0 {
            return 0.0;
        }
        self.clicks / f64::from(self.impressions) * 100.0
    }

    /// Conversion rate, percent
    pub fn cvr(&self) -> f64 {
        if self.clicks <= 0.0 {
            return 0.0;
        }
        self.conversions / self.clicks * 100.0
    }

    /// Cost per click; `None` without clicks
    pub fn cpc(&self) -> Option<f64> {
        (self.clicks > 0.0).then(|| self.campaign.budget / self.clicks)
    }

    /// Cost per acquisition; `None` without conversions
    pub fn cpa(&self) -> Option<f64> {
        (self.conversions > 0.0).then(|| self.campaign.budget / self.conversions)
    }
}

/// Simulate impressions, clicks, conversions and revenue for each campaign
pub fn simulate_campaigns(campaigns: &[Campaign], seed: u64) -> Vec<CampaignPerformance> {
    let mut rng = StdRng::seed_from_u64(seed);
    campaigns
        .iter()
        .map(|campaign| {
            let impressions = rng.gen_range(5_000..50_000);
            let clicks = f64::from(impressions) * rng.gen_range(0.02..0.08);
            let conversions = clicks * rng.gen_range(0.05..0.15);
            let revenue = conversions * rng.gen_range(500.0..2_000.0);
            CampaignPerformance {
                campaign: campaign.clone(),
                impressions,
                clicks,
                conversions,
                revenue,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketingOverview {
    pub total_budget: f64,
    pub total_revenue: f64,
    pub overall_roi: f64,
    pub best_campaign: Option<String>,
}

impl MarketingOverview {
    pub fn compute(performance: &[CampaignPerformance]) -> Self {
        let total_budget: f64 = performance.iter().map(|p| p.campaign.budget).sum();
        let total_revenue: f64 = performance.iter().map(|p| p.revenue).sum();
        let best_campaign = performance
            .iter()
            .reduce(|best, p| if p.roi() > best.roi() { p } else { best })
            .map(|p| p.campaign.name.clone());
        Self {
            total_budget,
            total_revenue,
            overall_roi: roi(total_revenue, total_budget),
            best_campaign,
        }
    }
}

/// Campaign results summed per marketing channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPerformance {
    pub channel: String,
    pub budget: f64,
    pub revenue: f64,
    pub impressions: u64,
    pub clicks: f64,
    pub conversions: f64,
}

impl ChannelPerformance {
    pub fn roi(&self) -> f64 {
        roi(self.revenue, self.budget)
    }
}

/// Sum campaign results per channel, channels in first-seen order
pub fn channel_performance(performance: &[CampaignPerformance]) -> Vec<ChannelPerformance> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut channels: Vec<ChannelPerformance> = Vec::new();
    for p in performance {
        let slot = *index.entry(p.campaign.channel.as_str()).or_insert_with(|| {
            channels.push(ChannelPerformance {
                channel: p.campaign.channel.clone(),
                budget: 0.0,
                revenue: 0.0,
                impressions: 0,
                clicks: 0.0,
                conversions: 0.0,
            });
            channels.len() - 1
        });
        let channel = &mut channels[slot];
        channel.budget += p.campaign.budget;
        channel.revenue += p.revenue;
        channel.impressions += u64::from(p.impressions);
        channel.clicks += p.clicks;
        channel.conversions += p.conversions;
    }
    channels
}

/// Store sales inside each campaign's window, both ends inclusive
pub fn campaign_sales(frame: &SalesFrame, campaigns: &[Campaign]) -> crate::Result<Vec<(String, f64)>> {
    let days = daily_sales(frame)?;
    Ok(campaigns
        .iter()
        .map(|campaign| {
            let total: f64 = days
                .iter()
                .filter(|(day, _)| (campaign.start..=campaign.end).contains(day))
                .map(|(_, sales)| sales)
                .sum();
            (campaign.name.clone(), total)
        })
        .collect())
}

/// Right-inclusive discount percentage bins `(lower, upper]`
pub const DISCOUNT_BINS: [(f64, f64, &str); 5] = [
    (0.0, 5.0, "0-5%"),
    (5.0, 10.0, "5-10%"),
    (10.0, 15.0, "10-15%"),
    (15.0, 20.0, "15-20%"),
    (20.0, 100.0, "20%+"),
];

/// Average order value of the sales lines in one discount bin
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountBin {
    pub label: &'static str,
    pub mean_order_value: f64,
    pub orders: usize,
}

/// Bin sales lines by unit discount as a share of unit price
///
/// Lines without a discount or an amount fall outside every bin. Every bin is reported,
/// empty ones with zero orders.
pub fn discount_analysis(frame: &SalesFrame) -> crate::Result<Vec<DiscountBin>> {
    let df = frame.frame();
    let discounts = f64_values(df, UNIT_DISCOUNT)?;
    let prices = f64_values(df, UNIT_PRICE)?;
    let amounts = f64_values(df, AMOUNT)?;

    let mut binned: Vec<Vec<f64>> = vec![Vec::new(); DISCOUNT_BINS.len()];
    for ((discount, price), amount) in discounts.into_iter().zip(prices).zip(amounts) {
        let (Some(discount), Some(price), Some(amount)) = (discount, price, amount) else {
            continue;
        };
        if price <= 0.0 {
            continue;
        }
        let pct = discount * 100.0 / price;
        if let Some(bin) = DISCOUNT_BINS.iter().position(|&(lo, hi, _)| pct > lo && pct <= hi) {
            binned[bin].push(amount);
        }
    }

    Ok(DISCOUNT_BINS
        .iter()
        .zip(binned)
        .map(|(&(_, _, label), amounts)| DiscountBin {
            label,
            orders: amounts.len(),
            mean_order_value: mean(amounts.into_iter().map(Some)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::sample_frame;

    fn performance(name: &str, channel: &str, budget: f64, revenue: f64) -> CampaignPerformance {
        CampaignPerformance {
            campaign: Campaign::new(name, (2024, 5, 1), (2024, 5, 2), budget, channel).unwrap(),
            impressions: 10_000,
            clicks: 500.0,
            conversions: 50.0,
            revenue,
        }
    }

    #[test]
    fn test_default_campaign_plan() {
        let campaigns = default_campaigns();
        assert_eq!(campaigns.len(), 5);
        assert!(campaigns.iter().all(|c| c.start <= c.end));
        assert_eq!(campaigns.iter().map(|c| c.budget).sum::<f64>(), 75_000.0);
    }

    #[test]
    fn test_simulation_ranges() {
        let results = simulate_campaigns(&default_campaigns(), 42);
        assert_eq!(results, simulate_campaigns(&default_campaigns(), 42));
        for p in &results {
            assert!((5_000..50_000).contains(&p.impressions));
            assert!(p.ctr() > 1.999 && p.ctr() < 8.001);
            assert!(p.cvr() > 4.999 && p.cvr() < 15.001);
            assert!(p.cpa().is_some());
        }
    }

    #[test]
    fn test_roi_and_rates() {
        let p = performance("Flash Sale", "Email", 5_000.0, 7_500.0);
        assert_eq!(p.roi(), 50.0);
        assert_eq!(p.ctr(), 5.0);
        assert_eq!(p.cvr(), 10.0);
        assert_eq!(p.cpa(), Some(100.0));
        assert_eq!(p.cpc(), Some(10.0));

        let unclicked = CampaignPerformance {
            clicks: 0.0,
            conversions: 0.0,
            ..p.clone()
        };
        assert_eq!(unclicked.cpc(), None);
        assert_eq!(unclicked.cpa(), None);
        assert_eq!(roi(100.0, 0.0), 0.0);
    }

    #[test]
    fn test_overview_and_channels() {
        let results = vec![
            performance("A", "Email", 1_000.0, 500.0),
            performance("B", "Social Media", 1_000.0, 3_000.0),
            performance("C", "Email", 2_000.0, 2_500.0),
        ];
        let overview = MarketingOverview::compute(&results);
        assert_eq!(overview.total_budget, 4_000.0);
        assert_eq!(overview.total_revenue, 6_000.0);
        assert_eq!(overview.overall_roi, 50.0);
        assert_eq!(overview.best_campaign.as_deref(), Some("B"));

        let channels = channel_performance(&results);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].channel, "Email");
        assert_eq!(channels[0].budget, 3_000.0);
        assert_eq!(channels[0].impressions, 20_000);
        assert_eq!(channels[0].roi(), 0.0);

        assert_eq!(MarketingOverview::compute(&[]).best_campaign, None);
    }

    #[test]
    fn test_campaign_sales_windows() {
        let campaigns = vec![
            Campaign::new("Early May", (2025, 5, 1), (2025, 5, 15), 1_000.0, "Email").unwrap(),
            Campaign::new("Last Day", (2025, 5, 21), (2025, 5, 21), 1_000.0, "Email").unwrap(),
            Campaign::new("Last Year", (2024, 5, 1), (2024, 5, 31), 1_000.0, "Email").unwrap(),
        ];
        let sales = campaign_sales(&sample_frame(), &campaigns).unwrap();
        assert_eq!(
            sales,
            vec![
                ("Early May".to_string(), 2924.0),
                ("Last Day".to_string(), 120.0),
                ("Last Year".to_string(), 0.0),
            ]
        );
    }

    #[test]
    fn test_discount_bins_skip_lines_without_amount() {
        use crate::data::load_sales;
        use crate::data::tests::HEADER;
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "1,DD1,Somchai Srisuk,Bangkok,Lazada,01/05/2025,DD014,Supplement,Supplements,1,800,5,40,760").unwrap();
        writeln!(file, "2,DD2,Somchai Srisuk,Bangkok,Lazada,02/05/2025,DD014,Supplement,Supplements,1,800,5,40,").unwrap();
        let bins = discount_analysis(&load_sales(file.path()).unwrap()).unwrap();
        assert_eq!(bins[0].orders, 1);
        assert_eq!(bins[0].mean_order_value, 760.0);
    }

    #[test]
    fn test_discount_bins_are_right_inclusive() {
        let bins = discount_analysis(&sample_frame()).unwrap();
        let counts: Vec<usize> = bins.iter().map(|b| b.orders).collect();
        assert_eq!(counts, vec![1, 1, 0, 1, 0]);
        assert_eq!(bins[0].label, "0-5%");
        assert_eq!(bins[0].mean_order_value, 760.0);
        assert_eq!(bins[1].mean_order_value, 324.0);
        assert_eq!(bins[2].mean_order_value, 0.0);
        assert_eq!(bins[3].mean_order_value, 200.0);
    }
}
