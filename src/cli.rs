//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::data::SalesFilter;

/// Sales analytics and RFM customer segmentation for the Dog Days store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true, env = "DOGDAYS_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a synthetic sales export
    Generate {
        /// Output CSV path
        #[arg(short, long, default_value = "data/sales_data.csv", env = "DOGDAYS_OUTPUT")]
        output: PathBuf,

        /// Number of sales lines
        #[arg(short = 'n', long, default_value = "500")]
        records: usize,

        /// Random seed
        #[arg(short, long, default_value = "42", env = "DOGDAYS_SEED")]
        seed: u64,

        /// Last day of the generated range, YYYY-MM-DD (default: today)
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },

    /// Score customers with RFM segmentation
    Segment {
        /// Path to the sales export CSV
        #[arg(short, long, default_value = "data/sales_data.csv", env = "DOGDAYS_INPUT")]
        input: PathBuf,

        /// Also write an RFM bubble chart to this PNG
        #[arg(short, long)]
        chart: Option<PathBuf>,

        /// Customers listed in the table
        #[arg(short, long, default_value = "10")]
        top: usize,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print a dashboard report and write its charts
    Report {
        /// Path to the sales export CSV
        #[arg(short, long, default_value = "data/sales_data.csv", env = "DOGDAYS_INPUT")]
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Dashboard::Sales)]
        dashboard: Dashboard,

        /// Directory for chart images; no charts without it
        #[arg(short, long, env = "DOGDAYS_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Seed for the simulated inventory and campaign figures
        #[arg(short, long, default_value = "42", env = "DOGDAYS_SEED")]
        seed: u64,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Sales,
    Products,
    Inventory,
    Customers,
    Marketing,
}

/// Sales line filters shared by the analysis commands
#[derive(ClapArgs, Debug, Clone, Default, PartialEq)]
pub struct FilterArgs {
    /// First order date to include, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last order date to include, YYYY-MM-DD
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Only this product category
    #[arg(long)]
    pub category: Option<String>,

    /// Only this sales channel
    #[arg(long)]
    pub channel: Option<String>,

    /// Only this product name; the products dashboard drills into it
    #[arg(long)]
    pub product: Option<String>,
}

impl FilterArgs {
    /// Validate the date bounds and build the filter
    pub fn to_filter(&self) -> crate::Result<SalesFilter> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                anyhow::bail!("--from {} is after --to {}", from, to);
            }
        }
        Ok(SalesFilter {
            from: self.from,
            to: self.to,
            category: self.category.clone(),
            channel: self.channel.clone(),
            product: self.product.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segment_with_filters() {
        let args = Args::try_parse_from([
            "dogdays",
            "segment",
            "--input",
            "sales.csv",
            "--from",
            "2025-05-01",
            "--channel",
            "Lazada",
            "-v",
        ])
        .unwrap();
        assert!(args.verbose);

        let Command::Segment { input, chart, top, filter } = args.command else {
            panic!("expected segment command");
        };
        assert_eq!(input, PathBuf::from("sales.csv"));
        assert_eq!(chart, None);
        assert_eq!(top, 10);

        let filter = filter.to_filter().unwrap();
        assert_eq!(filter.from, NaiveDate::from_ymd_opt(2025, 5, 1));
        assert_eq!(filter.to, None);
        assert_eq!(filter.channel.as_deref(), Some("Lazada"));
    }

    #[test]
    fn test_parse_report_dashboard() {
        let args = Args::try_parse_from([
            "dogdays",
            "report",
            "--dashboard",
            "products",
            "--product",
            "Hip & Joint Supplement",
        ])
        .unwrap();
        let Command::Report { dashboard, filter, .. } = args.command else {
            panic!("expected report command");
        };
        assert_eq!(dashboard, Dashboard::Products);
        assert_eq!(
            filter.to_filter().unwrap().product.as_deref(),
            Some("Hip & Joint Supplement")
        );

        let args = Args::try_parse_from(["dogdays", "report", "--dashboard", "marketing", "--seed", "7"]).unwrap();
        let Command::Report { dashboard, seed, output_dir, .. } = args.command else {
            panic!("expected report command");
        };
        assert_eq!(dashboard, Dashboard::Marketing);
        assert_eq!(seed, 7);
        assert_eq!(output_dir, None);

        assert!(Args::try_parse_from(["dogdays", "report", "--dashboard", "finance"]).is_err());
    }

    #[test]
    fn test_parse_generate() {
        let args = Args::try_parse_from([
            "dogdays",
            "generate",
            "-o",
            "out.csv",
            "-n",
            "20",
            "--end-date",
            "2025-06-30",
        ])
        .unwrap();
        let Command::Generate { output, records, end_date, .. } = args.command else {
            panic!("expected generate command");
        };
        assert_eq!(output, PathBuf::from("out.csv"));
        assert_eq!(records, 20);
        assert_eq!(end_date, NaiveDate::from_ymd_opt(2025, 6, 30));

        assert!(Args::try_parse_from(["dogdays", "generate", "--end-date", "30/06/2025"]).is_err());
    }

    #[test]
    fn test_reversed_date_bounds_are_rejected() {
        let filter = FilterArgs {
            from: NaiveDate::from_ymd_opt(2025, 6, 1),
            to: NaiveDate::from_ymd_opt(2025, 5, 1),
            ..Default::default()
        };
        assert!(filter.to_filter().is_err());
        assert!(FilterArgs::default().to_filter().unwrap().is_empty());
    }
}
