//! Dog Days: sales dashboards and RFM customer segmentation from the command line
//!
//! This is the main entrypoint that wires data loading, the dashboard
//! computations, segmentation and chart rendering to the CLI.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use dogdays::cli::{Command, Dashboard, FilterArgs};
use dogdays::dashboard::customers::{customers_by_province, top_customers, CustomerOverview};
use dogdays::dashboard::inventory::{by_value, low_stock_alerts, simulate_inventory, InventorySummary};
use dogdays::dashboard::marketing::{
    campaign_sales, channel_performance, default_campaigns, discount_analysis, simulate_campaigns,
    MarketingOverview,
};
use dogdays::dashboard::products::{product_performance, ProductDetail, ProductTotals};
use dogdays::dashboard::sales::{daily_sales, recent_orders, sales_by, SalesOverview};
use dogdays::data::columns::{CATEGORY, CHANNEL, PROVINCE};
use dogdays::generator::{generate, write_csv, GeneratorConfig};
use dogdays::{compute_rfm, load_sales, segment_distribution, segment_summaries, viz, Args, RfmError, SalesFrame};

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    let start_time = Instant::now();
    match args.command {
        Command::Generate { output, records, seed, end_date } => {
            let mut config = GeneratorConfig {
                records,
                seed,
                ..Default::default()
            };
            if let Some(end_date) = end_date {
                config.end_date = end_date;
            }
            run_generate(&config, &output)?;
        }
        Command::Segment { input, chart, top, filter } => {
            run_segment(&input, chart.as_deref(), top, &filter)?;
        }
        Command::Report {
            input,
            dashboard,
            output_dir,
            seed,
            filter,
        } => {
            run_report(&input, dashboard, output_dir.as_deref(), seed, &filter)?;
        }
    }

    tracing::debug!(elapsed_secs = start_time.elapsed().as_secs_f64(), "done");
    Ok(())
}

fn load_filtered(input: &Path, filter: &FilterArgs) -> Result<SalesFrame> {
    let frame = load_sales(input)?.filter(&filter.to_filter()?)?;
    println!("✓ Data loaded: {} sales lines from {}", frame.height(), input.display());
    Ok(frame)
}

fn run_generate(config: &GeneratorConfig, output: &Path) -> Result<()> {
    println!("=== Generating Sales Export ===\n");
    let records = generate(config)?;
    write_csv(&records, output)?;

    let paid = records
        .iter()
        .filter(|r| r.payment_date.is_some())
        .count();
    println!("✓ {} sales lines written to {}", records.len(), output.display());
    println!("  Seed: {}", config.seed);
    println!("  Dates: {} days up to {}", config.days, config.end_date);
    println!("  Paid lines: {}", paid);
    Ok(())
}

fn run_segment(input: &Path, chart: Option<&Path>, top: usize, filter: &FilterArgs) -> Result<()> {
    println!("=== Customer Segmentation ===\n");

    let frame = load_filtered(input, filter)?;
    let transactions = frame.transactions()?;

    let rows = match compute_rfm(&transactions) {
        Ok(rows) => rows,
        Err(e @ RfmError::InsufficientData) => {
            println!("\n{}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let summaries = segment_summaries(&rows);
    viz::print_segment_report(&rows, &summaries, top);

    let distribution = segment_distribution(&rows);
    println!("\nDistribution:");
    for (segment, count) in &distribution {
        println!("  {}: {}", segment, count);
    }

    if let Some(chart) = chart {
        viz::rfm_bubble_chart(&rows, chart)?;
        let sizes_chart = chart.with_file_name(format!(
            "{}_segments.png",
            chart.file_stem().and_then(|s| s.to_str()).unwrap_or("rfm")
        ));
        viz::segment_distribution_chart(&distribution, &sizes_chart)?;
        println!("\n✓ RFM chart saved to: {}", chart.display());
        println!("✓ Segment sizes saved to: {}", sizes_chart.display());
    }
    Ok(())
}

fn run_report(
    input: &Path,
    dashboard: Dashboard,
    output_dir: Option<&Path>,
    seed: u64,
    filter: &FilterArgs,
) -> Result<()> {
    println!("=== {:?} Dashboard ===\n", dashboard);

    let filter = filter.to_filter()?;
    let loaded = load_sales(input)?;
    // The products dashboard keeps the chosen product's siblings for comparison
    let (frame, product) = match (dashboard, filter.product.as_deref()) {
        (Dashboard::Products, Some(product)) => (loaded.filter(&filter.without_product())?, Some(product)),
        _ => (loaded.filter(&filter)?, None),
    };
    println!("✓ Data loaded: {} sales lines from {}", frame.height(), input.display());
    if frame.is_empty() {
        println!("\nNo sales lines match the filters.");
        return Ok(());
    }
    if let Some(dir) = output_dir {
        fs::create_dir_all(dir).with_context(|| format!("failed to create directory {}", dir.display()))?;
    }

    match dashboard {
        Dashboard::Sales => report_sales(&frame, output_dir),
        Dashboard::Products => report_products(&frame, product, output_dir),
        Dashboard::Inventory => report_inventory(&frame, seed, output_dir),
        Dashboard::Customers => report_customers(&frame, output_dir),
        Dashboard::Marketing => report_marketing(&frame, seed, output_dir),
    }
}

fn print_ranking(title: &str, rows: &[(String, f64)]) {
    println!("\n{}:", title);
    for (label, value) in rows {
        println!("  {:<36} {:>14.2}", label, value);
    }
}

fn report_sales(frame: &SalesFrame, charts: Option<&Path>) -> Result<()> {
    let overview = SalesOverview::compute(frame)?;
    println!("\nTotal sales: ฿{:.2}", overview.total_sales);
    println!("Total orders: {}", overview.total_orders);
    println!("Average order value: ฿{:.2}", overview.average_order_value);
    if let Some((product, units)) = &overview.top_product {
        println!("Top product: {} ({} units)", product, units);
    }
    if let Some((channel, sales)) = &overview.top_channel {
        println!("Top channel: {} (฿{:.2})", channel, sales);
    }

    let by_channel = sales_by(frame, CHANNEL)?;
    let by_province = sales_by(frame, PROVINCE)?;
    let by_category = sales_by(frame, CATEGORY)?;
    print_ranking("Sales by channel", &by_channel);
    print_ranking("Sales by province", &by_province);
    print_ranking("Sales by category", &by_category);

    println!("\nRecent orders:");
    for line in recent_orders(frame, 10)? {
        let date = line.order_date.map(|d| d.to_string()).unwrap_or_default();
        println!(
            "  {:<10} {:<10} {:<24} {:<36} {:>10.2}",
            line.order_id, date, line.customer, line.product, line.amount
        );
    }

    if let Some(dir) = charts {
        viz::daily_sales_chart(&daily_sales(frame)?, dir.join("daily_sales.png"))?;
        viz::bar_chart("Sales by Channel", &by_channel, dir.join("sales_by_channel.png"))?;
        viz::bar_chart("Sales by Category", &by_category, dir.join("sales_by_category.png"))?;
        println!("\n✓ Charts saved to: {}", dir.display());
    }
    Ok(())
}

fn report_products(frame: &SalesFrame, product: Option<&str>, charts: Option<&Path>) -> Result<()> {
    if let Some(product) = product {
        report_product_detail(frame, product, charts)?;
    }


    let totals = ProductTotals::compute(frame)?;
    println!("\nUnits sold: {}", totals.units);
    println!("Revenue: ฿{:.2}", totals.revenue);
    println!("Average unit price: ฿{:.2}", totals.mean_unit_price);
    println!("Average unit discount: ฿{:.2}", totals.mean_unit_discount);

    let products = product_performance(frame)?;
    println!("\n  {:<36} | {:>6} | {:>12} | {:>10} | {:>9}", "Product", "Units", "Revenue", "Avg price", "Avg disc");
    for p in &products {
        println!(
            "  {:<36} | {:>6} | {:>12.2} | {:>10.2} | {:>9.2}",
            p.product, p.units, p.revenue, p.mean_unit_price, p.mean_unit_discount
        );
    }

    if let Some(path) = charts.map(|dir| dir.join("product_revenue.png")) {
        let bars: Vec<(String, f64)> = products.iter().take(10).map(|p| (p.product.clone(), p.revenue)).collect();
        viz::bar_chart("Top Products by Revenue", &bars, &path)?;
        println!("\n✓ Chart saved to: {}", path.display());
    }
    Ok(())
}

fn report_product_detail(frame: &SalesFrame, product: &str, charts: Option<&Path>) -> Result<()> {
    let detail = ProductDetail::compute(frame, product)?;
    println!("\n--- {} ---", detail.product);
    let Some(category) = &detail.category else {
        println!("No sales lines for this product.");
        return Ok(());
    };
    println!("Category: {}", category);
    println!("Units sold: {}", detail.totals.units);
    println!("Revenue: ฿{:.2}", detail.totals.revenue);
    println!("Average unit price: ฿{:.2}", detail.totals.mean_unit_price);
    println!("Average unit discount: ฿{:.2}", detail.totals.mean_unit_discount);

    println!("\nDaily sales:");
    for (day, sales) in &detail.daily {
        println!("  {}  {:>12.2}", day, sales);
    }
    print_ranking("Sales by channel", &detail.by_channel);
    print_ranking(&format!("Compared with other {} products", category), &detail.category_comparison);

    if let Some(dir) = charts {
        if !detail.daily.is_empty() {
            viz::daily_sales_chart(&detail.daily, dir.join("product_daily_sales.png"))?;
        }
        viz::bar_chart("Sales by Channel", &detail.by_channel, dir.join("product_channels.png"))?;
        viz::bar_chart(
            &format!("Product Comparison in {}", category),
            &detail.category_comparison,
            dir.join("category_comparison.png"),
        )?;
        println!("\n✓ Product charts saved to: {}", dir.display());
    }
    Ok(())
}

fn report_inventory(frame: &SalesFrame, seed: u64, charts: Option<&Path>) -> Result<()> {
    let stock = simulate_inventory(&frame.product_catalog()?, seed);
    let summary = InventorySummary::compute(&stock);
    println!("\nTotal stock value: ฿{:.2}", summary.total_value);
    println!("Total units: {}", summary.total_units);
    println!("Low stock products: {}", summary.low_stock_count);
    println!("Average value per product: ฿{:.2}", summary.average_value);

    println!("\nLow stock alerts:");
    for item in low_stock_alerts(&stock) {
        println!("  {:<8} {:<36} {:>4} units", item.code, item.name, item.units);
    }

    println!("\nStock by value:");
    for item in by_value(&stock) {
        println!("  {:<8} {:<36} {:>4} units {:>12.2} {}", item.code, item.name, item.units, item.value, item.status);
    }

    if let Some(path) = charts.map(|dir| dir.join("stock_value.png")) {
        let bars: Vec<(String, f64)> = by_value(&stock).iter().map(|i| (i.code.clone(), i.value)).collect();
        viz::bar_chart("Stock Value by Product", &bars, &path)?;
        println!("\n✓ Chart saved to: {}", path.display());
    }
    Ok(())
}

fn report_customers(frame: &SalesFrame, charts: Option<&Path>) -> Result<()> {
    let overview = CustomerOverview::compute(frame)?;
    println!("\nUnique customers: {}", overview.unique_customers);
    println!("Average customer value: ฿{:.2}", overview.average_customer_value);
    println!("Average orders per customer: {:.2}", overview.average_orders_per_customer);
    println!("Repeat customer rate: {:.1}%", overview.repeat_customer_rate);

    let top = top_customers(frame, 10)?;
    let provinces = customers_by_province(frame)?;
    print_ranking("Top customers", &top);
    print_ranking("Customers by province", &provinces);

    if let Some(dir) = charts {
        viz::bar_chart("Top Customers by Spend", &top, dir.join("top_customers.png"))?;
        viz::bar_chart("Customers by Province", &provinces, dir.join("customers_by_province.png"))?;
        println!("\n✓ Charts saved to: {}", dir.display());
    }
    Ok(())
}

fn report_marketing(frame: &SalesFrame, seed: u64, charts: Option<&Path>) -> Result<()> {
    let performance = simulate_campaigns(&default_campaigns(), seed);
    let overview = MarketingOverview::compute(&performance);
    println!("\nTotal budget: ฿{:.2}", overview.total_budget);
    println!("Campaign revenue: ฿{:.2}", overview.total_revenue);
    println!("Overall ROI: {:.1}%", overview.overall_roi);
    if let Some(best) = &overview.best_campaign {
        println!("Best campaign: {}", best);
    }

    let cost = |c: Option<f64>| c.map(|c| format!("{:.2}", c)).unwrap_or_else(|| "-".to_string());
    println!(
        "\n  {:<20} | {:>10} | {:>6} | {:>6} | {:>8} | {:>10} | {:>8}",
        "Campaign", "Budget", "CTR", "CVR", "CPC", "CPA", "ROI"
    );
    for p in &performance {
        println!(
            "  {:<20} | {:>10.2} | {:>5.2}% | {:>5.2}% | {:>8} | {:>10} | {:>7.1}%",
            p.campaign.name,
            p.campaign.budget,
            p.ctr(),
            p.cvr(),
            cost(p.cpc()),
            cost(p.cpa()),
            p.roi()
        );
    }

    println!("\nStore sales during each campaign:");
    let campaigns: Vec<_> = performance.iter().map(|p| p.campaign.clone()).collect();
    for ((name, sales), campaign) in campaign_sales(frame, &campaigns)?.into_iter().zip(&campaigns) {
        println!("  {:<20} {} to {}  ฿{:.2}", name, campaign.start, campaign.end, sales);
    }

    println!("\nBy marketing channel:");
    for channel in channel_performance(&performance) {
        println!("  {:<20} budget {:>10.2}  ROI {:>7.1}%", channel.channel, channel.budget, channel.roi());
    }

    println!("\nDiscount impact:");
    for bin in discount_analysis(frame)? {
        println!("  {:<8} {:>5} lines  avg order ฿{:.2}", bin.label, bin.orders, bin.mean_order_value);
    }

    if let Some(path) = charts.map(|dir| dir.join("campaign_roi.png")) {
        let bars: Vec<(String, f64)> = performance.iter().map(|p| (p.campaign.name.clone(), p.roi())).collect();
        viz::bar_chart("Campaign ROI (%)", &bars, &path)?;
        println!("\n✓ Chart saved to: {}", path.display());
    }
    Ok(())
}
