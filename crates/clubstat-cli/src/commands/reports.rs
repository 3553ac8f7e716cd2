//! Report command implementations

use anyhow::{bail, Context, Result};
use clubstat_core::filter::month_options;
use clubstat_core::format::{
    format_date, format_gallons, format_money, format_number, format_opt_date, truncate_name,
};
use clubstat_core::report::{
    all_visits, chart_metrics, find_metric, ranked_locations, ChartDataset, Leaderboards,
};
use clubstat_core::{Database, DetailLookup, OrderDetail, Tab};

use super::{load_state, print_filter_line};
use crate::cli::FilterArgs;

/// Widest bar in a text chart
const BAR_WIDTH: usize = 30;

pub fn cmd_summary(db: &Database, args: &FilterArgs) -> Result<()> {
    let state = load_state(db, args)?;
    let view = state.view();
    let summary = &view.summary;

    println!();
    println!("📊 Summary: {}", view.tab);
    println!("   {}", view.tab.subtitle());
    print_filter_line(&state);
    println!("   ─────────────────────────────────────────────");

    if view.is_empty() {
        println!("   No receipts or orders match this filter.");
        return Ok(());
    }

    for card in &summary.cards {
        let value = if card.negative {
            format!("({})", card.value)
        } else {
            card.value.clone()
        };
        match &card.sub {
            Some(sub) => println!("   {:28} {:>14}   {}", card.label, value, sub),
            None => println!("   {:28} {:>14}", card.label, value),
        }
    }

    if !summary.locations.is_empty() {
        println!();
        println!("   📍 Locations");
        for (name, count) in &summary.locations {
            println!("      {:30} {:>5}", truncate_name(name, 30), count);
        }
    }

    let highlights = &view.highlights;
    println!();
    println!("   ⭐ Highlights");
    println!(
        "      Biggest trip:   {} ({})",
        highlights.biggest_trip.label,
        format_money(highlights.biggest_trip.total)
    );
    if let Some(month) = &highlights.biggest_month {
        println!("      Biggest month:  {} ({})", month.label, format_money(month.total));
    }
    if let Some((name, visits)) = &highlights.top_warehouse {
        println!("      Top warehouse:  {} ({} visits)", name, visits);
    }

    if !summary.coverage.is_empty() {
        println!();
        println!("   {}", summary.coverage);
    }

    Ok(())
}

pub fn cmd_items(db: &Database, args: &FilterArgs, limit: usize) -> Result<()> {
    let state = load_state(db, args)?;
    let view = state.view();
    let boards = Leaderboards::build(&view.item_stats, limit);

    println!();
    println!("🛒 Items: {}", view.tab);
    print_filter_line(&state);
    println!("   {} distinct items", view.item_stats.len());

    if view.item_stats.is_empty() {
        println!("   No item purchases in this range.");
        return Ok(());
    }

    println!();
    println!("   💰 Most Spent");
    println!("   {:32} │ {:>12} │ {:>7} │ {:>10}", "Item", "Total", "Count", "Avg");
    println!("   ─────────────────────────────────┼──────────────┼─────────┼───────────");
    for row in &boards.most_spent {
        println!(
            "   {:32} │ {:>12} │ {:>7} │ {:>10}",
            truncate_name(&row.name, 32),
            format_money(row.total_spent),
            format_number(row.purchases),
            format_money(row.average_price)
        );
    }

    println!();
    println!("   🔁 Most Purchased");
    println!("   {:32} │ {:>7} │ {:>10} │ {:>8}", "Item", "Count", "Avg", "Change");
    println!("   ─────────────────────────────────┼─────────┼────────────┼─────────");
    for row in &boards.most_purchased {
        println!(
            "   {:32} │ {:>7} │ {:>10} │ {:>7.1}%",
            truncate_name(&row.name, 32),
            format_number(row.purchases),
            format_money(row.average_price),
            row.increase_pct
        );
    }

    println!();
    println!("   💎 Most Expensive");
    println!("   {:32} │ {:>10} │ {:>10} │ {:>7}", "Item", "Avg", "Max", "Count");
    println!("   ─────────────────────────────────┼────────────┼────────────┼────────");
    for row in &boards.most_expensive {
        println!(
            "   {:32} │ {:>10} │ {:>10} │ {:>7}",
            truncate_name(&row.name, 32),
            format_money(row.average_price),
            format_money(row.max_price),
            format_number(row.purchases)
        );
    }

    println!();
    println!("   📈 Biggest Price Increases");
    if boards.price_increases.is_empty() {
        println!("   No price increases found.");
    } else {
        println!(
            "   {:32} │ {:>10} │ {:>10} │ {:>10} │ {:>8}",
            "Item", "From", "To", "Per month", "Months"
        );
        println!("   ─────────────────────────────────┼────────────┼────────────┼────────────┼─────────");
        for row in &boards.price_increases {
            println!(
                "   {:32} │ {:>10} │ {:>10} │ {:>10} │ {:>8.1}",
                truncate_name(&row.name, 32),
                format_money(row.min_price),
                format_money(row.max_price),
                format_money(row.rate_per_month),
                row.months
            );
            println!(
                "   {:32}   {} → {}",
                "",
                format_date(&row.min_date),
                format_date(&row.max_date)
            );
        }
    }

    Ok(())
}

pub fn cmd_gas(db: &Database, args: &FilterArgs) -> Result<()> {
    let state = load_state(db, args)?;
    let gas = &state.view().receipt_report.gas;

    println!();
    println!("⛽ Gas");
    print_filter_line(&state);
    println!("   ─────────────────────────────────────────────");

    if gas.trips.is_empty() {
        println!("   No fill-ups in this range.");
        return Ok(());
    }

    println!("   Fill-ups:       {}", gas.total_trips);
    println!("   Gallons:        {}", format_gallons(gas.total_gallons));
    println!("   Spent:          {}", format_money(gas.total_cost));
    println!("   Avg $/gal:      {}", format_money(gas.average_price_per_gallon()));
    println!();
    println!(
        "   {:14} │ {:24} │ {:>8} │ {:>8} │ {:>10}",
        "Date", "Station", "Gallons", "$/gal", "Total"
    );
    println!("   ───────────────┼──────────────────────────┼──────────┼──────────┼───────────");
    for trip in &gas.trips {
        println!(
            "   {:14} │ {:24} │ {:>8} │ {:>8} │ {:>10}",
            format_opt_date(trip.date.as_ref()),
            truncate_name(&trip.location, 24),
            format_gallons(trip.gallons),
            format!("{:.3}", trip.price_per_gallon),
            format_money(trip.total_price)
        );
    }

    let stations = ranked_locations(&gas.location_counts);
    if stations.len() > 1 {
        println!();
        println!("   📍 Stations");
        for (name, count) in stations {
            println!("      {:30} {:>5}", truncate_name(&name, 30), count);
        }
    }

    Ok(())
}

pub fn cmd_visits(db: &Database, args: &FilterArgs, limit: Option<usize>) -> Result<()> {
    let state = load_state(db, args)?;
    let view = state.view();

    // The tab picks which channels are listed
    let gas_trips = &view.receipt_report.gas.trips;
    let entries = match view.tab {
        Tab::All => all_visits(&view.receipt_report.visits, &view.online_report.rows, gas_trips),
        Tab::Warehouse => all_visits(&view.receipt_report.visits, &[], &[]),
        Tab::Online => all_visits(&[], &view.online_report.rows, &[]),
        Tab::Gas => all_visits(&[], &[], gas_trips),
    };

    println!();
    println!("🧾 Visits: {}", view.tab);
    print_filter_line(&state);
    println!("   {} entries", entries.len());

    if entries.is_empty() {
        return Ok(());
    }

    println!();
    println!(
        "   {:14} │ {:9} │ {:28} │ {:>8} │ {:>10}",
        "Date", "Channel", "Location", "Items", "Total"
    );
    println!("   ───────────────┼───────────┼──────────────────────────────┼──────────┼───────────");
    let shown = limit.unwrap_or(entries.len());
    for entry in entries.iter().take(shown) {
        let quantity = match (entry.items, entry.gallons) {
            (Some(items), _) => format_number(items),
            (None, Some(gallons)) => format!("{} gal", format_gallons(gallons)),
            (None, None) => String::new(),
        };
        println!(
            "   {:14} │ {:9} │ {:28} │ {:>8} │ {:>10}",
            format_opt_date(entry.date.as_ref()),
            entry.channel.as_str(),
            truncate_name(&entry.location, 28),
            quantity,
            format_money(entry.total)
        );
    }
    if entries.len() > shown {
        println!("   ... and {} more", entries.len() - shown);
    }

    Ok(())
}

pub fn cmd_chart_list(args: &FilterArgs) -> Result<()> {
    let tab: Tab = args.tab.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    println!();
    println!("📈 Charts for tab '{}'", tab);
    for (i, metric) in chart_metrics(tab).iter().enumerate() {
        let default = if i == 0 { " (default)" } else { "" };
        println!("   {:20} {}{}", metric.id, metric.display_label(), default);
    }

    Ok(())
}

pub fn cmd_chart(db: &Database, args: &FilterArgs, metric_id: Option<&str>) -> Result<()> {
    let state = load_state(db, args)?;
    let view = state.view();

    let metric = find_metric(view.tab, metric_id);
    if let Some(id) = metric_id {
        if !metric.id.eq_ignore_ascii_case(id) {
            println!("   ⚠️  Unknown chart '{}' for tab '{}', showing '{}'", id, view.tab, metric.id);
        }
    }

    println!();
    println!("📈 {}", metric.display_label());
    print_filter_line(&state);
    println!("   ─────────────────────────────────────────────");

    let Some(dataset) = metric.build(&view.monthly) else {
        println!("   No data to chart.");
        return Ok(());
    };
    let format = dataset.format();

    match &dataset {
        ChartDataset::Simple(series) => {
            let max = series.values.iter().cloned().fold(0.0_f64, f64::max);
            for (label, value) in series.labels.iter().zip(&series.values) {
                println!(
                    "   {:10} {:>12}  {}",
                    label,
                    format.apply(*value),
                    bar(*value, max)
                );
            }
        }
        ChartDataset::Stacked(stacked) => {
            let totals: Vec<f64> = (0..stacked.labels.len())
                .map(|i| stacked.series.iter().map(|s| s.values.get(i).copied().unwrap_or(0.0)).sum::<f64>())
                .collect();
            let max = totals.iter().cloned().fold(0.0_f64, f64::max);
            for (i, label) in stacked.labels.iter().enumerate() {
                let parts: Vec<String> = stacked
                    .series
                    .iter()
                    .filter_map(|s| {
                        let v = s.values.get(i).copied().unwrap_or(0.0);
                        (v != 0.0).then(|| format!("{} {}", s.label, format.apply(v)))
                    })
                    .collect();
                println!(
                    "   {:10} {:>12}  {}  {}",
                    label,
                    format.apply(totals[i]),
                    bar(totals[i], max),
                    parts.join(", ")
                );
            }
        }
    }

    Ok(())
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let width = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(width.max(1))
}

pub fn cmd_months(db: &Database) -> Result<()> {
    let snapshot = db
        .load_snapshot()
        .context("Failed to load snapshot")?
        .context("No data yet. Run 'clubstat sync' first.")?;
    let options = month_options(&snapshot.receipts, &snapshot.online_orders);

    println!();
    println!("📅 Months with data");
    if options.is_empty() {
        println!("   No dated receipts or orders.");
        return Ok(());
    }
    for option in &options {
        println!("   {:8} {}", option.key, option.label);
    }
    println!();
    println!("   Filter with: clubstat summary --month {}", options[0].key);

    Ok(())
}

pub fn cmd_order(db: &Database, number: &str) -> Result<()> {
    let snapshot = db
        .load_snapshot()
        .context("Failed to load snapshot")?
        .context("No data yet. Run 'clubstat sync' first.")?;
    let number = number.trim();

    let header = snapshot
        .online_orders
        .iter()
        .find(|o| o.order_key() == Some(number));

    println!();
    println!("📦 Order #{}", number);

    match snapshot.order_details.lookup(number) {
        DetailLookup::Found(detail) => print_order_detail(detail),
        DetailLookup::Failed(err) => {
            println!("   ⚠️  Details could not be downloaded ({})", err.kind.as_str());
            println!("   {}", err.message);
        }
        DetailLookup::NotFetched => match header {
            Some(order) => {
                println!("   Details were not downloaded for this order.");
                println!("   Status: {}", order.status.as_deref().unwrap_or("Unknown"));
                println!("   Total:  {}", format_money(order.total_amount()));
                for line in &order.order_line_items {
                    println!(
                        "   • {}",
                        line.item_description.as_deref().unwrap_or("Item")
                    );
                }
            }
            None => bail!("Order {} not found", number),
        },
    }

    Ok(())
}

fn print_order_detail(detail: &OrderDetail) {
    if let Some(status) = &detail.status {
        println!("   Status: {}", status);
    }
    if let Some(placed) = &detail.order_placed_date {
        println!("   Placed: {}", placed);
    }
    println!("   ─────────────────────────────────────────────");
    println!("   {:36} │ {:>5} │ {:>10}", "Item", "Qty", "Total");
    println!("   ─────────────────────────────────────┼───────┼───────────");
    for line in detail.line_items() {
        println!(
            "   {:36} │ {:>5} │ {:>10}",
            truncate_name(line.item_description.as_deref().unwrap_or("Item"), 36),
            format_number(line.quantity_value()),
            format_money(line.line_total())
        );
    }
    println!();

    let amounts = [
        ("Merchandise", detail.merchandise_total),
        ("Delivery fee", detail.retail_delivery_fee),
        ("Shipping", detail.shipping_and_handling),
        ("Grocery surcharge", detail.grocery_surcharge),
        ("Tax", detail.us_tax_total),
        ("Order total", detail.order_total),
    ];
    for (label, amount) in amounts {
        if let Some(amount) = amount {
            println!("   {:20} {:>12}", label, format_money(amount));
        }
    }

    for payment in &detail.order_payment {
        let card = payment
            .card_number
            .as_deref()
            .map(|c| format!(" ending {}", last_four(c)))
            .unwrap_or_default();
        println!(
            "   Paid {} by {}{}",
            format_money(payment.total_charged.unwrap_or(0.0)),
            payment.payment_type.as_deref().unwrap_or("card"),
            card
        );
    }
}

fn last_four(card_number: &str) -> String {
    let digits: Vec<char> = card_number.chars().filter(|c| c.is_ascii_digit()).collect();
    digits[digits.len().saturating_sub(4)..].iter().collect()
}
