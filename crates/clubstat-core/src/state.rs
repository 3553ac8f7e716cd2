//! Application state: the raw snapshot, the active filter and the derived view
//!
//! [`AppState::set_data`] and [`AppState::set_filter`] are the only ways to
//! change what is shown. Each rebuilds a fresh [`DashboardView`] from the raw
//! records; nothing derived is patched in place.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::filter::{
    combined_bounds, filter_online_orders, filter_receipts, month_options, reconcile_month,
    FilterState, MonthOption,
};
use crate::models::{OnlineOrder, Receipt, Snapshot};
use crate::report::{
    item_stats_for_tab, process_online_orders, process_receipts, DateBounds, Highlights,
    ItemStats, Leaderboards, MonthlyData, OnlineReport, ReceiptReport, Tab, TabSummary,
    LEADERBOARD_SIZE,
};

/// Everything a renderer needs for one filter + tab combination
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub tab: Tab,
    pub filter: FilterState,
    pub receipts: Vec<Receipt>,
    pub online_orders: Vec<OnlineOrder>,
    pub receipt_report: ReceiptReport,
    pub online_report: OnlineReport,
    pub item_stats: ItemStats,
    pub leaderboards: Leaderboards,
    pub monthly: MonthlyData,
    pub summary: TabSummary,
    pub highlights: Highlights,
    /// Offered from the unfiltered data
    pub month_options: Vec<MonthOption>,
    /// Unfiltered date bounds
    pub bounds: DateBounds,
    /// Milliseconds since the Unix epoch
    pub updated_at: Option<i64>,
}

impl DashboardView {
    /// Filter the raw snapshot and run every aggregation
    pub fn build(snapshot: &Snapshot, filter: &FilterState, tab: Tab, now: NaiveDateTime) -> Self {
        let receipts = filter_receipts(&snapshot.receipts, filter, now);
        let online_orders = filter_online_orders(&snapshot.online_orders, filter, now);
        debug!(
            "Filter kept {}/{} receipts, {}/{} online orders",
            receipts.len(),
            snapshot.receipts.len(),
            online_orders.len(),
            snapshot.online_orders.len()
        );

        let receipt_report = process_receipts(&receipts);
        let online_report = process_online_orders(&online_orders, &snapshot.order_details);
        let monthly = MonthlyData::build(
            &receipt_report.monthly,
            &online_report.monthly,
            &receipt_report.gas.monthly,
        );
        let highlights = Highlights::build(&receipt_report, &online_report, &monthly);

        let mut view = Self {
            tab,
            filter: filter.clone(),
            month_options: month_options(&snapshot.receipts, &snapshot.online_orders),
            bounds: combined_bounds(&snapshot.receipts, &snapshot.online_orders),
            updated_at: snapshot.updated_at,
            receipts,
            online_orders,
            receipt_report,
            online_report,
            monthly,
            highlights,
            ..Default::default()
        };
        view.select_tab(tab, snapshot);
        view
    }

    /// Rebuild only what depends on the tab
    fn select_tab(&mut self, tab: Tab, snapshot: &Snapshot) {
        self.tab = tab;
        self.item_stats = item_stats_for_tab(
            tab,
            &self.receipt_report.item_stats,
            &self.online_orders,
            &snapshot.order_details,
        );
        self.leaderboards = Leaderboards::build(&self.item_stats, LEADERBOARD_SIZE);
        self.summary = TabSummary::build(tab, &self.receipt_report, &self.online_report);
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty() && self.online_orders.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    snapshot: Snapshot,
    filter: FilterState,
    view: DashboardView,
    rendered_at: NaiveDateTime,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    /// Replace the raw data wholesale
    ///
    /// Unset custom dates are seeded from the data bounds and a month
    /// selection that no longer exists is cleared.
    pub fn set_data(&mut self, snapshot: Snapshot, now: NaiveDateTime) -> &DashboardView {
        let bounds = combined_bounds(&snapshot.receipts, &snapshot.online_orders);
        if self.filter.custom_start.is_none() {
            self.filter.custom_start = bounds.start.map(|d| d.date());
        }
        if self.filter.custom_end.is_none() {
            self.filter.custom_end = bounds.end.map(|d| d.date());
        }

        let options = month_options(&snapshot.receipts, &snapshot.online_orders);
        self.filter.month = reconcile_month(self.filter.month.as_deref(), &options);

        self.snapshot = snapshot;
        self.render(now)
    }

    pub fn set_filter(&mut self, filter: FilterState, now: NaiveDateTime) -> &DashboardView {
        self.filter = filter;
        self.render(now)
    }

    pub fn set_tab(&mut self, tab: Tab) -> &DashboardView {
        self.view.select_tab(tab, &self.snapshot);
        &self.view
    }

    fn render(&mut self, now: NaiveDateTime) -> &DashboardView {
        self.rendered_at = now;
        self.view = DashboardView::build(&self.snapshot, &self.filter, self.view.tab, now);
        &self.view
    }

    /// Rebuild the view as of `now` with the current data and filter
    pub fn refresh(&mut self, now: NaiveDateTime) -> &DashboardView {
        self.render(now)
    }

    /// When the current view was last built
    pub fn rendered_at(&self) -> NaiveDateTime {
        self.rendered_at
    }
}
