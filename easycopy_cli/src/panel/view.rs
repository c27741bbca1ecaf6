//! Filtered view over the exchanges a panel knows about

use easycopy_common::CapturedExchange;

/// Panel filter; reset whenever a panel is activated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterState {
    pub errors_only: bool,
}

impl FilterState {
    pub fn passes(&self, exchange: &CapturedExchange) -> bool {
        !self.errors_only || exchange.is_error()
    }
}

/// Indices of the exchanges that pass `filter`, in input order
pub fn apply_filter(exchanges: &[CapturedExchange], filter: FilterState) -> Vec<usize> {
    exchanges
        .iter()
        .enumerate()
        .filter(|(_, e)| filter.passes(e))
        .map(|(i, _)| i)
        .collect()
}

/// Full local history plus the rows currently visible in the table
#[derive(Debug, Default)]
pub struct PanelView {
    history: Vec<CapturedExchange>,
    rows: Vec<usize>,
    filter: FilterState,
    selected: usize,
}

impl PanelView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the replayed backlog to history and rebuild the rows
    pub fn load_backlog(&mut self, exchanges: Vec<CapturedExchange>) {
        self.history.extend(exchanges);
        self.rebuild();
    }

    /// Add one live exchange; returns whether it became a visible row
    pub fn push_live(&mut self, exchange: CapturedExchange) -> bool {
        let visible = self.filter.passes(&exchange);
        self.history.push(exchange);
        if visible {
            self.rows.push(self.history.len() - 1);
        }
        visible
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn set_errors_only(&mut self, errors_only: bool) {
        self.filter.errors_only = errors_only;
        self.rebuild();
    }

    pub fn toggle_errors_only(&mut self) {
        self.set_errors_only(!self.filter.errors_only);
    }

    /// Derive the rows from scratch out of the whole history
    fn rebuild(&mut self) {
        self.rows = apply_filter(&self.history, self.filter);
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    pub fn rows(&self) -> impl Iterator<Item = &CapturedExchange> {
        self.rows.iter().map(|&i| &self.history[i])
    }

    pub fn row(&self, index: usize) -> Option<&CapturedExchange> {
        self.rows.get(index).map(|&i| &self.history[i])
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_exchange(&self) -> Option<&CapturedExchange> {
        self.row(self.selected)
    }

    /// History index of the selected row
    pub fn selected_index(&self) -> Option<usize> {
        self.rows.get(self.selected).copied()
    }

    /// Row currently showing the exchange at `index` in history, if visible
    pub fn row_of(&self, index: usize) -> Option<usize> {
        // Rows are built in history order
        self.rows.binary_search(&index).ok()
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected < self.rows.len().saturating_sub(1) {
            self.selected += 1;
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(path: &str, status: u16) -> CapturedExchange {
        CapturedExchange::new("GET", format!("https://a.test/{}", path), status, "")
    }

    fn urls<'a>(rows: impl Iterator<Item = &'a CapturedExchange>) -> Vec<String> {
        rows.map(|e| e.url.clone()).collect()
    }

    fn sample() -> Vec<CapturedExchange> {
        vec![
            exchange("ok", 200),
            exchange("missing", 404),
            exchange("redirect", 302),
            exchange("boom", 500),
        ]
    }

    #[test]
    fn test_errors_only_filter() {
        let ok = exchange("ok", 200);
        let missing = exchange("missing", 404);
        let errors_only = FilterState { errors_only: true };

        assert!(errors_only.passes(&missing));
        assert!(!errors_only.passes(&ok));
        assert!(FilterState::default().passes(&ok));
        assert!(FilterState::default().passes(&missing));
    }

    #[test]
    fn test_apply_filter_preserves_order_and_is_idempotent() {
        let all = sample();
        let filter = FilterState { errors_only: true };

        let first = apply_filter(&all, filter);
        let second = apply_filter(&all, filter);
        assert_eq!(urls(first.iter().map(|&i| &all[i])), vec!["https://a.test/missing", "https://a.test/boom"]);
        assert_eq!(first, second);

        assert_eq!(apply_filter(&all, FilterState::default()).len(), 4);
    }

    #[test]
    fn test_toggle_rebuilds_from_history() {
        let mut view = PanelView::new();
        view.load_backlog(sample());
        let unfiltered = urls(view.rows());

        view.set_errors_only(true);
        let errors = urls(view.rows());
        assert_eq!(errors.len(), 2);

        view.toggle_errors_only();
        assert_eq!(urls(view.rows()), unfiltered);
        view.toggle_errors_only();
        assert_eq!(urls(view.rows()), errors);
    }

    #[test]
    fn test_live_exchange_appends_only_when_visible() {
        let mut view = PanelView::new();
        view.set_errors_only(true);
        view.load_backlog(sample());

        assert!(!view.push_live(exchange("fine", 204)));
        assert!(view.push_live(exchange("denied", 403)));

        assert_eq!(view.history_len(), 6);
        assert_eq!(view.row_count(), 3);
        assert_eq!(view.row(2).unwrap().url, "https://a.test/denied");

        // Hidden live exchanges come back once the filter is lifted
        view.set_errors_only(false);
        assert_eq!(view.row_count(), 6);
        assert_eq!(view.row(4).unwrap().url, "https://a.test/fine");
    }

    #[test]
    fn test_selection_clamps_after_rebuild() {
        let mut view = PanelView::new();
        view.load_backlog(sample());
        view.select_last();
        assert_eq!(view.selected(), 3);

        view.set_errors_only(true);
        assert_eq!(view.selected(), 1);
        assert_eq!(view.selected_exchange().unwrap().status, 500);

        view.select_next();
        assert_eq!(view.selected(), 1);
        view.select_first();
        view.select_previous();
        assert_eq!(view.selected(), 0);
    }

    #[test]
    fn test_history_index_follows_rebuilds() {
        let mut view = PanelView::new();
        view.load_backlog(sample());
        view.select_last();
        assert_eq!(view.selected_index(), Some(3));
        assert_eq!(view.row_of(3), Some(3));

        view.set_errors_only(true);
        assert_eq!(view.row_of(3), Some(1));
        assert_eq!(view.row_of(0), None);
    }

    #[test]
    fn test_empty_view() {
        let mut view = PanelView::new();
        view.select_next();
        assert_eq!(view.selected(), 0);
        assert!(view.selected_exchange().is_none());
        assert!(view.selected_index().is_none());
    }
}
