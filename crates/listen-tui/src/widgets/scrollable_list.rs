//! Scrollable, filterable list that keeps its selection by item key.
//!
//! Items are replaced wholesale (every poll delivers a fresh list), so the
//! selection is tracked by a stable key rather than by position.

pub struct ScrollableList<T> {
    items: Vec<T>,
    filtered_indices: Vec<usize>,
    selected: usize,
    scroll_offset: usize,
    filter: String,
    filter_fn: Box<dyn Fn(&T, &str) -> bool + Send + Sync>,
    key_fn: Box<dyn Fn(&T) -> String + Send + Sync>,
}

impl<T> ScrollableList<T> {
    pub fn new(
        key_fn: impl Fn(&T) -> String + Send + Sync + 'static,
        filter_fn: impl Fn(&T, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            items: Vec::new(),
            filtered_indices: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            filter: String::new(),
            filter_fn: Box::new(filter_fn),
            key_fn: Box::new(key_fn),
        }
    }

    /// Replace all items. The selected item stays selected if its key is
    /// still present; otherwise the cursor stays at the same row.
    pub fn set_items(&mut self, items: Vec<T>) {
        let key = self.selected_key();
        self.items = items;
        self.rebuild_filter();
        if let Some(key) = key {
            self.select_key(&key);
        }
    }

    pub fn set_filter(&mut self, query: &str) {
        let key = self.selected_key();
        self.filter = query.to_string();
        self.rebuild_filter();
        self.scroll_offset = 0;
        match key {
            Some(key) if self.select_key(&key) => {}
            _ => self.selected = 0,
        }
    }

    fn rebuild_filter(&mut self) {
        let query = self.filter.trim();
        self.filtered_indices = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| query.is_empty() || (self.filter_fn)(item, query))
            .map(|(i, _)| i)
            .collect();
        if self.selected >= self.filtered_indices.len() {
            self.selected = self.filtered_indices.len().saturating_sub(1);
        }
    }

    fn selected_key(&self) -> Option<String> {
        self.selected_item().map(|item| (self.key_fn)(item))
    }

    /// Move the cursor to the visible item with `key`. Returns false if it is
    /// filtered out or absent.
    pub fn select_key(&mut self, key: &str) -> bool {
        let found = self
            .filtered_indices
            .iter()
            .position(|&i| (self.key_fn)(&self.items[i]) == key);
        if let Some(pos) = found {
            self.selected = pos;
        }
        found.is_some()
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        self.selected = (self.selected + n).min(self.filtered_indices.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.filtered_indices.len().saturating_sub(1);
    }

    pub fn selected_item(&self) -> Option<&T> {
        let idx = self.filtered_indices.get(self.selected)?;
        self.items.get(*idx)
    }

    /// Items visible in `height` rows. Call `ensure_visible` first.
    pub fn visible_items(&self, height: usize) -> Vec<&T> {
        if height == 0 || self.filtered_indices.is_empty() {
            return Vec::new();
        }
        let end = (self.scroll_offset + height).min(self.filtered_indices.len());
        self.filtered_indices[self.scroll_offset.min(end)..end]
            .iter()
            .map(|&i| &self.items[i])
            .collect()
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    /// Select the item at `row` of the rendered area. Returns true on a hit.
    pub fn handle_click(&mut self, row: usize) -> bool {
        let target = self.scroll_offset + row;
        if target < self.filtered_indices.len() {
            self.selected = target;
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.filtered_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered_indices.is_empty()
    }

    pub fn total_len(&self) -> usize {
        self.items.len()
    }

    pub fn selected_in_view(&self, height: usize) -> usize {
        self.selected
            .saturating_sub(self.scroll_offset)
            .min(height.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> ScrollableList<String> {
        let mut l = ScrollableList::new(|s: &String| s.clone(), |s: &String, q: &str| s.contains(q));
        l.set_items(items.iter().map(|s| s.to_string()).collect());
        l
    }

    fn selected(l: &ScrollableList<String>) -> Option<&str> {
        l.selected_item().map(|s| s.as_str())
    }

    #[test]
    fn test_selection_follows_key_across_reorder() {
        let mut l = list(&["alice", "bob", "carol"]);
        l.select_down(1);
        assert_eq!(selected(&l), Some("bob"));

        l.set_items(vec!["bob".into(), "carol".into(), "alice".into()]);
        assert_eq!(selected(&l), Some("bob"));
    }

    #[test]
    fn test_selection_clamps_when_item_disappears() {
        let mut l = list(&["alice", "bob", "carol"]);
        l.select_last();
        l.set_items(vec!["alice".into()]);
        assert_eq!(selected(&l), Some("alice"));

        l.set_items(Vec::new());
        assert_eq!(selected(&l), None);
        assert!(l.is_empty());
    }

    #[test]
    fn test_filter_keeps_selection_when_it_matches() {
        let mut l = list(&["alice", "bob", "bobby"]);
        l.select_last();
        l.set_filter("bob");
        assert_eq!(l.len(), 2);
        assert_eq!(selected(&l), Some("bobby"));

        l.set_filter("ali");
        assert_eq!(selected(&l), Some("alice"));

        l.set_filter("");
        assert_eq!(l.len(), 3);
        assert_eq!(l.total_len(), 3);
    }

    #[test]
    fn test_scrolling_window() {
        let mut l = list(&["a", "b", "c", "d", "e"]);
        l.select_last();
        l.ensure_visible(2);
        let visible: Vec<&str> = l.visible_items(2).iter().map(|s| s.as_str()).collect();
        assert_eq!(visible, vec!["d", "e"]);
        assert_eq!(l.selected_in_view(2), 1);

        assert!(l.handle_click(0));
        assert_eq!(selected(&l), Some("d"));
        assert!(!l.handle_click(5));
    }
}
