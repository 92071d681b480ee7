//! Catalog search query builder.

use std::cmp::Ordering;

use crate::catalog::CatalogItem;
use crate::search::Filter;
use serde::{Deserialize, Serialize};

/// Sort options for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    /// Catalog order.
    #[default]
    Default,
    /// Sort by price, low to high.
    PriceAsc,
    /// Sort by price, high to low.
    PriceDesc,
    /// Sort by highest rated.
    RatingDesc,
    /// Sort by name A-Z.
    NameAsc,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Default => "default",
            SortOption::PriceAsc => "price-asc",
            SortOption::PriceDesc => "price-desc",
            SortOption::RatingDesc => "rating-desc",
            SortOption::NameAsc => "name",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" | "" => Some(SortOption::Default),
            "price-asc" => Some(SortOption::PriceAsc),
            "price-desc" => Some(SortOption::PriceDesc),
            "rating-desc" | "rating" => Some(SortOption::RatingDesc),
            "name" | "name-asc" => Some(SortOption::NameAsc),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SortOption::Default => "Featured",
            SortOption::PriceAsc => "Price: Low to High",
            SortOption::PriceDesc => "Price: High to Low",
            SortOption::RatingDesc => "Highest Rated",
            SortOption::NameAsc => "Name: A-Z",
        }
    }

    /// Compare two items. Ties keep catalog order (the sort is stable).
    fn compare(&self, a: &CatalogItem, b: &CatalogItem) -> Ordering {
        match self {
            SortOption::Default => Ordering::Equal,
            SortOption::PriceAsc => a.unit_price.minor.cmp(&b.unit_price.minor),
            SortOption::PriceDesc => b.unit_price.minor.cmp(&a.unit_price.minor),
            SortOption::RatingDesc => b.rating.total_cmp(&a.rating),
            SortOption::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    }
}

/// A catalog search query.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchQuery {
    /// Filters to apply; an item must pass all of them.
    pub filters: Vec<Filter>,
    /// Sort option.
    pub sort: SortOption,
}

impl SearchQuery {
    /// Create a query that matches everything in catalog order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text query. Blank text is ignored.
    pub fn with_text(mut self, q: impl Into<String>) -> Self {
        let q = q.into();
        if !q.trim().is_empty() {
            self.filters.push(Filter::Text(q.trim().to_string()));
        }
        self
    }

    /// Restrict to a category. "All" is the no-op category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        if !category.trim().is_empty() && !category.eq_ignore_ascii_case("all") {
            self.filters.push(Filter::Category(category));
        }
        self
    }

    /// Add a filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set sort option.
    pub fn with_sort(mut self, sort: SortOption) -> Self {
        self.sort = sort;
        self
    }

    /// Whether `item` passes every filter.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        self.filters.iter().all(|f| f.matches(item))
    }

    /// Filter and sort `items`.
    pub fn apply<'a>(&self, items: impl IntoIterator<Item = &'a CatalogItem>) -> Vec<CatalogItem> {
        let mut results: Vec<CatalogItem> = items
            .into_iter()
            .filter(|item| self.matches(item))
            .cloned()
            .collect();
        results.sort_by(|a, b| self.sort.compare(a, b));
        results
    }
}
