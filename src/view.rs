//! Filtered and sorted projection of the product collection.
use std::cmp::Ordering;
use std::fmt;

use crate::model::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Id,
    Name,
    Price,
    Quantity,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Price => "price",
            SortField::Quantity => "quantity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Some(SortField::Id),
            "name" => Some(SortField::Name),
            "price" => Some(SortField::Price),
            "quantity" | "qty" => Some(SortField::Quantity),
            _ => None,
        }
    }

    fn is_numeric(&self) -> bool {
        !matches!(self, SortField::Name)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        }
    }
}

/// Filter text plus sort selection. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewQuery {
    pub filter: String,
    pub sort_field: SortField,
    pub direction: SortDirection,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            filter: String::new(),
            sort_field: SortField::Id,
            direction: SortDirection::Asc,
        }
    }
}

impl ViewQuery {
    /// Header click: the active column flips direction, any other column
    /// becomes active in ascending order.
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.direction = self.direction.flipped();
        } else {
            self.sort_field = field;
            self.direction = SortDirection::Asc;
        }
    }
}

/// Case-insensitive substring match against id, name or description.
/// Blank filter text matches everything.
pub fn matches(product: &Product, filter: &str) -> bool {
    let q = filter.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    product.id.to_string().contains(&q)
        || product.name.to_lowercase().contains(&q)
        || product.description.to_lowercase().contains(&q)
}

fn numeric_key(product: &Product, field: SortField) -> f64 {
    match field {
        SortField::Id => product.id as f64,
        SortField::Price => product.price,
        SortField::Quantity => product.quantity as f64,
        SortField::Name => 0.0,
    }
}

/// Ascending comparator for `field`; callers swap operands for descending.
pub fn compare(a: &Product, b: &Product, field: SortField) -> Ordering {
    if field.is_numeric() {
        numeric_key(a, field)
            .partial_cmp(&numeric_key(b, field))
            .unwrap_or(Ordering::Equal)
    } else {
        collate(&a.name, &b.name)
    }
}

// Lowercased comparison by scalar value; no locale tables are available here.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Pure filter + sort over the current collection.
pub fn derive(products: &[Product], query: &ViewQuery) -> Vec<Product> {
    let mut rows: Vec<Product> = products
        .iter()
        .filter(|p| matches(p, &query.filter))
        .cloned()
        .collect();
    match query.direction {
        SortDirection::Asc => rows.sort_by(|a, b| compare(a, b, query.sort_field)),
        SortDirection::Desc => rows.sort_by(|a, b| compare(b, a, query.sort_field)),
    }
    rows
}

/// Memo for `derive`, keyed on the collection revision and the query.
/// A new collection snapshot must come with a new revision.
#[derive(Debug, Default)]
pub struct ViewCache {
    key: Option<(u64, ViewQuery)>,
    rows: Vec<Product>,
}

impl ViewCache {
    pub fn get(&mut self, revision: u64, products: &[Product], query: &ViewQuery) -> &[Product] {
        let hit = matches!(&self.key, Some((rev, q)) if *rev == revision && q == query);
        if !hit {
            self.rows = derive(products, query);
            self.key = Some((revision, query.clone()));
        }
        &self.rows
    }
}

/// What the product table shows.
#[derive(Debug, Clone, PartialEq)]
pub enum TableState {
    Loading,
    Empty,
    Rows(Vec<Product>),
}
