//! List filters, ordering and pagination windows.
//!
//! Filters arrive as raw key/value pairs. Only `id` and `order_by` are
//! recognised; anything else rejects the whole request before a query runs.

use ledger_core::{DomainError, DomainResult, FieldErrors};

use crate::validate::BLANK;

/// Entities that can be listed with an `order_by` filter.
pub trait Orderable {
    /// Column names accepted by `order_by` (without the `-` prefix).
    const ORDER_FIELDS: &'static [&'static str];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A validated ordering: a known column plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl OrderBy {
    /// Ascending by id, the default so that pages are stable.
    pub const fn by_id() -> Self {
        Self {
            field: "id",
            direction: SortDirection::Asc,
        }
    }

    /// Resolve `"field"` / `"-field"` against `T`'s orderable columns.
    pub fn resolve<T: Orderable>(raw: &str) -> DomainResult<Self> {
        let (name, direction) = match raw.strip_prefix('-') {
            Some(rest) => (rest, SortDirection::Desc),
            None => (raw, SortDirection::Asc),
        };

        T::ORDER_FIELDS
            .iter()
            .copied()
            .find(|f| *f == name)
            .map(|field| Self { field, direction })
            .ok_or_else(|| DomainError::InvalidOrderField(name.to_string()))
    }
}

impl Default for OrderBy {
    fn default() -> Self {
        Self::by_id()
    }
}

/// Parsed (but not yet entity-checked) list filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilters {
    pub id: Option<i64>,
    pub order_by: Option<String>,
}

impl ListFilters {
    pub const KEYS: &'static [&'static str] = &["id", "order_by"];

    /// Parse raw query pairs. Unknown keys fail first, regardless of the
    /// validity of the known ones; a repeated key keeps its last value.
    pub fn parse<'a, I>(raw: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pairs: Vec<(&str, &str)> = raw.into_iter().collect();

        let mut unknown: Vec<String> = pairs
            .iter()
            .filter(|(k, _)| !Self::KEYS.iter().any(|known| known == k))
            .map(|(k, _)| (*k).to_string())
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            unknown.dedup();
            return Err(DomainError::InvalidFilterField(unknown));
        }

        let mut filters = Self::default();
        let mut errors = FieldErrors::new();
        for (key, value) in pairs {
            match key {
                "id" => match value.trim().parse::<i64>() {
                    Ok(id) => filters.id = Some(id),
                    Err(_) => errors.add("id", "A valid integer is required."),
                },
                _ if value.trim().is_empty() => errors.add("order_by", BLANK),
                _ => filters.order_by = Some(value.to_string()),
            }
        }
        errors.into_result()?;

        Ok(filters)
    }

    /// Check `order_by` against `T` and produce a query.
    pub fn resolve<T: Orderable>(self) -> DomainResult<ListQuery> {
        let order = match self.order_by.as_deref() {
            Some(raw) => OrderBy::resolve::<T>(raw)?,
            None => OrderBy::by_id(),
        };

        Ok(ListQuery { id: self.id, order })
    }
}

/// A fully validated list query for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub id: Option<i64>,
    pub order: OrderBy,
}

/// Limit/offset window over a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// A zero or missing limit falls back to the default; large ones are capped.
    pub fn new(limit: Option<u32>, offset: Option<u64>) -> Self {
        let limit = match limit {
            Some(0) | None => Self::DEFAULT_LIMIT,
            Some(l) => l.min(Self::MAX_LIMIT),
        };
        Self {
            limit,
            offset: offset.unwrap_or(0),
        }
    }

    /// Window covering every row (internal callers that need the full list).
    pub const fn all() -> Self {
        Self {
            limit: u32::MAX,
            offset: 0,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One window of a list plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub count: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            count: 0,
            items: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
