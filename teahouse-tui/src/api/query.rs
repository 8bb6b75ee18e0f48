//! Record-store queries: equality and case-insensitive substring filters,
//! ordering and a row limit. Rendered to PostgREST query parameters by the
//! HTTP client and evaluated directly by the in-memory backend.

use std::fmt;

/// Logical collections in the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    Posts,
    Comments,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Posts => "posts",
            Table::Comments => "comments",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: &'static str, value: String },
    /// Case-insensitive LIKE pattern (`%` and `_` wildcards)
    ILike { column: &'static str, pattern: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq {
            column,
            value: value.to_string(),
        });
        self
    }

    /// Substring match; the term is escaped so user input cannot add wildcards
    pub fn contains(mut self, column: &'static str, term: &str) -> Self {
        self.filters.push(Filter::ILike {
            column,
            pattern: format!("%{}%", escape_like(term)),
        });
        self
    }

    pub fn order(mut self, column: &'static str, ascending: bool) -> Self {
        self.order.push(Order { column, ascending });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query parameters, excluding `select`. Nulls sort last in
    /// either direction.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        for filter in &self.filters {
            match filter {
                Filter::Eq { column, value } => {
                    params.push((column.to_string(), format!("eq.{}", value)));
                }
                Filter::ILike { column, pattern } => {
                    params.push((column.to_string(), format!("ilike.{}", pattern)));
                }
            }
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| {
                    let direction = if o.ascending { "asc" } else { "desc" };
                    format!("{}.{}.nullslast", o.column, direction)
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }
}

/// Escape LIKE wildcards in user input
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Case-insensitive LIKE evaluation, used by the in-memory backend
pub fn like_matches(pattern: &str, value: &str) -> bool {
    #[derive(Debug, PartialEq)]
    enum Tok {
        Any,
        One,
        Lit(char),
    }

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    tokens.extend(next.to_lowercase().map(Tok::Lit));
                }
            }
            '%' => tokens.push(Tok::Any),
            '_' => tokens.push(Tok::One),
            other => tokens.extend(other.to_lowercase().map(Tok::Lit)),
        }
    }

    let value: Vec<char> = value.chars().flat_map(|c| c.to_lowercase()).collect();

    // dp[i][j]: tokens[..i] matches value[..j]
    let mut dp = vec![vec![false; value.len() + 1]; tokens.len() + 1];
    dp[0][0] = true;
    for i in 1..=tokens.len() {
        for j in 0..=value.len() {
            dp[i][j] = match &tokens[i - 1] {
                Tok::Any => dp[i - 1][j] || (j > 0 && dp[i][j - 1]),
                Tok::One => j > 0 && dp[i - 1][j - 1],
                Tok::Lit(c) => j > 0 && dp[i - 1][j - 1] && value[j - 1] == *c,
            };
        }
    }
    dp[tokens.len()][value.len()]
}
