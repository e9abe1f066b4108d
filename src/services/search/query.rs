use serde::{Deserialize, Serialize};

/// Indexed text fields of a book document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Isbn,
    Author,
    Genre,
    Summary,
    Bio,
}

impl SearchField {
    pub const ALL: [SearchField; 6] = [
        SearchField::Title,
        SearchField::Isbn,
        SearchField::Author,
        SearchField::Genre,
        SearchField::Summary,
        SearchField::Bio,
    ];

    /// Field name in the index document.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Isbn => "isbn",
            SearchField::Author => "author",
            SearchField::Genre => "genre",
            SearchField::Summary => "summary",
            SearchField::Bio => "bio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOp {
    /// Case-insensitive substring match.
    Contains,
    /// Case-insensitive whole-value match.
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: SearchField,
    pub op: MatchOp,
    pub value: String,
}

impl Predicate {
    pub fn contains(field: SearchField, value: &str) -> Self {
        Self {
            field,
            op: MatchOp::Contains,
            value: value.to_string(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        let value = self.value.to_lowercase();
        match self.op {
            MatchOp::Contains => text.contains(&value),
            MatchOp::Exact => text == value,
        }
    }
}

/// Predicate tree handed to an index backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchQuery {
    Match(Predicate),
    Any(Vec<SearchQuery>),
    All(Vec<SearchQuery>),
}

impl SearchQuery {
    /// The catalog search: `text` contained in any indexed field.
    pub fn catalog_text(text: &str) -> Self {
        SearchQuery::Any(
            SearchField::ALL
                .iter()
                .map(|field| SearchQuery::Match(Predicate::contains(*field, text)))
                .collect(),
        )
    }

    /// Evaluate against a document, `field_value` returning the text of a field.
    ///
    /// An empty `Any` matches nothing and an empty `All` matches everything.
    pub fn evaluate<F>(&self, field_value: &F) -> bool
    where
        F: Fn(SearchField) -> String,
    {
        match self {
            SearchQuery::Match(predicate) => predicate.matches(&field_value(predicate.field)),
            SearchQuery::Any(queries) => queries.iter().any(|q| q.evaluate(field_value)),
            SearchQuery::All(queries) => queries.iter().all(|q| q.evaluate(field_value)),
        }
    }
}
