use serde::{Deserialize, Serialize};

/// Cell values spreadsheets and dataframe exports emit for "no value".
const NOT_A_VALUE_MARKERS: &[&str] = &["nan"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionQuery {
    pub venue_name: Option<String>,
    pub city: Option<String>,
}

impl ResolutionQuery {
    pub fn new(venue_name: Option<&str>, city: Option<&str>) -> Self {
        Self {
            venue_name: venue_name.map(str::to_string),
            city: city.map(str::to_string),
        }
    }
}

/// A query with cleaned fields and the single text string every tier sends upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub text: String,
    pub venue_name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryShape {
    Skip,
    Lookup(NormalizedQuery),
}

/// Trims a raw cell, mapping blanks and placeholder markers to `None`.
pub fn clean_cell(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if NOT_A_VALUE_MARKERS
        .iter()
        .any(|marker| trimmed.eq_ignore_ascii_case(marker))
    {
        return None;
    }
    Some(trimmed.to_string())
}

/// Builds `"<venue>, <city>"` from whichever fields survive cleaning.
pub fn normalize(query: &ResolutionQuery) -> QueryShape {
    let venue_name = clean_cell(query.venue_name.as_deref());
    let city = clean_cell(query.city.as_deref());

    let text = [venue_name.as_deref(), city.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

    if text.is_empty() {
        return QueryShape::Skip;
    }

    QueryShape::Lookup(NormalizedQuery {
        text,
        venue_name,
        city,
    })
}
