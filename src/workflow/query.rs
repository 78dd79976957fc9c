use super::types::DisplayItem;
use std::fmt::Write;

/// Fields requested for every country
pub const COUNTRY_FRAGMENT: &str = "fragment fields on Country {name code population}";

/// Builds the batched country lookup document.
///
/// Each lookup becomes an aliased `getCountriesByCode` field (`country0`,
/// `country1`, ...) spreading the shared fragment. Codes are written as
/// escaped GraphQL string literals.
#[derive(Debug, Default)]
pub struct CountryQueryBuilder {
    selections: String,
    fields: usize,
}

impl CountryQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lookup aliased by its position
    pub fn country_by_code(mut self, code: &str) -> Self {
        // Writing into a String cannot fail
        let _ = write!(self.selections, "country{}: getCountriesByCode(code:", self.fields);
        push_string_literal(&mut self.selections, code);
        self.selections.push_str(") { ...fields } ");
        self.fields += 1;
        self
    }

    pub fn build(self) -> String {
        format!("query{{{}}} {}", self.selections, COUNTRY_FRAGMENT)
    }
}

/// Build one query looking up every display item by code
pub fn build_graphql_query(items: &[DisplayItem]) -> String {
    items
        .iter()
        .fold(CountryQueryBuilder::new(), |builder, item| {
            builder.country_by_code(&item.code)
        })
        .build()
}

/// Quote `value` as a GraphQL string value
fn push_string_literal(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
