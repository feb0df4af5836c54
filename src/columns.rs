//! Column role detection.
//!
//! Picks, for each of the date / sales / product roles, the first column whose
//! name contains one of the role's keywords. ASCII keywords are compared
//! against the lower-cased name; ideographic keywords against the name as
//! written.

use std::fmt;

use serde::Serialize;

use crate::data::{Record, header_columns};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Date,
    Sales,
    Product,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 3] = [ColumnRole::Date, ColumnRole::Sales, ColumnRole::Product];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            ColumnRole::Date => &["日", "date"],
            ColumnRole::Sales => &["売", "金額", "amount", "sales", "total"],
            ColumnRole::Product => &["商", "品", "product", "item", "name"],
        }
    }

    pub fn matches(self, column: &str) -> bool {
        let lowered = column.to_lowercase();
        self.keywords().iter().any(|keyword| {
            if keyword.is_ascii() {
                lowered.contains(keyword)
            } else {
                column.contains(keyword)
            }
        })
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnRole::Date => "date",
            ColumnRole::Sales => "sales",
            ColumnRole::Product => "product",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl RoleMap {
    pub fn get(&self, role: ColumnRole) -> Option<&str> {
        match role {
            ColumnRole::Date => self.date.as_deref(),
            ColumnRole::Sales => self.sales.as_deref(),
            ColumnRole::Product => self.product.as_deref(),
        }
    }

    fn slot(&mut self, role: ColumnRole) -> &mut Option<String> {
        match role {
            ColumnRole::Date => &mut self.date,
            ColumnRole::Sales => &mut self.sales,
            ColumnRole::Product => &mut self.product,
        }
    }

    pub fn len(&self) -> usize {
        ColumnRole::ALL
            .iter()
            .filter(|role| self.get(**role).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves roles from an explicit column list. Once claimed, a role keeps its column.
pub fn detect_roles_from_columns<S: AsRef<str>>(columns: &[S]) -> RoleMap {
    let mut roles = RoleMap::default();
    for column in columns {
        let column = column.as_ref();
        for role in ColumnRole::ALL {
            let slot = roles.slot(role);
            if slot.is_none() && role.matches(column) {
                *slot = Some(column.to_string());
            }
        }
    }
    roles
}

/// Roles come from the first record's columns only.
pub fn detect_roles(records: &[Record]) -> RoleMap {
    detect_roles_from_columns(&header_columns(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    #[test]
    fn detects_japanese_headers() {
        let roles = detect_roles_from_columns(&["日付", "商品", "金額"]);
        assert_eq!(roles.date.as_deref(), Some("日付"));
        assert_eq!(roles.product.as_deref(), Some("商品"));
        assert_eq!(roles.sales.as_deref(), Some("金額"));
    }

    #[test]
    fn ascii_keywords_ignore_case() {
        let roles = detect_roles_from_columns(&["Order Date", "Item", "Total"]);
        assert_eq!(roles.get(ColumnRole::Date), Some("Order Date"));
        assert_eq!(roles.get(ColumnRole::Product), Some("Item"));
        assert_eq!(roles.get(ColumnRole::Sales), Some("Total"));
    }

    #[test]
    fn first_matching_column_wins() {
        let roles = detect_roles_from_columns(&["sales_amount", "total"]);
        assert_eq!(roles.sales.as_deref(), Some("sales_amount"));
    }

    #[test]
    fn one_column_may_claim_several_roles() {
        let roles = detect_roles_from_columns(&["売上日"]);
        assert_eq!(roles.date.as_deref(), Some("売上日"));
        assert_eq!(roles.sales.as_deref(), Some("売上日"));
        assert_eq!(roles.product, None);
        assert_eq!(roles.len(), 2);
    }

    #[test]
    fn unmatched_roles_stay_absent() {
        let roles = detect_roles_from_columns(&["foo", "bar"]);
        assert!(roles.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(detect_roles(&[]).is_empty());
    }

    #[test]
    fn later_rows_do_not_contribute_columns() {
        let first: Record = [("foo", Value::Text("x".into()))].into_iter().collect();
        let second: Record = [("amount", Value::Number(1.0))].into_iter().collect();
        assert!(detect_roles(&[first, second]).is_empty());
    }
}
