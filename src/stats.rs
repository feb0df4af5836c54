//! Sales statistics over loosely-typed rows.
//!
//! [`compute_statistics()`] is a pure single pass: it resolves column roles
//! from the first record, then accumulates the sales total, per-product totals
//! and a per-day series. Nothing in here can fail; malformed amounts count as
//! zero and rows without a usable date still count towards the totals.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use anyhow::Result;
use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    cli::StatsArgs,
    columns::{RoleMap, detect_roles},
    data::{Record, coerce_amount},
    request, table,
};

pub const TOP_PRODUCT_LIMIT: usize = 5;
const DATE_KEY_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductTotal {
    pub name: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_rows: usize,
    pub total_sales: f64,
    pub avg_row_sales: f64,
    pub top_products: Vec<ProductTotal>,
    pub timeseries: Vec<DailyTotal>,
}

impl Statistics {
    pub fn empty() -> Self {
        Self {
            total_rows: 0,
            total_sales: 0.0,
            avg_row_sales: 0.0,
            top_products: Vec::new(),
            timeseries: Vec::new(),
        }
    }

    pub fn render_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![
            vec!["total_rows".to_string(), self.total_rows.to_string()],
            vec!["total_sales".to_string(), format_number(self.total_sales)],
            vec!["avg_row_sales".to_string(), format_number(self.avg_row_sales)],
        ];
        for (rank, product) in self.top_products.iter().enumerate() {
            rows.push(vec![
                format!("top_product[{}] {}", rank + 1, product.name),
                format_number(product.sales),
            ]);
        }
        for point in &self.timeseries {
            rows.push(vec![format!("day {}", point.date), format_number(point.sales)]);
        }
        rows
    }
}

pub fn execute(args: &StatsArgs) -> Result<()> {
    let records = request::load_records(&args.input, args.delimiter, args.input_encoding.as_deref())?;
    let stats = compute_statistics(&records);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        let headers = vec!["metric".to_string(), "value".to_string()];
        table::print_table(&headers, &stats.render_rows());
    }
    info!(
        "Computed statistics for {} row(s) from {:?}",
        stats.total_rows, args.input
    );
    Ok(())
}

pub fn compute_statistics(records: &[Record]) -> Statistics {
    if records.is_empty() {
        return Statistics::empty();
    }
    let roles = detect_roles(records);
    let mut accumulator = StatsAccumulator::new(roles);
    for record in records {
        accumulator.ingest(record);
    }
    accumulator.finish()
}

/// Normalised day key: trimmed, `/` swapped for `-`, first ten characters.
pub fn date_key(raw: &str) -> String {
    raw.trim()
        .replace('/', "-")
        .chars()
        .take(DATE_KEY_CHARS)
        .collect()
}

struct StatsAccumulator {
    roles: RoleMap,
    rows: usize,
    total_sales: f64,
    product_order: Vec<String>,
    product_totals: HashMap<String, f64>,
    daily: BTreeMap<String, f64>,
}

impl StatsAccumulator {
    fn new(roles: RoleMap) -> Self {
        Self {
            roles,
            rows: 0,
            total_sales: 0.0,
            product_order: Vec::new(),
            product_totals: HashMap::new(),
            daily: BTreeMap::new(),
        }
    }

    fn ingest(&mut self, record: &Record) {
        self.rows += 1;
        let amount = self
            .roles
            .sales
            .as_deref()
            .map(|column| coerce_amount(record.get(column)))
            .unwrap_or(0.0);
        self.total_sales += amount;

        if let Some(column) = self.roles.product.as_deref() {
            let name = record.get(column).as_key().trim().to_string();
            match self.product_totals.get_mut(&name) {
                Some(total) => *total += amount,
                None => {
                    self.product_order.push(name.clone());
                    self.product_totals.insert(name, amount);
                }
            }
        }

        if let Some(column) = self.roles.date.as_deref() {
            let day = date_key(&record.get(column).as_key());
            if !day.is_empty() {
                *self.daily.entry(day).or_insert(0.0) += amount;
            }
        }
    }

    fn finish(self) -> Statistics {
        let avg_row_sales = if self.rows > 0 {
            self.total_sales / self.rows as f64
        } else {
            0.0
        };
        let product_totals = self.product_totals;
        // sorted_by is stable, so equal totals keep first-seen order
        let top_products = self
            .product_order
            .into_iter()
            .map(|name| {
                let sales = product_totals.get(&name).copied().unwrap_or(0.0);
                ProductTotal { name, sales }
            })
            .sorted_by(|a, b| b.sales.partial_cmp(&a.sales).unwrap_or(Ordering::Equal))
            .take(TOP_PRODUCT_LIMIT)
            .collect();
        let timeseries = self
            .daily
            .into_iter()
            .map(|(date, sales)| DailyTotal { date, sales })
            .collect();
        Statistics {
            total_rows: self.rows,
            total_sales: self.total_sales,
            avg_row_sales,
            top_products,
            timeseries,
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}
