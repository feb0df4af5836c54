//! Business-domain classification of a tabular dataset.
//!
//! Scoring runs in two phases. The structural phase looks for keywords in the
//! column names (substring containment over a lower-cased plus original-case
//! haystack, so `employee` will also light up the financial `pl` keyword).
//! The value phase inspects the first sample row for recognisable value
//! shapes. The category with the strictly highest score wins; ties go to the
//! earlier category in [`Category::ALL`], and an all-zero vector falls back to
//! [`Category::Financial`].
//!
//! Keyword rules live in [`KEYWORD_RULES`] so the taxonomy can grow without
//! touching the scoring code.

use std::{fmt, str::FromStr, sync::OnceLock};

use anyhow::{Result, anyhow};
use log::{debug, info};
use regex::Regex;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    cli::ClassifyArgs,
    data::{Record, header_columns},
    request, table,
};

pub const CLASSIFY_SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    HumanResources,
    Marketing,
    Sales,
    Inventory,
    Customer,
    Financial,
}

impl Category {
    /// Scoring and tie-break order.
    pub const ALL: [Category; 6] = [
        Category::HumanResources,
        Category::Marketing,
        Category::Sales,
        Category::Inventory,
        Category::Customer,
        Category::Financial,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::HumanResources => "hr_data",
            Category::Marketing => "marketing_data",
            Category::Sales => "sales_data",
            Category::Inventory => "inventory_data",
            Category::Customer => "customer_data",
            Category::Financial => "financial_data",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Category::HumanResources => "人事データ",
            Category::Marketing => "マーケティングデータ",
            Category::Sales => "売上データ",
            Category::Inventory => "在庫データ",
            Category::Customer => "顧客データ",
            Category::Financial => "財務データ",
        }
    }

    fn index(self) -> usize {
        Category::ALL
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or(Category::ALL.len() - 1)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| anyhow!("Unknown data category '{s}'"))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub category: Category,
    pub keyword: &'static str,
    pub weight: u32,
}

const fn rule(category: Category, keyword: &'static str, weight: u32) -> KeywordRule {
    KeywordRule {
        category,
        keyword,
        weight,
    }
}

use Category::{Customer, Financial, HumanResources as Hr, Inventory, Marketing, Sales};

/// Column-name keywords. Weight 3 marks a strong signal, 1–2 a secondary one.
pub static KEYWORD_RULES: &[KeywordRule] = &[
    rule(Hr, "社員id", 3),
    rule(Hr, "employee", 3),
    rule(Hr, "氏名", 3),
    rule(Hr, "部署", 3),
    rule(Hr, "給与", 3),
    rule(Hr, "salary", 3),
    rule(Hr, "賞与", 3),
    rule(Hr, "年収", 3),
    rule(Hr, "評価", 3),
    rule(Hr, "performance", 3),
    rule(Hr, "残業", 3),
    rule(Hr, "overtime", 3),
    rule(Hr, "有給", 3),
    rule(Hr, "離職", 3),
    rule(Hr, "昇進", 3),
    rule(Hr, "スキル", 3),
    rule(Hr, "チーム貢献", 3),
    rule(Hr, "人事", 3),
    rule(Hr, "勤怠", 2),
    rule(Hr, "attendance", 2),
    rule(Hr, "研修", 2),
    rule(Hr, "training", 2),
    rule(Hr, "目標達成", 2),
    rule(Hr, "職位", 2),
    rule(Hr, "入社", 2),
    rule(Hr, "年齢", 2),
    rule(Marketing, "キャンペーン", 3),
    rule(Marketing, "campaign", 3),
    rule(Marketing, "roi", 3),
    rule(Marketing, "インプレッション", 3),
    rule(Marketing, "impression", 3),
    rule(Marketing, "クリック", 3),
    rule(Marketing, "click", 3),
    rule(Marketing, "cv数", 3),
    rule(Marketing, "conversion", 3),
    rule(Marketing, "顧客獲得", 3),
    rule(Marketing, "cac", 3),
    rule(Marketing, "roas", 3),
    rule(Marketing, "広告", 3),
    rule(Marketing, "媒体", 3),
    rule(Marketing, "ターゲット", 3),
    rule(Marketing, "予算", 1),
    rule(Marketing, "budget", 1),
    rule(Marketing, "支出", 1),
    rule(Marketing, "cost", 1),
    rule(Marketing, "facebook", 1),
    rule(Marketing, "google", 1),
    rule(Marketing, "youtube", 1),
    rule(Marketing, "instagram", 1),
    rule(Marketing, "tiktok", 1),
    rule(Marketing, "twitter", 1),
    rule(Sales, "売上", 3),
    rule(Sales, "sales", 3),
    rule(Sales, "revenue", 3),
    rule(Sales, "商品", 3),
    rule(Sales, "product", 3),
    rule(Sales, "顧客", 3),
    rule(Sales, "customer", 3),
    rule(Sales, "金額", 3),
    rule(Sales, "amount", 3),
    rule(Sales, "単価", 3),
    rule(Sales, "price", 3),
    rule(Sales, "数量", 3),
    rule(Sales, "quantity", 3),
    rule(Sales, "日付", 1),
    rule(Sales, "date", 1),
    rule(Sales, "店舗", 1),
    rule(Sales, "store", 1),
    rule(Sales, "地域", 1),
    rule(Sales, "region", 1),
    rule(Sales, "カテゴリ", 1),
    rule(Sales, "category", 1),
    rule(Inventory, "在庫", 3),
    rule(Inventory, "inventory", 3),
    rule(Inventory, "stock", 3),
    rule(Inventory, "sku", 3),
    rule(Inventory, "倉庫", 3),
    rule(Inventory, "warehouse", 3),
    rule(Inventory, "入庫", 3),
    rule(Inventory, "出庫", 3),
    rule(Inventory, "棚卸", 3),
    rule(Inventory, "発注点", 3),
    rule(Inventory, "reorder", 3),
    rule(Inventory, "ロット", 2),
    rule(Inventory, "保管", 2),
    rule(Inventory, "仕入", 2),
    rule(Inventory, "supplier", 2),
    rule(Inventory, "単位", 1),
    rule(Inventory, "unit", 1),
    rule(Customer, "顧客id", 3),
    rule(Customer, "customer_id", 3),
    rule(Customer, "ltv", 3),
    rule(Customer, "churn", 3),
    rule(Customer, "解約", 3),
    rule(Customer, "会員", 3),
    rule(Customer, "member", 3),
    rule(Customer, "rfm", 3),
    rule(Customer, "nps", 3),
    rule(Customer, "性別", 2),
    rule(Customer, "gender", 2),
    rule(Customer, "年代", 2),
    rule(Customer, "メール", 2),
    rule(Customer, "email", 2),
    rule(Customer, "購入回数", 2),
    rule(Customer, "セグメント", 2),
    rule(Customer, "segment", 2),
    rule(Customer, "loyalty", 1),
    rule(Customer, "居住", 1),
    rule(Financial, "売上高", 3),
    rule(Financial, "revenue", 3),
    rule(Financial, "利益", 3),
    rule(Financial, "profit", 3),
    rule(Financial, "資産", 3),
    rule(Financial, "asset", 3),
    rule(Financial, "負債", 3),
    rule(Financial, "liability", 3),
    rule(Financial, "キャッシュ", 3),
    rule(Financial, "cash", 3),
    rule(Financial, "損益", 3),
    rule(Financial, "pl", 3),
    rule(Financial, "貸借", 3),
    rule(Financial, "bs", 3),
];

const DEPARTMENT_TOKENS: &[&str] = &["営業部", "it部", "人事部", "財務部", "マーケティング部"];
const TITLE_TOKENS: &[&str] = &["主任", "係長", "一般", "部長", "課長"];
const RISK_LEVEL_TOKENS: &[&str] = &["低", "中", "高"];
const AD_PLATFORM_TOKENS: &[&str] = &[
    "google広告",
    "facebook広告",
    "youtube広告",
    "instagram広告",
    "line広告",
    "tiktok広告",
];
const RATE_METRIC_KEYS: &[&str] = &["roi", "達成率", "満足度", "ctr", "cvr"];
const UNIT_TOKENS: &[&str] = &["個", "箱", "ケース", "本", "枚", "kg", "pcs", "units", "box"];
const STOCK_STATUS_TOKENS: &[&str] = &[
    "在庫切れ",
    "欠品",
    "入荷待ち",
    "発注済",
    "在庫あり",
    "out of stock",
    "in stock",
    "backorder",
];
const AGE_KEYS: &[&str] = &["年齢", "age"];
const GENDER_TOKENS: &[&str] = &["男性", "女性", "男", "女", "male", "female", "m", "f"];
const GENDER_KEYS: &[&str] = &["性別", "gender", "sex"];

fn age_bracket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{1,2}0代(以上|以下|前半|後半)?$|^\d{1,2}0s$").expect("valid age bracket regex")
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[a-z]{2,}$").expect("valid email regex")
    })
}

/// Non-negative score per category, always in [`Category::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreVector {
    scores: [u32; Category::ALL.len()],
}

impl ScoreVector {
    pub fn new() -> Self {
        Self {
            scores: [0; Category::ALL.len()],
        }
    }

    pub fn add(&mut self, category: Category, weight: u32) {
        self.scores[category.index()] += weight;
    }

    pub fn get(&self, category: Category) -> u32 {
        self.scores[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::ALL.into_iter().zip(self.scores.iter().copied())
    }

    pub fn is_zero(&self) -> bool {
        self.scores.iter().all(|score| *score == 0)
    }

    /// First category holding the maximum score, or the financial default when nothing scored.
    pub fn winner(&self) -> Category {
        let mut best = Category::Financial;
        let mut best_score = 0;
        for (category, score) in self.iter() {
            if score > best_score {
                best = category;
                best_score = score;
            }
        }
        best
    }
}

impl Default for ScoreVector {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for ScoreVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.scores.len()))?;
        for (category, score) in self.iter() {
            map.serialize_entry(category.label(), &score)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub scores: ScoreVector,
}

pub fn execute(args: &ClassifyArgs) -> Result<()> {
    let records = request::load_records(&args.input, args.delimiter, args.input_encoding.as_deref())?;
    let columns = header_columns(&records);
    let sample = &records[..records.len().min(args.sample)];
    let classification = classify(&columns, sample);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        let headers = vec!["category".to_string(), "score".to_string()];
        let rows = classification
            .scores
            .iter()
            .map(|(category, score)| vec![category.label().to_string(), score.to_string()])
            .collect::<Vec<_>>();
        table::print_table(&headers, &rows);
        println!(
            "detected: {} ({})",
            classification.category,
            classification.category.display_name()
        );
    }
    info!(
        "Classified {:?} as {} from {} column(s)",
        args.input,
        classification.category,
        columns.len()
    );
    Ok(())
}

/// Classifies from the first record's columns and the first few rows.
pub fn classify_records(records: &[Record]) -> Classification {
    let columns = header_columns(records);
    let sample = &records[..records.len().min(CLASSIFY_SAMPLE_ROWS)];
    classify(&columns, sample)
}

pub fn classify<S: AsRef<str>>(columns: &[S], sample: &[Record]) -> Classification {
    let mut scores = ScoreVector::new();
    if columns.is_empty() {
        return Classification {
            category: Category::Financial,
            scores,
        };
    }
    score_column_names(columns, &mut scores);
    if let Some(first) = sample.first() {
        score_sample_values(first, &mut scores);
    }
    let category = scores.winner();
    debug!("Category scores {:?} -> {}", scores, category);
    Classification { category, scores }
}

fn column_haystack<S: AsRef<str>>(columns: &[S]) -> String {
    let lowered = columns
        .iter()
        .map(|column| column.as_ref().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let original = columns
        .iter()
        .map(|column| column.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{lowered} {original}")
}

fn score_column_names<S: AsRef<str>>(columns: &[S], scores: &mut ScoreVector) {
    let haystack = column_haystack(columns);
    for rule in KEYWORD_RULES {
        if haystack.contains(rule.keyword) {
            scores.add(rule.category, rule.weight);
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn score_sample_values(row: &Record, scores: &mut ScoreVector) {
    for (key, value) in row.iter() {
        let text = value.as_key().to_lowercase();
        let trimmed = text.trim();
        let key_lower = key.to_lowercase();

        if contains_any(&text, DEPARTMENT_TOKENS) {
            scores.add(Category::HumanResources, 5);
        }
        if contains_any(&text, TITLE_TOKENS) {
            scores.add(Category::HumanResources, 3);
        }
        if contains_any(&text, RISK_LEVEL_TOKENS) && (key.contains("リスク") || key_lower.contains("risk")) {
            scores.add(Category::HumanResources, 4);
        }

        if contains_any(&text, AD_PLATFORM_TOKENS) {
            scores.add(Category::Marketing, 5);
        }
        if text.contains('%') && contains_any(&key_lower, RATE_METRIC_KEYS) {
            scores.add(Category::Marketing, 2);
        }

        if key.contains("商品") || key_lower.contains("product") {
            scores.add(Category::Sales, 3);
        }
        if matches!(key_lower.as_str(), "店舗" | "store") && !text.is_empty() {
            scores.add(Category::Sales, 4);
        }

        if UNIT_TOKENS.contains(&trimmed) || has_unit_suffix(trimmed) {
            scores.add(Category::Inventory, 2);
        }
        if contains_any(&text, STOCK_STATUS_TOKENS) {
            scores.add(Category::Inventory, 3);
        }

        if age_bracket_pattern().is_match(trimmed) || is_plausible_age(&key_lower, trimmed) {
            scores.add(Category::Customer, 2);
        }
        if contains_any(&key_lower, GENDER_KEYS) && GENDER_TOKENS.contains(&trimmed) {
            scores.add(Category::Customer, 2);
        } else if matches!(trimmed, "男性" | "女性" | "male" | "female") {
            scores.add(Category::Customer, 2);
        }
        if email_pattern().is_match(trimmed) {
            scores.add(Category::Customer, 3);
        }
    }
}

/// Quantities written with a unit, such as `120個` or `12 pcs`.
fn has_unit_suffix(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };
    if !first.is_ascii_digit() {
        return false;
    }
    let unit = text.trim_start_matches(|c: char| c.is_ascii_digit() || c == ',' || c == '.');
    let unit = unit.trim();
    !unit.is_empty() && UNIT_TOKENS.contains(&unit)
}

fn is_plausible_age(key_lower: &str, text: &str) -> bool {
    if !contains_any(key_lower, AGE_KEYS) {
        return false;
    }
    let digits = text.strip_suffix('歳').unwrap_or(text);
    matches!(digits.parse::<u32>(), Ok(age) if age <= 120)
}
