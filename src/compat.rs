//! Advisory check between the detected data category and the analysis the
//! caller asked for.
//!
//! The gate never blocks: `compatible` is always `true`. A mismatch only
//! produces an advisory message pointing at a better-suited analysis, which the
//! pipeline logs and passes through to the response diagnostics.

use std::fmt;

use serde::Serialize;

use crate::classify::Category;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisType {
    Sales,
    Hr,
    Marketing,
    Strategic,
    Other(String),
}

impl AnalysisType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "sales" => AnalysisType::Sales,
            "hr" => AnalysisType::Hr,
            "marketing" => AnalysisType::Marketing,
            "strategic" => AnalysisType::Strategic,
            other => AnalysisType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AnalysisType::Sales => "sales",
            AnalysisType::Hr => "hr",
            AnalysisType::Marketing => "marketing",
            AnalysisType::Strategic => "strategic",
            AnalysisType::Other(raw) => raw,
        }
    }

    fn profile(&self) -> Option<&'static AnalysisProfile> {
        let key = match self {
            AnalysisType::Sales => "sales",
            AnalysisType::Hr => "hr",
            AnalysisType::Marketing => "marketing",
            AnalysisType::Strategic => "strategic",
            AnalysisType::Other(_) => return None,
        };
        ANALYSIS_PROFILES.iter().find(|profile| profile.key == key)
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct AnalysisProfile {
    key: &'static str,
    name: &'static str,
    primary: &'static [Category],
    secondary: &'static [Category],
}

impl AnalysisProfile {
    fn accepts(&self, category: Category) -> bool {
        self.primary.contains(&category) || self.secondary.contains(&category)
    }
}

static ANALYSIS_PROFILES: &[AnalysisProfile] = &[
    AnalysisProfile {
        key: "sales",
        name: "売上分析",
        primary: &[Category::Sales],
        secondary: &[Category::Financial],
    },
    AnalysisProfile {
        key: "hr",
        name: "人事分析",
        primary: &[Category::HumanResources],
        secondary: &[],
    },
    AnalysisProfile {
        key: "marketing",
        name: "マーケティング分析",
        primary: &[Category::Marketing],
        secondary: &[Category::Financial],
    },
    AnalysisProfile {
        key: "strategic",
        name: "統合戦略分析",
        primary: &[Category::Financial, Category::Sales],
        secondary: &[Category::HumanResources, Category::Marketing],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compatibility {
    pub compatible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

pub fn check_compatibility(detected: Category, requested: &AnalysisType) -> Compatibility {
    let Some(profile) = requested.profile() else {
        return Compatibility {
            compatible: true,
            advisory: None,
        };
    };
    if profile.accepts(detected) {
        return Compatibility {
            compatible: true,
            advisory: None,
        };
    }

    let mut advisory = format!(
        "アップロードされたデータ（{}）は{}には最適化されていません。",
        detected.display_name(),
        profile.name
    );
    match ANALYSIS_PROFILES.iter().find(|candidate| candidate.accepts(detected)) {
        Some(best) => advisory.push_str(&format!(
            "このデータには「{}」がおすすめです。そのまま分析を続行します。",
            best.name
        )),
        None => advisory.push_str("「統合戦略分析」をお試しください。"),
    }
    Compatibility {
        compatible: true,
        advisory: Some(advisory),
    }
}

/// Category whose template drives the analysis for the requested type.
pub fn resolve_category(detected: Category, requested: Option<&AnalysisType>) -> Category {
    match requested {
        Some(AnalysisType::Sales) => Category::Sales,
        Some(AnalysisType::Hr) => Category::HumanResources,
        Some(AnalysisType::Marketing) => Category::Marketing,
        Some(AnalysisType::Strategic) | Some(AnalysisType::Other(_)) | None => detected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_request_has_no_advisory() {
        let result = check_compatibility(Category::Sales, &AnalysisType::Sales);
        assert!(result.compatible);
        assert_eq!(result.advisory, None);
        let result = check_compatibility(Category::Financial, &AnalysisType::Marketing);
        assert_eq!(result.advisory, None);
    }

    #[test]
    fn mismatch_stays_compatible_and_suggests_alternative() {
        let result = check_compatibility(Category::HumanResources, &AnalysisType::Sales);
        assert!(result.compatible);
        let advisory = result.advisory.expect("advisory for mismatch");
        assert!(advisory.contains("人事データ"));
        assert!(advisory.contains("人事分析"));
    }

    #[test]
    fn category_without_any_profile_points_at_strategic() {
        let result = check_compatibility(Category::Inventory, &AnalysisType::Hr);
        assert!(result.compatible);
        assert!(result.advisory.unwrap().contains("統合戦略分析"));
    }

    #[test]
    fn unknown_analysis_type_passes_silently() {
        let requested = AnalysisType::parse(" forecast ");
        assert_eq!(requested, AnalysisType::Other("forecast".into()));
        let result = check_compatibility(Category::Customer, &requested);
        assert!(result.compatible);
        assert_eq!(result.advisory, None);
    }

    #[test]
    fn resolve_category_follows_requested_type() {
        assert_eq!(
            resolve_category(Category::Customer, Some(&AnalysisType::Hr)),
            Category::HumanResources
        );
        assert_eq!(
            resolve_category(Category::Customer, Some(&AnalysisType::Strategic)),
            Category::Customer
        );
        assert_eq!(resolve_category(Category::Inventory, None), Category::Inventory);
    }
}
