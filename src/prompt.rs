//! Prompt rendering for the hosted model.
//!
//! Each response format has its own template. All of them embed the local
//! statistics and up to [`PROMPT_SAMPLE_ROWS`] raw rows so the model only
//! works from data it was given.

use serde_json::json;

use crate::{
    classify::Category, data::Record, request::ResponseFormat, stats::Statistics,
};

pub const PROMPT_SAMPLE_ROWS: usize = 50;

pub const SYSTEM_PROMPT: &str = "あなたは企業の財務データを分析する経験豊富な経営コンサルタントです。\
売上データ、損益計算書、貸借対照表、キャッシュフロー計算書など、あらゆる数値データを分析できます。\
回答は必ず日本語で、一般のビジネスパーソンにも分かりやすく説明してください。\
専門用語は必要最小限に留め、数値は千円単位で区切り、円マークを付けて表示してください。";

const FORCE_JA_DIRECTIVE: &str = "日本語のみで、数値は半角。KPI・要点・トレンドを簡潔に。";

#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub stats: &'a Statistics,
    pub sample: &'a [Record],
    pub category: Category,
    pub instruction: &'a str,
    pub force_ja: bool,
}

impl<'a> PromptContext<'a> {
    pub fn new(stats: &'a Statistics, records: &'a [Record], category: Category) -> Self {
        Self {
            stats,
            sample: &records[..records.len().min(PROMPT_SAMPLE_ROWS)],
            category,
            instruction: "",
            force_ja: false,
        }
    }

    fn stats_json(&self) -> String {
        serde_json::to_string(self.stats).unwrap_or_else(|_| "{}".to_string())
    }

    fn sample_json(&self) -> String {
        serde_json::to_string(self.sample).unwrap_or_else(|_| "[]".to_string())
    }

    fn user_request(&self) -> Option<String> {
        let instruction = self.instruction.trim();
        match (self.force_ja, instruction.is_empty()) {
            (true, true) => Some(FORCE_JA_DIRECTIVE.to_string()),
            (true, false) => Some(format!("{FORCE_JA_DIRECTIVE} {instruction}")),
            (false, false) => Some(instruction.to_string()),
            (false, true) => None,
        }
    }
}

pub fn build_prompt(format: ResponseFormat, ctx: &PromptContext<'_>) -> String {
    let mut prompt = match format {
        ResponseFormat::Json => json_prompt(ctx),
        ResponseFormat::Markdown => markdown_prompt(ctx),
        ResponseFormat::Text => text_prompt(ctx),
    };
    if let Some(request) = ctx.user_request() {
        prompt.push_str("\n【ご依頼】\n");
        prompt.push_str(&request);
        prompt.push('\n');
    }
    prompt
}

pub fn analysis_instructions(category: Category) -> &'static str {
    match category {
        Category::Sales => {
            "- 売上の合計、平均、トレンドを確認してください\n\
             - 商品別・時期別の売上構成を分析してください\n\
             - 売上の成長性と季節性があれば指摘してください\n\
             - 営業戦略の改善点があれば提案してください"
        }
        Category::Inventory => {
            "- 在庫の総額、商品別構成を確認してください\n\
             - 在庫回転率や滞留在庫があれば指摘してください\n\
             - 適正在庫レベルと過剰在庫のリスクを評価してください\n\
             - 在庫管理の改善点があれば提案してください"
        }
        Category::HumanResources => {
            "- 部署別・職位別の人件費分析を行ってください\n\
             - 給与水準の適正性を確認してください\n\
             - 残業時間と生産性の関係を分析してください\n\
             - 離職率や採用コストの傾向があれば指摘してください\n\
             - 人員配置の最適化と働き方改革の提案を行ってください"
        }
        Category::Marketing => {
            "- チャネル別の広告費対効果（ROAS）を計算してください\n\
             - 顧客獲得コスト（CAC）と生涯価値（LTV）を分析してください\n\
             - コンバージョン率とクリック率の改善点を指摘してください\n\
             - 予算配分の最適化とROI向上策を提案してください"
        }
        Category::Customer => {
            "- 顧客の属性（年代・性別・地域）別の構成を確認してください\n\
             - 購入頻度や生涯価値（LTV）の高い層を特定してください\n\
             - 解約や離反の兆候があれば指摘してください\n\
             - 顧客維持と育成の施策を提案してください"
        }
        Category::Financial => {
            "- データの主要な項目と数値を確認してください\n\
             - 重要な指標や比率があれば計算してください\n\
             - 傾向やパターンがあれば分析してください\n\
             - ビジネス上の意味と改善点があれば指摘してください"
        }
    }
}

fn output_schema_hint() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "overview": {"type": "string"},
            "findings": {"type": "array", "items": {"type": "string"}},
            "kpis": {
                "type": "object",
                "properties": {
                    "total_sales": {"type": "number"},
                    "top_products": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {"name": {"type": "string"}, "sales": {"type": "number"}}
                        }
                    }
                }
            },
            "trend": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"date": {"type": "string"}, "sales": {"type": "number"}}
                }
            }
        },
        "required": ["overview", "findings", "kpis"]
    })
}

fn json_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        "あなたは企業の財務データを分析する経験豊富な経営コンサルタントです。\
以下のデータを見て、経営陣に分かりやすく説明してください。\n\n\
【データ種別】: {name}\n\n\
【分析指示】\n{instructions}\n\n\
【出力形式】\n\
- 自然な日本語で、同僚に説明するように書いてください\n\
- 数字は「○○万円」「○○千円」など、普段使う表現で書いてください\n\
- 「全体の状況」「気づいたこと（3つまで）」「数字のまとめ」に整理してください\n\n\
※与えられたデータのみを使って分析してください（推測は避けてください）\n\
※以下の形式でJSONとして出力してください: {schema}\n\n\
[統計要約]\n{stats}\n\n\
[サンプル行]\n{sample}\n",
        name = ctx.category.display_name(),
        instructions = analysis_instructions(ctx.category),
        schema = output_schema_hint(),
        stats = ctx.stats_json(),
        sample = ctx.sample_json(),
    )
}

fn markdown_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        "あなたは会社の{name}を分析するビジネスアドバイザーです。\
社長や部長が読むレポートを、日本語と数字だけで作成してください。\n\n\
【重要】\n\
- 「##」「**」「|」「-」などの記号は使わず、普通の日本語文章で書いてください\n\
- 部下が上司に口頭で報告するような、自然な文章で書いてください\n\
- 数字は「○○万円」「○○%増加」など、話すときの表現で書いてください\n\n\
【分析指示】\n{instructions}\n\n\
# 統計要約\n{stats}\n\n\
# サンプル（最大{limit}）\n{sample}\n",
        name = ctx.category.display_name(),
        instructions = analysis_instructions(ctx.category),
        stats = ctx.stats_json(),
        limit = PROMPT_SAMPLE_ROWS,
        sample = ctx.sample_json(),
    )
}

fn text_prompt(ctx: &PromptContext<'_>) -> String {
    format!(
        "あなたは会社の{name}を分析するビジネスアドバイザーです。\
上司に口頭で報告するように、日本語だけで3行以内にまとめてください。\n\n\
【絶対守ること】\n\
- 記号、英語、カタカナ専門用語は使わないでください\n\
- 「です・ます」調で、丁寧に書いてください\n\n\
[統計要約]\n{stats}\n\n\
[サンプル（最大{limit}）]\n{sample}\n",
        name = ctx.category.display_name(),
        stats = ctx.stats_json(),
        limit = PROMPT_SAMPLE_ROWS,
        sample = ctx.sample_json(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, stats::compute_statistics};

    fn records(count: usize) -> Vec<Record> {
        (0..count)
            .map(|idx| {
                [
                    ("商品", Value::Text(format!("item-{idx}"))),
                    ("金額", Value::Number(100.0)),
                ]
                .into_iter()
                .collect()
            })
            .collect()
    }

    #[test]
    fn sample_is_capped_at_fifty_rows() {
        let rows = records(60);
        let stats = compute_statistics(&rows);
        let ctx = PromptContext::new(&stats, &rows, Category::Sales);
        assert_eq!(ctx.sample.len(), PROMPT_SAMPLE_ROWS);
        let prompt = build_prompt(ResponseFormat::Json, &ctx);
        assert!(prompt.contains("item-49"));
        assert!(!prompt.contains("item-50"));
    }

    #[test]
    fn json_prompt_names_category_and_embeds_stats() {
        let rows = records(2);
        let stats = compute_statistics(&rows);
        let ctx = PromptContext::new(&stats, &rows, Category::Inventory);
        let prompt = build_prompt(ResponseFormat::Json, &ctx);
        assert!(prompt.contains("【データ種別】: 在庫データ"));
        assert!(prompt.contains("\"total_rows\":2"));
        assert!(prompt.contains("\"required\""));
    }

    #[test]
    fn text_and_markdown_prompts_differ() {
        let rows = records(1);
        let stats = compute_statistics(&rows);
        let ctx = PromptContext::new(&stats, &rows, Category::Sales);
        let text = build_prompt(ResponseFormat::Text, &ctx);
        let markdown = build_prompt(ResponseFormat::Markdown, &ctx);
        assert!(text.contains("3行以内"));
        assert!(markdown.contains("# 統計要約"));
        assert_ne!(text, markdown);
    }

    #[test]
    fn force_ja_prefixes_instruction() {
        let rows = records(1);
        let stats = compute_statistics(&rows);
        let mut ctx = PromptContext::new(&stats, &rows, Category::Sales);
        ctx.instruction = "前月比も見て";
        ctx.force_ja = true;
        let prompt = build_prompt(ResponseFormat::Text, &ctx);
        assert!(prompt.contains(&format!("{FORCE_JA_DIRECTIVE} 前月比も見て")));
    }

    #[test]
    fn no_instruction_means_no_request_section() {
        let rows = records(1);
        let stats = compute_statistics(&rows);
        let ctx = PromptContext::new(&stats, &rows, Category::Financial);
        assert!(!build_prompt(ResponseFormat::Json, &ctx).contains("【ご依頼】"));
    }
}
