//! Review insights: an external text-generation pass when configured, with a
//! deterministic rule-based report whenever that is unavailable or unusable.

pub mod summarizer;

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::aggregation::{mean_overall, round_to, tag_frequency};
use crate::model::Review;

pub use summarizer::{
    parse_summary, AiSummary, ChatCompletionsSummarizer, InsightError, Summarizer,
};

/// Reviews carrying this tag count as recommendations.
pub const RECOMMEND_TAG: &str = "would-recommend";

/// Tags that read as strengths, in reporting order.
pub const POSITIVE_TAGS: [&str; 6] = [
    "fresh",
    "authentic",
    "worth-price",
    "would-recommend",
    "great-service",
    "premium-quality",
];

const PROMPT_REVIEW_LIMIT: usize = 20;
const POPULAR_TAGS: usize = 8;
const MAX_STRENGTHS: usize = 5;
const MAX_IMPROVEMENTS: usize = 3;
const MAX_INSIGHTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub summary: String,
    pub key_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub sentiment_score: f64,
    pub recommendation_percentage: f64,
    pub popular_tags: IndexMap<String, i64>,
    pub insights: Vec<String>,
}

/// Numbers derived locally from the full review set, whatever produced the prose.
struct ReviewMetrics {
    avg_rating: f64,
    sentiment_score: f64,
    recommendation_percentage: f64,
    ranked_tags: Vec<(String, i64)>,
}

impl ReviewMetrics {
    fn compute(reviews: &[Review]) -> Self {
        let total = reviews.len() as f64;
        let avg_rating = mean_overall(reviews).unwrap_or(0.0);
        let recommending = reviews
            .iter()
            .filter(|r| r.tags.iter().any(|t| t == RECOMMEND_TAG))
            .count() as f64;
        let recommendation_percentage = if reviews.is_empty() {
            0.0
        } else {
            round_to(recommending / total * 100.0, 1)
        };
        Self {
            avg_rating,
            sentiment_score: round_to(avg_rating / 5.0 * 100.0, 1),
            recommendation_percentage,
            ranked_tags: tag_frequency(reviews),
        }
    }

    fn popular_tags(&self) -> IndexMap<String, i64> {
        self.ranked_tags.iter().take(POPULAR_TAGS).cloned().collect()
    }
}

/// Render a percentage the way reports show it: always one decimal place, e.g. `80.0`.
fn format_pct(value: f64) -> String {
    format!("{value:.1}")
}

/// `worth-price` -> `Worth Price`.
pub fn display_tag(tag: &str) -> String {
    let spaced = tag.replace(['-', '_'], " ");
    let mut out = String::with_capacity(spaced.len());
    let mut prev_alpha = false;
    for c in spaced.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// One line per review: `Rating: N/5 - <short review> [Tags: a, b]`.
pub fn build_prompt(reviews: &[Review], subject_name: &str) -> String {
    let lines: Vec<String> = reviews
        .iter()
        .take(PROMPT_REVIEW_LIMIT)
        .map(|r| {
            let mut line = format!("Rating: {}/5", r.overall_rating);
            if let Some(short) = r.short_review.as_deref().filter(|s| !s.is_empty()) {
                line.push_str(" - ");
                line.push_str(short);
            }
            if !r.tags.is_empty() {
                line.push_str(&format!(" [Tags: {}]", r.tags.join(", ")));
            }
            line
        })
        .collect();

    format!(
        r#"Analyze these customer reviews for "{subject_name}" and provide insights in JSON format:

Reviews:
{reviews}

Respond with ONLY valid JSON in this exact format:
{{
    "summary": "A 2-3 sentence summary of overall customer sentiment",
    "key_strengths": ["strength1", "strength2", "strength3"],
    "areas_for_improvement": ["area1", "area2"],
    "insights": ["insight1 with percentage", "insight2 with percentage", "insight3"]
}}"#,
        reviews = lines.join("\n"),
    )
}

/// Rule-based report used when the external service is off or fails.
pub fn fallback(reviews: &[Review], subject_name: &str) -> InsightReport {
    if reviews.is_empty() {
        return InsightReport {
            summary: format!(
                "No reviews yet for {subject_name}. Be the first to share your experience!"
            ),
            key_strengths: vec![],
            areas_for_improvement: vec![],
            sentiment_score: 0.0,
            recommendation_percentage: 0.0,
            popular_tags: IndexMap::new(),
            insights: vec![],
        };
    }

    let total = reviews.len() as f64;
    let metrics = ReviewMetrics::compute(reviews);
    let count_rated = |pred: fn(i32) -> bool| {
        reviews.iter().filter(|r| pred(r.overall_rating)).count() as f64
    };

    let mut insights = Vec::new();
    let five_star_pct = round_to(count_rated(|r| r == 5) / total * 100.0, 1);
    if five_star_pct > 50.0 {
        insights.push(format!("{}% of reviewers gave 5 stars", format_pct(five_star_pct)));
    }
    for (tag, count) in metrics.ranked_tags.iter().take(3) {
        let pct = round_to(*count as f64 / total * 100.0, 1);
        insights.push(format!(
            "{}% of reviewers mentioned '{}'",
            format_pct(pct),
            display_tag(tag)
        ));
    }

    let key_strengths = POSITIVE_TAGS
        .iter()
        .filter(|tag| metrics.ranked_tags.iter().any(|(t, _)| t == *tag))
        .take(MAX_STRENGTHS)
        .map(|tag| display_tag(tag))
        .collect();

    let mut areas_for_improvement = Vec::new();
    if metrics.avg_rating < 4.0 {
        areas_for_improvement.push("Overall consistency".to_string());
    }
    if count_rated(|r| r <= 2) > total * 0.2 {
        areas_for_improvement.push("Address negative feedback patterns".to_string());
    }

    let sentiment = match metrics.avg_rating {
        a if a >= 4.5 => "excellent",
        a if a >= 4.0 => "positive",
        a if a >= 3.0 => "mixed",
        _ => "needs attention",
    };

    InsightReport {
        summary: format!(
            "{subject_name} has {sentiment} feedback with an average rating of {:.1}/5 based on {} reviews.",
            metrics.avg_rating,
            reviews.len()
        ),
        key_strengths,
        areas_for_improvement,
        sentiment_score: metrics.sentiment_score,
        recommendation_percentage: metrics.recommendation_percentage,
        popular_tags: metrics.popular_tags(),
        insights,
    }
}

/// Merge service-provided prose with locally computed numbers.
fn assemble(summary: AiSummary, reviews: &[Review]) -> InsightReport {
    let metrics = ReviewMetrics::compute(reviews);
    let AiSummary {
        summary,
        mut key_strengths,
        mut areas_for_improvement,
        mut insights,
    } = summary;
    key_strengths.truncate(MAX_STRENGTHS);
    areas_for_improvement.truncate(MAX_IMPROVEMENTS);
    insights.truncate(MAX_INSIGHTS);
    InsightReport {
        summary,
        key_strengths,
        areas_for_improvement,
        sentiment_score: metrics.sentiment_score,
        recommendation_percentage: metrics.recommendation_percentage,
        popular_tags: metrics.popular_tags(),
        insights,
    }
}

/// Produces [`InsightReport`]s. Without a summarizer every report is the fallback.
#[derive(Clone, Default)]
pub struct InsightGenerator {
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl InsightGenerator {
    pub fn new(summarizer: Option<Arc<dyn Summarizer>>) -> Self {
        Self { summarizer }
    }

    pub fn is_ai_enabled(&self) -> bool {
        self.summarizer.is_some()
    }

    /// `reviews` should be ordered most recent first; only the first 20 reach the prompt.
    pub async fn generate(&self, reviews: &[Review], subject_name: &str) -> InsightReport {
        let Some(summarizer) = self.summarizer.as_ref() else {
            return fallback(reviews, subject_name);
        };
        if reviews.is_empty() {
            return fallback(reviews, subject_name);
        }

        let prompt = build_prompt(reviews, subject_name);
        let raw = match summarizer.summarize(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(subject = subject_name, error = %e, "AI insights generation failed");
                return fallback(reviews, subject_name);
            }
        };
        match parse_summary(&raw) {
            Ok(summary) => assemble(summary, reviews),
            Err(e) => {
                warn!(subject = subject_name, error = %e, "AI insights response unusable; using fallback");
                fallback(reviews, subject_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn review(rating: i32, tags: &[&str]) -> Review {
        Review {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Kiran".into(),
            variant_id: Uuid::nil(),
            item_id: Uuid::nil(),
            overall_rating: rating,
            dimensional_ratings: BTreeMap::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            short_review: Some("Good".into()),
            full_review: None,
            helpful_count: 0,
            verified: false,
            created_at: Utc::now(),
        }
    }

    struct Canned {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(vec![]),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                prompts: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl Summarizer for Canned {
        async fn summarize(&self, prompt: &str) -> Result<String, InsightError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(()) => Err(InsightError::EmptyCompletion),
            }
        }
    }

    #[test]
    fn fallback_without_reviews_is_zeroed() {
        let report = fallback(&[], "Masala Dosa");
        assert_eq!(report.sentiment_score, 0.0);
        assert_eq!(report.recommendation_percentage, 0.0);
        assert!(report.summary.contains("Masala Dosa"));
        assert!(report.summary.to_lowercase().contains("no reviews"));
        assert!(report.insights.is_empty());
        assert!(report.popular_tags.is_empty());
    }

    #[test]
    fn fallback_reports_five_star_share_above_half() {
        let reviews = vec![
            review(5, &[]),
            review(5, &[]),
            review(5, &[]),
            review(5, &[]),
            review(3, &[]),
        ];
        let report = fallback(&reviews, "Thali");
        assert!(report
            .insights
            .contains(&"80.0% of reviewers gave 5 stars".to_string()));
        assert_eq!(report.sentiment_score, 92.0);
        assert!(report.summary.starts_with("Thali has excellent feedback"));
        assert!(report.summary.contains("4.6/5 based on 5 reviews"));
    }

    #[test]
    fn fallback_omits_five_star_share_at_or_below_half() {
        let reviews = vec![review(5, &[]), review(5, &[]), review(4, &[]), review(4, &[])];
        let report = fallback(&reviews, "Thali");
        assert!(report.insights.iter().all(|i| !i.contains("gave 5 stars")));
    }

    #[test]
    fn fallback_tag_insights_strengths_and_improvements() {
        let reviews = vec![
            review(2, &["worth-price", "spicy"]),
            review(1, &["spicy"]),
            review(4, &["fresh", "spicy", "would-recommend"]),
            review(5, &["fresh"]),
        ];
        let report = fallback(&reviews, "Vindaloo");

        assert_eq!(report.insights[0], "75.0% of reviewers mentioned 'Spicy'");
        assert_eq!(report.insights[1], "50.0% of reviewers mentioned 'Fresh'");
        assert_eq!(report.insights[2], "25.0% of reviewers mentioned 'Worth Price'");
        assert_eq!(report.insights.len(), 3);

        assert_eq!(
            report.key_strengths,
            vec!["Fresh", "Worth Price", "Would Recommend"]
        );
        assert_eq!(
            report.areas_for_improvement,
            vec!["Overall consistency", "Address negative feedback patterns"]
        );
        assert_eq!(report.recommendation_percentage, 25.0);
        assert_eq!(report.popular_tags.keys().next().map(String::as_str), Some("spicy"));
        assert!(report.summary.contains("mixed"));
    }

    #[test]
    fn display_tag_title_cases_separated_words() {
        assert_eq!(display_tag("worth-price"), "Worth Price");
        assert_eq!(display_tag("great_service"), "Great Service");
        assert_eq!(display_tag("SPICY"), "Spicy");
    }

    #[test]
    fn prompt_caps_reviews_and_renders_lines() {
        let mut reviews: Vec<Review> = (0..25).map(|_| review(4, &[])).collect();
        reviews[0].tags = vec!["fresh".into(), "spicy".into()];
        reviews[1].short_review = None;
        let prompt = build_prompt(&reviews, "Biryani");
        assert!(prompt.contains("\"Biryani\""));
        assert!(prompt.contains("Rating: 4/5 - Good [Tags: fresh, spicy]\n"));
        assert!(prompt.contains("\nRating: 4/5\n"));
        assert_eq!(prompt.matches("Rating: ").count(), 20);
        assert!(prompt.contains("\"key_strengths\""));
    }

    #[tokio::test]
    async fn generate_without_summarizer_uses_fallback() {
        let reviews = vec![review(5, &[])];
        let gen = InsightGenerator::default();
        assert!(!gen.is_ai_enabled());
        assert_eq!(gen.generate(&reviews, "Idli").await, fallback(&reviews, "Idli"));
    }

    #[tokio::test]
    async fn generate_skips_the_service_for_empty_review_sets() {
        let canned = Canned::ok("{}");
        let gen = InsightGenerator::new(Some(canned.clone()));
        let report = gen.generate(&[], "Idli").await;
        assert!(report.summary.contains("No reviews yet"));
        assert!(canned.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn generate_merges_ai_prose_with_local_numbers() {
        let canned = Canned::ok(
            "```json\n{\"summary\": \"Crowd favourite.\", \
             \"key_strengths\": [\"a\",\"b\",\"c\",\"d\",\"e\",\"f\"], \
             \"areas_for_improvement\": [\"x\",\"y\",\"z\",\"w\"], \
             \"insights\": [\"1\",\"2\",\"3\",\"4\",\"5\",\"6\",\"7\"]}\n```",
        );
        let gen = InsightGenerator::new(Some(canned.clone()));
        let mut reviews: Vec<Review> = (0..30).map(|_| review(4, &["fresh"])).collect();
        reviews[0].tags.push(RECOMMEND_TAG.into());

        let report = gen.generate(&reviews, "Pav Bhaji").await;
        assert_eq!(report.summary, "Crowd favourite.");
        assert_eq!(report.key_strengths.len(), 5);
        assert_eq!(report.areas_for_improvement.len(), 3);
        assert_eq!(report.insights.len(), 5);
        assert_eq!(report.sentiment_score, 80.0);
        assert_eq!(report.recommendation_percentage, 3.3);
        // tag counts cover every supplied review, not just the 20 in the prompt
        assert_eq!(report.popular_tags.get("fresh"), Some(&30));
        assert_eq!(canned.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn generate_falls_back_on_garbage_or_errors() {
        let reviews = vec![review(5, &["fresh"]), review(5, &[])];
        let expected = fallback(&reviews, "Chaat");

        let garbage = InsightGenerator::new(Some(Canned::ok("I cannot help with that.")));
        assert_eq!(garbage.generate(&reviews, "Chaat").await, expected);

        let failing = InsightGenerator::new(Some(Canned::failing()));
        assert_eq!(failing.generate(&reviews, "Chaat").await, expected);
    }
}
