use dom_smoothie::{Config, Readability};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("head > title, title").expect("Failed to parse title selector")
});

/// What the HTML parser hands back for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArticle {
    pub title: String,
    pub text_content: String,
    pub excerpt: Option<String>,
    pub byline: Option<String>,
    pub dir: Option<String>,
}

/// The extraction endpoint's public result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub byline: Option<String>,
    pub dir: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("no article found in page")]
    NoArticle,

    #[error("{0}")]
    Failed(String),
}

/// Turns raw HTML into the main article of the page.
pub trait ArticleParser: Send + Sync {
    fn parse(&self, html: &str, base_url: &str) -> Result<ParsedArticle, ParseError>;
}

/// Mozilla Readability, via `dom_smoothie`.
pub struct ReadabilityParser {
    max_elements: usize,
}

impl Default for ReadabilityParser {
    fn default() -> Self {
        Self {
            max_elements: 9000,
        }
    }
}

impl ArticleParser for ReadabilityParser {
    fn parse(&self, html: &str, base_url: &str) -> Result<ParsedArticle, ParseError> {
        let cfg = Config {
            max_elements_to_parse: self.max_elements,
            ..Default::default()
        };

        let mut readability = Readability::new(html, Some(base_url), Some(cfg))
            .map_err(|e| ParseError::Failed(e.to_string()))?;
        let article = readability.parse().map_err(|_| ParseError::NoArticle)?;

        let title = if article.title.trim().is_empty() {
            document_title(html).unwrap_or_default()
        } else {
            article.title.trim().to_string()
        };

        Ok(ParsedArticle {
            title,
            text_content: article.text_content.to_string(),
            excerpt: non_empty(article.excerpt),
            byline: non_empty(article.byline),
            dir: non_empty(article.dir),
        })
    }
}

/// Text of the document's `<title>` element, if it has one.
pub fn document_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
