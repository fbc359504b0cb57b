/// Output language of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Indonesian,
    English,
}

impl Language {
    /// `"en"` selects English; anything else, including nothing, is Indonesian.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(|c| c.trim().to_ascii_lowercase()) {
            Some(c) if c == "en" => Language::English,
            _ => Language::Indonesian,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Indonesian => "id",
            Language::English => "en",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Language::Indonesian => "Indonesian",
            Language::English => "English",
        }
    }
}

pub fn build_prompt(article: &str, source_url: Option<&str>, lang: Language) -> String {
    let source = source_url.map(str::trim).filter(|u| !u.is_empty()).unwrap_or("-");

    let mut result = String::with_capacity(article.len() + 1600);
    result.push_str("You are a news summarization assistant. Summarize the article below in ");
    result.push_str(lang.name());
    result.push_str(".\n");
    result.push_str(
        "The output MUST be plain text: no markdown, no asterisks, no bullet symbols, \
         no markdown headings (#), no links in square brackets [].\n",
    );
    result.push_str("Structure the summary as the following paragraphs, in this order:\n");
    result.push_str("1. TL;DR: one to two sentences with the core of the story.\n");
    result.push_str(
        "2. Key points: three to five separate sentences, one per line, numbered 1., 2., 3.\n",
    );
    result.push_str(
        "3. 5W1H: one line each starting with \"What:\", \"Who:\", \"When:\", \"Where:\", \"Why:\", \"How:\". \
         Leave out any line the article does not answer; never guess.\n",
    );
    result.push_str(
        "4. Notable quotes: if there are any, write each one as a plain sentence wrapped in double quotes.\n",
    );
    result.push_str("5. Context or angle: one to two sentences on perspective or possible bias.\n");
    result.push_str("6. Source: write the source URL as plain text: ");
    result.push_str(source);
    result.push_str(".\n");
    result.push_str(
        "Stay accurate and do not add facts that are not in the article. \
         If anything is uncertain, say so explicitly.\n\n",
    );
    result.push_str("=== ARTICLE START ===\n");
    result.push_str(article);
    result.push_str("\n=== ARTICLE END ===\n");
    result
}
