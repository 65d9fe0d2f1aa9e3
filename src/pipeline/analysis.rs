//! Standalone document analysis: synthesis tables and ad-hoc queries over
//! uploaded report text, independent of the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::services::llm_client::{LlmError, LlmProvider};

/// Markdown synthesis table parsed into headers and row cells. An
/// unparsable model reply yields the empty table rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub struct DocumentAnalyzer {
    llm: Arc<dyn LlmProvider>,
}

impl DocumentAnalyzer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Synthesizes an evaluation report into the seven-column markdown
    /// table. Returns the raw markdown; callers parse it with
    /// [`text_to_table`].
    pub async fn analyze(&self, text: &str) -> Result<String, LlmError> {
        let prompt = format!(
            "**Comprehensive analytical synthesis:**\n\
             Generate a synthesis of the provided document, which appears to be an evaluation report.\n\
             Organize the output in a table format with the following columns:\n\n\
             | Theme | Trend | Pattern | Organizational Learning Need | Good Practice | Lesson Learned | Reference |\n\
             |---|---|---|---|---|---|---|\n\n\
             Populate each cell of the table with relevant information extracted from the document.\n\
             If a particular category is not applicable or no information is found, leave the cell blank.\n\
             Provide references to specific sections or pages in the document where possible.\n\n\
             **Document:**\n{}",
            text
        );
        self.llm.generate(&prompt).await
    }

    /// Answers a free-form question against the uploaded document text.
    pub async fn query(&self, text: &str, query: &str) -> Result<String, LlmError> {
        let prompt = format!("Document: {}\n\nQuery: {}", text, query);
        self.llm.generate(&prompt).await
    }
}

/// Parses a markdown table out of model output. The first `|` line is the
/// header, the second is the dash separator, the rest are data rows. Rows
/// are padded or truncated to the header width; anything that does not look
/// like a table parses to the empty table.
pub fn text_to_table(text: &str) -> AnalysisTable {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && l.contains('|'))
        .collect();

    let Some(header_line) = lines.first() else {
        return AnalysisTable::default();
    };

    let headers: Vec<String> = header_line
        .split('|')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(String::from)
        .collect();
    if headers.is_empty() {
        return AnalysisTable::default();
    }

    let rows = lines
        .iter()
        .skip(2)
        .map(|line| {
            let cells: Vec<&str> = line.split('|').collect();
            // Drop the fragments outside the outer pipes
            let mut row: Vec<String> = cells[1..cells.len().saturating_sub(1).max(1)]
                .iter()
                .map(|c| c.trim().to_string())
                .collect();
            row.resize(headers.len(), String::new());
            row
        })
        .collect();

    AnalysisTable { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_client::MockLlm;

    const TABLE_MD: &str = "\
Here is the synthesis:

| Theme | Trend | Reference |
|---|---|---|
| Health | Improving | p. 12 |
| Education | Stable | p. 30 |
";

    #[test]
    fn parses_headers_and_rows() {
        let table = text_to_table(TABLE_MD);
        assert_eq!(table.headers, vec!["Theme", "Trend", "Reference"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["Health", "Improving", "p. 12"]);
    }

    #[test]
    fn short_rows_are_padded() {
        let table = text_to_table("| A | B | C |\n|---|---|---|\n| only |\n");
        assert_eq!(table.rows[0], vec!["only", "", ""]);
    }

    #[test]
    fn long_rows_are_truncated() {
        let table = text_to_table("| A | B |\n|---|---|\n| one | two | three |\n");
        assert_eq!(table.rows[0], vec!["one", "two"]);
    }

    #[test]
    fn non_table_text_is_empty() {
        let table = text_to_table("no pipes anywhere in this reply");
        assert_eq!(table, AnalysisTable::default());
    }

    #[test]
    fn header_only_table_has_no_rows() {
        let table = text_to_table("| A | B |\n|---|---|\n");
        assert_eq!(table.headers.len(), 2);
        assert!(table.rows.is_empty());
    }

    #[tokio::test]
    async fn analyze_returns_raw_markdown() {
        let analyzer = DocumentAnalyzer::new(Arc::new(MockLlm::always(TABLE_MD)));
        let analysis = analyzer.analyze("report body").await.unwrap();
        assert!(analysis.contains("| Health |"));
    }

    #[tokio::test]
    async fn query_propagates_provider_errors() {
        let analyzer = DocumentAnalyzer::new(Arc::new(MockLlm::failing()));
        assert!(analyzer.query("doc", "q").await.is_err());
    }
}
