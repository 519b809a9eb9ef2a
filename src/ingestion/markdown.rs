//! LLM-backed conversion of fetched sources into normalized markdown.

use std::sync::Arc;

use tracing::debug;

use super::fetch::FetchedDocument;
use crate::providers::{GenerateRequest, GenerativeModel};
use crate::types::{ContentType, RagError};

const HTML_PROMPT: &str = "\
Extract all information from this HTML content and convert it to clean and structured markdown:
1. Preserve headings, lists, table, and document structure using proper markdown header, list, and table syntax.
2. Use the following markdown header in a hierarchical manner: #, ##, ###.
3. Remove irrelevant elements and formatting.
4. Exclude navigation, header, and footer elements.
5. No additional comments or HTML tags, just the converted content without triple backtick codeblock.";

const JSON_PROMPT: &str = "\
Extract all information from this JSON data and convert it to clean markdown table:
1. Convert arrays of objects to markdown tables with proper markdown headers and table syntax.
2. Use just one header (#) for title.
3. Identify table header and plot the data according to it.
4. No additional comments, just the converted content without triple backtick codeblock.";

const PDF_PROMPT: &str = "\
Extract all information from this PDF content and convert it to clean and structured markdown:
1. Preserve headings, lists, table, and document structure using proper markdown header, list, and table syntax.
2. Use the following markdown header in a hierarchical manner: #, ##, ###.
3. Include essential details while removing irrelevant content.
4. Format tables using markdown syntax.
5. No additional comments, just the converted content without triple backtick codeblock.";

/// Converts fetched source material into markdown through the generative
/// model, with a fixed instruction per content type.
pub struct MarkdownConverter {
    model: Arc<dyn GenerativeModel>,
}

impl MarkdownConverter {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn convert(&self, fetched: &FetchedDocument) -> Result<String, RagError> {
        let request = match (fetched.content_type, fetched.text.as_deref()) {
            (ContentType::Html, Some(text)) => GenerateRequest::new()
                .with_system(HTML_PROMPT)
                .with_text(text),
            (ContentType::Json, Some(text)) => GenerateRequest::new()
                .with_system(JSON_PROMPT)
                .with_text(text),
            (ContentType::Pdf, _) => GenerateRequest::new()
                .with_system(PDF_PROMPT)
                .with_file_url(fetched.resolved_url.as_str(), "application/pdf"),
            (content_type, None) => {
                return Err(RagError::InvalidDocument(format!(
                    "{content_type} source has no text payload"
                )));
            }
        };

        let markdown = self.model.generate(request).await?;
        if markdown.trim().is_empty() {
            return Err(RagError::Provider(
                "markdown conversion returned empty output".to_string(),
            ));
        }
        debug!(
            content_type = %fetched.content_type,
            bytes = markdown.len(),
            "markdown conversion complete"
        );
        Ok(markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockGenerativeModel, UserContent};
    use url::Url;

    fn fetched(content_type: ContentType, text: Option<&str>) -> FetchedDocument {
        FetchedDocument {
            content_type,
            resolved_url: Url::parse("https://example.com/doc").unwrap(),
            text: text.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn html_sources_use_the_html_instruction() {
        let model = Arc::new(MockGenerativeModel::new());
        model.push_response("# Converted");
        let converter = MarkdownConverter::new(model.clone());

        let markdown = converter
            .convert(&fetched(ContentType::Html, Some("<p>hi</p>")))
            .await
            .unwrap();
        assert_eq!(markdown, "# Converted");

        let request = &model.requests()[0];
        assert!(request.system.as_deref().unwrap().contains("HTML content"));
        assert_eq!(request.user, vec![UserContent::Text("<p>hi</p>".to_string())]);
    }

    #[tokio::test]
    async fn pdf_sources_are_passed_by_reference() {
        let model = Arc::new(MockGenerativeModel::new());
        model.push_response("# From PDF");
        let converter = MarkdownConverter::new(model.clone());

        converter
            .convert(&fetched(ContentType::Pdf, None))
            .await
            .unwrap();

        let request = &model.requests()[0];
        assert!(request.system.as_deref().unwrap().contains("PDF content"));
        assert_eq!(
            request.user,
            vec![UserContent::FileUrl {
                url: "https://example.com/doc".to_string(),
                mime_type: "application/pdf".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn empty_conversion_output_is_an_error() {
        let model = Arc::new(MockGenerativeModel::new());
        model.push_response("   \n  ");
        let converter = MarkdownConverter::new(model);

        let result = converter
            .convert(&fetched(ContentType::Html, Some("<p>hi</p>")))
            .await;
        assert!(matches!(result, Err(RagError::Provider(_))));
    }

    #[tokio::test]
    async fn text_source_without_payload_is_rejected() {
        let model = Arc::new(MockGenerativeModel::new());
        let converter = MarkdownConverter::new(model);
        let result = converter.convert(&fetched(ContentType::Json, None)).await;
        assert!(matches!(result, Err(RagError::InvalidDocument(_))));
    }
}
