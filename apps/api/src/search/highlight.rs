use tantivy::query::Query;
use tantivy::snippet::{Snippet, SnippetGenerator};
use tantivy::Searcher;

use crate::models::content::ContentRecord;
use crate::search::schema::ContentFields;

/// Maximum characters in a single highlight fragment.
pub const FRAGMENT_SIZE: usize = 200;

pub const PRE_TAG: &str = "<mark>";
pub const POST_TAG: &str = "</mark>";

/// Builds `<mark>`-tagged fragments for the title and body of a hit.
///
/// Only terms from the free-text query are marked; category and author
/// filters never contribute highlights.
pub struct Highlighter {
    title: SnippetGenerator,
    body: SnippetGenerator,
}

impl Highlighter {
    pub fn new(
        searcher: &Searcher,
        text_query: &dyn Query,
        fields: &ContentFields,
    ) -> tantivy::Result<Self> {
        let mut title = SnippetGenerator::create(searcher, text_query, fields.title)?;
        title.set_max_num_chars(FRAGMENT_SIZE);
        let mut body = SnippetGenerator::create(searcher, text_query, fields.body)?;
        body.set_max_num_chars(FRAGMENT_SIZE);
        Ok(Self { title, body })
    }

    /// Title fragment first, then body. Fields without a match are skipped.
    pub fn highlights(&self, record: &ContentRecord) -> Vec<String> {
        [
            self.title.snippet(&record.title),
            self.body.snippet(&record.body),
        ]
        .into_iter()
        .filter_map(render)
        .collect()
    }
}

/// Surrounding text is HTML-escaped by `to_html`.
fn render(mut snippet: Snippet) -> Option<String> {
    if snippet.highlighted().is_empty() {
        return None;
    }
    snippet.set_snippet_prefix_postfix(PRE_TAG, POST_TAG);
    Some(snippet.to_html())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tantivy::query::QueryParser;
    use tantivy::{doc, Index, IndexWriter};

    use crate::search::schema::build_schema;

    fn record(title: &str, body: &str) -> ContentRecord {
        let now = Utc::now();
        ContentRecord {
            id: 1,
            title: title.to_string(),
            body: body.to_string(),
            category: None,
            author: None,
            tags: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn highlighter(docs: &[(&str, &str)], query: &str) -> Highlighter {
        let index = Index::create_in_ram(build_schema());
        let fields = ContentFields::resolve(&index.schema()).unwrap();
        let mut writer: IndexWriter = index.writer_with_num_threads(1, 15_000_000).unwrap();
        for (title, body) in docs {
            writer
                .add_document(doc!(fields.title => *title, fields.body => *body))
                .unwrap();
        }
        writer.commit().unwrap();

        let searcher = index.reader().unwrap().searcher();
        let parsed = QueryParser::for_index(&index, fields.text())
            .parse_query(query)
            .unwrap();
        Highlighter::new(&searcher, parsed.as_ref(), &fields).unwrap()
    }

    #[test]
    fn test_marks_matches_in_title_and_body() {
        let h = highlighter(&[("Hello there", "say hello world")], "hello");
        let out = h.highlights(&record("Hello there", "say hello world"));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], "<mark>Hello</mark> there");
        assert!(out[1].contains("<mark>hello</mark>"));
    }

    #[test]
    fn test_field_without_match_is_skipped() {
        let h = highlighter(&[("Rust", "systems programming")], "programming");
        let out = h.highlights(&record("Rust", "systems programming"));
        assert_eq!(out, vec!["systems <mark>programming</mark>".to_string()]);
    }

    #[test]
    fn test_text_around_marks_is_escaped() {
        let body = "<b>bold</b> & loud";
        let h = highlighter(&[("t", body)], "loud");
        let out = h.highlights(&record("t", body));
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("&amp;"));
        assert!(out[0].contains("&lt;/b&gt;"));
        assert!(out[0].contains("<mark>loud</mark>"));
    }

    #[test]
    fn test_long_body_is_cut_to_one_fragment() {
        let body = format!("{} needle {}", "filler ".repeat(60), "tail ".repeat(60));
        let h = highlighter(&[("t", body.as_str())], "needle");
        let out = h.highlights(&record("t", &body));
        let fragment = &out[0];
        assert!(fragment.contains("<mark>needle</mark>"));
        let plain = fragment.replace(PRE_TAG, "").replace(POST_TAG, "");
        assert!(plain.chars().count() <= FRAGMENT_SIZE);
    }
}
