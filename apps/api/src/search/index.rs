use std::cmp::Reverse;
use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, ConstScoreQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{
    DocId, Index, IndexReader, IndexWriter, ReloadPolicy, Score, SegmentReader, TantivyDocument,
    TantivyError, Term,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::content::{non_blank, ContentRecord, SearchResult};
use crate::search::highlight::Highlighter;
use crate::search::schema::{build_schema, ContentFields, FIELD_ID};

pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Score assigned to every hit of a query with no free text.
const FILTER_ONLY_SCORE: Score = 1.0;

/// Indexing arena for the single writer thread.
const WRITER_HEAP_BYTES: usize = 20_000_000;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("search index error: {0}")]
    Tantivy(#[from] TantivyError),

    #[error("invalid search query: {0}")]
    Query(#[from] tantivy::query::QueryParserError),

    #[error("stored record could not be decoded: {0}")]
    StoredRecord(#[from] serde_json::Error),

    #[error("indexed document {0:?} has no stored record")]
    MissingRecord(tantivy::DocAddress),

    #[error("index directory unavailable: {0}")]
    Io(#[from] std::io::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;

// ────────────────────────────────────────────────────────────────────────────
// Query
// ────────────────────────────────────────────────────────────────────────────

/// A search request, ready to run against a `ContentIndex`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    /// Free text with query syntax stripped. `None` when no text was given;
    /// `Some("")` when the text had no searchable characters, which matches
    /// nothing.
    pub text: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub max_results: usize,
}

impl IndexQuery {
    pub fn new(
        query: Option<&str>,
        category: Option<&str>,
        author: Option<&str>,
        max_results: usize,
    ) -> Self {
        Self {
            text: non_blank(&query.map(str::to_string)).map(|q| escape(&q)),
            category: non_blank(&category.map(str::to_string)),
            author: non_blank(&author.map(str::to_string)),
            max_results,
        }
    }

    /// True when no clause was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.category.is_none() && self.author.is_none()
    }
}

/// Reduces user text to plain words so the query parser never sees
/// operators, field prefixes, phrases or wildcards. Splitting on the same
/// boundaries as the default tokenizer keeps matching unchanged; lowercasing
/// turns `AND`/`OR`/`NOT` back into ordinary words.
fn escape(query: &str) -> String {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

// ────────────────────────────────────────────────────────────────────────────
// Index
// ────────────────────────────────────────────────────────────────────────────

/// Full-text index over content records.
///
/// Each document carries a JSON copy of its record so hits can be returned
/// without touching the repository. Every write is committed before it
/// returns, so readers never see a half-applied change.
pub struct ContentIndex {
    index: Index,
    writer: IndexWriter,
    reader: IndexReader,
    fields: ContentFields,
}

impl ContentIndex {
    /// A throwaway index held in RAM.
    pub fn in_memory() -> IndexResult<Self> {
        Self::from_index(Index::create_in_ram(build_schema()))
    }

    /// Opens the index stored at `path`, creating it if the directory is
    /// empty. Documents committed by an earlier process are kept.
    pub fn open(path: &Path) -> IndexResult<Self> {
        std::fs::create_dir_all(path)?;
        let directory = MmapDirectory::open(path).map_err(TantivyError::from)?;
        let index = Index::open_or_create(directory, build_schema())?;
        let opened = Self::from_index(index)?;
        info!(
            "Opened search index at {} ({} documents)",
            path.display(),
            opened.num_docs()
        );
        Ok(opened)
    }

    fn from_index(index: Index) -> IndexResult<Self> {
        let fields = ContentFields::resolve(&index.schema())?;
        let writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            index,
            writer,
            reader,
            fields,
        })
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Adds a record, replacing any previous version with the same id.
    pub fn upsert(&mut self, record: &ContentRecord) -> IndexResult<()> {
        let document = self.document(record)?;
        self.writer.delete_term(self.id_term(record.id));
        if let Err(e) = self.writer.add_document(document) {
            self.writer.rollback()?;
            return Err(e.into());
        }
        self.commit()
    }

    /// Removes a record. Removing an id that was never indexed is a no-op.
    pub fn remove(&mut self, id: i64) -> IndexResult<()> {
        self.writer.delete_term(self.id_term(id));
        self.commit()
    }

    /// Drops everything and indexes `records` from scratch in one commit.
    pub fn rebuild(&mut self, records: &[ContentRecord]) -> IndexResult<()> {
        let documents = records
            .iter()
            .map(|record| self.document(record))
            .collect::<IndexResult<Vec<_>>>()?;

        self.writer.delete_all_documents()?;
        for document in documents {
            if let Err(e) = self.writer.add_document(document) {
                self.writer.rollback()?;
                return Err(e.into());
            }
        }
        self.commit()
    }

    /// Runs `query`, returning at most `max_results` hits ordered by
    /// descending score, ties broken by ascending id.
    pub fn search(&self, query: &IndexQuery) -> IndexResult<Vec<SearchResult>> {
        if query.is_empty() || query.max_results == 0 {
            return Ok(Vec::new());
        }

        let text = match query.text.as_deref() {
            Some("") => return Ok(Vec::new()),
            Some(text) => Some(
                QueryParser::for_index(&self.index, self.fields.text()).parse_query(text)?,
            ),
            None => None,
        };

        let searcher = self.reader.searcher();
        let highlighter = text
            .as_ref()
            .map(|q| Highlighter::new(&searcher, q.as_ref(), &self.fields))
            .transpose()?;

        let combined = match (text, self.filter(query)) {
            (Some(text), Some(filter)) => boxed(BooleanQuery::new(vec![
                (Occur::Must, text),
                (Occur::Must, boxed(ConstScoreQuery::new(filter, 0.0))),
            ])),
            (Some(text), None) => text,
            (None, Some(filter)) => boxed(ConstScoreQuery::new(filter, FILTER_ONLY_SCORE)),
            (None, None) => return Ok(Vec::new()),
        };

        let collector = TopDocs::with_limit(query.max_results).tweak_score(
            |segment: &SegmentReader| {
                let ids = segment.fast_fields().i64(FIELD_ID).ok();
                move |doc: DocId, score: Score| {
                    let id = ids.as_ref().and_then(|c| c.first(doc)).unwrap_or(i64::MAX);
                    (score, Reverse(id))
                }
            },
        );
        let hits = searcher.search(combined.as_ref(), &collector)?;
        debug!("{:?} matched {} documents", query, hits.len());

        hits.into_iter()
            .map(|((score, _), address)| -> IndexResult<SearchResult> {
                let document: TantivyDocument = searcher.doc(address)?;
                let record = self.stored_record(&document, address)?;
                let highlights = highlighter
                    .as_ref()
                    .map(|h| h.highlights(&record))
                    .unwrap_or_default();
                Ok(SearchResult {
                    content: record,
                    score,
                    highlights,
                })
            })
            .collect()
    }

    /// Exact-term conjunction over category and author.
    fn filter(&self, query: &IndexQuery) -> Option<Box<dyn Query>> {
        let clauses: Vec<(Occur, Box<dyn Query>)> = [
            (self.fields.category, query.category.as_deref()),
            (self.fields.author, query.author.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            let term = Term::from_field_text(field, value?);
            Some((
                Occur::Must,
                boxed(TermQuery::new(term, IndexRecordOption::Basic)),
            ))
        })
        .collect();

        (!clauses.is_empty()).then(|| boxed(BooleanQuery::new(clauses)))
    }

    fn document(&self, record: &ContentRecord) -> IndexResult<TantivyDocument> {
        let f = &self.fields;
        let mut document = TantivyDocument::default();
        document.add_i64(f.id, record.id);
        document.add_text(f.title, &record.title);
        document.add_text(f.body, &record.body);
        for (field, value) in [
            (f.tags, &record.tags),
            (f.category, &record.category),
            (f.author, &record.author),
        ] {
            if let Some(value) = value {
                document.add_text(field, value);
            }
        }
        document.add_text(f.record, serde_json::to_string(record)?);
        Ok(document)
    }

    fn stored_record(
        &self,
        document: &TantivyDocument,
        address: tantivy::DocAddress,
    ) -> IndexResult<ContentRecord> {
        let json = document
            .get_first(self.fields.record)
            .and_then(|v| v.as_str())
            .ok_or(IndexError::MissingRecord(address))?;
        Ok(serde_json::from_str(json)?)
    }

    fn id_term(&self, id: i64) -> Term {
        Term::from_field_i64(self.fields.id, id)
    }

    fn commit(&mut self) -> IndexResult<()> {
        self.writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }
}

fn boxed(query: impl Query + 'static) -> Box<dyn Query> {
    Box::new(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: i64, title: &str, body: &str) -> ContentRecord {
        let now = Utc::now();
        ContentRecord {
            id,
            title: title.to_string(),
            body: body.to_string(),
            category: None,
            author: None,
            tags: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn with_meta(mut r: ContentRecord, category: &str, author: &str) -> ContentRecord {
        r.category = Some(category.to_string());
        r.author = Some(author.to_string());
        r
    }

    fn index_of(records: &[ContentRecord]) -> ContentIndex {
        let mut index = ContentIndex::in_memory().unwrap();
        for r in records {
            index.upsert(r).unwrap();
        }
        index
    }

    fn ids(results: &[SearchResult]) -> Vec<i64> {
        results.iter().map(|r| r.content.id).collect()
    }

    fn text(q: &str) -> IndexQuery {
        IndexQuery::new(Some(q), None, None, DEFAULT_MAX_RESULTS)
    }

    #[test]
    fn test_escape_strips_query_syntax() {
        assert_eq!(escape("RUST AND (title:x)"), "rust and title x");
        assert_eq!(escape("\"exact phrase\" -not +must*"), "exact phrase not must");
        assert_eq!(escape("!!!"), "");
    }

    #[test]
    fn test_text_match_returns_stored_record_with_highlights() {
        let stored = record(1, "A", "hello world");
        let index = index_of(&[stored.clone()]);
        let results = index.search(&text("hello")).unwrap();
        assert_eq!(ids(&results), vec![1]);
        assert_eq!(results[0].content, stored);
        assert!(results[0].score > 0.0);
        assert_eq!(results[0].highlights, vec!["<mark>hello</mark> world"]);
    }

    #[test]
    fn test_query_is_case_insensitive_and_literal() {
        let index = index_of(&[record(1, "Rust", "systems programming")]);
        assert_eq!(ids(&index.search(&text("RUST AND (title:x)")).unwrap()), vec![1]);
    }

    #[test]
    fn test_any_term_matches() {
        let index = index_of(&[
            record(1, "cats", "purr"),
            record(2, "dogs", "bark"),
            record(3, "fish", "swim"),
        ]);
        let mut found = ids(&index.search(&text("cats dogs")).unwrap());
        found.sort();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn test_more_matching_terms_rank_higher() {
        let index = index_of(&[
            record(1, "intro", "rust"),
            record(2, "rust search", "rust search engine"),
            record(3, "other", "nothing relevant"),
        ]);
        let results = index.search(&text("rust search")).unwrap();
        assert_eq!(ids(&results), vec![2, 1]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_tags_are_searchable_but_not_highlighted() {
        let mut r = record(1, "t", "b");
        r.tags = Some("lucene, indexing".into());
        let index = index_of(&[r]);
        let results = index.search(&text("indexing")).unwrap();
        assert_eq!(ids(&results), vec![1]);
        assert!(results[0].highlights.is_empty());
    }

    #[test]
    fn test_category_only_is_exact_and_unhighlighted() {
        let index = index_of(&[
            with_meta(record(1, "a", "x"), "News", "ana"),
            with_meta(record(2, "b", "y"), "news", "ana"),
            with_meta(record(3, "c", "z"), "News Extra", "bob"),
        ]);
        let q = IndexQuery::new(None, Some("News"), None, DEFAULT_MAX_RESULTS);
        let results = index.search(&q).unwrap();
        assert_eq!(ids(&results), vec![1]);
        assert_eq!(results[0].score, FILTER_ONLY_SCORE);
        assert!(results[0].highlights.is_empty());
    }

    #[test]
    fn test_text_and_filters_are_anded() {
        let index = index_of(&[
            with_meta(record(1, "hello", "x"), "news", "ana"),
            with_meta(record(2, "hello", "y"), "news", "bob"),
            with_meta(record(3, "bye", "z"), "news", "ana"),
        ]);
        let q = IndexQuery::new(Some("hello"), Some("news"), Some("ana"), DEFAULT_MAX_RESULTS);
        let results = index.search(&q).unwrap();
        assert_eq!(ids(&results), vec![1]);
        assert_eq!(results[0].highlights, vec!["<mark>hello</mark>"]);
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let index = index_of(&[record(1, "a", "b")]);
        let q = IndexQuery::new(Some("   "), Some(""), None, DEFAULT_MAX_RESULTS);
        assert!(q.is_empty());
        assert!(index.search(&q).unwrap().is_empty());
    }

    #[test]
    fn test_query_without_words_matches_nothing() {
        let index = index_of(&[with_meta(record(1, "a", "b"), "news", "ana")]);
        let q = IndexQuery::new(Some("!!!"), Some("news"), None, DEFAULT_MAX_RESULTS);
        assert!(!q.is_empty());
        assert!(index.search(&q).unwrap().is_empty());
    }

    #[test]
    fn test_max_results_keeps_top_hits() {
        let mut records: Vec<ContentRecord> = (1..=4)
            .map(|id| record(id, "other", "hello filler text here"))
            .collect();
        records.push(record(5, "hello", "hello hello"));
        let index = index_of(&records);
        let q = IndexQuery::new(Some("hello"), None, None, 1);
        assert_eq!(ids(&index.search(&q).unwrap()), vec![5]);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let index = index_of(&[
            with_meta(record(9, "same", "same"), "news", "ana"),
            with_meta(record(3, "same", "same"), "news", "ana"),
            with_meta(record(6, "same", "same"), "news", "ana"),
        ]);
        let q = IndexQuery::new(None, Some("news"), None, 2);
        assert_eq!(ids(&index.search(&q).unwrap()), vec![3, 6]);
    }

    #[test]
    fn test_upsert_replaces_old_terms() {
        let mut index = index_of(&[record(1, "old title", "body")]);
        index.upsert(&record(1, "new title", "body")).unwrap();
        assert_eq!(index.num_docs(), 1);
        assert!(index.search(&text("old")).unwrap().is_empty());
        assert_eq!(ids(&index.search(&text("new")).unwrap()), vec![1]);
    }

    #[test]
    fn test_remove_and_rebuild() {
        let mut index = index_of(&[record(1, "hello", "a"), record(2, "hello", "b")]);
        index.remove(1).unwrap();
        index.remove(1).unwrap();
        assert_eq!(ids(&index.search(&text("hello")).unwrap()), vec![2]);

        index.rebuild(&[record(7, "fresh", "start")]).unwrap();
        assert_eq!(index.num_docs(), 1);
        assert!(index.search(&text("hello")).unwrap().is_empty());
        assert_eq!(ids(&index.search(&text("fresh")).unwrap()), vec![7]);
    }

    #[test]
    fn test_on_disk_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut index = ContentIndex::open(dir.path()).unwrap();
            index.upsert(&record(4, "persisted", "across restarts")).unwrap();
        }

        let reopened = ContentIndex::open(dir.path()).unwrap();
        assert_eq!(reopened.num_docs(), 1);
        let results = reopened.search(&text("restarts")).unwrap();
        assert_eq!(ids(&results), vec![4]);
        assert_eq!(results[0].content.title, "persisted");
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("index");
        let index = ContentIndex::open(&nested).unwrap();
        assert_eq!(index.num_docs(), 0);
        assert!(nested.is_dir());
    }
}
