use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED, STRING, TEXT};

/// Field names for the content index
pub const FIELD_ID: &str = "id";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_BODY: &str = "body";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_CATEGORY: &str = "category";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_RECORD: &str = "record";

/// Build the Tantivy schema for indexing content records
pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // ID: indexed for deletes, fast for tie-breaking on equal scores
    schema_builder.add_i64_field(FIELD_ID, INDEXED | STORED | FAST);

    // Free-text fields, tokenized and lowercased by the default analyzer
    schema_builder.add_text_field(FIELD_TITLE, TEXT);
    schema_builder.add_text_field(FIELD_BODY, TEXT);
    schema_builder.add_text_field(FIELD_TAGS, TEXT);

    // Exact-match filters: a single untokenized term, case preserved
    schema_builder.add_text_field(FIELD_CATEGORY, STRING);
    schema_builder.add_text_field(FIELD_AUTHOR, STRING);

    // The full record as JSON, so hits come back without a repository round-trip
    schema_builder.add_text_field(FIELD_RECORD, STORED);

    schema_builder.build()
}

/// Resolved field handles for an opened index.
#[derive(Debug, Clone, Copy)]
pub struct ContentFields {
    pub id: Field,
    pub title: Field,
    pub body: Field,
    pub tags: Field,
    pub category: Field,
    pub author: Field,
    pub record: Field,
}

impl ContentFields {
    /// Looks every field up by name. Fails when an on-disk index was written
    /// with a different schema.
    pub fn resolve(schema: &Schema) -> tantivy::Result<Self> {
        Ok(Self {
            id: schema.get_field(FIELD_ID)?,
            title: schema.get_field(FIELD_TITLE)?,
            body: schema.get_field(FIELD_BODY)?,
            tags: schema.get_field(FIELD_TAGS)?,
            category: schema.get_field(FIELD_CATEGORY)?,
            author: schema.get_field(FIELD_AUTHOR)?,
            record: schema.get_field(FIELD_RECORD)?,
        })
    }

    /// Fields searched by the free-text query.
    pub fn text(&self) -> Vec<Field> {
        vec![self.title, self.body, self.tags]
    }
}
