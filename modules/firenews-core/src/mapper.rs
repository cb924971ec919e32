//! Translation between [`Article`] and a store's field map.
//!
//! Two encodings are in play:
//! - typed envelope: every value wrapped as `{"stringValue": "x"}`,
//!   `{"integerValue": "42"}`, `{"timestampValue": "..."}`, ... (Firestore REST)
//! - native: plain JSON scalars (Postgres JSONB, in-memory store)
//!
//! Writes use the encoding the store asks for. Reads accept either, and never
//! fail on an individual field: absent or mistyped values decode to the zero
//! value of their type.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use firenews_common::{Article, FireScore, Label, ModeratorNote};

use crate::store::{FieldMap, Scalar, StoredDocument};

/// Persisted field names.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const URL: &str = "url";
    pub const SOURCE: &str = "source";
    pub const AUTHOR: &str = "author";
    pub const PUBLISHED_AT: &str = "published_at";
    pub const SUBMITTED_AT: &str = "submitted_at";
    pub const FIRE_SCORE: &str = "fire_score";
    pub const SCORED_AT: &str = "scored_at";
    pub const MODEL_VERSION: &str = "model_version";
    pub const NEEDS_MODERATION: &str = "needs_moderation";

    pub const NOTE: &str = "note";
    pub const NEW_LABEL: &str = "new_label";
    pub const CREATED_AT: &str = "created_at";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    TypedEnvelope,
    Native,
}

/// Storage id from a fully qualified resource name: the final path segment.
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Builds a field map in one encoding.
pub struct FieldWriter {
    encoding: FieldEncoding,
    fields: FieldMap,
}

impl FieldWriter {
    pub fn new(encoding: FieldEncoding) -> Self {
        Self {
            encoding,
            fields: FieldMap::new(),
        }
    }

    fn put(mut self, key: &str, envelope: &str, native: Value, wrapped: Value) -> Self {
        let value = match self.encoding {
            FieldEncoding::Native => native,
            FieldEncoding::TypedEnvelope => {
                let mut env = FieldMap::new();
                env.insert(envelope.to_string(), wrapped);
                Value::Object(env)
            }
        };
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn string(self, key: &str, value: &str) -> Self {
        self.put(key, "stringValue", Value::from(value), Value::from(value))
    }

    /// Firestore transports int64 as a decimal string.
    pub fn integer(self, key: &str, value: i64) -> Self {
        self.put(key, "integerValue", Value::from(value), Value::from(value.to_string()))
    }

    pub fn boolean(self, key: &str, value: bool) -> Self {
        self.put(key, "booleanValue", Value::from(value), Value::from(value))
    }

    pub fn timestamp(self, key: &str, value: &DateTime<Utc>) -> Self {
        let formatted = format_timestamp(value);
        self.put(key, "timestampValue", Value::from(formatted.clone()), Value::from(formatted))
    }

    pub fn build(self) -> FieldMap {
        self.fields
    }
}

/// Encode a filter operand the way the store expects it.
pub fn encode_scalar(encoding: FieldEncoding, scalar: &Scalar) -> Value {
    let writer = FieldWriter::new(encoding);
    let writer = match scalar {
        Scalar::Bool(b) => writer.boolean("v", *b),
        Scalar::Integer(i) => writer.integer("v", *i),
        Scalar::String(s) => writer.string("v", s),
    };
    writer.build().remove("v").unwrap_or(Value::Null)
}

/// All persisted fields of a new article. `submitted_at` and `scored_at`
/// are stamped with `now`; a new article is never flagged.
pub fn to_storage_fields(article: &Article, encoding: FieldEncoding, now: DateTime<Utc>) -> FieldMap {
    let score = article.score_or_zero();
    FieldWriter::new(encoding)
        .string(fields::TITLE, &article.title)
        .string(fields::CONTENT, &article.content)
        .string(fields::URL, article.url.as_deref().unwrap_or_default())
        .string(fields::SOURCE, &article.source)
        .string(fields::AUTHOR, article.author.as_deref().unwrap_or_default())
        .timestamp(fields::PUBLISHED_AT, &article.published_at)
        .timestamp(fields::SUBMITTED_AT, &now)
        .integer(fields::FIRE_SCORE, score)
        .timestamp(fields::SCORED_AT, &now)
        .string(fields::MODEL_VERSION, &article.model_version)
        .boolean(fields::NEEDS_MODERATION, false)
        .build()
}

pub fn moderation_flag_fields(encoding: FieldEncoding, needs_moderation: bool) -> FieldMap {
    FieldWriter::new(encoding)
        .boolean(fields::NEEDS_MODERATION, needs_moderation)
        .build()
}

/// Score and flag written together so a reader never sees one without the other.
pub fn override_fields(encoding: FieldEncoding, score: i64, now: DateTime<Utc>) -> FieldMap {
    FieldWriter::new(encoding)
        .integer(fields::FIRE_SCORE, score)
        .boolean(fields::NEEDS_MODERATION, false)
        .timestamp(fields::SCORED_AT, &now)
        .build()
}

pub fn note_fields(
    encoding: FieldEncoding,
    note: &str,
    new_label: Label,
    now: DateTime<Utc>,
) -> FieldMap {
    FieldWriter::new(encoding)
        .string(fields::NOTE, note)
        .string(fields::NEW_LABEL, &new_label.to_string())
        .timestamp(fields::CREATED_AT, &now)
        .build()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Split `{"xValue": inner}` into `(Some("xValue"), inner)`; anything else is
/// a native value.
pub(crate) fn unwrap_envelope(value: &Value) -> (Option<&str>, &Value) {
    if let Value::Object(map) = value {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                if key.ends_with("Value") {
                    return (Some(key.as_str()), inner);
                }
            }
        }
    }
    (None, value)
}

/// Tolerant reader over a field map in either encoding.
pub struct FieldReader<'a> {
    fields: &'a FieldMap,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a FieldMap) -> Self {
        Self { fields }
    }

    /// The field's payload, or `None` when absent or explicitly null.
    fn raw(&self, key: &str) -> Option<(Option<&'a str>, &'a Value)> {
        let (kind, inner) = unwrap_envelope(self.fields.get(key)?);
        if inner.is_null() || kind == Some("nullValue") {
            return None;
        }
        Some((kind, inner))
    }

    pub fn opt_string(&self, key: &str) -> Option<String> {
        match self.raw(key)? {
            (None | Some("stringValue"), Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn string(&self, key: &str) -> String {
        self.opt_string(key).unwrap_or_default()
    }

    /// Empty strings read as absent.
    pub fn non_empty_string(&self, key: &str) -> Option<String> {
        self.opt_string(key).filter(|s| !s.is_empty())
    }

    /// `None` when absent or null. Present but unreadable values are 0;
    /// floats and integer strings are truncated to an integer.
    pub fn opt_integer(&self, key: &str) -> Option<i64> {
        let (kind, inner) = self.raw(key)?;
        let value = match (kind, inner) {
            (None | Some("integerValue") | Some("doubleValue"), Value::Number(n)) => {
                n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            }
            (Some("integerValue") | Some("doubleValue"), Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64)),
            _ => None,
        };
        Some(value.unwrap_or(0))
    }

    pub fn integer(&self, key: &str) -> i64 {
        self.opt_integer(key).unwrap_or(0)
    }

    pub fn boolean(&self, key: &str) -> bool {
        matches!(
            self.raw(key),
            Some((None | Some("booleanValue"), Value::Bool(true)))
        )
    }

    pub fn opt_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.raw(key)? {
            (None | Some("timestampValue") | Some("stringValue"), Value::String(s)) => {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            _ => None,
        }
    }

    /// Zero time is the Unix epoch.
    pub fn timestamp(&self, key: &str) -> DateTime<Utc> {
        self.opt_timestamp(key).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Decode a stored article. Never fails; see module docs.
///
/// The stored score carries no confidence, so it is derived from the score.
/// The score's timestamp is `scored_at`, falling back to `submitted_at` for
/// records written before overrides stamped it.
pub fn from_storage_fields(id: &str, fields: &FieldMap) -> Article {
    let r = FieldReader::new(fields);
    let submitted_at = r.opt_timestamp(fields::SUBMITTED_AT);
    let scored_at = r
        .opt_timestamp(fields::SCORED_AT)
        .or(submitted_at)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Article {
        id: Some(id.to_string()),
        title: r.string(fields::TITLE),
        content: r.string(fields::CONTENT),
        url: r.non_empty_string(fields::URL),
        source: r.string(fields::SOURCE),
        author: r.non_empty_string(fields::AUTHOR),
        published_at: r.timestamp(fields::PUBLISHED_AT),
        submitted_at,
        model_version: r.string(fields::MODEL_VERSION),
        fire_score: r
            .opt_integer(fields::FIRE_SCORE)
            .map(|score| FireScore::from_stored(score, scored_at)),
        needs_moderation: r.boolean(fields::NEEDS_MODERATION),
    }
}

pub fn article_from_document(doc: &StoredDocument) -> Article {
    from_storage_fields(document_id(&doc.name), &doc.fields)
}

/// Decode one stored note; `sequence` is its 1-based creation position.
pub fn note_from_document(article_id: &str, doc: &StoredDocument, sequence: usize) -> ModeratorNote {
    let r = FieldReader::new(&doc.fields);
    ModeratorNote {
        id: document_id(&doc.name).to_string(),
        article_id: article_id.to_string(),
        note: r.string(fields::NOTE),
        new_label: r.opt_string(fields::NEW_LABEL).and_then(|l| l.parse().ok()),
        created_at: r.timestamp(fields::CREATED_AT),
        sequence,
    }
}
