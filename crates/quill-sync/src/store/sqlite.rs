//! SQLite content store.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use quill_content::{ContentAttributes, ContentFormat, ContentType, ParseStatus};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::{ContentRecord, ContentStore, ReplaceOutcome, StoreError, StoredContent};
use crate::Scope;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS content (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant TEXT NOT NULL,
    slug TEXT NOT NULL,
    title TEXT NOT NULL,
    content_type TEXT NOT NULL,
    format TEXT NOT NULL,
    source_path TEXT NOT NULL,
    raw_content TEXT NOT NULL,
    processed_content TEXT,
    parse_status TEXT NOT NULL,
    parse_errors TEXT,
    publish_at TEXT,
    expires_at TEXT,
    meta_title TEXT,
    meta_description TEXT,
    og_image TEXT,
    og_title TEXT,
    og_description TEXT,
    tags TEXT NOT NULL,
    protected INTEGER NOT NULL,
    metadata TEXT NOT NULL,
    synced_at TEXT NOT NULL,
    UNIQUE (tenant, slug, content_type)
);
CREATE INDEX IF NOT EXISTS content_tenant ON content (tenant);
";

const COLUMNS: &str = "tenant, slug, title, content_type, format, source_path, raw_content, \
    processed_content, parse_status, parse_errors, publish_at, expires_at, meta_title, \
    meta_description, og_image, og_title, og_description, tags, protected, metadata, synced_at";

/// Rows per INSERT statement; 21 bound columns each stays well under
/// SQLite's variable limit.
const INSERT_CHUNK: usize = 500;

/// Content store backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    ///
    /// In-memory databases (`sqlite::memory:`) get a single long-lived
    /// connection so every query sees the same database.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        if !in_memory
            && let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        tracing::debug!(url = %url, "Content store ready");

        Ok(Self { pool })
    }
}

impl ContentStore for SqliteStore {
    async fn replace_all(
        &self,
        scope: &Scope,
        items: &[ContentAttributes],
    ) -> Result<ReplaceOutcome, StoreError> {
        let rows = items
            .iter()
            .map(EncodedRow::new)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await?;
        let result = write_tenant(&mut tx, scope.tenant(), rows).await;

        match result {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(error = %rollback, "Failed to roll back content transaction");
                }
                Err(classify(err, items))
            }
        }
    }

    async fn list(&self, scope: &Scope) -> Result<Vec<ContentRecord>, StoreError> {
        let query = format!(
            "SELECT id, {COLUMNS} FROM content WHERE tenant = ? ORDER BY source_path, id"
        );
        let rows = sqlx::query(&query)
            .bind(scope.tenant())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode_record).collect()
    }
}

async fn write_tenant(
    conn: &mut SqliteConnection,
    tenant: &str,
    rows: Vec<EncodedRow>,
) -> Result<ReplaceOutcome, StoreError> {
    let deleted = sqlx::query("DELETE FROM content WHERE tenant = ?")
        .bind(tenant)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let synced_at = Utc::now().to_rfc3339();
    let mut stored = Vec::with_capacity(rows.len());
    let mut rows = rows.into_iter().peekable();

    while rows.peek().is_some() {
        let chunk: Vec<EncodedRow> = rows.by_ref().take(INSERT_CHUNK).collect();

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("INSERT INTO content ({COLUMNS}) "));
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(tenant.to_owned())
                .push_bind(row.slug)
                .push_bind(row.title)
                .push_bind(row.content_type)
                .push_bind(row.format)
                .push_bind(row.source_path)
                .push_bind(row.raw_content)
                .push_bind(row.processed_content)
                .push_bind(row.parse_status)
                .push_bind(row.parse_errors)
                .push_bind(row.publish_at)
                .push_bind(row.expires_at)
                .push_bind(row.meta_title)
                .push_bind(row.meta_description)
                .push_bind(row.og_image)
                .push_bind(row.og_title)
                .push_bind(row.og_description)
                .push_bind(row.tags)
                .push_bind(row.protected)
                .push_bind(row.metadata)
                .push_bind(synced_at.clone());
        });
        builder.push(" RETURNING id, slug, content_type, parse_status");

        let inserted = builder.build().fetch_all(&mut *conn).await?;
        for row in &inserted {
            stored.push(decode_stored(row)?);
        }
    }

    stored.sort_by_key(|s| s.id);
    Ok(ReplaceOutcome { deleted, stored })
}

/// Turn a unique-key violation into [`StoreError::Constraint`] naming the
/// first duplicated `(slug, type)` pair.
fn classify(err: StoreError, items: &[ContentAttributes]) -> StoreError {
    let StoreError::Database(sqlx::Error::Database(db)) = &err else {
        return err;
    };
    if !db.is_unique_violation() {
        return err;
    }

    let mut seen = HashSet::new();
    items
        .iter()
        .find(|item| !seen.insert((item.slug.as_str(), item.content_type)))
        .map_or(err, |dup| StoreError::Constraint {
            slug: dup.slug.clone(),
            content_type: dup.content_type,
        })
}

/// Column values of one record, owned so they can be bound.
struct EncodedRow {
    slug: String,
    title: String,
    content_type: &'static str,
    format: &'static str,
    source_path: String,
    raw_content: String,
    processed_content: Option<String>,
    parse_status: &'static str,
    parse_errors: Option<String>,
    publish_at: Option<String>,
    expires_at: Option<String>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    og_image: Option<String>,
    og_title: Option<String>,
    og_description: Option<String>,
    tags: String,
    protected: bool,
    metadata: String,
}

impl EncodedRow {
    fn new(item: &ContentAttributes) -> Result<Self, StoreError> {
        Ok(Self {
            slug: item.slug.clone(),
            title: item.title.clone(),
            content_type: item.content_type.as_str(),
            format: item.format.as_str(),
            source_path: item.source_path.clone(),
            raw_content: item.raw_content.clone(),
            processed_content: item.processed_content.clone(),
            parse_status: item.parse_status.as_str(),
            parse_errors: item
                .parse_errors
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            publish_at: item.publish_at.map(|t| t.to_rfc3339()),
            expires_at: item.expires_at.map(|t| t.to_rfc3339()),
            meta_title: item.meta_title.clone(),
            meta_description: item.meta_description.clone(),
            og_image: item.og_image.clone(),
            og_title: item.og_title.clone(),
            og_description: item.og_description.clone(),
            tags: serde_json::to_string(&item.tags)?,
            protected: item.protected,
            metadata: serde_json::to_string(&item.metadata)?,
        })
    }
}

fn decode_stored(row: &SqliteRow) -> Result<StoredContent, StoreError> {
    Ok(StoredContent {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        content_type: decode_content_type(row)?,
        parse_status: decode_status(row)?,
    })
}

fn decode_record(row: &SqliteRow) -> Result<ContentRecord, StoreError> {
    let format: String = row.try_get("format")?;
    let parse_errors: Option<String> = row.try_get("parse_errors")?;
    let tags: String = row.try_get("tags")?;
    let metadata: String = row.try_get("metadata")?;

    let attributes = ContentAttributes {
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        content_type: decode_content_type(row)?,
        format: ContentFormat::parse(&format)
            .ok_or_else(|| StoreError::Decode(format!("unknown format '{format}'")))?,
        source_path: row.try_get("source_path")?,
        raw_content: row.try_get("raw_content")?,
        processed_content: row.try_get("processed_content")?,
        parse_status: decode_status(row)?,
        parse_errors: parse_errors
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        publish_at: decode_timestamp(row, "publish_at")?,
        expires_at: decode_timestamp(row, "expires_at")?,
        meta_title: row.try_get("meta_title")?,
        meta_description: row.try_get("meta_description")?,
        og_image: row.try_get("og_image")?,
        og_title: row.try_get("og_title")?,
        og_description: row.try_get("og_description")?,
        tags: serde_json::from_str(&tags)?,
        protected: row.try_get("protected")?,
        metadata: serde_json::from_str(&metadata)?,
    };

    Ok(ContentRecord {
        id: row.try_get("id")?,
        attributes,
    })
}

fn decode_content_type(row: &SqliteRow) -> Result<ContentType, StoreError> {
    let value: String = row.try_get("content_type")?;
    ContentType::parse(&value)
        .ok_or_else(|| StoreError::Decode(format!("unknown content type '{value}'")))
}

fn decode_status(row: &SqliteRow) -> Result<ParseStatus, StoreError> {
    let value: String = row.try_get("parse_status")?;
    ParseStatus::parse(&value)
        .ok_or_else(|| StoreError::Decode(format!("unknown parse status '{value}'")))
}

fn decode_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    let value: Option<String> = row.try_get(column)?;
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| StoreError::Decode(format!("{column}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use quill_content::{ErrorType, ParseErrors};

    use super::*;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn page(slug: &str, content_type: ContentType) -> ContentAttributes {
        ContentAttributes {
            slug: slug.to_owned(),
            title: format!("Title {slug}"),
            content_type,
            format: ContentFormat::Markdown,
            source_path: format!("{slug}.md"),
            raw_content: "# Hi".to_owned(),
            processed_content: Some("<h1>Hi</h1>\n".to_owned()),
            parse_status: ParseStatus::Success,
            parse_errors: None,
            publish_at: None,
            expires_at: None,
            meta_title: None,
            meta_description: None,
            og_image: None,
            og_title: None,
            og_description: None,
            tags: Vec::new(),
            protected: false,
            metadata: BTreeMap::new(),
        }
    }

    fn slugs(records: &[ContentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.attributes.slug.as_str()).collect()
    }

    #[tokio::test]
    async fn test_replace_and_list_preserves_all_fields() {
        let store = memory_store().await;
        let scope = Scope::new("acme");

        let mut rich = page("launch", ContentType::Blog);
        rich.publish_at = Some("2024-05-01T09:30:00Z".parse().unwrap());
        rich.tags = vec!["news".to_owned(), "release".to_owned()];
        rich.protected = true;
        rich.og_title = Some("Launch".to_owned());
        rich.metadata
            .insert("author".to_owned(), serde_json::json!("jo"));

        let mut broken = page("broken", ContentType::Page);
        broken.format = ContentFormat::Html;
        broken.source_path = "broken.html".to_owned();
        broken.processed_content = None;
        broken.parse_status = ParseStatus::Error;
        broken.parse_errors = Some(
            ParseErrors::new(ErrorType::SyntaxError, "bad").with_position(Some(2), Some(4)),
        );

        let outcome = store
            .replace_all(&scope, &[rich.clone(), broken.clone()])
            .await
            .unwrap();
        assert_eq!(outcome.deleted, 0);
        assert_eq!(outcome.stored.len(), 2);

        let listed = store.list(&scope).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].attributes, broken);
        assert_eq!(listed[1].attributes, rich);
    }

    #[tokio::test]
    async fn test_replace_removes_previous_content() {
        let store = memory_store().await;
        let scope = Scope::new("acme");

        store
            .replace_all(&scope, &[page("a", ContentType::Blog), page("b", ContentType::Blog)])
            .await
            .unwrap();
        let outcome = store
            .replace_all(&scope, &[page("c", ContentType::Page)])
            .await
            .unwrap();

        assert_eq!(outcome.deleted, 2);
        assert_eq!(slugs(&store.list(&scope).await.unwrap()), vec!["c"]);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = memory_store().await;
        let acme = Scope::new("acme");
        let globex = Scope::new("globex");

        store
            .replace_all(&acme, &[page("a", ContentType::Blog)])
            .await
            .unwrap();
        store
            .replace_all(&globex, &[page("a", ContentType::Blog)])
            .await
            .unwrap();
        store.replace_all(&globex, &[]).await.unwrap();

        assert_eq!(slugs(&store.list(&acme).await.unwrap()), vec!["a"]);
        assert!(store.list(&globex).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_slug_different_type_allowed() {
        let store = memory_store().await;
        let scope = Scope::new("acme");

        let outcome = store
            .replace_all(
                &scope,
                &[page("home", ContentType::Page), page("home", ContentType::Landing)],
            )
            .await
            .unwrap();

        assert_eq!(outcome.stored.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_rolls_back_whole_replace() {
        let store = memory_store().await;
        let scope = Scope::new("acme");
        store
            .replace_all(&scope, &[page("keep", ContentType::Blog)])
            .await
            .unwrap();

        let err = store
            .replace_all(
                &scope,
                &[
                    page("x", ContentType::Blog),
                    page("dup", ContentType::Page),
                    page("dup", ContentType::Page),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Constraint { ref slug, content_type: ContentType::Page } if slug == "dup"
        ));
        assert_eq!(slugs(&store.list(&scope).await.unwrap()), vec!["keep"]);
    }

    #[tokio::test]
    async fn test_large_batch_spans_chunks() {
        let store = memory_store().await;
        let scope = Scope::new("acme");
        let items: Vec<_> = (0..INSERT_CHUNK + 7)
            .map(|i| page(&format!("p{i:04}"), ContentType::Documentation))
            .collect();

        let outcome = store.replace_all(&scope, &items).await.unwrap();

        assert_eq!(outcome.stored.len(), INSERT_CHUNK + 7);
        assert!(outcome.stored.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("content.db");
        let url = format!("sqlite://{}", path.display());

        let store = SqliteStore::connect(&url).await.unwrap();
        store
            .replace_all(&Scope::new("acme"), &[page("a", ContentType::Blog)])
            .await
            .unwrap();

        assert!(path.exists());
        let reopened = SqliteStore::connect(&url).await.unwrap();
        assert_eq!(reopened.list(&Scope::new("acme")).await.unwrap().len(), 1);
    }
}
