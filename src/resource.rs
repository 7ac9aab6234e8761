// Post and page CRUD.
//
// Posts and pages share one implementation; the differences live in the
// [`ResourceKind`] policy table (collection path and the fields the API
// refuses on write).

use std::fmt;

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::error::{GhostError, Result};
use crate::transport::{ApiRequest, ApiResponse, RequestBody, Transport};

/// Ordered field mapping of a single post or page.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Posts,
    Pages,
}

impl ResourceKind {
    /// Collection path, also the envelope key of request and response bodies.
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Posts => "posts",
            ResourceKind::Pages => "pages",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            ResourceKind::Posts => "post",
            ResourceKind::Pages => "page",
        }
    }

    /// Fields read back from the API that must not be sent on update.
    pub fn write_denied_fields(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Posts => &["mobiledoc"],
            ResourceKind::Pages => &["mobiledoc", "comment_id", "uuid"],
        }
    }

    /// First record of a response envelope such as `{"posts": [{..}]}`.
    pub fn first_record(self, envelope: &Value) -> Option<&Fields> {
        envelope
            .get(self.collection())?
            .as_array()?
            .first()?
            .as_object()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchBy {
    #[default]
    Id,
    Slug,
}

impl fmt::Display for SearchBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchBy::Id => f.write_str("id"),
            SearchBy::Slug => f.write_str("slug"),
        }
    }
}

/// Overlay `overlay` on `current`, then drop every key in `deny`.
pub fn merge_fields(mut current: Fields, overlay: Fields, deny: &[&str]) -> Fields {
    current.extend(overlay);
    for key in deny {
        current.remove(*key);
    }
    current
}

impl<T: Transport> ApiClient<T> {
    /// Fetch resources of `kind`.
    ///
    /// With `SearchBy::Id` and no value the whole collection is returned.
    /// A slug search needs a value and fails before any request otherwise.
    /// `params` are passed as query parameters (e.g. `formats=html`).
    pub fn get(
        &self,
        kind: ResourceKind,
        id_or_slug: Option<&str>,
        search_by: SearchBy,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        let collection = kind.collection();
        let url = match (search_by, id_or_slug) {
            (SearchBy::Id, None) => self.endpoint(&[collection]),
            (SearchBy::Id, Some(id)) => self.endpoint(&[collection, id]),
            (SearchBy::Slug, Some(slug)) => self.endpoint(&[collection, "slug", slug]),
            (SearchBy::Slug, None) => {
                return Err(GhostError::Validation(format!(
                    "a slug is required to search {collection} by slug"
                )))
            }
        };

        let req = params
            .iter()
            .fold(ApiRequest::new(Method::GET, url), |req, (name, value)| {
                req.query(*name, *value)
            });
        self.send(req)?.expect_status(200)
    }

    /// Create a resource from HTML content. Returns the response envelope
    /// with the created record, including its assigned id.
    pub fn create(&self, kind: ResourceKind, fields: Fields) -> Result<Value> {
        let req = ApiRequest::new(Method::POST, self.endpoint(&[kind.collection()]))
            .query("source", "html")
            .body(RequestBody::Json(envelope(kind, fields)));

        let body = self.send(req)?.expect_status(201)?;
        if let Some(id) = kind.first_record(&body).and_then(|r| r.get("id")) {
            info!(%id, "created {}", kind.singular());
        }
        Ok(body)
    }

    /// Update a resource in place: the current record is fetched, `new_fields`
    /// are laid over it, and the result is written back by id.
    ///
    /// The lookup must resolve to exactly one record; otherwise nothing is
    /// written.
    pub fn update(
        &self,
        kind: ResourceKind,
        new_fields: Fields,
        id_or_slug: &str,
        search_by: SearchBy,
    ) -> Result<Value> {
        let current = self.get(kind, Some(id_or_slug), search_by, &[])?;
        let records = current
            .get(kind.collection())
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let record = match records {
            [only] => only.as_object().cloned().ok_or_else(|| {
                GhostError::UnexpectedResponse(format!("{} record is not an object", kind))
            })?,
            [] => {
                return Err(GhostError::NotFound {
                    collection: kind.collection().to_string(),
                    search_by: search_by.to_string(),
                    value: id_or_slug.to_string(),
                })
            }
            _ => {
                return Err(GhostError::Ambiguous {
                    collection: kind.collection().to_string(),
                    search_by: search_by.to_string(),
                    value: id_or_slug.to_string(),
                })
            }
        };

        let id = match search_by {
            SearchBy::Id => id_or_slug.to_string(),
            SearchBy::Slug => record
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    GhostError::UnexpectedResponse(format!(
                        "{} {id_or_slug} has no id",
                        kind.singular()
                    ))
                })?,
        };

        let merged = merge_fields(record, new_fields, kind.write_denied_fields());
        let req = ApiRequest::new(Method::PUT, self.endpoint(&[kind.collection(), &id]))
            .query("source", "html")
            .body(RequestBody::Json(envelope(kind, merged)));

        let body = self.send(req)?.expect_status(200)?;
        info!(%id, "updated {}", kind.singular());
        Ok(body)
    }

    /// Delete a resource by id. The API has no slug-based delete.
    ///
    /// Any non-2xx status is raised as an API error; on success the raw
    /// response is returned (normally 204 with an empty body).
    pub fn delete(&self, kind: ResourceKind, id: &str) -> Result<ApiResponse> {
        let req = ApiRequest::new(Method::DELETE, self.endpoint(&[kind.collection(), id]));
        let res = self.send(req)?;
        if !res.is_success() {
            return Err(GhostError::from_response(res.status, &res.body));
        }
        debug!(status = res.status, %id, "deleted {}", kind.singular());
        Ok(res)
    }
}

fn envelope(kind: ResourceKind, fields: Fields) -> Value {
    let mut body = Map::new();
    body.insert(
        kind.collection().to_string(),
        Value::Array(vec![Value::Object(fields)]),
    );
    Value::Object(body)
}
