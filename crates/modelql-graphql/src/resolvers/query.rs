//! Query resolvers.
//!
//! A query resolver combines the auth filter of its segment with the range
//! filter built from the arguments, then reads through the resource's store:
//! a count, a projected list, a page or a single record.

use modelql_storage::{FindOptions, ID_FIELD, OWNER_FIELD, SortParam};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::options::{AuthSegment, QueryPart, QueryRange};

/// Field of the `NameAndId` type that carries the record's label.
pub const NAME_FIELD: &str = "name";

/// Builds the owner filter of `segment`.
///
/// # Errors
///
/// `Self` and `Others` need a caller; without one this returns
/// [`ResolveError::Unauthenticated`].
pub fn auth_filter(segment: AuthSegment, caller: Option<&str>) -> Result<Value, ResolveError> {
    let caller = || {
        caller.ok_or_else(|| {
            ResolveError::Unauthenticated(format!("{} queries need a caller", segment.key()))
        })
    };
    Ok(match segment {
        AuthSegment::Owned => json!({ OWNER_FIELD: caller()? }),
        AuthSegment::Others => json!({ OWNER_FIELD: { "$ne": caller()? } }),
        AuthSegment::Mixed => json!({}),
    })
}

/// Returns `true` if `record` is visible in `segment` for `caller`.
#[must_use]
pub fn segment_allows(segment: AuthSegment, record: &Value, caller: Option<&str>) -> bool {
    let owner = record.get(OWNER_FIELD).and_then(Value::as_str);
    match segment {
        AuthSegment::Owned => caller.is_some() && owner == caller,
        AuthSegment::Others => caller.is_some() && owner != caller,
        AuthSegment::Mixed => true,
    }
}

/// Joins two filters with `$and`, dropping empty ones.
#[must_use]
pub fn combine_filters(left: Value, right: Value) -> Value {
    let is_empty = |filter: &Value| filter.as_object().is_some_and(Map::is_empty);
    match (is_empty(&left), is_empty(&right)) {
        (true, _) => right,
        (_, true) => left,
        _ => json!({ "$and": [left, right] }),
    }
}

/// Pagination arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
    pub sort: Vec<SortParam>,
}

impl Pagination {
    /// Reads `pagination: { page, limit, sort }` from the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::BadArgument`] if the input is missing, or if
    /// `page` or `limit` is not a positive integer.
    pub fn from_args(args: &Value) -> Result<Self, ResolveError> {
        let input = args
            .get("pagination")
            .filter(|value| value.is_object())
            .ok_or_else(|| ResolveError::BadArgument("pagination is required".into()))?;
        let positive = |key: &str| {
            input
                .get(key)
                .and_then(Value::as_u64)
                .filter(|n| *n > 0)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    ResolveError::BadArgument(format!("pagination.{key} must be a positive integer"))
                })
        };
        Ok(Self {
            page: positive("page")?,
            limit: positive("limit")?,
            sort: input
                .get("sort")
                .map(SortParam::from_document)
                .unwrap_or_default(),
        })
    }

    #[must_use]
    pub fn skip(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Resolver of one generated query field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResolver {
    pub resource: String,
    pub range: QueryRange,
    pub segment: AuthSegment,
    pub part: QueryPart,
    /// Fields kept for `whole` parts: those of the segment's root object.
    pub projection: Vec<String>,
    /// Record field reported as `name` by `nameAndId` parts. Without one
    /// the name is null.
    pub label: Option<String>,
}

impl QueryResolver {
    /// Builds the store filter for a call.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing caller or malformed arguments.
    pub fn filter(&self, caller: Option<&str>, args: &Value) -> Result<Value, ResolveError> {
        let auth = auth_filter(self.segment, caller)?;
        let range = match self.range {
            QueryRange::All => json!({}),
            QueryRange::Filtered | QueryRange::Paginated => match args.get("filter") {
                None | Some(Value::Null) => json!({}),
                Some(filter @ Value::Object(_)) => filter.clone(),
                Some(_) => return Err(ResolveError::BadArgument("filter must be an object".into())),
            },
            QueryRange::Id => {
                let id = args
                    .get(ID_FIELD)
                    .and_then(Value::as_str)
                    .ok_or_else(|| ResolveError::BadArgument("id is required".into()))?;
                json!({ ID_FIELD: id })
            }
        };
        Ok(combine_filters(auth, range))
    }

    fn projection(&self) -> Vec<String> {
        match self.part {
            QueryPart::NameAndId => std::iter::once(ID_FIELD.to_string())
                .chain(self.label.clone())
                .collect(),
            _ => self.projection.clone(),
        }
    }

    /// Reshapes `nameAndId` records into `{ id, name }`.
    fn shape(&self, records: Vec<Value>) -> Value {
        if self.part != QueryPart::NameAndId {
            return Value::Array(records);
        }
        records
            .into_iter()
            .map(|record| {
                let label = self
                    .label
                    .as_deref()
                    .and_then(|label| record.get(label))
                    .cloned()
                    .unwrap_or(Value::Null);
                json!({
                    ID_FIELD: record.get(ID_FIELD).cloned().unwrap_or(Value::Null),
                    NAME_FIELD: label,
                })
            })
            .collect()
    }

    /// Runs the query.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing caller, malformed arguments or a
    /// storage failure.
    pub async fn resolve(&self, ctx: &RequestContext, args: &Value) -> Result<Value, ResolveError> {
        let filter = self.filter(ctx.caller_id.as_deref(), args)?;
        let store = ctx.store(&self.resource)?;
        debug!(
            resource = %self.resource,
            range = self.range.key(),
            segment = self.segment.key(),
            part = self.part.key(),
            request_id = %ctx.request_id,
            "Resolving query"
        );

        if self.part == QueryPart::Count {
            return Ok(json!(store.count(&filter).await?));
        }

        let options = FindOptions::new().with_projection(self.projection());
        match self.range {
            QueryRange::Id => {
                let found = store.find(&filter, &options.with_limit(1)).await?;
                Ok(found.into_iter().next().unwrap_or(Value::Null))
            }
            QueryRange::Paginated => {
                let pagination = Pagination::from_args(args)?;
                let options = options
                    .with_skip(pagination.skip())
                    .with_limit(pagination.limit)
                    .with_sort(pagination.sort.clone());
                let docs = store.find(&filter, &options).await?;
                if self.part == QueryPart::Whole {
                    let total = store.count(&filter).await?;
                    Ok(json!({
                        "docs": docs,
                        "total": total,
                        "page": pagination.page,
                        "limit": pagination.limit,
                    }))
                } else {
                    Ok(self.shape(docs))
                }
            }
            QueryRange::All | QueryRange::Filtered => {
                Ok(self.shape(store.find(&filter, &options).await?))
            }
        }
    }
}
