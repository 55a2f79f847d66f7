//! Extract verb and path shape from a request under the API prefix, and map the
//! pair to a dispatcher action.

use crate::error::AppError;
use crate::search::is_search;
use crate::service::{Action, ApiRequest};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, Method},
};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Other(Method),
}

impl From<&Method> for Verb {
    fn from(m: &Method) -> Self {
        match *m {
            Method::GET => Verb::Get,
            Method::POST => Verb::Post,
            Method::PUT => Verb::Put,
            Method::DELETE => Verb::Delete,
            _ => Verb::Other(m.clone()),
        }
    }
}

/// Path segments after the API prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathShape {
    /// The prefix alone.
    Root,
    /// `/{type}`
    Collection { type_segment: String },
    /// `/{type}/{id}`
    Item { type_segment: String, id: String },
    /// Three or more segments.
    Nested(Vec<String>),
}

impl PathShape {
    pub fn from_path(path: &str) -> Self {
        let mut segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        match segments.len() {
            0 => PathShape::Root,
            1 => PathShape::Collection {
                type_segment: segments.remove(0),
            },
            2 => {
                let id = segments.remove(1);
                PathShape::Item {
                    type_segment: segments.remove(0),
                    id,
                }
            }
            _ => PathShape::Nested(segments),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRoute {
    pub verb: Verb,
    pub shape: PathShape,
}

impl ApiRoute {
    /// Map (verb, shape) to an action. `params` is the query string, used by search.
    pub fn into_request(self, params: Vec<(String, String)>) -> Result<ApiRequest, AppError> {
        use PathShape::{Collection, Item, Nested, Root};
        let (type_segment, action) = match (self.verb, self.shape) {
            (_, Root) => return Err(AppError::BadRequest("missing record type".into())),
            (_, Nested(segments)) => {
                return Err(AppError::BadRequest(format!(
                    "unsupported path /{}",
                    segments.join("/")
                )))
            }
            (Verb::Get, Collection { type_segment }) if is_search(&params) => {
                (type_segment, Action::Search(params))
            }
            (Verb::Get, Collection { type_segment }) => (type_segment, Action::ReadAll),
            (Verb::Get, Item { type_segment, id }) => (type_segment, Action::ReadOne { id }),
            (Verb::Post, Collection { type_segment }) => (type_segment, Action::Create),
            (Verb::Put, Item { type_segment, id }) => (type_segment, Action::Update { id }),
            (Verb::Delete, Item { type_segment, id }) => (type_segment, Action::Delete { id }),
            (Verb::Post, Item { .. }) => {
                return Err(AppError::BadRequest("POST takes no identifier".into()))
            }
            (Verb::Put, Collection { .. }) | (Verb::Delete, Collection { .. }) => {
                return Err(AppError::BadRequest("identifier required".into()))
            }
            (Verb::Other(m), _) => {
                return Err(AppError::BadRequest(format!("unsupported method {m}")))
            }
        };
        Ok(ApiRequest { type_segment, action })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiRoute
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // the prefix route has no `path` parameter
        let path = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|Path(mut params)| params.remove("path"))
            .unwrap_or_default();
        Ok(ApiRoute {
            verb: Verb::from(&parts.method),
            shape: PathShape::from_path(&path),
        })
    }
}
