use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::stac::Collection;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned status {status}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
    },
    #[error("Failed to encode {id}: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Joins `path` onto a base URL with exactly one slash between them.
pub fn parse_href(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Sends one JSON document and reports the response status.
pub trait StacTransport {
    fn send(&self, method: Method, url: &str, body: &Value) -> Result<StatusCode, ApiError>;
}

#[async_trait(?Send)]
pub trait AsyncStacTransport {
    async fn send(&self, method: Method, url: &str, body: &Value) -> Result<StatusCode, ApiError>;
}

fn client_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Blocking HTTP implementation of [`StacTransport`].
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(client_timeout())
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { client })
    }
}

impl StacTransport for HttpTransport {
    fn send(&self, method: Method, url: &str, body: &Value) -> Result<StatusCode, ApiError> {
        self.client
            .request(method.clone(), url)
            .json(body)
            .send()
            .map(|response| response.status())
            .map_err(|source| ApiError::Transport {
                method,
                url: url.to_string(),
                source,
            })
    }
}

/// Async HTTP implementation of [`AsyncStacTransport`]. One client session is
/// shared by every request.
#[derive(Debug)]
pub struct AsyncHttpTransport {
    client: reqwest::Client,
}

impl AsyncHttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(client_timeout())
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl AsyncStacTransport for AsyncHttpTransport {
    async fn send(&self, method: Method, url: &str, body: &Value) -> Result<StatusCode, ApiError> {
        self.client
            .request(method.clone(), url)
            .json(body)
            .send()
            .await
            .map(|response| response.status())
            .map_err(|source| ApiError::Transport {
                method,
                url: url.to_string(),
                source,
            })
    }
}

fn check(method: Method, url: &str, status: StatusCode) -> Result<(), ApiError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::Status {
            method,
            url: url.to_string(),
            status,
        })
    }
}

/// POSTs `body`, retrying exactly once with PUT when the resource exists.
pub fn force_write<T: StacTransport + ?Sized>(
    transport: &T,
    url: &str,
    body: &Value,
) -> Result<(), ApiError> {
    let status = transport.send(Method::POST, url, body)?;
    if status == StatusCode::CONFLICT {
        warn!("{} already exists, replacing it with PUT", url);
        let status = transport.send(Method::PUT, url, body)?;
        return check(Method::PUT, url, status);
    }
    check(Method::POST, url, status)
}

pub async fn force_write_async<T: AsyncStacTransport + ?Sized>(
    transport: &T,
    url: &str,
    body: &Value,
) -> Result<(), ApiError> {
    let status = transport.send(Method::POST, url, body).await?;
    if status == StatusCode::CONFLICT {
        warn!("{} already exists, replacing it with PUT", url);
        let status = transport.send(Method::PUT, url, body).await?;
        return check(Method::PUT, url, status);
    }
    check(Method::POST, url, status)
}

fn encode<T: Serialize>(id: &str, value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|source| ApiError::Encode {
        id: id.to_string(),
        source,
    })
}

fn collection_url(base: &str, collection: &Collection) -> String {
    parse_href(base, &format!("collections/{}", collection.id))
}

fn item_url(base: &str, collection: &Collection, item_id: &str) -> String {
    parse_href(
        base,
        &format!("collections/{}/items/{}", collection.id, item_id),
    )
}

/// Upserts the collection, then each item in order.
pub fn upsert_collection<T: StacTransport + ?Sized>(
    transport: &T,
    base: &str,
    collection: &Collection,
) -> Result<(), ApiError> {
    force_write(
        transport,
        &collection_url(base, collection),
        &encode(&collection.id, collection)?,
    )?;
    for item in &collection.items {
        force_write(
            transport,
            &item_url(base, collection, &item.id),
            &encode(&item.id, item)?,
        )?;
    }
    info!(
        "Uploaded collection {} and {} item(s) to {}",
        collection.id,
        collection.items.len(),
        base
    );
    Ok(())
}

/// Upserts the collection, then all items concurrently. The first failure
/// aborts the upload.
pub async fn upsert_collection_async<T: AsyncStacTransport + ?Sized>(
    transport: &T,
    base: &str,
    collection: &Collection,
) -> Result<(), ApiError> {
    force_write_async(
        transport,
        &collection_url(base, collection),
        &encode(&collection.id, collection)?,
    )
    .await?;

    let uploads = collection
        .items
        .iter()
        .map(|item| -> Result<(String, Value), ApiError> {
            Ok((item_url(base, collection, &item.id), encode(&item.id, item)?))
        })
        .collect::<Result<Vec<_>, _>>()?;
    try_join_all(
        uploads
            .iter()
            .map(|(url, body)| force_write_async(transport, url, body)),
    )
    .await?;
    info!(
        "Uploaded collection {} and {} item(s) to {}",
        collection.id,
        collection.items.len(),
        base
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::Bbox;
    use crate::geometry::Geometry;
    use crate::stac::{Extent, Item};
    use crate::temporal::{ItemTime, TimeRange};
    use rstest::rstest;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replies with queued statuses and records every request.
    struct ScriptedTransport {
        replies: RefCell<VecDeque<StatusCode>>,
        requests: RefCell<Vec<(Method, String)>>,
    }

    impl ScriptedTransport {
        fn new(replies: &[u16]) -> Self {
            Self {
                replies: RefCell::new(
                    replies
                        .iter()
                        .map(|code| StatusCode::from_u16(*code).unwrap())
                        .collect(),
                ),
                requests: RefCell::default(),
            }
        }

        fn reply(&self, method: Method, url: &str) -> StatusCode {
            self.requests.borrow_mut().push((method, url.to_string()));
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(StatusCode::OK)
        }

        fn methods(&self) -> Vec<Method> {
            self.requests.borrow().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    impl StacTransport for ScriptedTransport {
        fn send(&self, method: Method, url: &str, _body: &Value) -> Result<StatusCode, ApiError> {
            Ok(self.reply(method, url))
        }
    }

    #[async_trait(?Send)]
    impl AsyncStacTransport for ScriptedTransport {
        async fn send(
            &self,
            method: Method,
            url: &str,
            _body: &Value,
        ) -> Result<StatusCode, ApiError> {
            Ok(self.reply(method, url))
        }
    }

    fn collection() -> Collection {
        let at = "2017-01-01T00:00:00Z".parse().unwrap();
        let time = ItemTime {
            datetime: at,
            range: TimeRange::instant(at),
        };
        let mut collection = Collection::new(
            "farm",
            "d",
            "proprietary",
            Extent::new(Bbox::world(), TimeRange::instant(at)),
        );
        collection.items = vec![
            Item::new("a", Geometry::Point(vec![1.0, 1.0]), time),
            Item::new("b", Geometry::Point(vec![2.0, 2.0]), time),
        ];
        collection
    }

    #[rstest]
    #[case("http://localhost:8082", "collections/farm", "http://localhost:8082/collections/farm")]
    #[case("http://localhost:8082/", "collections/farm", "http://localhost:8082/collections/farm")]
    #[case(
        "http://localhost:8082/stac/",
        "/collections/farm",
        "http://localhost:8082/stac/collections/farm"
    )]
    fn test_parse_href(#[case] base: &str, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(parse_href(base, path), expected);
    }

    #[test]
    fn test_conflict_retries_with_put() {
        let transport = ScriptedTransport::new(&[409, 200]);
        force_write(&transport, "http://api/collections/farm", &Value::Null).unwrap();
        assert_eq!(transport.methods(), vec![Method::POST, Method::PUT]);
    }

    #[test]
    fn test_server_error_is_not_retried() {
        let transport = ScriptedTransport::new(&[500]);
        let err = force_write(&transport, "http://api/collections/farm", &Value::Null).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert_eq!(transport.methods(), vec![Method::POST]);
    }

    #[test]
    fn test_failed_put_propagates() {
        let transport = ScriptedTransport::new(&[409, 400]);
        let err = force_write(&transport, "http://api/collections/farm", &Value::Null).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Status { method, status, .. }
                if method == Method::PUT && status == StatusCode::BAD_REQUEST
        ));
        assert_eq!(transport.methods().len(), 2);
    }

    #[test]
    fn test_upsert_urls() {
        let transport = ScriptedTransport::new(&[201, 409, 200, 201]);
        upsert_collection(&transport, "http://api/", &collection()).unwrap();
        let urls: Vec<String> = transport
            .requests
            .borrow()
            .iter()
            .map(|(_, url)| url.clone())
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://api/collections/farm",
                "http://api/collections/farm/items/a",
                "http://api/collections/farm/items/a",
                "http://api/collections/farm/items/b",
            ]
        );
    }

    #[tokio::test]
    async fn test_async_upsert_posts_collection_first() {
        let transport = ScriptedTransport::new(&[201]);
        upsert_collection_async(&transport, "http://api", &collection())
            .await
            .unwrap();
        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].1, "http://api/collections/farm");
        assert!(requests.iter().all(|(method, _)| *method == Method::POST));
    }

    #[tokio::test]
    async fn test_async_upsert_stops_on_collection_failure() {
        let transport = ScriptedTransport::new(&[503]);
        let err = upsert_collection_async(&transport, "http://api", &collection())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { .. }));
        assert_eq!(transport.requests.borrow().len(), 1);
    }
}
