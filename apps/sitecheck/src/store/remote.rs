use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tracing::debug;

use super::{Snapshot, StateStore};
use crate::config::S3Config;
use crate::error::StoreError;

/// Snapshot kept as one JSON object in an S3 bucket
pub struct S3Store {
    bucket: Box<Bucket>,
    key: String,
}

impl S3Store {
    pub fn new(config: &S3Config) -> Result<Self, StoreError> {
        let credentials =
            Credentials::new(Some(&config.access_key), Some(&config.secret_key), None, None, None)
                .map_err(|e| StoreError::Config(e.to_string()))?;

        let bucket = match &config.endpoint {
            // S3-compatible services are addressed by path, not virtual host
            Some(endpoint) => {
                let region = Region::Custom { region: config.region.clone(), endpoint: endpoint.clone() };
                Bucket::new(&config.bucket, region, credentials)?.with_path_style()
            }
            None => {
                let region: Region =
                    config.region.parse().map_err(|e| StoreError::Config(format!("{e}")))?;
                Bucket::new(&config.bucket, region, credentials)?
            }
        };

        Ok(Self { bucket, key: config.key.clone() })
    }
}

fn ensure_success(status: u16) -> Result<(), StoreError> {
    if (200..300).contains(&status) { Ok(()) } else { Err(StoreError::Status(status)) }
}

#[async_trait]
impl StateStore for S3Store {
    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let response = match self.bucket.get_object(&self.key).await {
            Ok(response) => response,
            Err(S3Error::HttpFailWithBody(404, _)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match response.status_code() {
            404 => Ok(None),
            status => {
                ensure_success(status)?;
                Ok(Some(serde_json::from_slice(response.as_slice())?))
            }
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let body = serde_json::to_vec(snapshot)?;
        let response =
            self.bucket.put_object_with_content_type(&self.key, &body, "application/json").await?;
        ensure_success(response.status_code())?;
        debug!(location = %self.location(), "Saved snapshot");
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        match self.bucket.delete_object(&self.key).await {
            Ok(response) if response.status_code() == 404 => Ok(()),
            Ok(response) => ensure_success(response.status_code()),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket.name(), self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockito::Matcher;

    fn config(endpoint: String) -> S3Config {
        S3Config {
            access_key: "AKIDEXAMPLE".into(),
            secret_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            bucket: "sitecheck-state".into(),
            region: "us-east-1".into(),
            key: "sitecheck-data".into(),
            endpoint: Some(endpoint),
        }
    }

    fn object_path() -> Matcher {
        Matcher::Regex("^/sitecheck-state/sitecheck-data".into())
    }

    #[test]
    fn test_location_names_bucket_and_key() {
        let store = S3Store::new(&config("http://127.0.0.1:9".into())).unwrap();
        assert_eq!(store.location(), "s3://sitecheck-state/sitecheck-data");
    }

    #[tokio::test]
    async fn test_missing_object_loads_as_none() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", object_path()).with_status(404).create_async().await;

        let store = S3Store::new(&config(server.url())).unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stored_object_is_parsed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", object_path())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"time":"2026-10-13T06:00:00Z","errors":1,"messages":["http://a.example/: down"]}"#)
            .create_async()
            .await;

        let store = S3Store::new(&config(server.url())).unwrap();
        let snapshot = store.load().await.unwrap().unwrap();

        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.messages, vec!["http://a.example/: down"]);
    }

    #[tokio::test]
    async fn test_save_puts_json_object() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", object_path())
            .match_body(Matcher::PartialJsonString(r#"{"errors":0,"messages":[]}"#.into()))
            .with_status(200)
            .create_async()
            .await;

        let store = S3Store::new(&config(server.url())).unwrap();
        let snapshot = Snapshot { time: Utc::now(), errors: 0, messages: vec![], version: 1 };
        store.save(&snapshot).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_on_load_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", object_path()).with_status(500).create_async().await;

        let store = S3Store::new(&config(server.url())).unwrap();
        assert!(store.load().await.is_err());
    }
}
