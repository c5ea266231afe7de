use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Object store for user media (avatars and cover images).
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    /// Delete the object behind a URL previously minted by `object_url`.
    /// URLs that do not belong to this store are ignored.
    async fn delete_by_url(&self, url: &str) -> anyhow::Result<()>;
    /// Public, path-style address of an object.
    fn object_url(&self, key: &str) -> String;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl Storage {
    pub async fn new(
        endpoint: &str,
        bucket: &str,
        access_key: &str,
        secret_key: &str,
        region: &str,
    ) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .endpoint_url(endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_by_url(&self, url: &str) -> anyhow::Result<()> {
        let Some(key) = key_from_url(&self.endpoint, &self.bucket, url) else {
            return Ok(());
        };
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

/// Recover the object key from a URL minted by `object_url`.
fn key_from_url(endpoint: &str, bucket: &str, url: &str) -> Option<String> {
    let prefix = format!("{}/{}/", endpoint.trim_end_matches('/'), bucket);
    url.strip_prefix(&prefix)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

/// Upload one image and return its public URL. `scope` prefixes the object
/// key ("avatars", "covers").
pub async fn store_image(
    storage: &dyn StorageClient,
    scope: &str,
    body: Bytes,
    content_type: &str,
) -> ApiResult<String> {
    let ext = ext_from_mime(content_type).ok_or_else(|| {
        ApiError::Validation(format!("unsupported image type {content_type}"))
    })?;
    let key = format!("{}/{}.{}", scope, Uuid::new_v4(), ext);
    storage.put_object(&key, body, content_type).await?;
    Ok(storage.object_url(&key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    struct RecordingStorage;

    #[async_trait]
    impl StorageClient for RecordingStorage {
        async fn put_object(
            &self,
            _key: &str,
            _body: Bytes,
            _content_type: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn delete_by_url(&self, _url: &str) -> anyhow::Result<()> {
            Ok(())
        }
        fn object_url(&self, key: &str) -> String {
            format!("https://media.local/streamhub-media/{}", key)
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("text/plain"), None);
    }

    #[test]
    fn key_round_trips_through_url() {
        let url = "https://media.local/streamhub-media/avatars/abc.png";
        assert_eq!(
            key_from_url("https://media.local", "streamhub-media", url),
            Some("avatars/abc.png".to_string())
        );
        assert_eq!(
            key_from_url("https://media.local/", "streamhub-media", url),
            Some("avatars/abc.png".to_string())
        );
    }

    #[test]
    fn foreign_urls_yield_no_key() {
        assert_eq!(
            key_from_url(
                "https://media.local",
                "streamhub-media",
                "https://elsewhere.example/bucket/k.png"
            ),
            None
        );
        assert_eq!(
            key_from_url(
                "https://media.local",
                "streamhub-media",
                "https://media.local/streamhub-media/"
            ),
            None
        );
    }

    #[tokio::test]
    async fn store_image_keys_by_scope_and_extension() {
        let url = store_image(
            &RecordingStorage,
            "avatars",
            Bytes::from_static(b"png-bytes"),
            "image/png",
        )
        .await
        .expect("store image");
        assert!(url.starts_with("https://media.local/streamhub-media/avatars/"));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn store_image_rejects_unknown_mime() {
        let err = store_image(
            &RecordingStorage,
            "avatars",
            Bytes::from_static(b"%PDF"),
            "application/pdf",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
