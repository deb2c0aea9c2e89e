use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::config::Settings;

const MEDIA_PREFIX: &str = "question-media";

/// S3 access for question media. `None` from [`StorageService::from_settings`]
/// means uploads are disabled.
#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    client: Client,
    bucket: String,
    url_ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredObject {
    pub(crate) key: String,
    pub(crate) size: u64,
    pub(crate) sha256: String,
}

impl StorageService {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let s3 = settings.s3();
        if s3.access_key.is_empty() || s3.secret_key.is_empty() {
            return Ok(None);
        }

        let credentials = Credentials::new(
            s3.access_key.clone(),
            s3.secret_key.clone(),
            None,
            None,
            "lms-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(s3.endpoint.clone())
            .region(aws_config::Region::new(s3.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config).force_path_style(true).build();

        Ok(Some(Self {
            client: Client::from_conf(s3_config),
            bucket: s3.bucket.clone(),
            url_ttl: Duration::from_secs(settings.storage().presigned_url_expire_minutes * 60),
        }))
    }

    pub(crate) fn url_ttl(&self) -> Duration {
        self.url_ttl
    }

    pub(crate) async fn presign_put(&self, key: &str, content_type: &str) -> anyhow::Result<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(self.url_ttl)?)
            .await?;

        Ok(presigned.uri().to_string())
    }

    pub(crate) async fn presign_get(&self, key: &str) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(self.url_ttl)?)
            .await?;

        Ok(presigned.uri().to_string())
    }

    /// Stores `bytes` under a content-addressed key, so re-uploading the same
    /// file yields the same key.
    pub(crate) async fn upload_media(
        &self,
        extension: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<StoredObject> {
        let sha256 = sha256_hex(&bytes);
        let key = content_key(&sha256, extension);
        let size = bytes.len() as u64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        Ok(StoredObject { key, size, sha256 })
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub(crate) fn content_key(sha256: &str, extension: &str) -> String {
    format!("{MEDIA_PREFIX}/{}/{sha256}.{extension}", &sha256[..2.min(sha256.len())])
}

/// Key for a presigned upload; the object does not exist yet so it cannot be
/// content-addressed.
pub(crate) fn presign_key(user_id: &str, extension: &str) -> String {
    format!("{MEDIA_PREFIX}/{user_id}/{}.{extension}", Uuid::new_v4())
}

/// Keys handed out by this service; anything else is refused by the view-url
/// endpoint.
pub(crate) fn is_media_key(key: &str) -> bool {
    key.starts_with(&format!("{MEDIA_PREFIX}/"))
        && !key.contains("..")
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
}
