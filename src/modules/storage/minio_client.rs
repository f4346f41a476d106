//! MinIO/S3-compatible blob store
//!
//! Every asset of the website is public, so objects live under a single
//! public prefix with an anonymous-read bucket policy.
//!
//! Uses rust-s3 crate for lightweight S3 operations.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::config::MinIOConfig;
use crate::modules::storage::blob_store::{AssetKind, BlobStore, BlobStoreError};
use crate::shared::constants::get_content_type_from_extension;

type HmacSha256 = Hmac<Sha256>;

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    public_prefix: String,
    /// Access key for AWS Signature v4 signing
    access_key: String,
    /// Secret key for AWS Signature v4 signing
    secret_key: String,
    /// Region name for AWS Signature v4 signing
    region_name: String,
    /// HTTP client for bucket policy operations
    http_client: Client,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration
    ///
    /// This will:
    /// 1. Create the bucket if it doesn't exist
    /// 2. Set public read policy for the public prefix
    pub async fn new(config: MinIOConfig) -> Result<Self, BlobStoreError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| BlobStoreError::Transport(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| {
                BlobStoreError::Transport(format!("Failed to create MinIO bucket handle: {}", e))
            })?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let http_client = Client::builder()
            .build()
            .map_err(|e| BlobStoreError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let client = Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint,
            public_endpoint: config.public_endpoint,
            public_prefix: config.public_prefix,
            access_key: config.access_key,
            secret_key: config.secret_key,
            region_name: config.region,
            http_client,
        };

        client.ensure_bucket_exists().await;
        client.set_public_read_policy().await;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, public_prefix: {}",
            client.endpoint,
            client.bucket.name(),
            client.public_prefix
        );

        Ok(client)
    }

    /// Ensure the bucket exists, create if not
    async fn ensure_bucket_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => info!("Bucket '{}' created successfully", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Allow anonymous read access to objects under the public prefix
    async fn set_public_read_policy(&self) {
        let bucket_name = self.bucket.name();
        let public_prefix = &self.public_prefix;

        let policy = json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Principal": {"AWS": "*"},
                    "Action": ["s3:GetObject"],
                    "Resource": [format!("arn:aws:s3:::{bucket_name}/{public_prefix}/*")]
                }
            ]
        });

        match self
            .put_bucket_policy_with_sigv4(&bucket_name, &policy.to_string())
            .await
        {
            Ok(_) => info!(
                "Set public read policy for {}/{}/*",
                bucket_name, public_prefix
            ),
            Err(e) => warn!(
                "Failed to set bucket policy for '{}': {}. \
                You may need to set the policy manually using: \
                mc anonymous set download minio/{}/{}",
                bucket_name, e, bucket_name, public_prefix
            ),
        }
    }

    /// Put bucket policy using AWS Signature v4
    async fn put_bucket_policy_with_sigv4(
        &self,
        bucket_name: &str,
        policy: &str,
    ) -> Result<(), BlobStoreError> {
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| BlobStoreError::Transport(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| BlobStoreError::Transport("Endpoint URL has no host".to_string()))?;
        let host_header = match endpoint_url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let url = format!("{}/{}?policy", self.endpoint, bucket_name);
        let payload_hash = hex::encode(Sha256::digest(policy.as_bytes()));

        let canonical_uri = format!("/{}", bucket_name);
        let canonical_querystring = "policy=";
        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host_header, payload_hash, amz_date
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";

        let canonical_request = format!(
            "PUT\n{}\n{}\n{}\n{}\n{}",
            canonical_uri, canonical_querystring, canonical_headers, signed_headers, payload_hash
        );

        let algorithm = "AWS4-HMAC-SHA256";
        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region_name);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            algorithm,
            amz_date,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = self.calculate_signature(&date_stamp, &string_to_sign)?;

        let authorization_header = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            algorithm, self.access_key, credential_scope, signed_headers, signature
        );

        let response = self
            .http_client
            .put(&url)
            .header("Host", &host_header)
            .header("x-amz-date", &amz_date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("Authorization", &authorization_header)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| BlobStoreError::Transport(format!("Bucket policy request failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(BlobStoreError::Transport(format!(
                "Failed to set bucket policy: {} - {}",
                status, body
            )))
        }
    }

    /// Calculate AWS Signature v4 signature
    fn calculate_signature(
        &self,
        date_stamp: &str,
        string_to_sign: &str,
    ) -> Result<String, BlobStoreError> {
        let k_date = Self::hmac_sha256(
            format!("AWS4{}", self.secret_key).as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let k_region = Self::hmac_sha256(&k_date, self.region_name.as_bytes())?;
        let k_service = Self::hmac_sha256(&k_region, b"s3")?;
        let k_signing = Self::hmac_sha256(&k_service, b"aws4_request")?;

        let signature = Self::hmac_sha256(&k_signing, string_to_sign.as_bytes())?;
        Ok(hex::encode(signature))
    }

    fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, BlobStoreError> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| BlobStoreError::Transport(format!("HMAC key error: {}", e)))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Object key of a storage id inside the bucket
    fn object_key(&self, storage_id: &str) -> String {
        format!("{}/{}", self.public_prefix, storage_id)
    }

    /// Public URL of an object key
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.bucket.name(), key)
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }
}

#[async_trait]
impl BlobStore for MinIOClient {
    async fn put(
        &self,
        local_path: &Path,
        storage_id: &str,
        kind: AssetKind,
    ) -> Result<String, BlobStoreError> {
        let data = tokio::fs::read(local_path).await?;
        let extension = local_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let content_type = get_content_type_from_extension(extension);
        let key = self.object_key(storage_id);

        let response = self
            .bucket
            .put_object_with_content_type(&key, &data, content_type)
            .await
            .map_err(|e| {
                BlobStoreError::Transport(format!("Failed to upload {} '{}': {}", kind, key, e))
            })?;

        // Without fail-on-err, non-2xx responses come back as Ok
        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(BlobStoreError::Transport(format!(
                "Failed to upload {} '{}': status {}",
                kind, key, status
            )));
        }

        debug!(
            "Uploaded {} bytes to '{}' in bucket '{}'",
            data.len(),
            key,
            self.bucket.name()
        );
        Ok(self.public_url(&key))
    }

    async fn delete(&self, storage_id: &str, kind: AssetKind) -> Result<(), BlobStoreError> {
        let key = self.object_key(storage_id);

        let response = self.bucket.delete_object(&key).await.map_err(|e| {
            BlobStoreError::Transport(format!("Failed to delete {} '{}': {}", kind, key, e))
        })?;

        // S3 answers 204 for missing keys too; 404 is treated the same
        let status = response.status_code();
        if !(200..300).contains(&status) && status != 404 {
            return Err(BlobStoreError::Transport(format!(
                "Failed to delete {} '{}': status {}",
                kind, key, status
            )));
        }

        debug!("Deleted '{}' from bucket '{}'", key, self.bucket.name());
        Ok(())
    }

    async fn exists(&self, storage_id: &str) -> Result<bool, BlobStoreError> {
        let key = self.object_key(storage_id);

        match self.bucket.head_object(&key).await {
            Ok((_, status)) if status == 404 => Ok(false),
            Ok((_, status)) if (200..300).contains(&status) => Ok(true),
            Ok((_, status)) => Err(BlobStoreError::Transport(format!(
                "Failed to check if '{}' exists: status {}",
                key, status
            ))),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("404") || error_str.contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(BlobStoreError::Transport(format!(
                        "Failed to check if '{}' exists: {}",
                        key, e
                    )))
                }
            }
        }
    }
}
