//! Upload and delete services for editor images, backed by [`ApiClient`].

use std::sync::Arc;

use n0_future::boxed::BoxFuture;
use parchment_editor_core::{DeleteService, ImageFile, ServiceError, UploadService, UploadedImage};
use reqwest::Method;
use serde_json::Value;

use crate::client::ApiClient;
use crate::request::{ApiRequest, FormValue};

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file_url";
/// Form field carrying the id of the image to delete.
pub const DELETE_FIELD: &str = "id";

/// Endpoint paths for template images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEndpoints {
    pub upload: String,
    pub delete: String,
}

impl Default for ImageEndpoints {
    fn default() -> Self {
        Self {
            upload: "/templates/images".to_owned(),
            delete: "/templates/images".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiImageService {
    client: Arc<ApiClient>,
    endpoints: ImageEndpoints,
}

impl ApiImageService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self::with_endpoints(client, ImageEndpoints::default())
    }

    pub fn with_endpoints(client: Arc<ApiClient>, endpoints: ImageEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn upload_request(&self, file: ImageFile) -> ApiRequest {
        ApiRequest::post(&self.endpoints.upload).form(vec![(
            UPLOAD_FIELD.to_owned(),
            FormValue::File {
                name: file.name,
                mime: file.mime,
                bytes: file.bytes,
            },
        )])
    }

    pub fn delete_request(&self, id: String) -> ApiRequest {
        ApiRequest::new(Method::DELETE, &self.endpoints.delete)
            .form(vec![(DELETE_FIELD.to_owned(), FormValue::Text(id))])
    }
}

/// The backend wraps payloads in `{ "data": ... }`; accept a bare payload too.
pub fn parse_uploaded(body: Value) -> Result<UploadedImage, ServiceError> {
    let payload = match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(payload).map_err(|err| ServiceError::Request(err.to_string()))
}

impl UploadService for ApiImageService {
    fn upload(&self, file: ImageFile) -> BoxFuture<Result<UploadedImage, ServiceError>> {
        let client = self.client.clone();
        let request = self.upload_request(file);
        Box::pin(async move {
            let body = client
                .request(request)
                .await?
                .ok_or_else(|| ServiceError::Request("upload rejected".into()))?;
            parse_uploaded(body)
        })
    }
}

impl DeleteService for ApiImageService {
    fn delete(&self, id: String) -> BoxFuture<Result<(), ServiceError>> {
        let client = self.client.clone();
        let request = self.delete_request(id);
        Box::pin(async move {
            client
                .request(request)
                .await?
                .map(|_| ())
                .ok_or_else(|| ServiceError::Request("delete rejected".into()))
        })
    }
}
