use serde::Serialize;

use crate::{
    endpoints::Endpoint,
    entities::{Operation, Resource},
    error::{Error, Result},
    parameters::Parameters,
    transport::Transport,
};

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const PDF_EXTENSION: &str = "pdf";
pub const DEFAULT_BINARY_PROPERTY: &str = "data";

/// How a downloaded PDF is attached to the output item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Name of the binary property on the output item.
    pub property: String,
    pub file_name: Option<String>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            property: DEFAULT_BINARY_PROPERTY.to_string(),
            file_name: None,
        }
    }
}

impl DownloadOptions {
    /// Reads `binaryProperty` and `fileName`.
    #[must_use]
    pub fn from_parameters(params: &Parameters) -> Self {
        Self {
            property: params
                .optional_string("binaryProperty")
                .unwrap_or_else(|| DEFAULT_BINARY_PROPERTY.to_string()),
            file_name: params.optional_string("fileName"),
        }
    }
}

/// A binary payload attached to an output item.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryAttachment {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub file_extension: String,
    pub property: String,
}

impl std::fmt::Debug for BinaryAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryAttachment")
            .field("data", &format_args!("{} bytes", self.data.len()))
            .field("mime_type", &self.mime_type)
            .field("file_name", &self.file_name)
            .field("file_extension", &self.file_extension)
            .field("property", &self.property)
            .finish()
    }
}

/// Downloads the PDF rendition of `resource` `id`.
#[instrument(skip(transport))]
pub async fn fetch<T: Transport>(
    transport: &T,
    resource: Resource,
    id: &str,
    options: DownloadOptions,
) -> Result<BinaryAttachment> {
    if !resource.supports_pdf() {
        return Err(Error::UnsupportedOperation {
            resource,
            operation: Operation::Get,
        });
    }

    let data = transport
        .fetch_pdf(&Endpoint::Pdf(resource, id.to_string()))
        .await?;
    debug!(bytes = data.len(), "downloaded PDF");

    Ok(BinaryAttachment {
        data,
        mime_type: PDF_MIME_TYPE.to_string(),
        file_name: options
            .file_name
            .unwrap_or_else(|| format!("{resource}-{id}.{PDF_EXTENSION}")),
        file_extension: PDF_EXTENSION.to_string(),
        property: options.property,
    })
}
