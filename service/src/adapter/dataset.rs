use crate::adapter::AdapterError;
use crate::connect::{Backend, unwrap_field};
use crate::segment::ApproximationSegmentsContainer;
use crate::DatasetInfo;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Uploaded {
    pub filename: String,
}

pub async fn upload_csv_file(backend: &Backend, path: &Path) -> Result<Uploaded, AdapterError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AdapterError::InvalidRequest(format!("Not a file: {}", path.display())))?
        .to_string();

    let bytes = bytes::Bytes::from(tokio::fs::read(path).await?);
    log::info!("Uploading {file_name} ({} bytes)", bytes.len());

    let part = Part::stream(bytes)
        .file_name(file_name)
        .mime_str("text/csv")
        .map_err(AdapterError::FetchError)?;
    let form = Form::new().part("file", part);

    let response = backend
        .post_multipart("/api/upload_csv_file", form)
        .await
        .inspect_err(|e| log::error!("upload_csv_file failed: {e}"))?;

    serde_json::from_value(response).map_err(|e| AdapterError::ParseError(e.to_string()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessDatasetRequest<'a> {
    dataset_info: &'a DatasetInfo,
}

pub async fn process_dataset(
    backend: &Backend,
    info: &DatasetInfo,
) -> Result<Vec<ApproximationSegmentsContainer>, AdapterError> {
    let response = backend
        .post_json(
            "/api/process_dataset",
            &ProcessDatasetRequest { dataset_info: info },
        )
        .await
        .inspect_err(|e| log::error!("process_dataset failed: {e}"))?;

    unwrap_field(response, "approximationSegmentsContainers")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn process_request_uses_camel_case_envelope() {
        let info = DatasetInfo {
            time_column: "date".to_string(),
            value_columns: vec!["price".to_string()],
        };
        let body = serde_json::to_value(ProcessDatasetRequest { dataset_info: &info }).unwrap();
        assert_eq!(
            body,
            json!({"datasetInfo": {"time_column": "date", "value_columns": ["price"]}})
        );
    }

    #[test]
    fn containers_parse_from_envelope() {
        let response = json!({
            "approximationSegmentsContainers": [{
                "source": "price",
                "max_approximation_level": 2,
                "approximation_segments_list": [
                    {"approximation_level": 0, "segments": [
                        {"start_idx": 0, "end_idx": 3, "slope": 1.0, "start_value": 0.0, "end_value": 3.0}
                    ]}
                ]
            }]
        });

        let containers: Vec<ApproximationSegmentsContainer> =
            unwrap_field(response, "approximationSegmentsContainers").unwrap();
        assert_eq!(containers[0].max_approximation_level, 2);
        assert_eq!(containers[0].segments_at(0)[0].end_idx, 3);
    }
}
