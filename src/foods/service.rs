use bytes::Bytes;
use tracing::debug;

use crate::error::AppError;
use crate::foods::client::FoodCatalog;
use crate::foods::vision::LabelDetector;
use crate::state::AppState;

/// Detect labels in an image, then keep only the ones the food catalog can
/// actually resolve (at least one search hit), preserving detection order.
pub async fn detect_verified_labels(
    state: &AppState,
    image: Bytes,
) -> Result<Vec<String>, AppError> {
    let labels = state.labels.detect(image).await?;
    debug!(count = labels.len(), "labels detected");

    let mut verified = Vec::with_capacity(labels.len());
    for label in labels {
        if !state.foods.search(&label).await?.is_empty() {
            verified.push(label);
        }
    }
    debug!(count = verified.len(), "labels verified against catalog");
    Ok(verified)
}
