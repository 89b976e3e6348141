//! Generic workflow transition request.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    #[validate(length(min = 1, message = "Target state is required"))]
    pub target_state: String,
    #[validate(length(min = 1, message = "Action is required"))]
    pub action: String,
}
