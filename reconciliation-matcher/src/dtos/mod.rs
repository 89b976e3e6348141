//! Request and response bodies for the reconciliation routes.

pub mod approval;
pub mod matching;
pub mod workflow;

pub use approval::*;
pub use matching::*;
pub use workflow::*;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn empty_submission_fails_validation() {
        let req: SubmitApprovalRequest = serde_json::from_str(r#"{"matches": []}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn confidence_above_100_fails_validation() {
        let req: SubmitApprovalRequest = serde_json::from_value(serde_json::json!({
            "matches": [{
                "statementId": uuid::Uuid::new_v4(),
                "transactionId": uuid::Uuid::new_v4(),
                "confidence": 101
            }]
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn blank_transition_fields_fail_validation() {
        let req: TransitionRequest =
            serde_json::from_str(r#"{"targetState": "", "action": "approve"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn amounts_serialize_as_numbers() {
        let body = serde_json::to_value(SubmitApprovalResponse {
            executed: 1,
            failed: 0,
            approval_id: None,
            total_value: rust_decimal::Decimal::new(25050, 2),
            auto_approved_by_rule: false,
        })
        .unwrap();
        assert_eq!(body["totalValue"], serde_json::json!(250.5));
        assert!(body.get("approvalId").is_none());
    }
}
