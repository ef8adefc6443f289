//! Verification helpers for fabric mutation journals
//!
//! Provides assertion helpers to verify which mutations a cycle issued and
//! in what order

use fabric_client::fake::FabricOp;
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected operation {op} not found in journal")]
    OpMissing { op: String },

    #[error("Expected {first} before {second}, found at positions {first_pos} and {second_pos}")]
    OutOfOrder {
        first: String,
        second: String,
        first_pos: usize,
        second_pos: usize,
    },

    #[error("Operation {op} issued {count} times")]
    Duplicate { op: String, count: usize },

    #[error("Expected no matching operations, found {ops}")]
    UnexpectedOps { ops: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Journal verification helper
#[derive(Debug, Clone)]
pub struct JournalVerifier {
    ops: Vec<FabricOp>,
}

impl JournalVerifier {
    /// Create a verifier over a journal snapshot
    pub fn new(ops: Vec<FabricOp>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[FabricOp] {
        &self.ops
    }

    fn position(&self, op: &FabricOp) -> VerifyResult<usize> {
        self.ops
            .iter()
            .position(|o| o == op)
            .ok_or_else(|| VerificationError::OpMissing {
                op: format!("{:?}", op),
            })
    }

    /// Verify that an operation was issued
    pub fn assert_contains(&self, op: &FabricOp) -> VerifyResult<()> {
        self.position(op).map(|_| ())
    }

    /// Verify that the first `first` precedes the first `second`
    pub fn assert_before(&self, first: &FabricOp, second: &FabricOp) -> VerifyResult<()> {
        let first_pos = self.position(first)?;
        let second_pos = self.position(second)?;
        if first_pos >= second_pos {
            return Err(VerificationError::OutOfOrder {
                first: format!("{:?}", first),
                second: format!("{:?}", second),
                first_pos,
                second_pos,
            });
        }
        Ok(())
    }

    /// Verify that no create operation was issued twice
    pub fn assert_no_duplicate_creates(&self) -> VerifyResult<()> {
        for op in &self.ops {
            let is_create = matches!(
                op,
                FabricOp::CreatePartition(_)
                    | FabricOp::CreateBlock(_)
                    | FabricOp::CreateVlan(_)
                    | FabricOp::CreatePortPolicy(_)
            );
            let count = self.ops.iter().filter(|o| *o == op).count();
            if is_create && count > 1 {
                return Err(VerificationError::Duplicate {
                    op: format!("{:?}", op),
                    count,
                });
            }
        }
        Ok(())
    }

    /// Verify that no operation matches `pred`
    pub fn assert_none(&self, pred: impl Fn(&FabricOp) -> bool) -> VerifyResult<()> {
        let matching: Vec<&FabricOp> = self.ops.iter().filter(|o| pred(*o)).collect();
        if !matching.is_empty() {
            return Err(VerificationError::UnexpectedOps {
                ops: format!("{:?}", matching),
            });
        }
        Ok(())
    }

    /// Verify that the journal is empty
    pub fn assert_no_mutations(&self) -> VerifyResult<()> {
        self.assert_none(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> JournalVerifier {
        JournalVerifier::new(vec![
            FabricOp::DeleteBlock("t1-blk".to_string()),
            FabricOp::DeletePartition("t1".to_string()),
            FabricOp::DeleteVlan(3),
        ])
    }

    #[test]
    fn test_assert_before() {
        let v = journal();
        assert!(v
            .assert_before(
                &FabricOp::DeleteBlock("t1-blk".to_string()),
                &FabricOp::DeletePartition("t1".to_string())
            )
            .is_ok());
        assert!(matches!(
            v.assert_before(
                &FabricOp::DeleteVlan(3),
                &FabricOp::DeleteBlock("t1-blk".to_string())
            ),
            Err(VerificationError::OutOfOrder { .. })
        ));
        assert!(matches!(
            v.assert_contains(&FabricOp::DeleteVlan(4)),
            Err(VerificationError::OpMissing { .. })
        ));
    }

    #[test]
    fn test_duplicate_creates() {
        let v = JournalVerifier::new(vec![FabricOp::CreateVlan(1), FabricOp::CreateVlan(1)]);
        assert_eq!(
            v.assert_no_duplicate_creates(),
            Err(VerificationError::Duplicate {
                op: "CreateVlan(1)".to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn test_assert_none() {
        let v = journal();
        assert!(v.assert_none(FabricOp::is_port_patch).is_ok());
        assert!(v.assert_none(FabricOp::touches_vlan).is_err());
        assert!(v.assert_no_mutations().is_err());
        assert!(JournalVerifier::new(vec![]).assert_no_mutations().is_ok());
    }
}
