//! Exit code constants for the pinboard CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad config, unknown document)
//! - 2: Document store failure
//! - 3: Write contention (version conflict or held document lock)
//! - 4: Local execution backend failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or unknown document.
pub const USER_ERROR: i32 = 1;

/// Document store failure: list, get, create, update or delete failed.
pub const STORE_FAILURE: i32 = 2;

/// Write contention: compare-and-swap conflict or document lock held.
pub const CONTENTION: i32 = 3;

/// Execution backend failure.
pub const EXEC_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, STORE_FAILURE, CONTENTION, EXEC_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn exit_codes_match_documented_values() {
        assert_eq!(SUCCESS, 0);
        assert_eq!(USER_ERROR, 1);
        assert_eq!(STORE_FAILURE, 2);
        assert_eq!(CONTENTION, 3);
        assert_eq!(EXEC_FAILURE, 4);
    }
}
