//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Connection error - cluster unreachable, kubeconfig unusable or credentials rejected
pub const CONNECTION_ERROR: i32 = 2;

/// Not found - missing namespace or kubeconfig context
pub const NOT_FOUND: i32 = 3;

/// Collection error - listing objects on the source failed
pub const COLLECTION_ERROR: i32 = 4;

/// Decode error - a Helm release payload could not be decoded
pub const DECODE_ERROR: i32 = 5;

/// External tool error - helm or docker exited non-zero
pub const EXTERNAL_TOOL_ERROR: i32 = 6;

/// Partial failure - replication finished but some objects failed
pub const PARTIAL_FAILURE: i32 = 7;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
