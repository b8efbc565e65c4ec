//! Process exit codes. Part of the CLI contract.

pub const SUCCESS: i32 = 0;
pub const RUN_FAILED: i32 = 1; // No source handle could be acquired
pub const CONFIG_ERROR: i32 = 2; // Bad config, usage or internal error
