//! Exit code constants and error mapping for genforge.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `PLAN_INVALID` | Artifact list rejected by the planner |
//! | 4 | `PARTIAL_FAILURE` | Some artifacts failed to generate |
//! | 70 | `BACKENDS_EXHAUSTED` | Every backend failed for a call |

use crate::error::{ExecutionError, GenforgeError};

/// Process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const INTERNAL: ExitCode = ExitCode(1);
    pub const CLI_ARGS: ExitCode = ExitCode(2);
    pub const PLAN_INVALID: ExitCode = ExitCode(3);
    pub const PARTIAL_FAILURE: ExitCode = ExitCode(4);
    pub const BACKENDS_EXHAUSTED: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<&GenforgeError> for ExitCode {
    fn from(err: &GenforgeError) -> Self {
        match err {
            GenforgeError::Config(_) => ExitCode::CLI_ARGS,
            GenforgeError::Plan(_) => ExitCode::PLAN_INVALID,
            GenforgeError::Execution(ExecutionError::InvalidRequest(_)) => ExitCode::INTERNAL,
            GenforgeError::Execution(_) | GenforgeError::Llm(_) => ExitCode::BACKENDS_EXHAUSTED,
            GenforgeError::Io(_) => ExitCode::INTERNAL,
        }
    }
}
