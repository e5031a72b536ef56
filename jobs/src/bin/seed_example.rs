//! Write a sample `(id, uuid)` table for `udf_example` to read.
//!
//! ```bash
//! seed_example --storage-root /var/lib/ytspark [rows] [destination]
//! ```

use std::process::ExitCode;
use ytspark_jobs::udf_example::run_seed_example;

fn main() -> ExitCode {
    ytspark_core::app::run(run_seed_example)
}
