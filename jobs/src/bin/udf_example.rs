//! Filter `/sys/spark/examples/example_1` and write the second `uuid` segment of
//! every row with `id > 5` to `/sys/spark/examples/example_1_map`.
//!
//! ```bash
//! udf_example --storage-root /var/lib/ytspark [source] [destination]
//! ```

use std::process::ExitCode;
use ytspark_jobs::udf_example::run_udf_example;

fn main() -> ExitCode {
    ytspark_core::app::run(run_udf_example)
}
