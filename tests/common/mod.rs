#![allow(dead_code, unused_imports)]

pub use snapcheck_test_utils::{builders, init_tracing, with_timeout};
