// Every test binary compiles this module but only uses part of it.
#![allow(dead_code)]

pub mod test_utils;
