//! Engine test suite

mod vlog_tests;
