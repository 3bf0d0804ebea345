//! Shared helpers for sync integration tests.

pub mod mock_source;
pub mod test_data;
