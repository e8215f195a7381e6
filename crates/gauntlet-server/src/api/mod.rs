pub mod experiments;
pub mod runs;
pub mod test_cases;
