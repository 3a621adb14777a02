pub mod prekeys;
pub mod sweeper;
