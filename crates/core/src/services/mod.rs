pub mod chart;
pub mod history;
pub mod portfolio;
pub mod refresh;
pub mod scheduler;
pub mod session_clock;
