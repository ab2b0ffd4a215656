pub mod authorization;
pub mod intakes;
pub mod lifecycle;
pub mod matching;
pub mod ranking;
