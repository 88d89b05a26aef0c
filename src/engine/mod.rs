pub mod grid;
pub mod payoff;
pub mod evaluator;

pub use evaluator::{Evaluation, StrategyEvaluator};
