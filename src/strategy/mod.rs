pub mod controller;
pub mod decision;
pub mod evaluator;

pub use controller::StrategyController;
pub use decision::DecisionEngine;
pub use evaluator::EfficiencyEvaluator;
