pub mod ensemble;
pub mod kelly;
pub mod limits;
pub mod sentiment;

pub use ensemble::{EnsembleInput, EnsembleWeights};
pub use kelly::kelly_stake;
pub use limits::{check_risk, RiskCheck};
pub use sentiment::{KeywordSentimentModel, SentimentModel};
