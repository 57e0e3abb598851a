//! Opaque unique ids (spec §3: "All identifiers are opaque unique IDs").

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }
    };
}

id_type!(UserId);
id_type!(SessionId);
id_type!(TeamId);
id_type!(MatchId);
id_type!(OddsId);
id_type!(StockId);
id_type!(StockPriceId);
id_type!(PortfolioId);
id_type!(PositionId);
id_type!(OrderId);
id_type!(TradeId);
id_type!(BetId);
id_type!(BankrollHistoryId);
id_type!(ValueBetId);
id_type!(StockNewsId);
id_type!(WatchlistId);
id_type!(AlertId);
id_type!(NotificationId);
id_type!(FairValueId);
