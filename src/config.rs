//! Round configuration handed to each workload by the harness.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;

/// Display name given to voters created by the voter-creation workload.
pub const DEFAULT_VOTER_NAME: &str = "Name";

/// Options recognized in a round's argument mapping.
///
/// Every field is optional at the type level; each workload checks the ones it
/// needs in `initialize` and reports the first missing one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundArguments {
    /// Contract handle requests are addressed to.
    pub contract_id: Option<String>,
    /// Identity requests are submitted as.
    pub invoker_id: Option<String>,
    /// Number of voters (cast-vote workload).
    pub tx: Option<usize>,
    /// Number of votable items.
    pub items: Option<usize>,
    /// Number of pre-built ballots (get-ballot workload).
    pub ballots: Option<usize>,
    /// Seed for reproducible shuffles and ballot picks.
    pub seed: Option<u64>,
    /// Display name used by the voter-creation workload.
    pub voter_name: Option<String>,
}

impl RoundArguments {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn contract_id(&self) -> Result<&str, ConfigError> {
        self.contract_id
            .as_deref()
            .ok_or(ConfigError::Missing("contractId"))
    }

    pub fn invoker_id(&self) -> Result<&str, ConfigError> {
        self.invoker_id
            .as_deref()
            .ok_or(ConfigError::Missing("invokerId"))
    }

    pub fn voter_count(&self) -> Result<usize, ConfigError> {
        self.tx.ok_or(ConfigError::Missing("tx"))
    }

    pub fn item_count(&self) -> Result<usize, ConfigError> {
        self.items.ok_or(ConfigError::Missing("items"))
    }

    /// Ballot count; at least one ballot is needed to have something to look up.
    pub fn ballot_count(&self) -> Result<usize, ConfigError> {
        match self.ballots {
            None => Err(ConfigError::Missing("ballots")),
            Some(0) => Err(ConfigError::Invalid {
                option: "ballots",
                reason: "at least one ballot is required".to_string(),
            }),
            Some(n) => Ok(n),
        }
    }

    /// Checks every option the given workload requires, without running it.
    pub fn validate_for(&self, kind: WorkloadKind) -> Result<(), ConfigError> {
        self.contract_id()?;
        self.invoker_id()?;
        match kind {
            WorkloadKind::CastVote => {
                self.voter_count()?;
                self.item_count()?;
            }
            WorkloadKind::GetBallot => {
                self.ballot_count()?;
                self.item_count()?;
            }
            WorkloadKind::NewVoter => {}
        }
        Ok(())
    }

    pub fn voter_name(&self) -> &str {
        self.voter_name.as_deref().unwrap_or(DEFAULT_VOTER_NAME)
    }

    /// Overlays every option set in `other` onto `self`.
    pub fn merge(mut self, other: RoundArguments) -> Self {
        if other.contract_id.is_some() {
            self.contract_id = other.contract_id;
        }
        if other.invoker_id.is_some() {
            self.invoker_id = other.invoker_id;
        }
        if other.voter_name.is_some() {
            self.voter_name = other.voter_name;
        }
        self.tx = other.tx.or(self.tx);
        self.items = other.items.or(self.items);
        self.ballots = other.ballots.or(self.ballots);
        self.seed = other.seed.or(self.seed);
        self
    }
}

/// The three workload variants, differing only in what they submit per transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum WorkloadKind {
    /// Casts one ranked ballot per submission.
    CastVote,
    /// Reads one pre-built ballot per submission.
    GetBallot,
    /// Registers one new voter per submission.
    NewVoter,
}

impl WorkloadKind {
    pub fn name(&self) -> &'static str {
        match self {
            WorkloadKind::CastVote => "cast-vote",
            WorkloadKind::GetBallot => "get-ballot",
            WorkloadKind::NewVoter => "new-voter",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_arguments() {
        let args = RoundArguments::from_json_str(
            r#"{"contractId":"govote","invokerId":"User1","tx":10,"items":4,"ballots":2}"#,
        )
        .unwrap();

        assert_eq!(args.contract_id().unwrap(), "govote");
        assert_eq!(args.invoker_id().unwrap(), "User1");
        assert_eq!(args.voter_count().unwrap(), 10);
        assert_eq!(args.item_count().unwrap(), 4);
        assert_eq!(args.ballot_count().unwrap(), 2);
        assert_eq!(args.voter_name(), DEFAULT_VOTER_NAME);
    }

    #[test]
    fn test_missing_options_are_reported_by_name() {
        let args = RoundArguments::from_json_str(r#"{"contractId":"govote"}"#).unwrap();

        assert!(matches!(args.invoker_id(), Err(ConfigError::Missing("invokerId"))));
        assert!(matches!(args.voter_count(), Err(ConfigError::Missing("tx"))));
        assert!(matches!(args.ballot_count(), Err(ConfigError::Missing("ballots"))));
    }

    #[test]
    fn test_zero_ballots_is_invalid() {
        let args = RoundArguments {
            ballots: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            args.ballot_count(),
            Err(ConfigError::Invalid { option: "ballots", .. })
        ));
    }

    #[test]
    fn test_validate_per_workload() {
        let args = RoundArguments::from_json_str(
            r#"{"contractId":"govote","invokerId":"User1","items":4}"#,
        )
        .unwrap();

        assert!(args.validate_for(WorkloadKind::NewVoter).is_ok());
        assert!(matches!(
            args.validate_for(WorkloadKind::CastVote),
            Err(ConfigError::Missing("tx"))
        ));
        assert!(matches!(
            args.validate_for(WorkloadKind::GetBallot),
            Err(ConfigError::Missing("ballots"))
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = RoundArguments::from_json_str(r#"{"tx":"many"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = RoundArguments::from_json_str(
            r#"{"contractId":"govote","invokerId":"User1","tx":10,"items":4}"#,
        )
        .unwrap();
        let overrides = RoundArguments {
            tx: Some(3),
            seed: Some(9),
            ..Default::default()
        };

        let merged = base.merge(overrides);
        assert_eq!(merged.tx, Some(3));
        assert_eq!(merged.items, Some(4));
        assert_eq!(merged.seed, Some(9));
        assert_eq!(merged.contract_id.as_deref(), Some("govote"));
    }
}
