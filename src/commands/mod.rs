//! Operational commands.
//!
//! Each command turns its arguments into an [`OutboundMessage`] plus a
//! [`Dispatch`] mode; the binary hands that to the messaging core. Nothing in
//! here talks to the broker.

use clap::{Args, Subcommand};
use serde::Serialize;
use thiserror::Error;

use crate::rabbitmq::OutboundMessage;

mod customer;
mod esignature;
mod ppi;
mod referential;
mod sepa;

pub use customer::ReadCustomerArgs;
pub use esignature::SignatureRequestArgs;
pub use ppi::{PpiSyncArgs, PullPoliciesArgs};
pub use referential::{
    EntityArgs, PartyArgs, PolicyEntityArgs, PullAgreementsArgs, PullCountriesArgs,
    PullProfessionsArgs,
};
pub use sepa::CheckIbanArgs;

pub const REFERENTIAL_EXCHANGE: &str = "cnp.referential";
pub const CUSTOMER_EXCHANGE: &str = "cnp.customer";
pub const SEPA_EXCHANGE: &str = "cnp.sepa";
pub const ESIGNATURE_EXCHANGE: &str = "cnp.esignature";
pub const PPI_EXCHANGE: &str = "ppi.referential";

pub const USERNAME_HEADER: &str = "App-Username";
pub const AUTHORITIES_HEADER: &str = "App-Authorities";
pub const SOURCE_HEADER: &str = "App-Source";
pub const SOURCE: &str = "hodei-cli";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Required at least one of: {0}")]
    MissingSearchKey(&'static str),

    #[error("Required authorization information (-u USERNAME and -a AUTHORITIES)")]
    MissingAuthorization,

    #[error("Unknown product {0}")]
    UnknownProduct(String),

    #[error("Failed to build request body: {0}")]
    Payload(#[from] serde_json::Error),
}

/// How a command's message is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Publish and return.
    Publish,
    /// Publish and wait for the correlated reply.
    Call,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub message: OutboundMessage,
    pub dispatch: Dispatch,
}

impl CommandRequest {
    fn publish(message: OutboundMessage) -> Self {
        Self {
            message,
            dispatch: Dispatch::Publish,
        }
    }

    fn call(message: OutboundMessage) -> Self {
        Self {
            message,
            dispatch: Dispatch::Call,
        }
    }
}

/// Caller identity forwarded to the back office as headers.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Authorization {
    /// Username
    #[arg(short = 'u', long = "username")]
    pub username: Option<String>,

    /// Authorities (comma separated)
    #[arg(short = 'a', long = "authorities")]
    pub authorities: Option<String>,
}

impl Authorization {
    pub fn new(username: impl Into<String>, authorities: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            authorities: Some(authorities.into()),
        }
    }

    /// Headers for the values that are set and non-empty.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        [
            (USERNAME_HEADER, &self.username),
            (AUTHORITIES_HEADER, &self.authorities),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (name, v.to_string()))
        })
        .collect()
    }

    /// Like [`headers`](Self::headers), but both values must be present.
    pub fn required_headers(&self) -> Result<Vec<(&'static str, String)>, CommandError> {
        let headers = self.headers();
        if headers.len() < 2 {
            return Err(CommandError::MissingAuthorization);
        }
        Ok(headers)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum BrokerCommand {
    /// Pull countries from the referential API
    PullCountries(PullCountriesArgs),
    /// Pull professions from the referential API
    PullProfessions(PullProfessionsArgs),
    /// Pull products from the referential API
    PullProducts(EntityArgs),
    /// Pull agreements from the referential API
    PullAgreements(PullAgreementsArgs),
    /// Pull customers by id, external code or id card
    PullCustomers(PartyArgs),
    /// Pull networks by id, external code or id card
    PullNetworks(PartyArgs),
    /// Pull policy orders
    PullOrders(PolicyEntityArgs),
    /// Pull claims
    PullClaims(PolicyEntityArgs),
    /// Pull policy coverages
    PullCoverages(PolicyEntityArgs),
    /// Pull policies of a product
    PullPolicies(PullPoliciesArgs),
    /// Search a customer and print the result
    ReadCustomer(ReadCustomerArgs),
    /// Validate an IBAN and print the result
    CheckIban(CheckIbanArgs),
    /// Request the signature of a document
    SignatureRequest(SignatureRequestArgs),
    /// Ask the PPI referential to synchronize
    PpiSync(PpiSyncArgs),
}

impl BrokerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BrokerCommand::PullCountries(_) => "pull-countries",
            BrokerCommand::PullProfessions(_) => "pull-professions",
            BrokerCommand::PullProducts(_) => "pull-products",
            BrokerCommand::PullAgreements(_) => "pull-agreements",
            BrokerCommand::PullCustomers(_) => "pull-customers",
            BrokerCommand::PullNetworks(_) => "pull-networks",
            BrokerCommand::PullOrders(_) => "pull-orders",
            BrokerCommand::PullClaims(_) => "pull-claims",
            BrokerCommand::PullCoverages(_) => "pull-coverages",
            BrokerCommand::PullPolicies(_) => "pull-policies",
            BrokerCommand::ReadCustomer(_) => "read-customer",
            BrokerCommand::CheckIban(_) => "check-iban",
            BrokerCommand::SignatureRequest(_) => "signature-request",
            BrokerCommand::PpiSync(_) => "ppi-sync",
        }
    }

    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        match self {
            BrokerCommand::PullCountries(args) => args.request(),
            BrokerCommand::PullProfessions(args) => args.request(),
            BrokerCommand::PullProducts(args) => args.request("product.pull"),
            BrokerCommand::PullAgreements(args) => args.request(),
            BrokerCommand::PullCustomers(args) => args.request("customer.pull"),
            BrokerCommand::PullNetworks(args) => args.request("network.pull"),
            BrokerCommand::PullOrders(args) => args.request("order.pull"),
            BrokerCommand::PullClaims(args) => args.request("claim.pull"),
            BrokerCommand::PullCoverages(args) => args.request("coverage.pull"),
            BrokerCommand::PullPolicies(args) => args.request(),
            BrokerCommand::ReadCustomer(args) => args.request(),
            BrokerCommand::CheckIban(args) => args.request(),
            BrokerCommand::SignatureRequest(args) => args.request(),
            BrokerCommand::PpiSync(args) => args.request(),
        }
    }
}

fn json_body<T: Serialize>(payload: &T) -> Result<Vec<u8>, CommandError> {
    Ok(serde_json::to_vec(payload)?)
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, CommandError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(CommandError::MissingArgument(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_authorization_values_are_not_sent() {
        let auth = Authorization {
            username: Some("jdoe".to_string()),
            authorities: Some(" ".to_string()),
        };
        assert_eq!(auth.headers(), vec![(USERNAME_HEADER, "jdoe".to_string())]);
        assert!(matches!(
            auth.required_headers(),
            Err(CommandError::MissingAuthorization)
        ));
    }

    #[test]
    fn full_authorization_yields_both_headers() {
        let auth = Authorization::new("jdoe", "ROLE_ADMIN,ROLE_USER");
        assert_eq!(
            auth.required_headers().unwrap(),
            vec![
                (USERNAME_HEADER, "jdoe".to_string()),
                (AUTHORITIES_HEADER, "ROLE_ADMIN,ROLE_USER".to_string()),
            ]
        );
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required(&Some(" 42 ".to_string()), "id").unwrap(), "42");
        assert!(matches!(
            required(&Some("".to_string()), "id"),
            Err(CommandError::MissingArgument("id"))
        ));
        assert!(required(&None, "id").is_err());
    }
}
