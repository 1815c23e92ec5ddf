use clap::Args;
use serde::Serialize;

use super::{json_body, Authorization, CommandError, CommandRequest, REFERENTIAL_EXCHANGE};
use crate::rabbitmq::OutboundMessage;

#[derive(Args, Debug, Clone, Default)]
pub struct PullCountriesArgs {}

impl PullCountriesArgs {
    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        Ok(CommandRequest::publish(OutboundMessage::new(
            REFERENTIAL_EXCHANGE,
            "country.pull",
            Vec::new(),
        )))
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct PullProfessionsArgs {}

impl PullProfessionsArgs {
    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        Ok(CommandRequest::publish(OutboundMessage::new(
            REFERENTIAL_EXCHANGE,
            "profession.pull",
            "{}",
        )))
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct PullAgreementsArgs {
    #[command(flatten)]
    pub auth: Authorization,
}

impl PullAgreementsArgs {
    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        let message = OutboundMessage::new(REFERENTIAL_EXCHANGE, "agreement.pull", "{}")
            .with_headers(self.auth.headers());
        Ok(CommandRequest::publish(message))
    }
}

/// An entity addressed by id or external code.
#[derive(Args, Debug, Clone, Default)]
pub struct EntityArgs {
    /// Entity identifier
    #[arg(long, default_value = "")]
    pub id: String,

    /// Entity external code
    #[arg(long = "externalcode", default_value = "")]
    pub external_code: String,

    #[command(flatten)]
    pub auth: Authorization,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntityPayload<'a> {
    id: &'a str,
    external_code: &'a str,
}

impl EntityArgs {
    pub fn request(&self, routing_key: &str) -> Result<CommandRequest, CommandError> {
        let body = json_body(&EntityPayload {
            id: &self.id,
            external_code: &self.external_code,
        })?;
        let message = OutboundMessage::new(REFERENTIAL_EXCHANGE, routing_key, body)
            .with_headers(self.auth.headers());
        Ok(CommandRequest::publish(message))
    }
}

/// A customer or network addressed by id, external code or id card.
#[derive(Args, Debug, Clone, Default)]
pub struct PartyArgs {
    /// Entity identifier
    #[arg(long, default_value = "")]
    pub id: String,

    /// Entity external code
    #[arg(long = "externalcode", default_value = "")]
    pub external_code: String,

    /// Entity id card
    #[arg(long = "idcard", default_value = "")]
    pub id_card: String,

    #[command(flatten)]
    pub auth: Authorization,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PartyPayload<'a> {
    id: &'a str,
    external_code: &'a str,
    id_card: &'a str,
}

impl PartyArgs {
    pub fn request(&self, routing_key: &str) -> Result<CommandRequest, CommandError> {
        if [&self.id, &self.external_code, &self.id_card]
            .iter()
            .all(|v| v.trim().is_empty())
        {
            return Err(CommandError::MissingSearchKey("--id, --externalcode, --idcard"));
        }
        let headers = self.auth.required_headers()?;

        let body = json_body(&PartyPayload {
            id: &self.id,
            external_code: &self.external_code,
            id_card: &self.id_card,
        })?;
        let message =
            OutboundMessage::new(REFERENTIAL_EXCHANGE, routing_key, body).with_headers(headers);
        Ok(CommandRequest::publish(message))
    }
}

/// Orders, claims and coverages: addressed directly or through their policy.
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyEntityArgs {
    /// Entity identifier
    #[arg(long, default_value = "")]
    pub id: String,

    /// Entity external code
    #[arg(long = "externalcode", default_value = "")]
    pub external_code: String,

    /// Policy identifier
    #[arg(long = "policyid", default_value = "")]
    pub policy_id: String,

    /// Policy external code
    #[arg(long = "policyexternalcode", default_value = "")]
    pub policy_external_code: String,

    #[command(flatten)]
    pub auth: Authorization,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyEntityPayload<'a> {
    id: &'a str,
    external_code: &'a str,
    policy_id: &'a str,
    policy_external_code: &'a str,
}

impl PolicyEntityArgs {
    pub fn request(&self, routing_key: &str) -> Result<CommandRequest, CommandError> {
        let body = json_body(&PolicyEntityPayload {
            id: &self.id,
            external_code: &self.external_code,
            policy_id: &self.policy_id,
            policy_external_code: &self.policy_external_code,
        })?;
        let message = OutboundMessage::new(REFERENTIAL_EXCHANGE, routing_key, body)
            .with_headers(self.auth.headers());
        Ok(CommandRequest::publish(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Dispatch;
    use serde_json::{json, Value};

    fn body(request: &CommandRequest) -> Value {
        serde_json::from_slice(request.message.body()).unwrap()
    }

    #[test]
    fn pull_countries_has_empty_body_and_no_headers() {
        let request = PullCountriesArgs::default().request().unwrap();
        assert_eq!(request.dispatch, Dispatch::Publish);
        assert_eq!(request.message.exchange(), "cnp.referential");
        assert_eq!(request.message.routing_key(), "country.pull");
        assert!(request.message.body().is_empty());
        assert!(request.message.headers().is_empty());
    }

    #[test]
    fn pull_products_sends_id_and_external_code() {
        let args = EntityArgs {
            id: "p-1".to_string(),
            auth: Authorization::new("jdoe", "ROLE_ADMIN"),
            ..EntityArgs::default()
        };
        let request = args.request("product.pull").unwrap();

        assert_eq!(request.message.routing_key(), "product.pull");
        assert_eq!(body(&request), json!({"id": "p-1", "externalCode": ""}));
        assert_eq!(request.message.headers()["App-Username"], "jdoe");
        assert_eq!(request.message.headers()["App-Authorities"], "ROLE_ADMIN");
    }

    #[test]
    fn pull_customers_requires_a_search_key() {
        let args = PartyArgs {
            auth: Authorization::new("jdoe", "ROLE_ADMIN"),
            ..PartyArgs::default()
        };
        assert!(matches!(
            args.request("customer.pull"),
            Err(CommandError::MissingSearchKey(_))
        ));
    }

    #[test]
    fn pull_networks_requires_authorization() {
        let args = PartyArgs {
            id_card: "12345678Z".to_string(),
            ..PartyArgs::default()
        };
        assert!(matches!(
            args.request("network.pull"),
            Err(CommandError::MissingAuthorization)
        ));
    }

    #[test]
    fn pull_customers_body_is_structured_json() {
        let args = PartyArgs {
            external_code: "C\"001".to_string(),
            auth: Authorization::new("jdoe", "ROLE_ADMIN"),
            ..PartyArgs::default()
        };
        let request = args.request("customer.pull").unwrap();
        assert_eq!(
            body(&request),
            json!({"id": "", "externalCode": "C\"001", "idCard": ""})
        );
    }

    #[test]
    fn pull_claims_carries_policy_reference() {
        let args = PolicyEntityArgs {
            policy_external_code: "POL-9".to_string(),
            ..PolicyEntityArgs::default()
        };
        let request = args.request("claim.pull").unwrap();
        assert_eq!(
            body(&request),
            json!({"id": "", "externalCode": "", "policyId": "", "policyExternalCode": "POL-9"})
        );
        assert!(request.message.headers().is_empty());
    }
}
