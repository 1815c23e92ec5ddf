use clap::Args;
use serde::Serialize;

use super::{
    json_body, required, Authorization, CommandError, CommandRequest, PPI_EXCHANGE, SOURCE,
    SOURCE_HEADER,
};
use crate::rabbitmq::OutboundMessage;

#[derive(Args, Debug, Clone, Default)]
pub struct PpiSyncArgs {}

impl PpiSyncArgs {
    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        let message =
            OutboundMessage::new(PPI_EXCHANGE, "process", "{}").with_header(SOURCE_HEADER, SOURCE);
        Ok(CommandRequest::call(message))
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct PullPoliciesArgs {
    /// Product external code (only `ppi` is supported)
    #[arg(long)]
    pub product: Option<String>,

    /// Agreement identifier
    #[arg(long = "agreement", default_value = "")]
    pub agreement_id: String,

    #[command(flatten)]
    pub auth: Authorization,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyPull<'a> {
    agreement_id: &'a str,
}

impl PullPoliciesArgs {
    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        match required(&self.product, "--product")? {
            "ppi" => {
                let body = json_body(&PolicyPull {
                    agreement_id: &self.agreement_id,
                })?;
                let message = OutboundMessage::new(PPI_EXCHANGE, "policy.pull", body)
                    .with_headers(self.auth.headers());
                Ok(CommandRequest::publish(message))
            }
            other => Err(CommandError::UnknownProduct(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Dispatch;

    #[test]
    fn ppi_sync_is_a_call() {
        let request = PpiSyncArgs::default().request().unwrap();
        assert_eq!(request.dispatch, Dispatch::Call);
        assert_eq!(request.message.exchange(), "ppi.referential");
        assert_eq!(request.message.routing_key(), "process");
        assert_eq!(request.message.body(), b"{}");
    }

    #[test]
    fn ppi_policies_are_pulled_by_agreement() {
        let args = PullPoliciesArgs {
            product: Some("ppi".to_string()),
            agreement_id: "AG-1".to_string(),
            auth: Authorization::new("jdoe", "ROLE_ADMIN"),
        };
        let request = args.request().unwrap();

        assert_eq!(request.dispatch, Dispatch::Publish);
        assert_eq!(request.message.routing_key(), "policy.pull");
        assert_eq!(request.message.body(), br#"{"agreementId":"AG-1"}"#);
    }

    #[test]
    fn product_is_required() {
        assert!(matches!(
            PullPoliciesArgs::default().request(),
            Err(CommandError::MissingArgument("--product"))
        ));
    }

    #[test]
    fn unknown_product_is_rejected() {
        let args = PullPoliciesArgs {
            product: Some("life".to_string()),
            ..PullPoliciesArgs::default()
        };
        assert!(matches!(
            args.request(),
            Err(CommandError::UnknownProduct(p)) if p == "life"
        ));
    }
}
