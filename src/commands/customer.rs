use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{json_body, required, Authorization, CommandError, CommandRequest, CUSTOMER_EXCHANGE};
use crate::rabbitmq::OutboundMessage;

#[derive(Args, Debug, Clone, Default)]
pub struct ReadCustomerArgs {
    /// Entity identifier
    #[arg(long)]
    pub id: Option<String>,

    /// Search a legal entity instead of a person
    #[arg(long)]
    pub legal: bool,

    #[command(flatten)]
    pub auth: Authorization,
}

#[derive(Serialize)]
struct CustomerReference<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    reference: &'a str,
}

impl ReadCustomerArgs {
    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        let id = required(&self.id, "--id")?;
        let kind = if self.legal { "legal" } else { "person" };

        // The search service takes a map of numbered criteria.
        let criteria = BTreeMap::from([(
            "1",
            CustomerReference {
                kind,
                reference: id,
            },
        )]);

        let message = OutboundMessage::new(CUSTOMER_EXCHANGE, "customer.search", json_body(&criteria)?)
            .with_headers(self.auth.headers());
        Ok(CommandRequest::call(message))
    }
}
