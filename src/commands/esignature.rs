use clap::Args;
use serde::Serialize;

use super::{
    json_body, required, Authorization, CommandError, CommandRequest, ESIGNATURE_EXCHANGE,
};
use crate::rabbitmq::OutboundMessage;

#[derive(Args, Debug, Clone, Default)]
pub struct SignatureRequestArgs {
    /// Document identifier
    #[arg(long)]
    pub id: Option<String>,

    #[command(flatten)]
    pub auth: Authorization,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignatureRequest<'a> {
    document_id: &'a str,
}

impl SignatureRequestArgs {
    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        let document_id = required(&self.id, "--id")?;
        let headers = self.auth.required_headers()?;

        let body = json_body(&SignatureRequest { document_id })?;
        let message = OutboundMessage::new(ESIGNATURE_EXCHANGE, "signature.request", body)
            .with_headers(headers);
        Ok(CommandRequest::call(message))
    }
}
