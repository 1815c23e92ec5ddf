use clap::Args;
use serde::Serialize;

use super::{json_body, CommandError, CommandRequest, SEPA_EXCHANGE, SOURCE, SOURCE_HEADER};
use crate::rabbitmq::OutboundMessage;

#[derive(Args, Debug, Clone, Default)]
pub struct CheckIbanArgs {
    /// IBAN
    #[arg(long, default_value = "")]
    pub iban: String,

    /// Country ISO3 code
    #[arg(long = "country", default_value = "")]
    pub country_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IbanValidation<'a> {
    country_code: &'a str,
    iban: &'a str,
}

impl CheckIbanArgs {
    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        let body = json_body(&IbanValidation {
            country_code: &self.country_code,
            iban: &self.iban,
        })?;
        let message = OutboundMessage::new(SEPA_EXCHANGE, "iban.validation", body)
            .with_header(SOURCE_HEADER, SOURCE);
        Ok(CommandRequest::call(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Dispatch;

    #[test]
    fn builds_validation_request() {
        let args = CheckIbanArgs {
            iban: "ES9121000418450200051332".to_string(),
            country_code: "ESP".to_string(),
        };
        let request = args.request().unwrap();

        assert_eq!(request.dispatch, Dispatch::Call);
        assert_eq!(request.message.exchange(), "cnp.sepa");
        assert_eq!(request.message.routing_key(), "iban.validation");
        assert_eq!(
            request.message.body(),
            br#"{"countryCode":"ESP","iban":"ES9121000418450200051332"}"#
        );
        assert_eq!(request.message.headers()["App-Source"], "hodei-cli");
    }
}
