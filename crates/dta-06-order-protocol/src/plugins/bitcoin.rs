//! `bitcoinwallet`: the secret is a bitcoin private key.

use dta_04_envelope::OrderDocument;
use shared_crypto::{bitcoin_address, wif, Network};

use super::ServicePlugin;
use crate::api::Extension;
use crate::errors::{ProtocolError, ProtocolResult};

pub(super) const PLUGIN_NAME: &str = "bitcoinwallet";

const COIN: &str = "coin";
const ADDRESS: &str = "address";
const PRIVATE_KEY: &str = "privatekey";

pub struct BitcoinWallet;

fn parse_coin(extension: &Extension) -> ProtocolResult<i64> {
    let raw = extension
        .get(COIN)
        .ok_or_else(|| ProtocolError::validation("extension.coin is required"))?;
    let coin: i64 = raw
        .parse()
        .map_err(|_| ProtocolError::validation(format!("coin '{}' is not an integer", raw)))?;
    network(coin)?;
    Ok(coin)
}

fn network(coin: i64) -> ProtocolResult<Network> {
    let coin = u32::try_from(coin)
        .map_err(|_| ProtocolError::validation(format!("coin {} is negative", coin)))?;
    Network::from_coin_type(coin).map_err(|e| ProtocolError::validation(e.to_string()))
}

impl ServicePlugin for BitcoinWallet {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn validate_order_request(&self, extension: &Extension) -> ProtocolResult<()> {
        parse_coin(extension).map(|_| ())
    }

    fn prepare_order_part1(
        &self,
        order: &mut OrderDocument,
        extension: &Extension,
    ) -> ProtocolResult<()> {
        order.coin = parse_coin(extension)?;
        Ok(())
    }

    fn prepare_order_response(
        &self,
        order: &mut OrderDocument,
        commitment: &str,
    ) -> ProtocolResult<Extension> {
        let address = bitcoin_address(commitment, network(order.coin)?)?;
        Ok(Extension::from([(ADDRESS.to_string(), address)]))
    }

    fn produce_final_secret(
        &self,
        order: &OrderDocument,
        final_secret: &str,
        commitment: &str,
    ) -> ProtocolResult<Extension> {
        let network = network(order.coin)?;
        Ok(Extension::from([
            (ADDRESS.to_string(), bitcoin_address(commitment, network)?),
            (PRIVATE_KEY.to_string(), wif(final_secret, network)?),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::public_key_from_private;

    const SECRET: &str = "C70C9D95F4C1612C53886D2E07A2BAE5AA931F36C65E6AF13BFBA410A0CA1BD0";

    fn ext(coin: &str) -> Extension {
        Extension::from([(COIN.to_string(), coin.to_string())])
    }

    #[test]
    fn test_coin_rules() {
        assert!(BitcoinWallet.validate_order_request(&ext("0")).is_ok());
        assert!(BitcoinWallet.validate_order_request(&ext("1")).is_ok());
        for bad in ["", "btc", "-1", "7"] {
            assert!(
                matches!(
                    BitcoinWallet.validate_order_request(&ext(bad)),
                    Err(ProtocolError::Validation(_))
                ),
                "coin {:?} accepted",
                bad
            );
        }
        assert!(BitcoinWallet.validate_order_request(&Extension::new()).is_err());
    }

    #[test]
    fn test_commitment_address_matches_final_address() {
        let mut order = OrderDocument::default();
        BitcoinWallet.prepare_order_part1(&mut order, &ext("1")).unwrap();
        assert_eq!(order.coin, 1);

        let (_, commitment) = public_key_from_private(SECRET).unwrap();
        let response = BitcoinWallet.prepare_order_response(&mut order, &commitment).unwrap();
        let final_ext = BitcoinWallet
            .produce_final_secret(&order, SECRET, &commitment)
            .unwrap();

        assert_eq!(response[ADDRESS], final_ext[ADDRESS]);
        // Testnet P2PKH and compressed testnet WIF prefixes.
        assert!(final_ext[ADDRESS].starts_with('m') || final_ext[ADDRESS].starts_with('n'));
        assert!(final_ext[PRIVATE_KEY].starts_with('c'));
    }
}
