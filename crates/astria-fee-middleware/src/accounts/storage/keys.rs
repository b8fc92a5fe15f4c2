use eyre::{
    OptionExt as _,
    Result,
};

use crate::address::Address;

const COMPONENT_PREFIX: &str = "accounts/";
const BALANCE_PREFIX: &str = "balance/";

/// Example: `accounts/astria1rsxy...cfgm/balance/`.
pub(in crate::accounts) fn balance_prefix(address: &Address) -> String {
    format!("{COMPONENT_PREFIX}{address}/{BALANCE_PREFIX}")
}

/// Example: `accounts/astria1rsxy...cfgm/balance/transfer/channel-0/uatom`.
///
/// The denomination is the key's suffix, so denominations containing `/` are fine.
pub(in crate::accounts) fn balance(address: &Address, denom: &str) -> String {
    format!("{}{denom}", balance_prefix(address))
}

pub(in crate::accounts) fn extract_denom_from_key<'a>(
    key: &'a str,
    address: &Address,
) -> Result<&'a str> {
    key.strip_prefix(&balance_prefix(address))
        .ok_or_eyre("failed to strip prefix from account balance key")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        "astria1rsxyjrcm255ds9euthjx6yc3vrjt9sxrm9cfgm"
            .parse()
            .unwrap()
    }

    #[test]
    fn keys_should_not_change() {
        insta::assert_snapshot!(
            balance(&address(), "uatom"),
            @"accounts/astria1rsxyjrcm255ds9euthjx6yc3vrjt9sxrm9cfgm/balance/uatom"
        );
    }

    #[test]
    fn keys_should_have_component_prefix() {
        assert!(balance(&address(), "nria").starts_with(COMPONENT_PREFIX));
    }

    #[test]
    fn balance_prefix_should_be_prefix_of_balance_key() {
        assert!(balance(&address(), "nria").starts_with(&balance_prefix(&address())));
    }

    #[test]
    fn should_extract_denom_from_key() {
        let key = balance(&address(), "transfer/channel-0/uatom");
        assert_eq!(
            extract_denom_from_key(&key, &address()).unwrap(),
            "transfer/channel-0/uatom"
        );
    }
}
